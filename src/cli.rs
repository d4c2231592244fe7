//! Command-line argument parsing for sqlchat.
//!
//! Flags pre-fill the interactive setup form; a complete set of flags
//! skips the form entirely. `--question` runs a single interaction
//! without the terminal UI.

use clap::Parser;
use std::path::PathBuf;

use crate::config::{Credential, DatabaseConfig, RemoteConfig};

/// Default model served by the Groq API.
pub const DEFAULT_MODEL: &str = "llama3-8b-8192";

/// Chat with a SQL database from your terminal.
#[derive(Parser, Debug)]
#[command(name = "sqlchat")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to a local SQLite database file (opened read-only)
    #[arg(short = 'l', long, value_name = "PATH")]
    pub local: Option<PathBuf>,

    /// MySQL host (enables remote mode; may include a port as host:port)
    #[arg(short = 'H', long, value_name = "HOST")]
    pub host: Option<String>,

    /// MySQL user
    #[arg(short = 'U', long, value_name = "USER")]
    pub user: Option<String>,

    /// MySQL password
    #[arg(long, value_name = "PASSWORD")]
    pub password: Option<String>,

    /// MySQL database name
    #[arg(short = 'd', long, value_name = "DATABASE")]
    pub database: Option<String>,

    /// Groq API key
    #[arg(short = 'k', long, value_name = "KEY", env = "GROQ_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Model to use
    #[arg(short = 'm', long, value_name = "MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    // === Headless mode options ===
    /// Ask a single question and print the answer (no terminal UI)
    #[arg(short = 'q', long, value_name = "TEXT")]
    pub question: Option<String>,

    /// Use a canned responder instead of the model API (for testing)
    #[arg(long)]
    pub mock_agent: bool,
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Converts CLI arguments to a DatabaseConfig, if any were given.
    ///
    /// Remote flags take precedence over --local; missing remote fields are
    /// left empty and caught by validation, never guessed.
    pub fn to_database_config(&self) -> Option<DatabaseConfig> {
        if self.host.is_some()
            || self.user.is_some()
            || self.password.is_some()
            || self.database.is_some()
        {
            return Some(DatabaseConfig::Remote(RemoteConfig {
                host: self.host.clone().unwrap_or_default(),
                user: self.user.clone().unwrap_or_default(),
                password: self.password.clone().unwrap_or_default(),
                database: self.database.clone().unwrap_or_default(),
            }));
        }

        self.local
            .as_ref()
            .map(|path| DatabaseConfig::Local { path: path.clone() })
    }

    /// Returns the credential from the flag or environment, if present.
    pub fn credential(&self) -> Option<Credential> {
        self.api_key
            .as_deref()
            .map(Credential::new)
            .filter(|c| !c.is_empty())
    }

    /// Returns true if a headless one-shot interaction was requested.
    pub fn is_headless(&self) -> bool {
        self.question.is_some()
    }

    /// Validates headless mode arguments.
    ///
    /// Headless mode has no form to fall back to, so the configuration must
    /// be complete up front. The mock responder needs neither a credential
    /// nor a database.
    pub fn validate_headless(&self) -> std::result::Result<(), String> {
        if self.question.is_none() {
            return Ok(());
        }

        if self.mock_agent {
            return Ok(());
        }

        let config = self
            .to_database_config()
            .unwrap_or_else(DatabaseConfig::local_default);
        config.validate().map_err(|e| e.to_string())?;

        if self.credential().is_none() {
            return Err(
                "--question requires an API key (--api-key or GROQ_API_KEY)".to_string(),
            );
        }

        Ok(())
    }
}
