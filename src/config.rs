//! Configuration types for sqlchat.
//!
//! A session is configured from interactive form fields (optionally
//! pre-filled from the command line): a database selection plus the model
//! credential. Configurations are immutable once constructed; changing the
//! form produces a new value.

use std::fmt;
use std::path::PathBuf;

use url::Url;

use crate::error::{ChatError, Result};

/// Default local database file, matching the bundled demo database.
pub const DEFAULT_LOCAL_DB: &str = "student.db";

/// Database selection: a local embedded file or a remote server.
///
/// Identity (`PartialEq`/`Hash`) covers every field, so the handle cache
/// can key on the configuration itself.
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum DatabaseConfig {
    /// Local SQLite file, opened read-only. The file must already exist.
    Local { path: PathBuf },
    /// Remote MySQL server.
    Remote(RemoteConfig),
}

/// Connection details for a remote MySQL database.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct RemoteConfig {
    pub host: String,
    pub user: String,
    pub password: String,
    pub database: String,
}

impl DatabaseConfig {
    /// Creates a local configuration with the default database file.
    pub fn local_default() -> Self {
        Self::Local {
            path: PathBuf::from(DEFAULT_LOCAL_DB),
        }
    }

    /// Validates the configuration.
    ///
    /// Remote mode requires all four fields to be non-empty; nothing is
    /// guessed or defaulted. The error names the missing fields so the
    /// setup form can point at them.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Local { path } => {
                if path.as_os_str().is_empty() {
                    return Err(ChatError::config("Database file path is required"));
                }
                Ok(())
            }
            Self::Remote(remote) => {
                let mut missing = Vec::new();
                if remote.host.trim().is_empty() {
                    missing.push("host");
                }
                if remote.user.trim().is_empty() {
                    missing.push("user");
                }
                if remote.password.is_empty() {
                    missing.push("password");
                }
                if remote.database.trim().is_empty() {
                    missing.push("database");
                }
                if missing.is_empty() {
                    Ok(())
                } else {
                    Err(ChatError::config(format!(
                        "Please provide all MySQL connection details (missing: {})",
                        missing.join(", ")
                    )))
                }
            }
        }
    }

    /// Returns a display-safe string (no password) for UI purposes.
    pub fn display_string(&self) -> String {
        match self {
            Self::Local { path } => format!("{} (sqlite, read-only)", path.display()),
            Self::Remote(remote) => {
                format!("{} @ {} (mysql)", remote.database, remote.host)
            }
        }
    }
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never leak the password through Debug output.
        write!(f, "DatabaseConfig({})", self.display_string())
    }
}

impl RemoteConfig {
    /// Builds a sqlx-compatible connection URL.
    ///
    /// User and password are percent-encoded through the `url` crate. The
    /// host field may carry an explicit port as `host:port`; otherwise the
    /// MySQL default of 3306 applies.
    pub fn connection_url(&self) -> Result<String> {
        let (host, port) = match self.host.rsplit_once(':') {
            Some((h, p)) if p.chars().all(|c| c.is_ascii_digit()) && !p.is_empty() => {
                let port: u16 = p
                    .parse()
                    .map_err(|_| ChatError::config(format!("Invalid port in host '{}'", self.host)))?;
                (h.to_string(), Some(port))
            }
            _ => (self.host.clone(), None),
        };

        let mut url = Url::parse("mysql://localhost")
            .map_err(|e| ChatError::internal(format!("Failed to build connection URL: {e}")))?;
        url.set_host(Some(&host))
            .map_err(|_| ChatError::config(format!("Invalid host '{}'", self.host)))?;
        if let Some(port) = port {
            url.set_port(Some(port))
                .map_err(|_| ChatError::config(format!("Invalid port in host '{}'", self.host)))?;
        }
        url.set_username(&self.user)
            .map_err(|_| ChatError::config(format!("Invalid user '{}'", self.user)))?;
        url.set_password(Some(&self.password))
            .map_err(|_| ChatError::config("Invalid password"))?;
        url.set_path(&format!("/{}", self.database));

        Ok(url.to_string())
    }
}

/// The model API key.
///
/// Held only in memory for the lifetime of the session; masked in all
/// display and debug output.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Creates a credential from a raw string, trimming whitespace.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into().trim().to_string())
    }

    /// Returns true if no key material is present.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the raw key for use in request headers.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Returns a masked form suitable for display.
    pub fn masked(&self) -> String {
        mask_secret(&self.0)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential({})", self.masked())
    }
}

/// Masks a secret for display: keeps a short prefix, hides the rest.
pub fn mask_secret(secret: &str) -> String {
    if secret.is_empty() {
        "<empty>".to_string()
    } else if secret.len() <= 6 {
        "****".to_string()
    } else {
        format!("{}****", &secret[..4])
    }
}
