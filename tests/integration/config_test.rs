//! Configuration wiring tests.
//!
//! Exercises the path from command-line flags through validation, the
//! same route the setup form takes.

use clap::Parser;

use sqlchat::cli::{Cli, DEFAULT_MODEL};
use sqlchat::config::{Credential, DatabaseConfig};
use sqlchat::error::ChatError;

#[test]
fn test_defaults_match_the_demo_database() {
    let cli = Cli::parse_from(["sqlchat"]);
    assert!(cli.to_database_config().is_none());
    assert_eq!(cli.model, DEFAULT_MODEL);

    let config = DatabaseConfig::local_default();
    assert!(config.validate().is_ok());
    assert_eq!(config.display_string(), "student.db (sqlite, read-only)");
}

#[test]
fn test_remote_flags_build_validating_config() {
    let cli = Cli::parse_from([
        "sqlchat", "--host", "db.internal:3307", "--user", "app", "--password", "pw",
        "--database", "grades",
    ]);
    let config = cli.to_database_config().unwrap();
    assert!(config.validate().is_ok());

    match config {
        DatabaseConfig::Remote(remote) => {
            assert_eq!(
                remote.connection_url().unwrap(),
                "mysql://app:pw@db.internal:3307/grades"
            );
        }
        _ => panic!("Expected remote config"),
    }
}

#[test]
fn test_partial_remote_flags_fail_validation_with_field_names() {
    let cli = Cli::parse_from(["sqlchat", "--host", "db.internal", "--user", "app"]);
    let config = cli.to_database_config().unwrap();

    let err = config.validate().unwrap_err();
    assert!(matches!(err, ChatError::Config(_)));
    let text = err.to_string();
    assert!(text.contains("password"));
    assert!(text.contains("database"));
    assert!(!text.contains("host"));
}

#[test]
fn test_headless_validation_requires_complete_setup() {
    let cli = Cli::parse_from(["sqlchat", "--question", "hi", "--host", "db.internal"]);
    assert!(cli.validate_headless().is_err());

    let cli = Cli::parse_from([
        "sqlchat", "--question", "hi", "--local", "student.db", "--api-key", "gsk_test",
    ]);
    assert!(cli.validate_headless().is_ok());
}

#[test]
fn test_credential_never_appears_in_debug_output() {
    let cred = Credential::new("gsk_supersecretvalue");
    let debug = format!("{cred:?}");
    assert!(!debug.contains("supersecret"));
    assert!(debug.contains("gsk_****"));
}
