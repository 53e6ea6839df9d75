//! Common test utilities and fixtures
//!
//! This module provides shared test infrastructure

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use assert_cmd::Command;

/// Environment variables the server reads; cleared so the host cannot leak in
const SERVER_ENV: &[&str] = &[
    "BACKROOMS_CONFIG",
    "BACKROOMS_HOST",
    "PORT",
    "BACKROOMS_PORT",
    "BACKROOMS_CORS_ANY_ORIGIN",
    "BACKROOMS_OPENAI_BASE_URL",
    "OPENAI_API_KEY",
    "BACKROOMS_OPENAI_API_KEY",
    "BACKROOMS_OPENAI_TIMEOUT_SECS",
    "BACKROOMS_OPENAI_MAX_RETRIES",
    "BACKROOMS_DAILY_LIMIT",
    "BACKROOMS_LEDGER_FILE",
    "BACKROOMS_CALLS_PER_WINDOW",
    "BACKROOMS_ROTATION",
    "BACKROOMS_PERSONAS_FILE",
    "BACKROOMS_CONTENT_FILE",
    "BACKROOMS_LOG_LEVEL",
    "BACKROOMS_LOG_FILE",
    "BACKROOMS_LOG_JSON",
    "BACKROOMS_DATA_DIR",
    "RUST_LOG",
];

/// Get the path to the test fixtures directory
pub fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
}

/// Get a path to a specific fixture file
pub fn fixture_path(name: &str) -> PathBuf {
    fixtures_dir().join(name)
}

/// Get the valid config fixture path
pub fn valid_config_fixture() -> PathBuf {
    fixture_path("valid_config.toml")
}

/// Get the invalid config fixture path
pub fn invalid_config_fixture() -> PathBuf {
    fixture_path("invalid_config.toml")
}

/// The server binary, sandboxed to `home`
///
/// HOME, the XDG config directory and the working directory all point at
/// `home`, so config discovery and the default data directory never touch
/// the real user's files.
pub fn server_cmd(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("backrooms-server").unwrap();
    for name in SERVER_ENV {
        cmd.env_remove(name);
    }
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .current_dir(home);
    cmd
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixtures_dir_exists() {
        assert!(fixtures_dir().exists(), "Fixtures directory should exist");
    }

    #[test]
    fn test_valid_config_exists() {
        assert!(
            valid_config_fixture().exists(),
            "Valid config fixture should exist"
        );
    }

    #[test]
    fn test_invalid_config_exists() {
        assert!(
            invalid_config_fixture().exists(),
            "Invalid config fixture should exist"
        );
    }
}
