//! Error types for the backrooms server
//!
//! Provides structured error handling with:
//! - Numeric error codes for machine parsing
//! - User-friendly messages with suggestions
//! - Classification of which failures the conversation loop survives
//! - Exit codes for CLI

use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

use crate::generator::GenerationError;

/// Result type alias for server operations
pub type Result<T> = std::result::Result<T, Error>;

/// Numeric error codes for machine parsing and documentation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum ErrorCode {
    // Configuration errors (1xx)
    ConfigNotFound = 100,
    ConfigParseError = 101,
    ConfigValidation = 102,
    MissingCredential = 103,

    // IO and persistence errors (2xx)
    IoRead = 200,
    IoWrite = 201,
    IoPermission = 202,
    IoNotFound = 203,
    LedgerPersistence = 210,

    // Serving errors (3xx)
    BindFailed = 300,
    ServerFailed = 301,

    // Generation errors (5xx)
    GenerationFailed = 500,
    GenerationTimeout = 501,

    // Turn execution errors (6xx)
    EmptyCatalog = 601,
    UnknownPersona = 602,

    // Internal errors (9xx)
    InternalError = 900,
}

impl ErrorCode {
    /// Get the string code (e.g., "E100")
    pub fn as_str(&self) -> String {
        format!("E{}", *self as u16)
    }

    /// Get the exit code for CLI (maps to 1-125 range)
    pub fn exit_code(&self) -> i32 {
        match *self as u16 {
            100..=199 => 10,
            200..=299 => 20,
            300..=399 => 30,
            500..=599 => 50,
            600..=699 => 60,
            900..=999 => 90,
            _ => 1,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Main error type for the server
#[derive(Error, Debug)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Configuration parse error
    #[error("Failed to parse configuration: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<toml::de::Error>,
    },

    /// Configuration validation error
    #[error("Configuration validation failed: {message}")]
    ConfigValidation { message: String, field: Option<String> },

    /// Generic configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A secret required before serving is absent
    #[error("Missing credential: {name} is not set")]
    MissingCredential { name: String },

    // ─────────────────────────────────────────────────────────────
    // IO / Persistence Errors
    // ─────────────────────────────────────────────────────────────

    /// File read error
    #[error("Failed to read file: {path}")]
    IoRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File write error
    #[error("Failed to write file: {path}")]
    IoWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    Toml(#[from] toml::ser::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Usage ledger could not be read or written
    #[error("Usage ledger persistence failed for {path}: {message}")]
    Persistence { path: PathBuf, message: String },

    // ─────────────────────────────────────────────────────────────
    // Serving Errors
    // ─────────────────────────────────────────────────────────────

    /// Listener could not bind
    #[error("Failed to bind {addr}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// HTTP server terminated with an error
    #[error("Server error: {0}")]
    Server(String),

    // ─────────────────────────────────────────────────────────────
    // Generation Errors
    // ─────────────────────────────────────────────────────────────

    /// External text generation failed
    #[error("Generation failed: {0}")]
    Generation(#[from] GenerationError),

    // ─────────────────────────────────────────────────────────────
    // Turn Execution Errors
    // ─────────────────────────────────────────────────────────────

    /// A catalog needed for the current turn has no lines
    #[error("Content catalog '{catalog}' is empty")]
    EmptyCatalog { catalog: String },

    /// Rotation references a persona nobody defined
    #[error("Unknown persona: {name}")]
    UnknownPersona { name: String },

    // ─────────────────────────────────────────────────────────────
    // Internal Errors
    // ─────────────────────────────────────────────────────────────

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Get the numeric error code
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::ConfigNotFound { .. } => ErrorCode::ConfigNotFound,
            Error::ConfigParse { .. } => ErrorCode::ConfigParseError,
            Error::ConfigValidation { .. } => ErrorCode::ConfigValidation,
            Error::Config(_) => ErrorCode::ConfigValidation,
            Error::MissingCredential { .. } => ErrorCode::MissingCredential,

            Error::IoRead { .. } => ErrorCode::IoRead,
            Error::IoWrite { .. } => ErrorCode::IoWrite,
            Error::Io(e) => match e.kind() {
                std::io::ErrorKind::NotFound => ErrorCode::IoNotFound,
                std::io::ErrorKind::PermissionDenied => ErrorCode::IoPermission,
                _ => ErrorCode::IoRead,
            },
            Error::Toml(_) => ErrorCode::ConfigParseError,
            Error::Json(_) => ErrorCode::LedgerPersistence,
            Error::Persistence { .. } => ErrorCode::LedgerPersistence,

            Error::Bind { .. } => ErrorCode::BindFailed,
            Error::Server(_) => ErrorCode::ServerFailed,

            Error::Generation(GenerationError::Timeout { .. }) => ErrorCode::GenerationTimeout,
            Error::Generation(_) => ErrorCode::GenerationFailed,

            Error::EmptyCatalog { .. } => ErrorCode::EmptyCatalog,
            Error::UnknownPersona { .. } => ErrorCode::UnknownPersona,

            Error::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// Whether the conversation loop should retry the same speaker
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::EmptyCatalog { .. }
                | Error::Generation(_)
                | Error::Io(_)
                | Error::IoRead { .. }
                | Error::IoWrite { .. }
                | Error::Persistence { .. }
        )
    }

    /// Whether the process must not start (or continue) serving
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::ConfigNotFound { .. }
                | Error::ConfigParse { .. }
                | Error::ConfigValidation { .. }
                | Error::Config(_)
                | Error::MissingCredential { .. }
                | Error::UnknownPersona { .. }
                | Error::Bind { .. }
                | Error::Internal(_)
        )
    }

    /// Get the exit code for CLI
    pub fn exit_code(&self) -> i32 {
        self.code().exit_code()
    }

    /// Get a user-friendly suggestion for how to fix this error
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Error::ConfigNotFound { .. } => Some(
                "Run 'backrooms-server config init' to create a default configuration file.",
            ),
            Error::ConfigParse { .. } => Some(
                "Check your configuration file syntax. Run 'backrooms-server config validate' to see details.",
            ),
            Error::ConfigValidation { .. } | Error::Config(_) => Some(
                "Review the configuration file and fix the invalid values.",
            ),
            Error::MissingCredential { .. } => Some(
                "Export OPENAI_API_KEY (or BACKROOMS_OPENAI_API_KEY) or set [openai].api_key in the config file.",
            ),
            Error::Persistence { .. } => Some(
                "Check that the data directory exists and is writable. Usage is tracked in memory meanwhile.",
            ),
            Error::Bind { .. } => Some(
                "Another process may be using the port. Pick another with --port or BACKROOMS_PORT.",
            ),
            Error::UnknownPersona { .. } => Some(
                "Every name in [conversation].rotation must be defined in the personas file.",
            ),
            Error::EmptyCatalog { .. } => Some(
                "Add at least one line to the named catalog in the content file.",
            ),
            _ => None,
        }
    }

    /// Format the error for terminal display with colors
    pub fn format_for_terminal(&self) -> String {
        let mut output = format!("\x1b[31mError [{}]\x1b[0m: {}\n", self.code(), self);

        if let Some(hint) = self.suggestion() {
            output.push_str(&format!("\n\x1b[33mHint\x1b[0m: {}\n", hint));
        }

        output
    }

    /// Format the error for logging (no colors)
    pub fn format_for_log(&self) -> String {
        format!("[{}] {}", self.code(), self)
    }
}

// ─────────────────────────────────────────────────────────────────
// Error Constructors
// ─────────────────────────────────────────────────────────────────

impl Error {
    pub fn config_not_found(path: impl Into<PathBuf>) -> Self {
        Error::ConfigNotFound { path: path.into() }
    }

    pub fn config_validation(message: impl Into<String>) -> Self {
        Error::ConfigValidation {
            message: message.into(),
            field: None,
        }
    }

    /// Create a config validation error with field name
    pub fn config_field_invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Error::ConfigValidation {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    pub fn persistence(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Error::Persistence {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn empty_catalog(catalog: impl Into<String>) -> Self {
        Error::EmptyCatalog {
            catalog: catalog.into(),
        }
    }
}
