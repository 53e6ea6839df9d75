//! Configuration system for the backrooms server
//!
//! Supports multiple configuration sources with the following precedence (highest to lowest):
//! 1. CLI arguments
//! 2. Environment variables (BACKROOMS_* prefix, plus OPENAI_API_KEY and PORT)
//! 3. Configuration file (TOML)
//! 4. Default values

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

use crate::error::{Error, Result};

/// Name of the ledger file inside the data directory
pub const LEDGER_FILE_NAME: &str = "api_counter.json";

/// Main server configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listener settings
    pub server: ServerSettings,

    /// Text generation API settings
    pub openai: OpenAiSettings,

    /// Daily call budget and provider rate limit
    pub budget: BudgetSettings,

    /// Turn pacing, rotation and content overrides
    pub conversation: ConversationSettings,

    /// Logging configuration
    pub logging: LoggingSettings,

    /// Data storage paths
    pub storage: StorageSettings,
}

/// Listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Interface to bind
    pub host: String,

    /// TCP port for HTTP and WebSocket traffic
    pub port: u16,

    /// Answer CORS preflights for any origin
    pub cors_any_origin: bool,
}

/// OpenAI-compatible API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiSettings {
    /// API base URL (e.g., "https://api.openai.com/v1", "http://localhost:11434/v1")
    pub base_url: String,

    /// API key; required before serving
    pub api_key: String,

    /// Transport timeout per generation call in seconds
    pub timeout_secs: u64,

    /// Maximum retries on transient failures
    pub max_retries: u32,

    /// Completion length cap
    pub max_tokens: u32,

    /// Sampling temperature
    pub temperature: f32,
}

/// Call budget settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetSettings {
    /// Successful generator calls allowed per calendar day
    pub daily_limit: u32,

    /// Ledger file path (defaults to <data_dir>/api_counter.json)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ledger_file: Option<String>,

    /// Generator calls allowed per rolling window
    pub calls_per_window: u32,

    /// Rolling window length in seconds
    pub window_secs: u64,
}

/// Conversation pacing and content settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversationSettings {
    /// Speaker order by persona name (empty = bundled rotation)
    pub rotation: Vec<String>,

    /// Delay between session start and the first turn
    pub first_turn_delay_ms: u64,

    /// Lower bound (inclusive) of the delay between turns
    pub min_turn_delay_ms: u64,

    /// Upper bound (exclusive) of the delay between turns
    pub max_turn_delay_ms: u64,

    /// Delay before retrying a turn that failed
    pub retry_delay_ms: u64,

    /// Transcript length that triggers truncation
    pub transcript_limit: usize,

    /// Entries kept after truncation
    pub transcript_keep: usize,

    /// Prior lines sent to the generator as context
    pub context_window: usize,

    /// Probability that a system-log turn draws an anomaly line
    pub anomaly_rate: f64,

    /// Override for the bundled personas file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub personas_file: Option<String>,

    /// Override for the bundled content catalog
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_file: Option<String>,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level: trace, debug, info, warn, error
    pub level: String,

    /// Log file path (empty = no file logging)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,

    /// Maximum log file size in MB before rotation
    pub max_file_size_mb: u64,

    /// Number of rotated log files to keep
    pub max_files: u32,

    /// Enable JSON formatted logging
    pub json_format: bool,
}

/// Storage path settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Base data directory
    pub data_dir: String,
}

// Default implementations

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            cors_any_origin: true,
        }
    }
}

impl Default for OpenAiSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            timeout_secs: 30,
            max_retries: 2,
            max_tokens: 100,
            temperature: 0.7,
        }
    }
}

impl Default for BudgetSettings {
    fn default() -> Self {
        Self {
            daily_limit: 25,
            ledger_file: None,
            calls_per_window: 3,
            window_secs: 60,
        }
    }
}

impl Default for ConversationSettings {
    fn default() -> Self {
        Self {
            rotation: vec![],
            first_turn_delay_ms: 2000,
            min_turn_delay_ms: 3000,
            max_turn_delay_ms: 8000,
            retry_delay_ms: 5000,
            transcript_limit: 100,
            transcript_keep: 50,
            context_window: 10,
            anomaly_rate: 0.15,
            personas_file: None,
            content_file: None,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            max_file_size_mb: 100,
            max_files: 5,
            json_format: false,
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.backrooms".to_string(),
        }
    }
}

impl ConversationSettings {
    pub fn first_turn_delay(&self) -> Duration {
        Duration::from_millis(self.first_turn_delay_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

impl BudgetSettings {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

impl ServerConfig {
    /// Load configuration from file with environment variable overrides
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut config = Self::default();

        // 1. Load from config file if it exists
        let config_file = Self::find_config_file(config_path)?;
        if let Some(path) = config_file {
            debug!(path = %path.display(), "Loading configuration file");
            let content = fs::read_to_string(&path).map_err(|e| Error::IoRead {
                path: path.clone(),
                source: e,
            })?;
            config = toml::from_str(&content).map_err(|e| Error::ConfigParse {
                message: format!("{}: {}", path.display(), e),
                source: Some(e),
            })?;
            info!(path = %path.display(), "Configuration loaded from file");
        }

        // 2. Apply environment variable overrides
        config.apply_env_overrides();

        // 3. Expand paths
        config.expand_paths();

        // 4. Validate
        config.validate()?;

        Ok(config)
    }

    /// Find the configuration file to use
    fn find_config_file(explicit_path: Option<&str>) -> Result<Option<PathBuf>> {
        // If explicit path provided, use it (error if not found)
        if let Some(path) = explicit_path {
            let path = PathBuf::from(expand_path(path));
            if path.exists() {
                return Ok(Some(path));
            }
            return Err(Error::config_not_found(path));
        }

        let search_paths = [
            // Current directory
            PathBuf::from("backrooms.toml"),
            PathBuf::from("config.toml"),
            // User config directory
            dirs::config_dir()
                .map(|p| p.join("backrooms").join("server.toml"))
                .unwrap_or_default(),
            // Home directory
            dirs::home_dir()
                .map(|p| p.join(".backrooms").join("server.toml"))
                .unwrap_or_default(),
            // System config (Linux)
            PathBuf::from("/etc/backrooms/server.toml"),
        ];

        for path in &search_paths {
            if path.is_file() {
                debug!(path = %path.display(), "Found configuration file");
                return Ok(Some(path.clone()));
            }
        }

        debug!("No configuration file found, using defaults");
        Ok(None)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    fn apply_overrides_from(&mut self, var: impl Fn(&str) -> Option<String>) {
        fn flag(val: &str) -> bool {
            val.eq_ignore_ascii_case("true") || val == "1"
        }

        // Server settings; bare PORT is the conventional hosting variable,
        // the prefixed one wins when both are set
        if let Some(val) = var("BACKROOMS_HOST") {
            self.server.host = val;
        }
        if let Some(n) = var("PORT").and_then(|v| v.parse().ok()) {
            self.server.port = n;
        }
        if let Some(n) = var("BACKROOMS_PORT").and_then(|v| v.parse().ok()) {
            self.server.port = n;
        }
        if let Some(val) = var("BACKROOMS_CORS_ANY_ORIGIN") {
            self.server.cors_any_origin = flag(&val);
        }

        // OpenAI settings
        if let Some(val) = var("BACKROOMS_OPENAI_BASE_URL") {
            self.openai.base_url = val;
        }
        if let Some(val) = var("OPENAI_API_KEY") {
            self.openai.api_key = val;
        }
        if let Some(val) = var("BACKROOMS_OPENAI_API_KEY") {
            self.openai.api_key = val;
        }
        if let Some(n) = var("BACKROOMS_OPENAI_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            self.openai.timeout_secs = n;
        }
        if let Some(n) = var("BACKROOMS_OPENAI_MAX_RETRIES").and_then(|v| v.parse().ok()) {
            self.openai.max_retries = n;
        }

        // Budget settings
        if let Some(n) = var("BACKROOMS_DAILY_LIMIT").and_then(|v| v.parse().ok()) {
            self.budget.daily_limit = n;
        }
        if let Some(val) = var("BACKROOMS_LEDGER_FILE") {
            self.budget.ledger_file = Some(val);
        }
        if let Some(n) = var("BACKROOMS_CALLS_PER_WINDOW").and_then(|v| v.parse().ok()) {
            self.budget.calls_per_window = n;
        }

        // Conversation settings
        if let Some(val) = var("BACKROOMS_ROTATION") {
            self.conversation.rotation = val
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(val) = var("BACKROOMS_PERSONAS_FILE") {
            self.conversation.personas_file = Some(val);
        }
        if let Some(val) = var("BACKROOMS_CONTENT_FILE") {
            self.conversation.content_file = Some(val);
        }

        // Logging settings
        if let Some(val) = var("BACKROOMS_LOG_LEVEL") {
            self.logging.level = val;
        }
        if let Some(val) = var("BACKROOMS_LOG_FILE") {
            self.logging.file = Some(val);
        }
        if let Some(val) = var("BACKROOMS_LOG_JSON") {
            self.logging.json_format = flag(&val);
        }

        // Storage settings
        if let Some(val) = var("BACKROOMS_DATA_DIR") {
            self.storage.data_dir = val;
        }
    }

    /// Expand ~ and other path variables
    fn expand_paths(&mut self) {
        self.storage.data_dir = expand_path(&self.storage.data_dir);

        for path in [
            &mut self.budget.ledger_file,
            &mut self.logging.file,
            &mut self.conversation.personas_file,
            &mut self.conversation.content_file,
        ] {
            if let Some(expanded) = path.as_deref().map(expand_path) {
                *path = Some(expanded);
            }
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.host.trim().is_empty() {
            return Err(Error::config_field_invalid("server.host", "Host cannot be empty"));
        }
        if self.server.port == 0 {
            return Err(Error::config_field_invalid("server.port", "Port must be greater than 0"));
        }

        match Url::parse(&self.openai.base_url) {
            Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
            Ok(_) => {
                return Err(Error::config_field_invalid(
                    "openai.base_url",
                    "Base URL must start with http:// or https://",
                ))
            }
            Err(e) => {
                return Err(Error::config_field_invalid(
                    "openai.base_url",
                    format!("Invalid base URL '{}': {}", self.openai.base_url, e),
                ))
            }
        }
        if self.openai.timeout_secs == 0 {
            return Err(Error::config_field_invalid(
                "openai.timeout_secs",
                "timeout_secs must be greater than 0",
            ));
        }
        if self.openai.max_tokens == 0 {
            return Err(Error::config_field_invalid(
                "openai.max_tokens",
                "max_tokens must be greater than 0",
            ));
        }
        if !(0.0..=2.0).contains(&self.openai.temperature) {
            return Err(Error::config_field_invalid(
                "openai.temperature",
                "temperature must be between 0.0 and 2.0",
            ));
        }

        if self.budget.daily_limit == 0 {
            return Err(Error::config_field_invalid(
                "budget.daily_limit",
                "daily_limit must be greater than 0",
            ));
        }
        if self.budget.calls_per_window == 0 || self.budget.window_secs == 0 {
            return Err(Error::config_field_invalid(
                "budget.calls_per_window",
                "calls_per_window and window_secs must be greater than 0",
            ));
        }

        let conv = &self.conversation;
        if conv.min_turn_delay_ms >= conv.max_turn_delay_ms {
            return Err(Error::config_field_invalid(
                "conversation.min_turn_delay_ms",
                format!(
                    "min_turn_delay_ms ({}) must be less than max_turn_delay_ms ({})",
                    conv.min_turn_delay_ms, conv.max_turn_delay_ms
                ),
            ));
        }
        if conv.transcript_keep == 0 || conv.transcript_keep > conv.transcript_limit {
            return Err(Error::config_field_invalid(
                "conversation.transcript_keep",
                format!(
                    "transcript_keep ({}) must be between 1 and transcript_limit ({})",
                    conv.transcript_keep, conv.transcript_limit
                ),
            ));
        }
        if !(0.0..=1.0).contains(&conv.anomaly_rate) {
            return Err(Error::config_field_invalid(
                "conversation.anomaly_rate",
                "anomaly_rate must be between 0.0 and 1.0",
            ));
        }

        // Validate log level
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(Error::config_field_invalid(
                "logging.level",
                format!(
                    "Invalid log level '{}'. Must be one of: {}",
                    self.logging.level,
                    valid_levels.join(", ")
                ),
            ));
        }

        Ok(())
    }

    /// Fail unless the generator credential is present
    pub fn require_credentials(&self) -> Result<()> {
        if self.openai.api_key.trim().is_empty() {
            return Err(Error::MissingCredential {
                name: "OPENAI_API_KEY".to_string(),
            });
        }
        Ok(())
    }

    /// Copy safe to print: the API key is masked
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        if !config.openai.api_key.is_empty() {
            config.openai.api_key = "********".to_string();
        }
        config
    }

    /// Get the data directory as a PathBuf
    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(&self.storage.data_dir)
    }

    /// Where the usage ledger lives
    pub fn ledger_path(&self) -> PathBuf {
        self.budget
            .ledger_file
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| self.data_dir().join(LEDGER_FILE_NAME))
    }
}

/// Expand ~ and environment variables in paths
fn expand_path(path: &str) -> String {
    shellexpand::full(path)
        .unwrap_or_else(|_| std::borrow::Cow::Borrowed(path))
        .into_owned()
}

/// Initialize a new configuration file
pub fn init_config(path: Option<&str>, force: bool) -> Result<PathBuf> {
    let config_path = path
        .map(|p| PathBuf::from(expand_path(p)))
        .unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".backrooms")
                .join("server.toml")
        });

    if config_path.exists() && !force {
        return Err(Error::Config(format!(
            "Configuration file already exists: {}. Use --force to overwrite.",
            config_path.display()
        )));
    }

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::IoWrite {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    fs::write(&config_path, generate_default_config()).map_err(|e| Error::IoWrite {
        path: config_path.clone(),
        source: e,
    })?;

    Ok(config_path)
}

/// Generate default configuration content with comments
fn generate_default_config() -> String {
    r#"# Backrooms Server Configuration

[server]
# Interface and port for HTTP and WebSocket traffic
host = "0.0.0.0"
port = 3001

# Answer CORS requests from any origin
cors_any_origin = true

[openai]
# API base URL (OpenAI, Ollama, vLLM, LM Studio, etc.)
base_url = "https://api.openai.com/v1"

# API key (prefer the OPENAI_API_KEY environment variable)
# api_key = "sk-..."

# Timeout per generation call in seconds
timeout_secs = 30

# Maximum retries on transient failures
max_retries = 2

# Completion parameters
max_tokens = 100
temperature = 0.7

[budget]
# Successful generator calls per calendar day
daily_limit = 25

# Usage ledger location (defaults to <data_dir>/api_counter.json)
# ledger_file = "~/.backrooms/api_counter.json"

# Provider rate limit: calls per rolling window
calls_per_window = 3
window_secs = 60

[conversation]
# Speaker order by persona name (empty = bundled rotation)
rotation = []

# Turn pacing in milliseconds; the next-turn delay is drawn from [min, max)
first_turn_delay_ms = 2000
min_turn_delay_ms = 3000
max_turn_delay_ms = 8000
retry_delay_ms = 5000

# Once the transcript exceeds transcript_limit, keep only the last transcript_keep
transcript_limit = 100
transcript_keep = 50

# Prior lines sent to the generator
context_window = 10

# Chance a system-log turn picks an anomaly line
anomaly_rate = 0.15

# Override bundled personas or content
# personas_file = "~/.backrooms/personas.toml"
# content_file = "~/.backrooms/content.toml"

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log file path (comment out to disable file logging)
# file = "~/.backrooms/logs/server.log"

# Maximum log file size in MB before rotation
max_file_size_mb = 100

# Number of rotated log files to keep
max_files = 5

# Enable JSON formatted logging
json_format = false

[storage]
# Base data directory
data_dir = "~/.backrooms"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn overrides(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.server.port, 3001);
        assert_eq!(config.budget.daily_limit, 25);
        assert_eq!(config.budget.calls_per_window, 3);
        assert_eq!(config.conversation.transcript_limit, 100);
        assert_eq!(config.conversation.transcript_keep, 50);
        assert_eq!(config.openai.max_tokens, 100);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_env_override() {
        let mut config = ServerConfig::default();
        config.apply_overrides_from(overrides(&[
            ("BACKROOMS_PORT", "4000"),
            ("BACKROOMS_DAILY_LIMIT", "5"),
            ("BACKROOMS_LOG_LEVEL", "debug"),
            ("BACKROOMS_ROTATION", "GPT-2, System Log"),
        ]));

        assert_eq!(config.server.port, 4000);
        assert_eq!(config.budget.daily_limit, 5);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.conversation.rotation, vec!["GPT-2", "System Log"]);
    }

    #[test]
    fn test_prefixed_port_beats_bare_port() {
        let mut config = ServerConfig::default();
        config.apply_overrides_from(overrides(&[("PORT", "8080")]));
        assert_eq!(config.server.port, 8080);

        config.apply_overrides_from(overrides(&[("PORT", "8080"), ("BACKROOMS_PORT", "9090")]));
        assert_eq!(config.server.port, 9090);
    }

    #[test]
    fn test_api_key_from_env() {
        let mut config = ServerConfig::default();
        assert!(config.require_credentials().is_err());

        config.apply_overrides_from(overrides(&[("OPENAI_API_KEY", "sk-test")]));
        assert_eq!(config.openai.api_key, "sk-test");
        assert!(config.require_credentials().is_ok());
    }

    #[test]
    fn test_unparseable_override_ignored() {
        let mut config = ServerConfig::default();
        config.apply_overrides_from(overrides(&[("BACKROOMS_PORT", "not-a-port")]));
        assert_eq!(config.server.port, 3001);
    }

    #[test]
    fn test_missing_credential_error() {
        let mut config = ServerConfig::default();
        config.openai.api_key = "   ".to_string();
        let err = config.require_credentials().unwrap_err();
        assert!(matches!(err, Error::MissingCredential { .. }));
    }

    #[test]
    fn test_validation_valid_config() {
        assert!(ServerConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validation_invalid_url() {
        let mut config = ServerConfig::default();
        config.openai.base_url = "ftp://example.com".to_string();
        assert!(config.validate().is_err());

        config.openai.base_url = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_delay_bounds() {
        let mut config = ServerConfig::default();
        config.conversation.min_turn_delay_ms = 8000;
        let err = config.validate().unwrap_err();
        assert!(
            matches!(err, Error::ConfigValidation { field: Some(ref f), .. } if f == "conversation.min_turn_delay_ms")
        );
    }

    #[test]
    fn test_validation_transcript_keep() {
        let mut config = ServerConfig::default();
        config.conversation.transcript_keep = 101;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_zero_budget() {
        let mut config = ServerConfig::default();
        config.budget.daily_limit = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_invalid_log_level() {
        let mut config = ServerConfig::default();
        config.logging.level = "invalid".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_anomaly_rate() {
        let mut config = ServerConfig::default();
        config.conversation.anomaly_rate = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_path_expansion() {
        let mut config = ServerConfig::default();
        config.budget.ledger_file = Some("~/counter.json".to_string());
        config.expand_paths();

        assert!(!config.storage.data_dir.contains('~'));
        assert!(!config.budget.ledger_file.as_ref().unwrap().contains('~'));
    }

    #[test]
    fn test_ledger_path() {
        let mut config = ServerConfig::default();
        config.storage.data_dir = "/var/lib/backrooms".to_string();
        assert_eq!(
            config.ledger_path(),
            PathBuf::from("/var/lib/backrooms/api_counter.json")
        );

        config.budget.ledger_file = Some("/tmp/usage.json".to_string());
        assert_eq!(config.ledger_path(), PathBuf::from("/tmp/usage.json"));
    }

    #[test]
    fn test_redacted() {
        let mut config = ServerConfig::default();
        config.openai.api_key = "sk-secret".to_string();
        let shown = toml::to_string(&config.redacted()).unwrap();
        assert!(!shown.contains("sk-secret"));
        assert!(shown.contains("********"));
        assert_eq!(config.openai.api_key, "sk-secret");
    }

    #[test]
    fn test_generated_default_parses() {
        let config: ServerConfig = toml::from_str(&generate_default_config()).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.port, 3001);
    }

    #[test]
    fn test_parse_config_file() {
        let config_str = r#"
[server]
port = 4001

[budget]
daily_limit = 50

[conversation]
rotation = ["System Log", "GPT-2"]
anomaly_rate = 0.0

[logging]
level = "debug"
"#;

        let config: ServerConfig = toml::from_str(config_str).unwrap();

        assert_eq!(config.server.port, 4001);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.budget.daily_limit, 50);
        assert_eq!(config.conversation.rotation, vec!["System Log", "GPT-2"]);
        assert_eq!(config.conversation.min_turn_delay_ms, 3000);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_load_explicit_missing_file() {
        let err = ServerConfig::load(Some("/nonexistent/backrooms.toml")).unwrap_err();
        assert!(matches!(err, Error::ConfigNotFound { .. }));
    }

    #[test]
    fn test_init_config_refuses_overwrite() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("server.toml");
        let path_str = path.to_str().unwrap();

        assert_eq!(init_config(Some(path_str), false).unwrap(), path);
        assert!(init_config(Some(path_str), false).is_err());
        assert!(init_config(Some(path_str), true).is_ok());
    }
}
