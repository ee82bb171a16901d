//! Configuration module for drivegate.

use serde::Deserialize;
use std::path::Path;

use crate::{GateError, Result};

/// Minimum length accepted for generated private tokens.
pub const MIN_TOKEN_LENGTH: usize = 8;

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port number to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Registry storage backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RegistryBackend {
    /// A single JSON document holding the whole map.
    #[default]
    Json,
    /// A SQLite database file.
    Sqlite,
}

/// Registry configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RegistryConfig {
    /// Storage backend.
    #[serde(default)]
    pub backend: RegistryBackend,
    /// Path to the registry file (JSON document or SQLite database).
    #[serde(default = "default_registry_path")]
    pub path: String,
    /// Length of generated private tokens.
    #[serde(default = "default_token_length")]
    pub token_length: usize,
}

fn default_registry_path() -> String {
    "data/folderMap.json".to_string()
}

fn default_token_length() -> usize {
    8
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            backend: RegistryBackend::default(),
            path: default_registry_path(),
            token_length: default_token_length(),
        }
    }
}

/// Google Drive configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DriveConfig {
    /// Base URL of the Drive v3 REST API.
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Path to a service-account JSON key.
    #[serde(default)]
    pub credentials_file: Option<String>,
    /// Raw service-account JSON key (takes precedence over the file).
    #[serde(default)]
    pub credentials_json: Option<String>,
    /// Token registered for the bootstrap folder.
    #[serde(default = "default_bootstrap_token")]
    pub bootstrap_token: String,
    /// Folder seeded under `bootstrap_token` at start-up.
    #[serde(default)]
    pub bootstrap_folder_id: Option<String>,
    /// Connect timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Read (idle) timeout in seconds.
    #[serde(default = "default_read_timeout")]
    pub read_timeout_secs: u64,
    /// Total timeout in seconds for listing, metadata and token requests.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_api_base() -> String {
    "https://www.googleapis.com/drive/v3".to_string()
}

fn default_bootstrap_token() -> String {
    "abc123".to_string()
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_read_timeout() -> u64 {
    30
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            credentials_file: None,
            credentials_json: None,
            bootstrap_token: default_bootstrap_token(),
            bootstrap_folder_id: None,
            connect_timeout_secs: default_connect_timeout(),
            read_timeout_secs: default_read_timeout(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Archive configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ArchiveConfig {
    /// Download filename used when none can be derived from the folder name.
    #[serde(default = "default_archive_filename")]
    pub default_filename: String,
    /// Deflate level (1-9); 0 stores entries uncompressed.
    #[serde(default = "default_compression_level")]
    pub compression_level: i64,
    /// Number of chunks buffered between the archive writer and the response.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
    /// Timeout in seconds for fetching metadata and opening a file.
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,
    /// Timeout in seconds between two chunks of one file.
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

fn default_archive_filename() -> String {
    "photos.zip".to_string()
}

fn default_compression_level() -> i64 {
    9
}

fn default_channel_capacity() -> usize {
    8
}

fn default_fetch_timeout() -> u64 {
    30
}

fn default_idle_timeout() -> u64 {
    60
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            default_filename: default_archive_filename(),
            compression_level: default_compression_level(),
            channel_capacity: default_channel_capacity(),
            fetch_timeout_secs: default_fetch_timeout(),
            idle_timeout_secs: default_idle_timeout(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file. Empty disables file logging.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/drivegate.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Web configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WebConfig {
    /// CORS allowed origins.
    #[serde(default)]
    pub cors_origins: Vec<String>,
    /// Whether to serve static files.
    #[serde(default)]
    pub serve_static: bool,
    /// Path to static files directory.
    #[serde(default = "default_static_path")]
    pub static_path: String,
}

fn default_static_path() -> String {
    "web/dist".to_string()
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            cors_origins: vec![],
            serve_static: false,
            static_path: default_static_path(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Registry configuration.
    #[serde(default)]
    pub registry: RegistryConfig,
    /// Google Drive configuration.
    #[serde(default)]
    pub drive: DriveConfig,
    /// Archive configuration.
    #[serde(default)]
    pub archive: ArchiveConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Web configuration.
    #[serde(default)]
    pub web: WebConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(GateError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| GateError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `GOOGLE_SERVICE_ACCOUNT_KEY`: raw service-account JSON key
    /// - `GOOGLE_DRIVE_FOLDER_ID`: bootstrap folder id
    /// - `DRIVEGATE_PORT`: listen port
    pub fn apply_env_overrides(&mut self) {
        if let Some(key) = non_empty_var("GOOGLE_SERVICE_ACCOUNT_KEY") {
            self.drive.credentials_json = Some(key);
        }
        if let Some(folder_id) = non_empty_var("GOOGLE_DRIVE_FOLDER_ID") {
            self.drive.bootstrap_folder_id = Some(folder_id);
        }
        if let Some(port) = non_empty_var("DRIVEGATE_PORT") {
            match port.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => tracing::warn!(value = %port, "Ignoring invalid DRIVEGATE_PORT"),
            }
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.drive.credentials_json.is_none() && self.drive.credentials_file.is_none() {
            return Err(GateError::Config(
                "no Google service-account credentials. \
                 Set drive.credentials_file in config.toml or GOOGLE_SERVICE_ACCOUNT_KEY."
                    .to_string(),
            ));
        }
        if self.registry.token_length < MIN_TOKEN_LENGTH {
            return Err(GateError::Config(format!(
                "registry.token_length must be at least {MIN_TOKEN_LENGTH}"
            )));
        }
        if !(0..=9).contains(&self.archive.compression_level) {
            return Err(GateError::Config(
                "archive.compression_level must be between 0 and 9".to_string(),
            ));
        }
        if self.archive.channel_capacity == 0 {
            return Err(GateError::Config(
                "archive.channel_capacity must be greater than 0".to_string(),
            ));
        }
        if self.archive.fetch_timeout_secs == 0 || self.archive.idle_timeout_secs == 0 {
            return Err(GateError::Config(
                "archive.fetch_timeout_secs and archive.idle_timeout_secs must be greater than 0"
                    .to_string(),
            ));
        }
        Ok(())
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}
