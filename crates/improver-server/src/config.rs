//! Configuration file parsing for the server.
//!
//! Loads settings from TOML files including bind address, storage
//! directories, upload limits, analyzer tuning and provider credentials.

use improver_analyzer::AnalyzerConfig;
use improver_llm::anthropic::DEFAULT_ENDPOINT;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable holding the provider API key
pub const API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

/// Prefix every real Anthropic key starts with
pub const API_KEY_PREFIX: &str = "sk-ant-";

/// Server configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse config TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Missing required field
    #[error("Missing required configuration field: {0}")]
    MissingField(String),

    /// Field present but unusable
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Server configuration loaded from TOML
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "127.0.0.1")
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Bind port (e.g., 8000)
    #[serde(default = "default_bind_port")]
    pub bind_port: u16,

    /// Directory uploaded protocols are saved to
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,

    /// Directory improved protocols are written to
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Largest accepted upload in megabytes (default: 10)
    #[serde(default = "default_max_file_size_mb")]
    pub max_file_size_mb: u64,

    /// Characters of extracted text shown in an upload preview (default: 500)
    #[serde(default = "default_preview_chars")]
    pub preview_chars: usize,

    /// Analyzer tuning
    #[serde(default)]
    pub analyzer: AnalyzerConfig,

    /// Model provider connection
    #[serde(default)]
    pub provider: ProviderConfig,
}

/// Model provider configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    /// API base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// API key; `ANTHROPIC_API_KEY` takes precedence
    #[serde(default)]
    pub api_key: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: String::new(),
        }
    }
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_bind_port() -> u16 {
    8000
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("uploads")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("outputs")
}

fn default_max_file_size_mb() -> u64 {
    10
}

fn default_preview_chars() -> usize {
    500
}

fn default_base_url() -> String {
    DEFAULT_ENDPOINT.to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            bind_port: default_bind_port(),
            upload_dir: default_upload_dir(),
            output_dir: default_output_dir(),
            max_file_size_mb: default_max_file_size_mb(),
            preview_chars: default_preview_chars(),
            analyzer: AnalyzerConfig::default(),
            provider: ProviderConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from a TOML file
    ///
    /// The environment's API key overrides the file's.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::parse(&contents)?;
        config.override_api_key(std::env::var(API_KEY_ENV).ok());
        config.validate()?;
        Ok(config)
    }

    /// Configuration from defaults and the environment only
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.override_api_key(std::env::var(API_KEY_ENV).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML document without validating it
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Replace the API key when `key` is set and non-empty
    pub fn override_api_key(&mut self, key: Option<String>) {
        if let Some(key) = key.filter(|k| !k.trim().is_empty()) {
            self.provider.api_key = key.trim().to_string();
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.provider.api_key.is_empty() {
            return Err(ConfigError::MissingField(format!(
                "provider.api_key (or {})",
                API_KEY_ENV
            )));
        }
        if !self.provider.api_key.starts_with(API_KEY_PREFIX) {
            return Err(ConfigError::Invalid(format!(
                "API key appears to be invalid, it should start with '{}'",
                API_KEY_PREFIX
            )));
        }
        if self.provider.base_url.trim().is_empty() {
            return Err(ConfigError::MissingField("provider.base_url".to_string()));
        }
        if self.max_file_size_mb == 0 {
            return Err(ConfigError::Invalid(
                "max_file_size_mb must be greater than 0".to_string(),
            ));
        }
        if self.preview_chars == 0 {
            return Err(ConfigError::Invalid(
                "preview_chars must be greater than 0".to_string(),
            ));
        }
        self.analyzer
            .validate()
            .map_err(|e| ConfigError::Invalid(format!("analyzer: {}", e)))?;
        Ok(())
    }

    /// Create the upload and output directories if missing
    pub fn prepare_directories(&self) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.upload_dir)?;
        std::fs::create_dir_all(&self.output_dir)?;
        Ok(())
    }

    /// Create a configuration for testing rooted at `dir`
    pub fn default_test_config(dir: &Path) -> Self {
        ServerConfig {
            upload_dir: dir.join("uploads"),
            output_dir: dir.join("outputs"),
            provider: ProviderConfig {
                base_url: "http://localhost:9".to_string(),
                api_key: "sk-ant-test-key".to_string(),
            },
            ..Self::default()
        }
    }

    /// Get the full bind address (address:port)
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.bind_port)
    }

    /// Upload ceiling in bytes
    pub fn max_file_size_bytes(&self) -> usize {
        usize::try_from(self.max_file_size_mb.saturating_mul(1024 * 1024)).unwrap_or(usize::MAX)
    }
}
