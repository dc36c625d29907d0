//! Configuration loading and validation for WealthDesk.
//!
//! Precedence, lowest to highest: built-in defaults → TOML file →
//! `WEALTHDESK_*` environment variables.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Display name of the advisor running this instance (used in drafts).
    #[serde(default = "default_advisor_name")]
    pub advisor_name: String,

    #[serde(default)]
    pub gateway: GatewayConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub reasoning: ReasoningConfig,
}

/// HTTP/WebSocket gateway settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Origins allowed by the CORS layer.
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "127.0.0.1".into()
}

fn default_port() -> u16 {
    8600
}

fn default_cors_origins() -> Vec<String> {
    vec!["http://localhost:3000".into()]
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: default_cors_origins(),
        }
    }
}

/// Record store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// SQLite path, or `sqlite::memory:` for an ephemeral store.
    #[serde(default = "default_store_path")]
    pub path: String,

    /// Seed the demo dataset into an empty store on startup.
    #[serde(default)]
    pub seed_on_start: bool,
}

fn default_store_path() -> String {
    "sqlite://wealthdesk.db".into()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            seed_on_start: false,
        }
    }
}

/// External reasoning call settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReasoningConfig {
    /// API key. Usually supplied via `WEALTHDESK_API_KEY` or
    /// `ANTHROPIC_API_KEY` rather than the file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Fast model for routing and matching calls.
    #[serde(default = "default_router_model")]
    pub router_model: String,

    /// Deeper model for advisor-facing synthesis.
    #[serde(default = "default_writer_model")]
    pub writer_model: String,
}

fn default_router_model() -> String {
    "claude-haiku-3-5-20241022".into()
}

fn default_writer_model() -> String {
    "claude-sonnet-4-20250514".into()
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            router_model: default_router_model(),
            writer_model: default_writer_model(),
        }
    }
}

fn default_advisor_name() -> String {
    "Alex".into()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            advisor_name: default_advisor_name(),
            gateway: GatewayConfig::default(),
            store: StoreConfig::default(),
            reasoning: ReasoningConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.wealthdesk/config.toml),
    /// then apply environment overrides:
    /// - `WEALTHDESK_API_KEY` / `ANTHROPIC_API_KEY`
    /// - `WEALTHDESK_HOST` / `WEALTHDESK_PORT`
    /// - `WEALTHDESK_DB`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env();
        Ok(config)
    }

    /// Load configuration from a specific file path (no env overrides).
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides (highest precedence).
    pub fn apply_env(&mut self) {
        if let Ok(key) = std::env::var("WEALTHDESK_API_KEY") {
            self.reasoning.api_key = Some(key);
        } else if self.reasoning.api_key.is_none() {
            self.reasoning.api_key = std::env::var("ANTHROPIC_API_KEY").ok();
        }
        if let Ok(host) = std::env::var("WEALTHDESK_HOST") {
            self.gateway.host = host;
        }
        if let Ok(port) = std::env::var("WEALTHDESK_PORT") {
            if let Ok(port) = port.parse() {
                self.gateway.port = port;
            } else {
                tracing::warn!(value = %port, "Ignoring unparsable WEALTHDESK_PORT");
            }
        }
        if let Ok(db) = std::env::var("WEALTHDESK_DB") {
            self.store.path = db;
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".wealthdesk")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.gateway.port == 0 {
            return Err(ConfigError::ValidationError(
                "gateway.port must be non-zero".into(),
            ));
        }
        if self.store.path.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "store.path must not be empty".into(),
            ));
        }
        if self.reasoning.router_model.trim().is_empty()
            || self.reasoning.writer_model.trim().is_empty()
        {
            return Err(ConfigError::ValidationError(
                "reasoning models must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Check if a reasoning API key is available.
    pub fn has_api_key(&self) -> bool {
        self.reasoning.api_key.is_some()
    }

    /// Generate a default config TOML string (for onboarding).
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigError> for wealthdesk_core::Error {
    fn from(e: ConfigError) -> Self {
        wealthdesk_core::Error::Config {
            message: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.gateway.port, 8600);
        assert_eq!(config.advisor_name, "Alex");
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.gateway.port, config.gateway.port);
        assert_eq!(parsed.reasoning.router_model, config.reasoning.router_model);
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.gateway.host, "127.0.0.1");
    }

    #[test]
    fn zero_port_rejected() {
        let mut config = AppConfig::default();
        config.gateway.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
advisor_name = "Morgan"

[gateway]
port = 9100
"#,
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.advisor_name, "Morgan");
        assert_eq!(config.gateway.port, 9100);
        // Untouched sections keep their defaults
        assert_eq!(config.store.path, "sqlite://wealthdesk.db");
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "advisor_name = [not toml").unwrap();
        assert!(matches!(
            AppConfig::load_from(&path),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("8600"));
        assert!(toml_str.contains("router_model"));
    }
}
