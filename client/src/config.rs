//! Configuration management for the crop yield prediction client
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (config/development.toml, config/production.toml)
//! 3. Environment variable overrides with CYP_ prefix

use std::path::PathBuf;
use std::time::Duration;

use config::{ConfigError, Environment, File};
use serde::Deserialize;

/// Main client configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Prediction backend configuration
    pub api: ApiConfig,

    /// Session persistence configuration
    pub session: SessionConfig,

    /// Demo-mode authentication
    pub demo: DemoConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    /// Backend base URL, without trailing slash
    pub base_url: String,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionConfig {
    /// Directory holding the persisted session keys
    pub storage_dir: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DemoConfig {
    /// Fall back to local registration when the backend is unreachable
    pub enabled: bool,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment = std::env::var("CYP_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("api.base_url", "http://localhost:8000")?
            .set_default("api.timeout_secs", 30)?
            .set_default("session.storage_dir", ".crop-yield")?
            .set_default("demo.enabled", false)?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (CYP_ prefix)
            .add_source(
                Environment::with_prefix("CYP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout_secs: 30,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            api: ApiConfig::default(),
            session: SessionConfig {
                storage_dir: PathBuf::from(".crop-yield"),
            },
            demo: DemoConfig { enabled: false },
        }
    }
}
