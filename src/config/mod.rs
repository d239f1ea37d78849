pub mod validation;

use serde::{Deserialize, Serialize};

use self::validation::validate_config;

/// Error type for configuration loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Upstream chat service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Endpoint base, e.g. `https://api.openai.com/v1`. A trailing slash and
    /// a `/chat/completions` suffix are both tolerated.
    pub api_endpoint: String,
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub system_prompt: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_http_pool_max_idle_per_host")]
    pub http_pool_max_idle_per_host: usize,
    #[serde(default = "default_http_pool_idle_timeout_secs")]
    pub http_pool_idle_timeout_secs: u64,
    #[serde(default)]
    pub proxy: Option<String>,
}

fn default_model() -> String {
    "gpt-3.5-turbo".to_string()
}
fn default_temperature() -> f64 {
    0.7
}
fn default_timeout() -> u64 {
    120
}
fn default_http_pool_max_idle_per_host() -> usize {
    16
}
fn default_http_pool_idle_timeout_secs() -> u64 {
    15
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            api_endpoint: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            model: default_model(),
            system_prompt: String::new(),
            temperature: default_temperature(),
            timeout_secs: default_timeout(),
            http_pool_max_idle_per_host: default_http_pool_max_idle_per_host(),
            http_pool_idle_timeout_secs: default_http_pool_idle_timeout_secs(),
            proxy: None,
        }
    }
}

/// Feature flags and settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeaturesConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "INFO".to_string()
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub service: ServiceConfig,
    #[serde(default)]
    pub features: FeaturesConfig,
}

/// Load and validate configuration from a YAML file.
///
/// # Errors
///
/// Returns [`ConfigError`] when the file cannot be read, parsed, or fails
/// validation.
pub fn load_config(path: &str) -> Result<AppConfig, ConfigError> {
    let raw = std::fs::read_to_string(path)?;
    let config: AppConfig = serde_yaml::from_str(&raw)?;
    validate_config(&config)?;
    Ok(config)
}
