use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Discovery/indexing backend base URL.
    #[serde(default = "default_api_url")]
    pub base_url: String,
    /// How often the standing pollers refresh, in milliseconds.
    #[serde(default = "default_refresh_ms")]
    pub refresh_interval_ms: u64,
    /// Per-request deadline for every backend fetch, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub request_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DashboardConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    /// Chain shown when the URL carries no `chain` selection.
    #[serde(default)]
    pub default_chain: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

fn default_api_url() -> String {
    "http://localhost:8080/api".to_string()
}
fn default_refresh_ms() -> u64 {
    10_000
}
fn default_timeout_ms() -> u64 {
    10_000
}
fn default_bind_addr() -> String {
    "127.0.0.1:3333".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_api_url(),
            refresh_interval_ms: default_refresh_ms(),
            request_timeout_ms: default_timeout_ms(),
        }
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            default_chain: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl ApiConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Config {
    /// Load config from a TOML file, then overlay environment variables.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;
        config.apply_env();
        Ok(config)
    }

    /// Load a default config from environment variables only (no file needed).
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env();
        config
    }

    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("OMNIWATCH_API_URL") {
            self.api.base_url = url;
        }
        if let Ok(addr) = std::env::var("OMNIWATCH_BIND_ADDR") {
            self.dashboard.bind_addr = addr;
        }
        if let Ok(ms) = std::env::var("OMNIWATCH_REFRESH_MS") {
            if let Ok(ms) = ms.parse() {
                self.api.refresh_interval_ms = ms;
            }
        }
    }
}
