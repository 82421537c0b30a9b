//! Client configuration

use config::{Config, Environment, File};
use reqwest::Url;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{ClientError, Result};

pub const ENV_PREFIX: &str = "AGENT_CONSOLE";

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_REFRESH_TIMEOUT_SECS: u64 = 10;
const DEFAULT_LOG_FILTER: &str = "info";

/// Configuration for the console client
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Backend base URL, e.g. `https://api.example.com`
    pub api_base_url: String,

    /// Timeout applied to every HTTP request
    /// Default: 30 seconds
    pub request_timeout_secs: u64,

    /// Upper bound for one refresh call; expiry counts as a network failure
    /// Default: 10 seconds
    pub refresh_timeout_secs: u64,

    /// File holding the refresh token between runs. In-memory only when unset.
    #[serde(default)]
    pub refresh_token_path: Option<PathBuf>,

    /// `tracing` filter directive
    /// Default: "info"
    pub log_filter: String,
}

impl ClientConfig {
    pub fn new(api_base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            refresh_timeout_secs: DEFAULT_REFRESH_TIMEOUT_SECS,
            refresh_token_path: None,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }

    pub fn with_refresh_token_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.refresh_token_path = Some(path.into());
        self
    }

    /// Load from an optional TOML file, overridden by `AGENT_CONSOLE_*` variables
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut builder = Config::builder()
            .set_default("api_base_url", "")?
            .set_default("request_timeout_secs", DEFAULT_REQUEST_TIMEOUT_SECS)?
            .set_default("refresh_timeout_secs", DEFAULT_REFRESH_TIMEOUT_SECS)?
            .set_default("log_filter", DEFAULT_LOG_FILTER)?;

        if let Some(path) = path {
            builder = builder.add_source(File::with_name(path).required(false));
        }

        let config: ClientConfig = builder
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let base_url = self.api_base_url.trim();
        if base_url.is_empty() {
            return Err(ClientError::Configuration("api_base_url is required".to_string()));
        }

        let url = Url::parse(base_url)
            .map_err(|e| ClientError::Configuration(format!("Invalid api_base_url: {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ClientError::Configuration(format!(
                "api_base_url must use http or https, got {}",
                url.scheme()
            )));
        }

        if self.request_timeout_secs == 0 || self.refresh_timeout_secs == 0 {
            return Err(ClientError::Configuration(
                "timeouts must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn refresh_timeout(&self) -> Duration {
        Duration::from_secs(self.refresh_timeout_secs)
    }
}
