use std::time::Duration;

use serde::Deserialize;

use crate::services::orchestrator::PollSettings;

/// Prefix shared by every configuration variable.
pub const ENV_PREFIX: &str = "FACTCHECK_";

/// Client configuration, read from `FACTCHECK_*` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Base URL of the fact-check service (e.g., "http://localhost:5000")
    pub api_url: String,

    /// Delay between job status checks, in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Status checks before a job is abandoned as timed out
    #[serde(default = "default_max_poll_ticks")]
    pub max_poll_ticks: u32,

    /// Per-request HTTP timeout, in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Mark rendered reports as coming from the demo service
    #[serde(default)]
    pub demo_mode: bool,
}

fn default_poll_interval_ms() -> u64 {
    2000
}

fn default_max_poll_ticks() -> u32 {
    60
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let config: Self = envy::prefixed(ENV_PREFIX).from_env()?;
        config.validate()
    }

    /// Load from explicit key/value pairs (keys carry the `FACTCHECK_` prefix).
    pub fn from_vars<I>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let config: Self = envy::prefixed(ENV_PREFIX).from_iter(vars)?;
        config.validate()
    }

    fn validate(self) -> Result<Self, ConfigError> {
        if !(self.api_url.starts_with("http://") || self.api_url.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "{ENV_PREFIX}API_URL must be an http(s) URL, got {:?}",
                self.api_url
            )));
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(format!(
                "{ENV_PREFIX}POLL_INTERVAL_MS must be greater than zero"
            )));
        }
        if self.max_poll_ticks == 0 {
            return Err(ConfigError::Invalid(format!(
                "{ENV_PREFIX}MAX_POLL_TICKS must be greater than zero"
            )));
        }
        Ok(self)
    }

    pub fn poll_settings(&self) -> PollSettings {
        PollSettings {
            interval: Duration::from_millis(self.poll_interval_ms),
            max_ticks: self.max_poll_ticks,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read configuration from environment: {0}")]
    Env(#[from] envy::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
