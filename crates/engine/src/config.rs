use std::str::FromStr;
use std::time::Duration;

/// A malformed configuration variable.
#[derive(Debug, thiserror::Error)]
#[error("{key} must be a valid {expected}, got '{value}'")]
pub struct ConfigError {
    pub key: &'static str,
    pub expected: &'static str,
    pub value: String,
}

/// Read `key` from the environment, falling back to `default` when unset.
pub fn env_or<T: FromStr>(key: &'static str, default: T, expected: &'static str) -> Result<T, ConfigError> {
    match std::env::var(key) {
        Err(_) => Ok(default),
        Ok(value) => value.trim().parse().map_err(|_| ConfigError {
            key,
            expected,
            value,
        }),
    }
}

/// Automation engine tuning.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Upper bound on one campaign-service call (default: 30s).
    pub campaign_timeout: Duration,
    /// Automations evaluated concurrently per event (default: 8).
    pub max_concurrency: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            campaign_timeout: Duration::from_secs(30),
            max_concurrency: 8,
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                  | Default |
    /// |--------------------------|---------|
    /// | `CAMPAIGN_TIMEOUT_SECS`  | `30`    |
    /// | `AUTOMATION_CONCURRENCY` | `8`     |
    pub fn from_env() -> Result<Self, ConfigError> {
        let timeout_secs: u64 = env_or("CAMPAIGN_TIMEOUT_SECS", 30, "u64")?;
        let max_concurrency: usize = env_or("AUTOMATION_CONCURRENCY", 8, "usize")?;

        Ok(Self {
            campaign_timeout: Duration::from_secs(timeout_secs),
            max_concurrency: max_concurrency.max(1),
        })
    }
}
