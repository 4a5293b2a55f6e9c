use mailivo_engine::config::{env_or, ConfigError};
use mailivo_engine::EngineConfig;

/// Server configuration loaded from environment variables.
///
/// All fields except `database_url` have defaults suitable for local
/// development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3001`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `60`).
    pub request_timeout_secs: u64,
    /// Postgres connection string.
    pub database_url: String,
    /// Landivo listing API base URL.
    pub landivo_api_url: String,
    /// Mailivo campaign API base URL.
    pub mailivo_api_url: String,
    /// Bearer token for the Mailivo campaign API, if it requires one.
    pub mailivo_api_token: Option<String>,
    /// Per-request timeout for Landivo and Mailivo calls (default: `30`).
    pub upstream_timeout_secs: u64,
    /// Whether the per-minute `time_based` ticker runs (default: `true`).
    pub scheduler_enabled: bool,
    /// Dispatcher tuning.
    pub engine: EngineConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                     |
    /// |------------------------|-----------------------------|
    /// | `HOST`                 | `0.0.0.0`                   |
    /// | `PORT`                 | `3001`                      |
    /// | `CORS_ORIGINS`         | `http://localhost:3000`     |
    /// | `REQUEST_TIMEOUT_SECS` | `60`                        |
    /// | `DATABASE_URL`         | required                    |
    /// | `LANDIVO_API_URL`      | `http://localhost:5000/api` |
    /// | `MAILIVO_API_URL`      | `http://localhost:3000`     |
    /// | `MAILIVO_API_TOKEN`    | unset                       |
    /// | `UPSTREAM_TIMEOUT_SECS`| `30`                        |
    /// | `SCHEDULER_ENABLED`    | `true`                      |
    ///
    /// Engine variables are documented on [`EngineConfig::from_env`].
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port: u16 = env_or("PORT", 3001, "u16")?;

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = env_or("REQUEST_TIMEOUT_SECS", 60, "u64")?;

        let database_url = std::env::var("DATABASE_URL").map_err(|_| ConfigError {
            key: "DATABASE_URL",
            expected: "postgres connection string",
            value: String::new(),
        })?;

        let landivo_api_url =
            std::env::var("LANDIVO_API_URL").unwrap_or_else(|_| "http://localhost:5000/api".into());
        let mailivo_api_url = std::env::var("MAILIVO_API_URL").unwrap_or_else(|_| "http://localhost:3000".into());
        let mailivo_api_token = std::env::var("MAILIVO_API_TOKEN").ok().filter(|t| !t.trim().is_empty());
        let upstream_timeout_secs: u64 = env_or("UPSTREAM_TIMEOUT_SECS", 30, "u64")?;

        let scheduler_enabled: bool = env_or("SCHEDULER_ENABLED", true, "bool")?;

        Ok(Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            database_url,
            landivo_api_url,
            mailivo_api_url,
            mailivo_api_token,
            upstream_timeout_secs,
            scheduler_enabled,
            engine: EngineConfig::from_env()?,
        })
    }
}
