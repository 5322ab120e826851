//! Application configuration.

use serde::Deserialize;
use std::path::Path;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Redis configuration.
    pub redis: RedisConfig,
    /// Federation configuration.
    pub federation: FederationConfig,
    /// Webhook verification configuration.
    #[serde(default)]
    pub webhook: WebhookConfig,
    /// Sentry configuration.
    #[serde(default)]
    pub sentry: SentryConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind to.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Database connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// MySQL connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// Redis configuration (queue topics).
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    /// Redis connection URL.
    pub url: String,
    /// Key prefix for all Redis channels.
    #[serde(default = "default_redis_prefix")]
    pub prefix: String,
}

/// Federation configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct FederationConfig {
    /// Whether outbound federation is enabled.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// User agent for outbound requests.
    #[serde(default)]
    pub user_agent: Option<String>,
    /// Timeout for outbound HTTP requests, in seconds.
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
    /// Name of the retry topic; `None` disables retry-topic routing.
    #[serde(default = "default_retry_topic")]
    pub retry_topic: Option<String>,
}

/// Webhook verification configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookConfig {
    /// Allowed clock skew for the signature timestamp, in seconds.
    #[serde(default = "default_webhook_tolerance_secs")]
    pub tolerance_secs: u64,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            tolerance_secs: default_webhook_tolerance_secs(),
        }
    }
}

/// Sentry configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SentryConfig {
    /// Sentry DSN; `None` disables reporting.
    #[serde(default)]
    pub dsn: Option<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    3000
}

const fn default_max_connections() -> u32 {
    100
}

const fn default_min_connections() -> u32 {
    5
}

fn default_redis_prefix() -> String {
    "fedipress".to_string()
}

const fn default_true() -> bool {
    true
}

const fn default_http_timeout_secs() -> u64 {
    30
}

fn default_retry_topic() -> Option<String> {
    Some("fedipress-deliver-retry".to_string())
}

const fn default_webhook_tolerance_secs() -> u64 {
    300
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `config/default.toml`
    /// 2. `config/{environment}.toml` (based on `FEDIPRESS_ENV`)
    /// 3. Environment variables with `FEDIPRESS_` prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let env = std::env::var("FEDIPRESS_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("FEDIPRESS")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load configuration from a specific file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("FEDIPRESS")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
