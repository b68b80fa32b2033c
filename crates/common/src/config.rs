//! Application configuration.

use serde::Deserialize;
use std::path::Path;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Question feed configuration.
    #[serde(default)]
    pub feed: FeedConfig,
    /// Answer thread configuration.
    #[serde(default)]
    pub thread: ThreadConfig,
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
    /// `PostgreSQL` connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// Question feed configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    /// Page size used when the request does not give one.
    #[serde(default = "default_feed_limit")]
    pub default_limit: u64,
    /// Upper bound for a requested page size.
    #[serde(default = "default_feed_max_limit")]
    pub max_limit: u64,
}

/// Answer thread configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ThreadConfig {
    /// Deepest level expanded when assembling a thread (root is depth 0).
    #[serde(default = "default_thread_max_depth")]
    pub max_depth: usize,
    /// Ceiling for a per-request depth override.
    #[serde(default = "default_thread_max_depth_limit")]
    pub max_depth_limit: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            default_limit: default_feed_limit(),
            max_limit: default_feed_max_limit(),
        }
    }
}

impl Default for ThreadConfig {
    fn default() -> Self {
        Self {
            max_depth: default_thread_max_depth(),
            max_depth_limit: default_thread_max_depth_limit(),
        }
    }
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

const fn default_feed_limit() -> u64 {
    20
}

const fn default_feed_max_limit() -> u64 {
    100
}

const fn default_thread_max_depth() -> usize {
    2
}

const fn default_thread_max_depth_limit() -> usize {
    16
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `.env` (if present, exported into the process environment)
    /// 2. `config/default.toml`
    /// 3. `config/{environment}.toml` (based on `QUORUM_ENV`)
    /// 4. Environment variables with `QUORUM__` prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();

        let env = std::env::var("QUORUM_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("QUORUM")
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
                config::Environment::with_prefix("QUORUM")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn from_toml(toml: &str) -> Config {
        config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_defaults_applied_when_sections_missing() {
        let config = from_toml(
            r#"
            [database]
            url = "postgres://localhost/quorum"
            "#,
        );

        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.database.max_connections, 100);
        assert_eq!(config.feed.default_limit, 20);
        assert_eq!(config.feed.max_limit, 100);
        assert_eq!(config.thread.max_depth, 2);
        assert_eq!(config.thread.max_depth_limit, 16);
    }

    #[test]
    fn test_overrides_are_read() {
        let config = from_toml(
            r#"
            [server]
            port = 8080

            [database]
            url = "postgres://db/quorum"
            min_connections = 1

            [feed]
            default_limit = 10

            [thread]
            max_depth = 4
            "#,
        );

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.database.min_connections, 1);
        assert_eq!(config.feed.default_limit, 10);
        assert_eq!(config.feed.max_limit, 100);
        assert_eq!(config.thread.max_depth, 4);
    }

    #[test]
    fn test_missing_database_is_an_error() {
        let result = config::Config::builder()
            .add_source(config::File::from_str("", config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize::<Config>();

        assert!(result.is_err());
    }
}
