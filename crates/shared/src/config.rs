//! Application configuration management.

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// JWT configuration.
    pub jwt: JwtConfig,
    /// Resolved-session cache configuration.
    #[serde(default)]
    pub session_cache: SessionCacheConfig,
    /// Audit log query limits.
    #[serde(default)]
    pub audit: AuditConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// JWT configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    /// Secret key for verifying tokens.
    pub secret: String,
    /// Access token expiration in seconds.
    #[serde(default = "default_access_token_expiry")]
    pub access_token_expiry_secs: u64,
}

fn default_access_token_expiry() -> u64 {
    900 // 15 minutes
}

/// Cache of resolved tenant contexts, keyed by bearer token.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionCacheConfig {
    /// Time-to-live for a cached context, in seconds.
    #[serde(default = "default_session_ttl")]
    pub ttl_secs: u64,
    /// Maximum number of cached contexts.
    #[serde(default = "default_session_capacity")]
    pub max_capacity: u64,
}

impl Default for SessionCacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_session_ttl(),
            max_capacity: default_session_capacity(),
        }
    }
}

fn default_session_ttl() -> u64 {
    60
}

fn default_session_capacity() -> u64 {
    10_000
}

/// Audit log query limits.
#[derive(Debug, Clone, Deserialize)]
pub struct AuditConfig {
    /// Limit applied when a query does not specify one.
    #[serde(default = "default_query_limit")]
    pub default_query_limit: u64,
    /// Hard upper bound on any query limit.
    #[serde(default = "max_query_limit")]
    pub max_query_limit: u64,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            default_query_limit: default_query_limit(),
            max_query_limit: max_query_limit(),
        }
    }
}

fn default_query_limit() -> u64 {
    100
}

fn max_query_limit() -> u64 {
    1000
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// Sources, later ones overriding earlier ones: `config/default`,
    /// `config/{RUN_MODE}`, then `BURSAR__SECTION__KEY` environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(
                config::Environment::with_prefix("BURSAR")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_from_environment_with_defaults() {
        temp_env::with_vars(
            [
                ("BURSAR__DATABASE__URL", Some("postgres://localhost/bursar_test")),
                ("BURSAR__JWT__SECRET", Some("test-secret")),
                ("BURSAR__SERVER__PORT", None),
                ("BURSAR__SESSION_CACHE__TTL_SECS", None),
            ],
            || {
                let config = AppConfig::load().unwrap();
                assert_eq!(config.database.url, "postgres://localhost/bursar_test");
                assert_eq!(config.database.max_connections, 10);
                assert_eq!(config.jwt.secret, "test-secret");
                assert_eq!(config.jwt.access_token_expiry_secs, 900);
                assert_eq!(config.server.port, 8080);
                assert_eq!(config.session_cache.ttl_secs, 60);
                assert_eq!(config.audit.default_query_limit, 100);
                assert_eq!(config.audit.max_query_limit, 1000);
            },
        );
    }

    #[test]
    fn test_environment_overrides() {
        temp_env::with_vars(
            [
                ("BURSAR__DATABASE__URL", Some("postgres://db/bursar")),
                ("BURSAR__JWT__SECRET", Some("s3cret")),
                ("BURSAR__SERVER__PORT", Some("9090")),
                ("BURSAR__SESSION_CACHE__TTL_SECS", Some("5")),
            ],
            || {
                let config = AppConfig::load().unwrap();
                assert_eq!(config.server.port, 9090);
                assert_eq!(config.session_cache.ttl_secs, 5);
            },
        );
    }

    #[test]
    fn test_missing_database_url_fails() {
        temp_env::with_vars(
            [
                ("BURSAR__DATABASE__URL", None::<&str>),
                ("BURSAR__JWT__SECRET", Some("s3cret")),
            ],
            || {
                assert!(AppConfig::load().is_err());
            },
        );
    }
}
