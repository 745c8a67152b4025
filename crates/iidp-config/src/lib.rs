//! Process-level configuration for the IIDP server and CLI.
//!
//! Distinct from [`iidp_core::EngineConfig`]: that one holds the engine's
//! scoring/composition tunables (learning rate, quiz length, ...), unlikely
//! to change between environments. This one holds what *does* change between
//! a developer's laptop, CI, and production — connection strings, bind
//! addresses, deadlines — loaded from the environment the way the rest of
//! this stack's config layer does it.
use std::env;
use std::time::Duration;

use iidp_core::EngineConfig;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing environment variable: {0}")]
    MissingVar(String),
    #[error("invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// PostgreSQL connection URL for the profile/item/response store.
    pub database_url: String,
    /// Address the API server binds to.
    pub bind_address: String,
    /// Maximum pooled database connections.
    pub db_max_connections: u32,
    /// Wall-clock deadline for a single engine operation, overriding
    /// [`EngineConfig::operation_deadline_ms`] when set.
    pub operation_deadline: Duration,
    /// Shared key gating the admin/debug CLI commands against the running
    /// server. Empty disables those commands.
    pub admin_api_key: String,
}

impl AppConfig {
    /// Loads configuration from the environment, falling back to a `.env`
    /// file in the working directory if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let operation_deadline_ms: u64 = env_var_or("OPERATION_DEADLINE_MS", "5000")
            .parse()
            .map_err(|_| {
                ConfigError::InvalidValue(
                    "OPERATION_DEADLINE_MS".to_string(),
                    "expected an integer number of milliseconds".to_string(),
                )
            })?;
        let db_max_connections: u32 = env_var_or("DB_MAX_CONNECTIONS", "10")
            .parse()
            .map_err(|_| {
                ConfigError::InvalidValue(
                    "DB_MAX_CONNECTIONS".to_string(),
                    "expected a positive integer".to_string(),
                )
            })?;

        Ok(Self {
            database_url: env_var("DATABASE_URL")?,
            bind_address: env_var_or("BIND_ADDRESS", "0.0.0.0:8080"),
            db_max_connections,
            operation_deadline: Duration::from_millis(operation_deadline_ms),
            admin_api_key: env_var_or("ADMIN_API_KEY", ""),
        })
    }

    /// Applies this process config's overrides on top of the engine's
    /// tunable defaults.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            operation_deadline_ms: self.operation_deadline.as_millis() as u64,
            ..EngineConfig::default()
        }
    }
}

fn env_var(name: &str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::MissingVar(name.to_string()))
}

fn env_var_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_var_or_uses_default_when_unset() {
        let val = env_var_or("IIDP_CONFIG_TEST_NONEXISTENT_VAR", "fallback");
        assert_eq!(val, "fallback");
    }

    #[test]
    fn engine_config_overrides_only_the_deadline() {
        let app = AppConfig {
            database_url: "postgres://localhost/iidp".into(),
            bind_address: "0.0.0.0:8080".into(),
            db_max_connections: 10,
            operation_deadline: Duration::from_millis(9_000),
            admin_api_key: String::new(),
        };
        let engine = app.engine_config();
        assert_eq!(engine.operation_deadline_ms, 9_000);
        assert_eq!(engine.quiz_length, EngineConfig::default().quiz_length);
    }
}
