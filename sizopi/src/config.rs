//! Configuration management for the Sizopi server.
//!
//! Loads configuration from environment variables with sensible defaults.
//! Call [`dotenvy::dotenv`] first to pick up a local `.env` file.

use serde::{Deserialize, Serialize};
use sizopi_runtime::RetryPolicy;
use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while reading configuration.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// A required variable is not set
    #[error("{0} must be set")]
    Missing(&'static str),

    /// A variable is set but cannot be parsed
    #[error("invalid value {value:?} for {var}: {reason}")]
    Invalid {
        /// Variable name
        var: &'static str,
        /// Raw value
        value: String,
        /// Parser message
        reason: String,
    },
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// `PostgreSQL` configuration
    pub database: DatabaseConfig,
    /// HTTP server configuration
    pub server: ServerConfig,
    /// Booking transaction retry configuration
    pub booking: BookingConfig,
}

/// `PostgreSQL` configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection URL
    pub url: String,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Minimum number of idle connections in the pool
    pub min_connections: u32,
    /// Connection timeout in seconds
    pub connect_timeout: u64,
    /// Apply pending migrations on startup
    pub run_migrations: bool,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to bind to
    pub port: u16,
    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout: u64,
}

/// Retry settings for booking transactions that hit serialization failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingConfig {
    /// Retries after the first attempt
    pub max_retries: usize,
    /// Delay before the first retry, in milliseconds
    pub retry_initial_delay_ms: u64,
    /// Upper bound on the delay between retries, in milliseconds
    pub retry_max_delay_ms: u64,
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `DATABASE_URL` is missing or any variable
    /// cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Load configuration through `lookup`, which returns a variable's value.
    ///
    /// # Errors
    ///
    /// See [`Config::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let vars = Vars(lookup);

        Ok(Self {
            database: DatabaseConfig {
                url: vars.required("DATABASE_URL")?,
                max_connections: vars.parse_or("DATABASE_MAX_CONNECTIONS", 10)?,
                min_connections: vars.parse_or("DATABASE_MIN_CONNECTIONS", 1)?,
                connect_timeout: vars.parse_or("DATABASE_CONNECT_TIMEOUT", 30)?,
                run_migrations: vars.parse_or("DATABASE_RUN_MIGRATIONS", true)?,
            },
            server: ServerConfig {
                host: vars.get("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port: vars.parse_or("PORT", 8080)?,
                shutdown_timeout: vars.parse_or("SHUTDOWN_TIMEOUT", 30)?,
            },
            booking: BookingConfig {
                max_retries: vars.parse_or("BOOKING_MAX_RETRIES", 3)?,
                retry_initial_delay_ms: vars.parse_or("BOOKING_RETRY_INITIAL_DELAY_MS", 20)?,
                retry_max_delay_ms: vars.parse_or("BOOKING_RETRY_MAX_DELAY_MS", 500)?,
            },
        })
    }
}

impl ServerConfig {
    /// `host:port` to bind.
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// How long in-flight requests may run after a shutdown signal.
    #[must_use]
    pub const fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout)
    }
}

impl BookingConfig {
    /// Retry policy for the reservation manager.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::builder()
            .max_retries(self.max_retries)
            .initial_delay(Duration::from_millis(self.retry_initial_delay_ms))
            .max_delay(Duration::from_millis(self.retry_max_delay_ms))
            .build()
    }
}

/// Typed access to a variable lookup.
struct Vars<F>(F);

impl<F: Fn(&str) -> Option<String>> Vars<F> {
    fn get(&self, var: &str) -> Option<String> {
        (self.0)(var).filter(|value| !value.trim().is_empty())
    }

    fn required(&self, var: &'static str) -> Result<String, ConfigError> {
        self.get(var).ok_or(ConfigError::Missing(var))
    }

    fn parse_or<T>(&self, var: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: Display,
    {
        match self.get(var) {
            None => Ok(default),
            Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
                var,
                reason: e.to_string(),
                value,
            }),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Config::from_lookup(|var| vars.get(var).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("DATABASE_URL", "postgres://localhost/sizopi")]).unwrap();

        assert_eq!(config.database.url, "postgres://localhost/sizopi");
        assert_eq!(config.database.max_connections, 10);
        assert_eq!(config.database.min_connections, 1);
        assert_eq!(config.database.connect_timeout, 30);
        assert!(config.database.run_migrations);
        assert_eq!(config.server.bind_address(), "0.0.0.0:8080");
        assert_eq!(config.server.shutdown_timeout(), Duration::from_secs(30));
        assert_eq!(config.booking.max_retries, 3);
        assert_eq!(config.booking.retry_initial_delay_ms, 20);
        assert_eq!(config.booking.retry_max_delay_ms, 500);
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("DATABASE_URL", "postgres://db/sizopi"),
            ("DATABASE_RUN_MIGRATIONS", "false"),
            ("HOST", "127.0.0.1"),
            ("PORT", "9000"),
            ("BOOKING_MAX_RETRIES", "7"),
        ])
        .unwrap();

        assert!(!config.database.run_migrations);
        assert_eq!(config.server.bind_address(), "127.0.0.1:9000");
        assert_eq!(config.booking.retry_policy().max_retries, 7);
    }

    #[test]
    fn test_missing_database_url() {
        assert_eq!(load(&[]).unwrap_err(), ConfigError::Missing("DATABASE_URL"));
        assert_eq!(
            load(&[("DATABASE_URL", "  ")]).unwrap_err(),
            ConfigError::Missing("DATABASE_URL")
        );
    }

    #[test]
    fn test_unparsable_value() {
        let err = load(&[("DATABASE_URL", "postgres://db"), ("PORT", "eighty")]).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid { var: "PORT", ref value, .. } if value == "eighty"
        ));
    }
}
