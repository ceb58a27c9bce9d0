//! Configuration module
//!
//! Loads configuration from environment variables.

use std::env;
use std::time::Duration;

use crate::domain::DEFAULT_ROOM_CAPACITY;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Database connection URL
    pub database_url: String,

    /// Maximum database connections in pool
    pub database_max_connections: u32,

    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Environment (development, production)
    pub environment: String,

    /// Capacity given to rooms created by seed data
    pub default_room_capacity: u32,

    /// How often the capacity ledger is checked against stored rows
    pub ledger_reconcile_interval: Duration,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url =
            lookup("DATABASE_URL").ok_or(ConfigError::MissingEnv("DATABASE_URL"))?;

        let database_max_connections = parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 10)?;

        let host = lookup("HOST").unwrap_or_else(|| "127.0.0.1".to_string());

        let port = parse_or(&lookup, "PORT", 4000)?;

        let environment = lookup("ENVIRONMENT").unwrap_or_else(|| "development".to_string());

        let default_room_capacity =
            parse_or(&lookup, "DEFAULT_ROOM_CAPACITY", DEFAULT_ROOM_CAPACITY)?;

        let reconcile_secs: u64 = parse_or(&lookup, "LEDGER_RECONCILE_INTERVAL_SECS", 300)?;
        if reconcile_secs == 0 {
            return Err(ConfigError::InvalidValue("LEDGER_RECONCILE_INTERVAL_SECS"));
        }

        Ok(Self {
            database_url,
            database_max_connections,
            host,
            port,
            environment,
            default_room_capacity,
            ledger_reconcile_interval: Duration::from_secs(reconcile_secs),
        })
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue(key)),
        None => Ok(default),
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnv(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config =
            Config::from_lookup(lookup_from(&[("DATABASE_URL", "postgres://localhost/events")]))
                .unwrap();

        assert_eq!(config.database_max_connections, 10);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 4000);
        assert_eq!(config.default_room_capacity, 3);
        assert_eq!(config.ledger_reconcile_interval, Duration::from_secs(300));
        assert!(!config.is_production());
    }

    #[test]
    fn test_missing_database_url() {
        let result = Config::from_lookup(lookup_from(&[]));
        assert!(matches!(result, Err(ConfigError::MissingEnv("DATABASE_URL"))));
    }

    #[test]
    fn test_invalid_port() {
        let result = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/events"),
            ("PORT", "not-a-port"),
        ]));
        assert!(matches!(result, Err(ConfigError::InvalidValue("PORT"))));
    }

    #[test]
    fn test_zero_reconcile_interval_rejected() {
        let result = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/events"),
            ("LEDGER_RECONCILE_INTERVAL_SECS", "0"),
        ]));
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue("LEDGER_RECONCILE_INTERVAL_SECS"))
        ));
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://db/events"),
            ("PORT", "8080"),
            ("ENVIRONMENT", "production"),
            ("DEFAULT_ROOM_CAPACITY", "2"),
        ]))
        .unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.default_room_capacity, 2);
        assert!(config.is_production());
    }
}
