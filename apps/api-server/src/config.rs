//! API server configuration.
//!
//! Configuration is loaded from environment variables with fallback to
//! defaults. A `.env` file is applied first by `main`.
//!
//! | Variable               | Default     | Meaning                             |
//! |------------------------|-------------|-------------------------------------|
//! | `SERVER_PORT`          | 8080        | HTTP listen port                    |
//! | `SERVER_READ_TIMEOUT`  | 10s         | Deadline for reading a request body |
//! | `SERVER_WRITE_TIMEOUT` | 30s         | Deadline for the whole request      |
//! | `REVENUE_TZ`           | UTC         | IANA zone for revenue buckets       |
//! | `PRODUCTION`           | false       | JSON logs when true                 |
//! | `DB_HOST`              | localhost   |                                     |
//! | `DB_PORT`              | 5432        |                                     |
//! | `DB_USER`              | dinein      |                                     |
//! | `DB_PASS`              | (none)      |                                     |
//! | `DB_NAME`              | dinein      |                                     |
//! | `DB_SSLMODE`           | prefer      | libpq sslmode name                  |
//! | `DB_MAX_CONNECTIONS`   | 20          | Pool size                           |
//! | `DB_ACQUIRE_TIMEOUT`   | 5s          | Wait for a pooled connection        |
//!
//! Durations accept `30`, `30s` or `500ms`.

use std::env;
use std::time::Duration;

use chrono_tz::Tz;
use dinein_db::DbConfig;

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// HTTP listen port
    pub server_port: u16,

    /// Deadline for receiving the request body
    pub read_timeout: Duration,

    /// Deadline for the whole request, handler included
    pub write_timeout: Duration,

    /// Zone for revenue day/month/hour boundaries
    pub revenue_tz: Tz,

    /// JSON log output
    pub production: bool,

    /// Database connection settings
    pub db: DbConfig,
}

impl ApiConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup`, which returns a variable's
    /// value if set.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());
        let invalid = |key: &str| ConfigError::InvalidValue(key.to_string());

        let mut db = DbConfig::new(
            var("DB_HOST", "localhost"),
            var("DB_USER", "dinein"),
            var("DB_NAME", "dinein"),
        )
        .port(var("DB_PORT", "5432").parse().map_err(|_| invalid("DB_PORT"))?)
        .ssl_mode(var("DB_SSLMODE", "prefer"))
        .max_connections(
            var("DB_MAX_CONNECTIONS", "20")
                .parse()
                .map_err(|_| invalid("DB_MAX_CONNECTIONS"))?,
        )
        .acquire_timeout(
            parse_duration(&var("DB_ACQUIRE_TIMEOUT", "5s"))
                .ok_or_else(|| invalid("DB_ACQUIRE_TIMEOUT"))?,
        );
        if let Some(password) = lookup("DB_PASS") {
            db = db.password(password);
        }
        db.connect_options().map_err(|_| invalid("DB_SSLMODE"))?;

        let config = ApiConfig {
            server_port: var("SERVER_PORT", "8080")
                .parse()
                .map_err(|_| invalid("SERVER_PORT"))?,

            read_timeout: parse_duration(&var("SERVER_READ_TIMEOUT", "10s"))
                .ok_or_else(|| invalid("SERVER_READ_TIMEOUT"))?,

            write_timeout: parse_duration(&var("SERVER_WRITE_TIMEOUT", "30s"))
                .ok_or_else(|| invalid("SERVER_WRITE_TIMEOUT"))?,

            revenue_tz: var("REVENUE_TZ", "UTC")
                .trim()
                .parse()
                .map_err(|_| invalid("REVENUE_TZ"))?,

            production: parse_bool(&var("PRODUCTION", "false"))
                .ok_or_else(|| invalid("PRODUCTION"))?,

            db,
        };

        if config.read_timeout.is_zero() || config.write_timeout.is_zero() {
            return Err(ConfigError::InvalidValue("SERVER_*_TIMEOUT".to_string()));
        }

        Ok(config)
    }
}

/// Parses `30` (seconds), `30s` or `500ms`.
fn parse_duration(value: &str) -> Option<Duration> {
    let value = value.trim();
    if let Some(ms) = value.strip_suffix("ms") {
        return ms.trim().parse().ok().map(Duration::from_millis);
    }
    let secs = value.strip_suffix('s').unwrap_or(value);
    secs.trim().parse().ok().map(Duration::from_secs)
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<ApiConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ApiConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.server_port, 8080);
        assert_eq!(config.read_timeout, Duration::from_secs(10));
        assert_eq!(config.write_timeout, Duration::from_secs(30));
        assert_eq!(config.revenue_tz, Tz::UTC);
        assert!(!config.production);
        assert_eq!(config.db.port, 5432);
        assert_eq!(config.db.max_connections, 20);
        assert_eq!(config.db.password, None);
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("SERVER_PORT", "9000"),
            ("SERVER_WRITE_TIMEOUT", "1500ms"),
            ("REVENUE_TZ", "Asia/Bangkok"),
            ("PRODUCTION", "true"),
            ("DB_PASS", "secret"),
            ("DB_SSLMODE", "disable"),
        ])
        .unwrap();
        assert_eq!(config.server_port, 9000);
        assert_eq!(config.write_timeout, Duration::from_millis(1500));
        assert_eq!(config.revenue_tz, chrono_tz::Asia::Bangkok);
        assert!(config.production);
        assert_eq!(config.db.password.as_deref(), Some("secret"));
    }

    #[test]
    fn test_invalid_values() {
        let err = load(&[("REVENUE_TZ", "Mars/Olympus")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(ref v) if v == "REVENUE_TZ"));

        assert!(load(&[("SERVER_PORT", "http")]).is_err());
        assert!(load(&[("SERVER_READ_TIMEOUT", "0")]).is_err());
        assert!(load(&[("PRODUCTION", "maybe")]).is_err());
        assert!(load(&[("DB_SSLMODE", "sometimes")]).is_err());
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("30"), Some(Duration::from_secs(30)));
        assert_eq!(parse_duration("30s"), Some(Duration::from_secs(30)));
        assert_eq!(parse_duration("250ms"), Some(Duration::from_millis(250)));
        assert_eq!(parse_duration("soon"), None);
    }
}
