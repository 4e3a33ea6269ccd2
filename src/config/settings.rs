//! Process settings from the environment (a `.env` file is honoured).

use crate::config::is_identifier;
use crate::error::ConfigError;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

pub const DATABASE_URL: &str = "HUNTREASURE_DATABASE_URL";
pub const DATABASE_URL_FALLBACK: &str = "DATABASE_URL";
pub const BIND: &str = "HUNTREASURE_BIND";
pub const MAX_CONNECTIONS: &str = "HUNTREASURE_MAX_CONNECTIONS";
pub const ACQUIRE_TIMEOUT_SECS: &str = "HUNTREASURE_ACQUIRE_TIMEOUT_SECS";
pub const SCHEMA: &str = "HUNTREASURE_SCHEMA";
pub const BODY_LIMIT: &str = "HUNTREASURE_BODY_LIMIT";

/// Default `RUST_LOG` directives when the variable is unset.
pub const DEFAULT_LOG_FILTER: &str = "huntreasure=info,tower_http=info";

#[derive(Clone, Debug)]
pub struct Settings {
    pub database_url: String,
    pub bind: SocketAddr,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
    /// Schema holding the entity tables.
    pub schema: String,
    /// Request body limit in bytes.
    pub body_limit: usize,
}

impl Settings {
    /// Load `.env` if present, then read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                tracing::warn!(error = %e, "ignoring unreadable .env file");
            }
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from any key lookup; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let database_url = get(DATABASE_URL)
            .or_else(|| get(DATABASE_URL_FALLBACK))
            .ok_or(ConfigError::Missing(DATABASE_URL))?;
        let schema = get(SCHEMA).unwrap_or_else(|| "public".into());
        if !is_identifier(&schema) {
            return Err(ConfigError::Invalid {
                key: SCHEMA,
                value: schema,
                reason: "not a valid identifier".into(),
            });
        }
        let max_connections: u32 = parse_or(get(MAX_CONNECTIONS), MAX_CONNECTIONS, 5)?;
        if max_connections == 0 {
            return Err(ConfigError::Invalid {
                key: MAX_CONNECTIONS,
                value: "0".into(),
                reason: "must be positive".into(),
            });
        }
        Ok(Settings {
            database_url,
            bind: parse_or(get(BIND), BIND, SocketAddr::from(([0, 0, 0, 0], 8000)))?,
            max_connections,
            acquire_timeout: Duration::from_secs(parse_or(get(ACQUIRE_TIMEOUT_SECS), ACQUIRE_TIMEOUT_SECS, 10)?),
            schema,
            body_limit: parse_or(get(BODY_LIMIT), BODY_LIMIT, 64 * 1024)?,
        })
    }
}

fn parse_or<T>(raw: Option<String>, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(v) => v.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            value: v.clone(),
            reason: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(pairs: &[(&str, &str)]) -> Result<Settings, ConfigError> {
        let env: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Settings::from_lookup(|k| env.get(k).cloned())
    }

    #[test]
    fn defaults_apply_when_only_url_is_set() {
        let s = settings(&[(DATABASE_URL, "postgres://localhost/hunt")]).unwrap();
        assert_eq!(s.database_url, "postgres://localhost/hunt");
        assert_eq!(s.bind, "0.0.0.0:8000".parse().unwrap());
        assert_eq!(s.max_connections, 5);
        assert_eq!(s.acquire_timeout, Duration::from_secs(10));
        assert_eq!(s.schema, "public");
        assert_eq!(s.body_limit, 65536);
    }

    #[test]
    fn falls_back_to_generic_database_url() {
        let s = settings(&[(DATABASE_URL_FALLBACK, "postgres://db/other"), (DATABASE_URL, "  ")]).unwrap();
        assert_eq!(s.database_url, "postgres://db/other");
    }

    #[test]
    fn missing_url_is_an_error() {
        assert!(matches!(settings(&[]), Err(ConfigError::Missing(DATABASE_URL))));
    }

    #[test]
    fn overrides_are_parsed() {
        let s = settings(&[
            (DATABASE_URL, "postgres://x/y"),
            (BIND, "127.0.0.1:9000"),
            (MAX_CONNECTIONS, "12"),
            (ACQUIRE_TIMEOUT_SECS, "3"),
            (SCHEMA, "hunt"),
            (BODY_LIMIT, "1024"),
        ])
        .unwrap();
        assert_eq!(s.bind.port(), 9000);
        assert_eq!(s.max_connections, 12);
        assert_eq!(s.acquire_timeout, Duration::from_secs(3));
        assert_eq!(s.schema, "hunt");
        assert_eq!(s.body_limit, 1024);
    }

    #[test]
    fn rejects_unparseable_values() {
        let err = settings(&[(DATABASE_URL, "postgres://x/y"), (MAX_CONNECTIONS, "many")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: MAX_CONNECTIONS, .. }));
        let err = settings(&[(DATABASE_URL, "postgres://x/y"), (MAX_CONNECTIONS, "0")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: MAX_CONNECTIONS, .. }));
    }

    #[test]
    fn rejects_schema_that_is_not_an_identifier() {
        let err = settings(&[(DATABASE_URL, "postgres://x/y"), (SCHEMA, "a;drop")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: SCHEMA, .. }));
    }
}
