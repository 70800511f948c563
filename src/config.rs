use dotenvy::dotenv;
use std::env;
use thiserror::Error;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_TOKEN_TTL_HOURS: i64 = 24;
/// Five years
pub const MAX_TOKEN_TTL_HOURS: i64 = 5 * 365 * 24;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} missing, it is required")]
    Missing(&'static str),

    #[error("{name} must be {expected}, got `{value}`")]
    Invalid {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    /// In-process key-value store, nothing survives a restart
    Local,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub store: StoreBackend,
    pub database_url: Option<String>,
    pub log_format: LogFormat,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenv().is_ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |name: &'static str| lookup(name).ok_or(ConfigError::Missing(name));

        let port = required("PORT")?;
        let port = port.parse().map_err(|_| ConfigError::Invalid {
            name: "PORT",
            expected: "a valid u16 number",
            value: port.clone(),
        })?;

        let jwt_secret = required("JWT_SECRET")?;

        let token_ttl_hours = match lookup("TOKEN_TTL_HOURS") {
            Some(raw) => match raw.parse::<i64>() {
                Ok(hours) if (1..=MAX_TOKEN_TTL_HOURS).contains(&hours) => hours,
                _ => {
                    return Err(ConfigError::Invalid {
                        name: "TOKEN_TTL_HOURS",
                        expected: "a number of hours between 1 and 43800",
                        value: raw,
                    })
                }
            },
            None => DEFAULT_TOKEN_TTL_HOURS,
        };

        let store = match lookup("STORE").as_deref() {
            None | Some("postgres") => StoreBackend::Postgres,
            Some("local") => StoreBackend::Local,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: "STORE",
                    expected: "`postgres` or `local`",
                    value: other.to_string(),
                })
            }
        };

        let database_url = lookup("DATABASE_URL");
        if store == StoreBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        let log_format = match lookup("LOG_FORMAT").as_deref() {
            None | Some("pretty") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: "LOG_FORMAT",
                    expected: "`pretty` or `json`",
                    value: other.to_string(),
                })
            }
        };

        Ok(Self {
            host: lookup("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            jwt_secret,
            token_ttl_hours,
            store,
            database_url,
            log_format,
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults_with_local_store() {
        let config = Config::from_lookup(lookup(&[
            ("PORT", "8080"),
            ("JWT_SECRET", "s3cret"),
            ("STORE", "local"),
        ]))
        .unwrap();

        assert_eq!(config.addr(), "127.0.0.1:8080");
        assert_eq!(config.store, StoreBackend::Local);
        assert_eq!(config.token_ttl_hours, DEFAULT_TOKEN_TTL_HOURS);
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    #[test]
    fn test_postgres_requires_database_url() {
        let err = Config::from_lookup(lookup(&[("PORT", "8080"), ("JWT_SECRET", "s")])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("DATABASE_URL")));
    }

    #[test]
    fn test_invalid_values() {
        let err = Config::from_lookup(lookup(&[("PORT", "eighty"), ("JWT_SECRET", "s")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "PORT", .. }));

        let err = Config::from_lookup(lookup(&[
            ("PORT", "80"),
            ("JWT_SECRET", "s"),
            ("STORE", "redis"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "STORE", .. }));

        for ttl in ["0", "-3", "43801", "9223372036854775807"] {
            let err = Config::from_lookup(lookup(&[
                ("PORT", "80"),
                ("JWT_SECRET", "s"),
                ("STORE", "local"),
                ("TOKEN_TTL_HOURS", ttl),
            ]))
            .unwrap_err();
            assert!(matches!(err, ConfigError::Invalid { name: "TOKEN_TTL_HOURS", .. }));
        }

        let config = Config::from_lookup(lookup(&[
            ("PORT", "80"),
            ("JWT_SECRET", "s"),
            ("STORE", "local"),
            ("TOKEN_TTL_HOURS", "43800"),
        ]))
        .unwrap();
        assert_eq!(config.token_ttl_hours, MAX_TOKEN_TTL_HOURS);

        let err = Config::from_lookup(lookup(&[("PORT", "80")])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("JWT_SECRET")));
    }
}
