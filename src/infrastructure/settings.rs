//! Environment configuration

use sqlx::sqlite::SqliteConnectOptions;
use std::env;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_DATABASE_URL: &str = "sqlite:restaurants.db";
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:3000";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Supabase,
    Sqlite,
}

impl FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "supabase" => Ok(StoreBackend::Supabase),
            "sqlite" => Ok(StoreBackend::Sqlite),
            _ => Err(ConfigError::Invalid {
                name: "RESTAURANT_STORE",
                value: s.to_owned(),
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub openai_model: String,
    pub openai_timeout: Option<Duration>,
    pub store: StoreBackend,
    pub supabase_url: String,
    pub supabase_key: String,
    pub database_url: String,
    /// Parsed `database_url`. The file is created when missing.
    pub database_options: SqliteConnectOptions,
    pub bind_address: String,
}

impl Settings {
    /// Reads settings from the process environment, honouring a `.env` file.
    pub fn from_env() -> Result<Settings, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Settings, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let store = match get("RESTAURANT_STORE") {
            Some(value) => value.parse()?,
            None => StoreBackend::Supabase,
        };

        let openai_timeout = match get("OPENAI_TIMEOUT_SECS") {
            Some(value) => Some(Duration::from_secs(value.trim().parse().map_err(|_| {
                ConfigError::Invalid {
                    name: "OPENAI_TIMEOUT_SECS",
                    value,
                }
            })?)),
            None => None,
        };

        let (supabase_url, supabase_key) = match store {
            StoreBackend::Supabase => (
                get("SUPABASE_URL").ok_or(ConfigError::Missing("SUPABASE_URL"))?,
                get("SUPABASE_ANON_KEY").ok_or(ConfigError::Missing("SUPABASE_ANON_KEY"))?,
            ),
            StoreBackend::Sqlite => (
                get("SUPABASE_URL").unwrap_or_default(),
                get("SUPABASE_ANON_KEY").unwrap_or_default(),
            ),
        };

        let database_url = get("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_owned());
        let database_options = match store {
            StoreBackend::Sqlite => database_options(&database_url)?,
            StoreBackend::Supabase => SqliteConnectOptions::new(),
        };

        Ok(Settings {
            openai_api_key: get("OPENAI_API_KEY").ok_or(ConfigError::Missing("OPENAI_API_KEY"))?,
            openai_base_url: get("OPENAI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_owned()),
            openai_model: get("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_owned()),
            openai_timeout,
            store,
            supabase_url,
            supabase_key,
            database_url,
            database_options,
            bind_address: get("BIND_ADDRESS").unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_owned()),
        })
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            openai_api_key: String::new(),
            openai_base_url: DEFAULT_OPENAI_BASE_URL.to_owned(),
            openai_model: DEFAULT_OPENAI_MODEL.to_owned(),
            openai_timeout: None,
            store: StoreBackend::Supabase,
            supabase_url: String::new(),
            supabase_key: String::new(),
            database_url: DEFAULT_DATABASE_URL.to_owned(),
            database_options: SqliteConnectOptions::new()
                .filename("restaurants.db")
                .create_if_missing(true),
            bind_address: DEFAULT_BIND_ADDRESS.to_owned(),
        }
    }
}

fn database_options(url: &str) -> Result<SqliteConnectOptions, ConfigError> {
    let invalid = || ConfigError::Invalid {
        name: "DATABASE_URL",
        value: url.to_owned(),
    };

    if !url.starts_with("sqlite:") {
        return Err(invalid());
    }
    SqliteConnectOptions::from_str(url)
        .map(|options| options.create_if_missing(true))
        .map_err(|_| invalid())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_supabase_defaults() {
        let settings = Settings::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("SUPABASE_URL", "https://x.supabase.co"),
            ("SUPABASE_ANON_KEY", "anon"),
        ]))
        .unwrap();

        assert_eq!(settings.store, StoreBackend::Supabase);
        assert_eq!(settings.openai_model, "gpt-4o-mini");
        assert_eq!(settings.openai_base_url, DEFAULT_OPENAI_BASE_URL);
        assert_eq!(settings.openai_timeout, None);
        assert_eq!(settings.bind_address, "0.0.0.0:3000");
    }

    #[test]
    fn test_missing_api_key() {
        let result = Settings::from_lookup(lookup(&[("RESTAURANT_STORE", "sqlite")]));
        assert_eq!(result.unwrap_err(), ConfigError::Missing("OPENAI_API_KEY"));
    }

    #[test]
    fn test_supabase_requires_url() {
        let result = Settings::from_lookup(lookup(&[("OPENAI_API_KEY", "sk-test")]));
        assert_eq!(result.unwrap_err(), ConfigError::Missing("SUPABASE_URL"));
    }

    #[test]
    fn test_sqlite_backend_without_supabase() {
        let settings = Settings::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("RESTAURANT_STORE", "SQLite"),
            ("DATABASE_URL", "sqlite::memory:"),
            ("OPENAI_TIMEOUT_SECS", "30"),
        ]))
        .unwrap();

        assert_eq!(settings.store, StoreBackend::Sqlite);
        assert_eq!(settings.database_url, "sqlite::memory:");
        assert_eq!(settings.openai_timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_invalid_values() {
        let result = Settings::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("RESTAURANT_STORE", "mongo"),
        ]));
        assert!(matches!(result, Err(ConfigError::Invalid { name: "RESTAURANT_STORE", .. })));

        let result = Settings::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("RESTAURANT_STORE", "sqlite"),
            ("OPENAI_TIMEOUT_SECS", "soon"),
        ]));
        assert!(matches!(result, Err(ConfigError::Invalid { name: "OPENAI_TIMEOUT_SECS", .. })));
    }

    #[test]
    fn test_invalid_database_url_is_rejected() {
        let result = Settings::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("RESTAURANT_STORE", "sqlite"),
            ("DATABASE_URL", "postgres://localhost/restaurants"),
        ]));
        assert_eq!(
            result.unwrap_err(),
            ConfigError::Invalid {
                name: "DATABASE_URL",
                value: "postgres://localhost/restaurants".to_owned(),
            }
        );

        let result = Settings::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("RESTAURANT_STORE", "sqlite"),
            ("DATABASE_URL", "sqlite:restaurants.db?mode=sideways"),
        ]));
        assert!(matches!(result, Err(ConfigError::Invalid { name: "DATABASE_URL", .. })));
    }

    #[test]
    fn test_default_database_is_created_when_missing() {
        let settings = Settings::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("RESTAURANT_STORE", "sqlite"),
        ]))
        .unwrap();

        assert_eq!(settings.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(
            settings.database_options.get_filename(),
            std::path::Path::new("restaurants.db")
        );
        assert!(format!("{:?}", settings.database_options).contains("create_if_missing: true"));
    }

    #[test]
    fn test_database_url_ignored_for_supabase() {
        let settings = Settings::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("SUPABASE_URL", "https://x.supabase.co"),
            ("SUPABASE_ANON_KEY", "anon"),
            ("DATABASE_URL", "postgres://localhost/restaurants"),
        ]))
        .unwrap();

        assert_eq!(settings.store, StoreBackend::Supabase);
    }
}
