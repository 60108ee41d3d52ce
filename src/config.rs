use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

use crate::errors::BackendError;

/// Returns the value of the named environment variable if it exists or panics.
pub fn get_variable(name: &str) -> String {
    env::var(name).unwrap_or_else(|_| panic!("must define {} environment variable", name))
}

/// Returns the value of the named environment variable, or `default`
/// if it is unset.
pub fn get_variable_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_owned())
}

/// Parses the named environment variable, falling back to `default`
/// if it is unset. A value that is set but unparsable is an error.
pub fn parse_variable_or<T: FromStr>(name: &str, default: T) -> Result<T, BackendError> {
    match env::var(name) {
        Ok(value) => parse_setting(name, &value),
        Err(_) => Ok(default),
    }
}

fn parse_setting<T: FromStr>(name: &str, value: &str) -> Result<T, BackendError> {
    value.trim().parse().map_err(|_| invalid(name, value))
}

fn invalid(name: &str, value: impl Display) -> BackendError {
    BackendError::InvalidSetting {
        name: name.to_owned(),
        value: value.to_string(),
    }
}

/// Where to find the database and how many connections to keep.
#[derive(Clone, Debug, PartialEq)]
pub struct DatabaseSettings {
    /// Overrides the individual fields below when set.
    pub connection_string: Option<String>,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub name: String,
    pub pool_size: u32,
    pub acquire_timeout_seconds: u64,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            connection_string: None,
            host: "localhost".to_owned(),
            port: 5432,
            user: "postgres".to_owned(),
            password: String::new(),
            name: "blood_donor_connect".to_owned(),
            pool_size: 10,
            acquire_timeout_seconds: 60,
        }
    }
}

impl DatabaseSettings {
    pub fn from_env() -> Result<Self, BackendError> {
        let defaults = DatabaseSettings::default();

        let settings = DatabaseSettings {
            connection_string: env::var("BACKEND_DB_CONNECTION_STRING")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            host: get_variable_or("BACKEND_DB_HOST", &defaults.host),
            port: parse_variable_or("BACKEND_DB_PORT", defaults.port)?,
            user: get_variable_or("BACKEND_DB_USER", &defaults.user),
            password: get_variable_or("BACKEND_DB_PASSWORD", &defaults.password),
            name: get_variable_or("BACKEND_DB_NAME", &defaults.name),
            pool_size: parse_variable_or("BACKEND_DB_POOL_SIZE", defaults.pool_size)?,
            acquire_timeout_seconds: parse_variable_or(
                "BACKEND_DB_ACQUIRE_TIMEOUT_SECONDS",
                defaults.acquire_timeout_seconds,
            )?,
        };

        if settings.pool_size == 0 {
            return Err(invalid("BACKEND_DB_POOL_SIZE", settings.pool_size));
        }

        Ok(settings)
    }
}

/// Everything the server binary reads at start-up.
#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    pub port: u16,

    /// The path segment the API lives under, without slashes.
    pub api_path: String,

    /// The directory the pages are served from.
    pub frontend_dir: PathBuf,

    pub database: DatabaseSettings,
}

impl Settings {
    pub fn from_env() -> Result<Self, BackendError> {
        let api_path = get_variable_or("BACKEND_API_PATH", "api");
        check_api_path(&api_path)?;

        Ok(Settings {
            port: parse_variable_or("BACKEND_PORT", 3001)?,
            api_path,
            frontend_dir: PathBuf::from(get_variable_or("BACKEND_FRONTEND_DIR", "frontend")),
            database: DatabaseSettings::from_env()?,
        })
    }
}

/// The API path must be a single, non-empty path segment.
pub fn check_api_path(api_path: &str) -> Result<(), BackendError> {
    if api_path.is_empty() || api_path.contains('/') {
        Err(invalid("BACKEND_API_PATH", api_path))
    } else {
        Ok(())
    }
}
