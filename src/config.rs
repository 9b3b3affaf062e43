//! Runtime configuration read from the environment.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 10;
const DEFAULT_CACHE_PATH: &str = "scouting-submissions.json";
const DEFAULT_CACHE_CAPACITY: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    database_url: Option<String>,
    /// Pool size for the submissions store.
    pub max_connections: u32,
    /// How long a store call waits for a connection before failing.
    pub acquire_timeout: Duration,
    pub cache_path: PathBuf,
    pub cache_capacity: usize,
}

impl Config {
    /// Reads `DATABASE_URL` and the `SCOUTING_*` variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());

        let max_connections: u32 = parse_var(
            &lookup,
            "SCOUTING_MAX_CONNECTIONS",
            DEFAULT_MAX_CONNECTIONS,
        )?;
        let acquire_timeout_secs: u64 = parse_var(
            &lookup,
            "SCOUTING_ACQUIRE_TIMEOUT_SECS",
            DEFAULT_ACQUIRE_TIMEOUT_SECS,
        )?;
        let cache_capacity: usize =
            parse_var(&lookup, "SCOUTING_CACHE_CAPACITY", DEFAULT_CACHE_CAPACITY)?;

        let cache_path = lookup("SCOUTING_CACHE_PATH")
            .filter(|path| !path.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_PATH));

        Ok(Self {
            database_url,
            max_connections,
            acquire_timeout: Duration::from_secs(acquire_timeout_secs),
            cache_path,
            cache_capacity,
        })
    }

    pub fn database_url(&self) -> Result<&str, ConfigError> {
        self.database_url
            .as_deref()
            .ok_or(ConfigError::MissingDatabaseUrl)
    }
}

fn parse_var<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr + PartialOrd + Default,
{
    let Some(raw) = lookup(key) else {
        return Ok(default);
    };

    let invalid = |reason: &str| ConfigError::Invalid {
        key,
        value: raw.clone(),
        reason: reason.to_string(),
    };

    let value: T = raw
        .trim()
        .parse()
        .map_err(|_| invalid("expected a positive integer"))?;
    if value <= T::default() {
        return Err(invalid("must be greater than zero"));
    }
    Ok(value)
}
