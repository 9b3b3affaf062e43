//! Error types for the scouting statistics tool.
//!
//! Each concern gets its own enum so callers can tell a failed read apart
//! from bad data or an empty table.

use std::path::PathBuf;

use thiserror::Error;

use crate::models::Metric;

/// A stored submission lacks a value the aggregation needs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("submission for team {team_number} is missing {field}")]
pub struct MalformedRecordError {
    pub team_number: String,
    pub field: Metric,
}

impl MalformedRecordError {
    #[must_use]
    pub fn new(team_number: impl Into<String>, field: Metric) -> Self {
        Self {
            team_number: team_number.into(),
            field,
        }
    }
}

/// Reading the submissions table failed.
#[derive(Error, Debug)]
#[error("failed to retrieve submissions: {0}")]
pub struct RetrievalError(#[from] pub sqlx::Error);

/// Writing to or preparing the submissions table failed.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("failed to store submission: {0}")]
    Write(#[source] sqlx::Error),

    #[error("database migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Loading team statistics failed.
#[derive(Error, Debug)]
pub enum StatsError {
    #[error(transparent)]
    Retrieval(#[from] RetrievalError),

    #[error(transparent)]
    Malformed(#[from] MalformedRecordError),
}

impl StatsError {
    /// True when the store could not be read, as opposed to bad data in it.
    #[must_use]
    pub fn is_retrieval(&self) -> bool {
        matches!(self, Self::Retrieval(_))
    }
}

/// A form submission failed its presence checks.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} is required")]
    MissingField(&'static str),
}

/// The local recent-submission cache could not be read or written.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("failed to access cache at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cache at {path} is not valid JSON: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("DATABASE_URL must be set to a Postgres instance")]
    MissingDatabaseUrl,

    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}
