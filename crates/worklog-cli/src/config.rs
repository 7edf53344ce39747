//! Environment configuration.

use std::path::PathBuf;
use std::str::FromStr;

use crate::error::AppError;

/// Migrations shipped with the workspace.
const DEFAULT_MIGRATIONS_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../../migrations");

/// Log line format on stderr.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per line.
    Json,
    /// Human-readable lines.
    #[default]
    Pretty,
}

impl FromStr for LogFormat {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            other => Err(AppError::Config(format!(
                "WORKLOG_LOG_FORMAT must be 'json' or 'pretty', got '{other}'"
            ))),
        }
    }
}

/// Runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Data directory holding the event log and the projection database.
    pub home: PathBuf,
    /// Root of the namespaced migration tree.
    pub migrations_dir: PathBuf,
    /// Log line format.
    pub log_format: LogFormat,
}

impl Config {
    /// Reads configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a variable is set to an invalid value.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through `lookup`, which returns a variable's
    /// value or `None` when it is unset.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a variable is set to an invalid value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let home = match lookup("WORKLOG_HOME") {
            Some(home) if home.trim().is_empty() => {
                return Err(AppError::Config("WORKLOG_HOME must not be empty".to_owned()));
            }
            Some(home) => PathBuf::from(home),
            None => PathBuf::from(".worklog"),
        };
        let migrations_dir = lookup("WORKLOG_MIGRATIONS_DIR")
            .filter(|dir| !dir.trim().is_empty())
            .map_or_else(|| PathBuf::from(DEFAULT_MIGRATIONS_DIR), PathBuf::from);
        let log_format = lookup("WORKLOG_LOG_FORMAT")
            .map(|format| format.parse())
            .transpose()?
            .unwrap_or_default();

        Ok(Self {
            home,
            migrations_dir,
            log_format,
        })
    }

    /// Directory holding one subdirectory per event stream.
    #[must_use]
    pub fn events_dir(&self) -> PathBuf {
        self.home.join("events")
    }

    /// Path of the SQLite projection database.
    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.home.join("projections.db")
    }
}
