//! Projection database handle.

use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use thiserror::Error;
use tracing::{debug, info};

const SIDECAR_SUFFIXES: [&str; 2] = ["-wal", "-shm"];

/// Errors from opening, closing or removing the projection database.
#[derive(Debug, Error)]
pub enum DbError {
    /// The database could not be opened or created.
    #[error("failed to open projection database {path}: {source}")]
    Open {
        /// Database file path.
        path: PathBuf,
        /// Underlying driver error.
        #[source]
        source: sqlx::Error,
    },

    /// The WAL checkpoint before closing failed.
    #[error("failed to checkpoint projection database {path}: {source}")]
    Checkpoint {
        /// Database file path.
        path: PathBuf,
        /// Underlying driver error.
        #[source]
        source: sqlx::Error,
    },

    /// A database file or its parent directory could not be created or
    /// removed.
    #[error("filesystem error on {path}: {source}")]
    Io {
        /// Offending path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// An open connection pool to the projection database file.
#[derive(Debug, Clone)]
pub struct ProjectionDb {
    pool: SqlitePool,
    path: PathBuf,
}

impl ProjectionDb {
    /// Opens the database at `path`, creating the file and its parent
    /// directory if needed. The database runs in WAL mode.
    ///
    /// # Errors
    ///
    /// Returns `DbError::Io` if the parent directory cannot be created and
    /// `DbError::Open` if SQLite refuses the file.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, DbError> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| DbError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(&path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|source| DbError::Open {
                path: path.clone(),
                source,
            })?;

        debug!(path = %path.display(), "opened projection database");
        Ok(Self { pool, path })
    }

    /// Returns the connection pool.
    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Returns the database file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Checkpoints the WAL into the main file and closes every connection.
    ///
    /// # Errors
    ///
    /// Returns `DbError::Checkpoint` if the checkpoint fails. The pool is
    /// closed either way.
    pub async fn dispose(self) -> Result<(), DbError> {
        let checkpoint = sqlx::query("PRAGMA wal_checkpoint(TRUNCATE)")
            .execute(&self.pool)
            .await;
        self.pool.close().await;
        checkpoint.map_err(|source| DbError::Checkpoint {
            path: self.path.clone(),
            source,
        })?;
        debug!(path = %self.path.display(), "closed projection database");
        Ok(())
    }

    /// Deletes the database file at `path` together with its WAL and
    /// shared-memory sidecars. Files that do not exist are skipped.
    ///
    /// # Errors
    ///
    /// Returns `DbError::Io` if an existing file cannot be removed.
    pub async fn destroy(path: &Path) -> Result<(), DbError> {
        let mut targets = vec![path.to_path_buf()];
        targets.extend(SIDECAR_SUFFIXES.iter().map(|suffix| sidecar(path, suffix)));

        for target in targets {
            match tokio::fs::remove_file(&target).await {
                Ok(()) => debug!(path = %target.display(), "removed database file"),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(source) => {
                    return Err(DbError::Io {
                        path: target,
                        source,
                    });
                }
            }
        }
        info!(path = %path.display(), "destroyed projection database");
        Ok(())
    }
}

fn sidecar(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}
