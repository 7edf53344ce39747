//! Namespaced, checksum-verified schema migrations.
//!
//! Migrations live under one root directory. Every directory that holds
//! `.sql` files is a namespace named by its path relative to the root
//! (`work/goals`, `core/activity`), and each namespace is an independent
//! version sequence. Files are named `NNN-description.sql`.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{debug, info, warn};

use worklog_core::clock::Clock;

const TRACKING_TABLE_DDL: &str = "CREATE TABLE IF NOT EXISTS schema_migrations (
    namespace  TEXT    NOT NULL,
    version    INTEGER NOT NULL,
    name       TEXT    NOT NULL,
    applied_at TEXT    NOT NULL,
    checksum   TEXT    NOT NULL,
    PRIMARY KEY (namespace, version)
)";

/// An applied migration whose source text no longer matches its recorded
/// checksum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecksumDrift {
    /// Migration namespace.
    pub namespace: String,
    /// Migration version.
    pub version: i64,
    /// Checksum stored when the migration was applied.
    pub recorded: String,
    /// Checksum of the file currently on disk.
    pub actual: String,
}

impl fmt::Display for ChecksumDrift {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{:03}", self.namespace, self.version)
    }
}

fn join_drift(drift: &[ChecksumDrift]) -> String {
    drift
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Errors raised while discovering, verifying or applying migrations.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// The migrations directory could not be read.
    #[error("failed to read migrations at {path}: {source}")]
    Io {
        /// Offending path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A `.sql` file does not follow the `NNN-description.sql` convention.
    #[error("migration file {path} does not match NNN-description.sql")]
    InvalidFileName {
        /// Offending file.
        path: PathBuf,
    },

    /// Two files in one namespace carry the same version number.
    #[error("namespace {namespace} has more than one migration numbered {version:03}")]
    DuplicateVersion {
        /// Namespace containing the duplicates.
        namespace: String,
        /// The repeated version.
        version: i64,
    },

    /// Applied migrations were edited after they ran.
    #[error("applied migrations changed on disk: {}", join_drift(.0))]
    ChecksumMismatch(Vec<ChecksumDrift>),

    /// A migration's SQL or its tracking row failed; the transaction was
    /// rolled back.
    #[error("migration {namespace}/{version:03} failed: {source}")]
    Apply {
        /// Namespace of the failing migration.
        namespace: String,
        /// Version of the failing migration.
        version: i64,
        /// Underlying driver error.
        #[source]
        source: sqlx::Error,
    },

    /// The tracking table could not be created or read.
    #[error("schema tracking query failed: {0}")]
    Database(#[from] sqlx::Error),
}

/// One migration file found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationFile {
    /// Namespace, `/`-separated path relative to the migrations root.
    pub namespace: String,
    /// Version parsed from the file name prefix.
    pub version: i64,
    /// Description parsed from the file name.
    pub name: String,
    /// Location on disk.
    pub path: PathBuf,
    /// SQL source text.
    pub sql: String,
    /// Lowercase hex SHA-256 of `sql`.
    pub checksum: String,
}

/// One row of the `schema_migrations` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedMigration {
    /// Migration namespace.
    pub namespace: String,
    /// Migration version.
    pub version: i64,
    /// Migration description.
    pub name: String,
    /// RFC 3339 time the migration was applied.
    pub applied_at: String,
    /// Checksum of the source text that was applied.
    pub checksum: String,
}

/// Result of a successful verification pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifyReport {
    /// Applied migrations whose file matches the recorded checksum.
    pub verified: usize,
    /// Applied migrations whose file is no longer on disk.
    pub missing: Vec<(String, i64)>,
}

/// Lowercase hex SHA-256 of migration source text.
#[must_use]
pub fn checksum(sql: &str) -> String {
    format!("{:x}", Sha256::digest(sql.as_bytes()))
}

/// Parses `NNN-description.sql` into `(version, description)`.
///
/// The prefix must be at least three ASCII digits; the description must be
/// non-empty and contain only ASCII letters, digits, `_` and `-`.
#[must_use]
pub fn parse_file_name(file_name: &str) -> Option<(i64, String)> {
    let stem = file_name.strip_suffix(".sql")?;
    let (digits, description) = stem.split_once('-')?;
    if digits.len() < 3 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if description.is_empty()
        || !description
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return None;
    }
    let version = digits.parse().ok()?;
    Some((version, description.to_owned()))
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> MigrationError + '_ {
    move |source| MigrationError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Discovers, verifies and applies migrations against a projection database.
#[derive(Clone)]
pub struct Migrator {
    root: PathBuf,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for Migrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Migrator").field("root", &self.root).finish_non_exhaustive()
    }
}

impl Migrator {
    /// Creates a migrator reading from `root`. `clock` stamps `applied_at`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Self {
        Self {
            root: root.into(),
            clock,
        }
    }

    /// Returns the migrations root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Walks the migrations root and returns every migration, ordered by
    /// namespace then version. A missing root yields no migrations.
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::InvalidFileName` for a badly named `.sql`
    /// file, `MigrationError::DuplicateVersion` for a repeated version, and
    /// `MigrationError::Io` if a directory or file cannot be read.
    pub async fn discover(&self) -> Result<Vec<MigrationFile>, MigrationError> {
        match tokio::fs::metadata(&self.root).await {
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!(root = %self.root.display(), "migrations directory does not exist");
                return Ok(Vec::new());
            }
            Err(e) => return Err(io_error(&self.root)(e)),
        }

        let mut by_namespace: BTreeMap<String, BTreeMap<i64, MigrationFile>> = BTreeMap::new();
        let mut pending_dirs = vec![(self.root.clone(), Vec::<String>::new())];

        while let Some((dir, segments)) = pending_dirs.pop() {
            let mut entries = tokio::fs::read_dir(&dir).await.map_err(io_error(&dir))?;
            while let Some(entry) = entries.next_entry().await.map_err(io_error(&dir))? {
                let path = entry.path();
                let file_type = entry.file_type().await.map_err(io_error(&path))?;
                let Some(file_name) = entry.file_name().to_str().map(str::to_owned) else {
                    continue;
                };
                if file_name.starts_with('.') {
                    continue;
                }

                if file_type.is_dir() {
                    let mut child = segments.clone();
                    child.push(file_name);
                    pending_dirs.push((path, child));
                    continue;
                }
                if !file_type.is_file()
                    || Path::new(&file_name)
                        .extension()
                        .is_none_or(|ext| !ext.eq_ignore_ascii_case("sql"))
                {
                    continue;
                }

                if segments.is_empty() {
                    warn!(path = %path.display(), "ignoring migration outside a namespace directory");
                    continue;
                }
                let Some((version, name)) = parse_file_name(&file_name) else {
                    return Err(MigrationError::InvalidFileName { path });
                };
                let namespace = segments.join("/");
                let sql = tokio::fs::read_to_string(&path)
                    .await
                    .map_err(io_error(&path))?;
                let migration = MigrationFile {
                    namespace: namespace.clone(),
                    version,
                    name,
                    checksum: checksum(&sql),
                    path,
                    sql,
                };
                let versions = by_namespace.entry(namespace.clone()).or_default();
                if versions.insert(version, migration).is_some() {
                    return Err(MigrationError::DuplicateVersion { namespace, version });
                }
            }
        }

        let migrations: Vec<MigrationFile> = by_namespace
            .into_values()
            .flat_map(BTreeMap::into_values)
            .collect();
        debug!(count = migrations.len(), "discovered migrations");
        Ok(migrations)
    }

    /// Returns the tracking rows, ordered by namespace then version.
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::Database` if the tracking table cannot be
    /// created or queried.
    pub async fn applied(&self, pool: &SqlitePool) -> Result<Vec<AppliedMigration>, MigrationError> {
        sqlx::raw_sql(TRACKING_TABLE_DDL).execute(pool).await?;
        let rows: Vec<(String, i64, String, String, String)> = sqlx::query_as(
            "SELECT namespace, version, name, applied_at, checksum
             FROM schema_migrations
             ORDER BY namespace, version",
        )
        .fetch_all(pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(
                |(namespace, version, name, applied_at, checksum)| AppliedMigration {
                    namespace,
                    version,
                    name,
                    applied_at,
                    checksum,
                },
            )
            .collect())
    }

    /// Returns discovered migrations with no tracking row, ordered by
    /// namespace then version.
    ///
    /// # Errors
    ///
    /// Returns any discovery or tracking-table error.
    pub async fn pending(&self, pool: &SqlitePool) -> Result<Vec<MigrationFile>, MigrationError> {
        let applied = self.applied(pool).await?;
        let discovered = self.discover().await?;
        Ok(Self::subtract(discovered, &applied))
    }

    fn subtract(discovered: Vec<MigrationFile>, applied: &[AppliedMigration]) -> Vec<MigrationFile> {
        discovered
            .into_iter()
            .filter(|m| {
                !applied
                    .iter()
                    .any(|a| a.namespace == m.namespace && a.version == m.version)
            })
            .collect()
    }

    /// Recomputes the checksum of every applied migration still on disk.
    ///
    /// An applied migration whose file is gone is logged and listed in the
    /// report; it is not an error.
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::ChecksumMismatch` listing every drifted
    /// migration, or any discovery or tracking-table error.
    pub async fn verify(&self, pool: &SqlitePool) -> Result<VerifyReport, MigrationError> {
        let applied = self.applied(pool).await?;
        let discovered = self.discover().await?;
        Self::compare(&discovered, &applied)
    }

    fn compare(
        discovered: &[MigrationFile],
        applied: &[AppliedMigration],
    ) -> Result<VerifyReport, MigrationError> {
        let on_disk: HashMap<(&str, i64), &MigrationFile> = discovered
            .iter()
            .map(|m| ((m.namespace.as_str(), m.version), m))
            .collect();

        let mut report = VerifyReport::default();
        let mut drift = Vec::new();
        for row in applied {
            match on_disk.get(&(row.namespace.as_str(), row.version)) {
                Some(file) if file.checksum == row.checksum => report.verified += 1,
                Some(file) => drift.push(ChecksumDrift {
                    namespace: row.namespace.clone(),
                    version: row.version,
                    recorded: row.checksum.clone(),
                    actual: file.checksum.clone(),
                }),
                None => {
                    warn!(
                        namespace = %row.namespace,
                        version = row.version,
                        name = %row.name,
                        "applied migration is missing from disk"
                    );
                    report.missing.push((row.namespace.clone(), row.version));
                }
            }
        }

        if drift.is_empty() {
            Ok(report)
        } else {
            Err(MigrationError::ChecksumMismatch(drift))
        }
    }

    /// Verifies applied migrations, then applies every pending migration,
    /// namespace by namespace in lexical order, each in its own transaction
    /// together with its tracking row. Returns the migrations applied.
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::ChecksumMismatch` before applying anything
    /// if verification fails, `MigrationError::Apply` for the first
    /// migration that fails, or any discovery or tracking-table error.
    pub async fn run(&self, pool: &SqlitePool) -> Result<Vec<MigrationFile>, MigrationError> {
        let applied = self.applied(pool).await?;
        let discovered = self.discover().await?;
        Self::compare(&discovered, &applied)?;

        let mut highest: HashMap<String, i64> = HashMap::new();
        for row in &applied {
            let entry = highest.entry(row.namespace.clone()).or_insert(row.version);
            *entry = (*entry).max(row.version);
        }

        let pending = Self::subtract(discovered, &applied);
        for migration in &pending {
            if let Some(max) = highest
                .get(&migration.namespace)
                .copied()
                .filter(|&max| migration.version < max)
            {
                warn!(
                    namespace = %migration.namespace,
                    version = migration.version,
                    highest_applied = max,
                    "applying migration older than the newest applied one"
                );
            }
            self.apply(pool, migration).await?;
        }

        if !pending.is_empty() {
            info!(count = pending.len(), "applied migrations");
        }
        Ok(pending)
    }

    async fn apply(&self, pool: &SqlitePool, migration: &MigrationFile) -> Result<(), MigrationError> {
        let failed = |source| MigrationError::Apply {
            namespace: migration.namespace.clone(),
            version: migration.version,
            source,
        };

        let mut tx = pool.begin().await.map_err(failed)?;
        sqlx::raw_sql(&migration.sql)
            .execute(&mut *tx)
            .await
            .map_err(failed)?;
        sqlx::query(
            "INSERT INTO schema_migrations (namespace, version, name, applied_at, checksum)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&migration.namespace)
        .bind(migration.version)
        .bind(&migration.name)
        .bind(self.clock.now().to_rfc3339())
        .bind(&migration.checksum)
        .execute(&mut *tx)
        .await
        .map_err(failed)?;
        tx.commit().await.map_err(failed)?;

        info!(
            namespace = %migration.namespace,
            version = migration.version,
            name = %migration.name,
            "applied migration"
        );
        Ok(())
    }
}
