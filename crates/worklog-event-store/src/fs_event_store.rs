//! Filesystem implementation of the `EventStore` trait.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, instrument};

use worklog_core::error::DomainError;
use worklog_core::event::{EventRecord, sort_by_timestamp};
use worklog_core::store::{AppendReceipt, EventStore};

use crate::layout;
use crate::stored::StoredEventRecord;

fn io_error(context: &str, path: &Path, err: &std::io::Error) -> DomainError {
    DomainError::Infrastructure(format!("{context} {}: {err}", path.display()))
}

/// Event store rooted at a directory, one subdirectory per stream.
///
/// Appends to the same stream are serialized through a per-stream async
/// mutex so that counting existing records and writing the next one happen
/// as one unit. Appends to different streams do not contend. A stream's
/// mutex is dropped when its last append finishes.
#[derive(Debug)]
pub struct FsEventStore {
    root: PathBuf,
    stream_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl FsEventStore {
    /// Creates a store rooted at `root`. The directory is created lazily on
    /// the first append.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            stream_locks: DashMap::new(),
        }
    }

    /// Returns the root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn stream_lock(&self, stream_id: &str) -> Arc<Mutex<()>> {
        self.stream_locks
            .entry(stream_id.to_owned())
            .or_default()
            .clone()
    }

    /// Drops the stream's lock once no append holds or awaits it, so the
    /// map only grows with the number of streams being written at once.
    fn release_stream_lock(&self, stream_id: &str) {
        self.stream_locks
            .remove_if(stream_id, |_, lock| Arc::strong_count(lock) == 1);
    }

    /// Lists the event files of one stream directory ordered by `seq`.
    async fn event_files(dir: &Path) -> Result<Vec<(u64, PathBuf)>, DomainError> {
        let mut entries = match fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_error("failed to list stream", dir, &e)),
        };

        let mut files = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| io_error("failed to list stream", dir, &e))?
        {
            let name = entry.file_name();
            if let Some(seq) = name.to_str().and_then(layout::parse_seq) {
                files.push((seq, entry.path()));
            }
        }
        files.sort_by_key(|(seq, _)| *seq);
        Ok(files)
    }

    async fn read_stored(path: &Path) -> Result<StoredEventRecord, DomainError> {
        let bytes = fs::read(path)
            .await
            .map_err(|e| io_error("failed to read event", path, &e))?;
        serde_json::from_slice(&bytes).map_err(|e| {
            DomainError::Infrastructure(format!("corrupt event file {}: {e}", path.display()))
        })
    }

    async fn write_durably(
        dir: &Path,
        tmp_name: &str,
        final_path: &Path,
        bytes: &[u8],
    ) -> Result<(), DomainError> {
        let tmp_path = dir.join(tmp_name);
        let mut file = fs::File::create(&tmp_path)
            .await
            .map_err(|e| io_error("failed to create", &tmp_path, &e))?;
        file.write_all(bytes)
            .await
            .map_err(|e| io_error("failed to write", &tmp_path, &e))?;
        file.sync_all()
            .await
            .map_err(|e| io_error("failed to sync", &tmp_path, &e))?;
        drop(file);
        fs::rename(&tmp_path, final_path)
            .await
            .map_err(|e| io_error("failed to commit", final_path, &e))
    }

    /// Counts, checks and writes one record. The caller holds the stream lock.
    async fn append_locked(&self, record: &EventRecord) -> Result<AppendReceipt, DomainError> {
        let dir = self.root.join(&record.stream_id);
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| io_error("failed to create stream", &dir, &e))?;

        let existing = Self::event_files(&dir).await?;
        let stored_version = match existing.last() {
            Some((_, path)) => Self::read_stored(path).await?.version,
            None => 0,
        };
        if record.version != stored_version + 1 {
            return Err(DomainError::ConcurrencyConflict {
                stream_id: record.stream_id.clone(),
                expected: record.version - 1,
                actual: stored_version,
            });
        }

        let seq = existing.len() as u64 + 1;
        let final_path = dir.join(layout::event_file_name(seq, &record.event_type));
        if fs::try_exists(&final_path)
            .await
            .map_err(|e| io_error("failed to inspect", &final_path, &e))?
        {
            return Err(DomainError::Infrastructure(format!(
                "event file {} already exists; stream directory was modified externally",
                final_path.display()
            )));
        }

        let stored = StoredEventRecord::new(record.clone(), seq);
        let bytes = serde_json::to_vec_pretty(&stored).map_err(|e| {
            DomainError::Infrastructure(format!("event serialization failed: {e}"))
        })?;
        Self::write_durably(&dir, &layout::temp_file_name(seq), &final_path, &bytes).await?;

        debug!(seq, event_type = %record.event_type, "appended event");
        Ok(AppendReceipt { next_seq: seq })
    }

    async fn load_stream(&self, stream_id: &str) -> Result<Vec<EventRecord>, DomainError> {
        let dir = self.root.join(stream_id);
        let mut records = Vec::new();
        for (_, path) in Self::event_files(&dir).await? {
            records.push(Self::read_stored(&path).await?.into_record());
        }
        Ok(records)
    }
}

#[async_trait]
impl EventStore for FsEventStore {
    #[instrument(skip(self, record), fields(stream_id = %record.stream_id, version = record.version))]
    async fn append(&self, record: &EventRecord) -> Result<AppendReceipt, DomainError> {
        layout::validate_segment("stream id", &record.stream_id)?;
        layout::validate_segment("event type", &record.event_type)?;
        layout::validate_version(record.version)?;

        let lock = self.stream_lock(&record.stream_id);
        let result = {
            let _guard = lock.lock().await;
            self.append_locked(record).await
        };
        drop(lock);
        self.release_stream_lock(&record.stream_id);
        result
    }

    async fn read_stream(&self, stream_id: &str) -> Result<Vec<EventRecord>, DomainError> {
        layout::validate_segment("stream id", stream_id)?;
        let records = self.load_stream(stream_id).await?;
        debug!(stream_id, count = records.len(), "read stream");
        Ok(records)
    }

    async fn get_all_events(&self) -> Result<Vec<EventRecord>, DomainError> {
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_error("failed to list store", &self.root, &e)),
        };

        let mut stream_ids = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| io_error("failed to list store", &self.root, &e))?
        {
            let is_dir = entry
                .file_type()
                .await
                .map_err(|e| io_error("failed to inspect", &entry.path(), &e))?
                .is_dir();
            let name = entry.file_name();
            match name.to_str() {
                Some(name) if is_dir && !name.starts_with('.') => stream_ids.push(name.to_owned()),
                _ => {}
            }
        }
        // Fixed visiting order keeps repeated scans identical.
        stream_ids.sort();

        let mut all = Vec::new();
        for stream_id in &stream_ids {
            all.extend(self.load_stream(stream_id).await?);
        }
        sort_by_timestamp(&mut all);

        debug!(streams = stream_ids.len(), count = all.len(), "scanned all streams");
        Ok(all)
    }
}
