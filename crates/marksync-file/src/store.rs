//! Filesystem storage for bookmark records.

use std::fs::{self, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use marksync_core::error::{Error, StoreReadError, StoreWriteError};
use marksync_core::{
    BookmarkDraft, BookmarkRecord, BoxedChangeFeed, OwnerId, RecordId, RecordStore, Result,
};

use crate::changes::FileChanges;

fn read_io(err: std::io::Error) -> Error {
    Error::StoreRead(StoreReadError::Unavailable {
        message: format!("IO error: {}", err),
    })
}

fn write_io(err: std::io::Error) -> Error {
    Error::StoreWrite(StoreWriteError::Unavailable {
        message: format!("IO error: {}", err),
    })
}

/// An entry in the change log.
///
/// The log records that the collection changed and when, nothing more;
/// feed consumers get a payload-free notice either way.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ChangeLogEvent {
    /// ISO 8601 timestamp.
    pub time: String,
    /// The operation type.
    pub op: ChangeLogOp,
}

/// The type of change-log operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum ChangeLogOp {
    Create,
    Delete,
}

/// Filesystem-backed record store.
///
/// Layout under the root:
/// - `store/records/<id>.json` - one file per record
/// - `store/state/next-id` - decimal id allocator, fs2-locked
/// - `store/changes.jsonl` - append-only change log
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Create a new file store rooted at the given directory.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Get the root directory path.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub(crate) fn store_dir(&self) -> PathBuf {
        self.root.join("store")
    }

    fn records_dir(&self) -> PathBuf {
        self.store_dir().join("records")
    }

    fn record_path(&self, id: &RecordId) -> PathBuf {
        self.records_dir().join(format!("{}.json", id.as_str()))
    }

    fn next_id_path(&self) -> PathBuf {
        self.store_dir().join("state").join("next-id")
    }

    pub(crate) fn change_log_path(&self) -> PathBuf {
        self.store_dir().join("changes.jsonl")
    }

    fn change_lock_path(&self) -> PathBuf {
        self.store_dir().join("changes.lock")
    }

    /// Allocate the next record id.
    ///
    /// The allocator file is locked exclusively so concurrent creators
    /// (other processes included) never share an id. Ids ascend, which
    /// is what makes descending id order newest-first.
    fn allocate_id(&self) -> Result<RecordId> {
        let path = self.next_id_path();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(write_io)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .map_err(write_io)?;

        file.lock_exclusive().map_err(write_io)?;

        let mut contents = String::new();
        file.read_to_string(&mut contents).map_err(write_io)?;
        let next: u64 = contents.trim().parse().unwrap_or(1);

        file.set_len(0).map_err(write_io)?;
        file.seek(SeekFrom::Start(0)).map_err(write_io)?;
        write!(file, "{}", next + 1).map_err(write_io)?;
        file.sync_data().map_err(write_io)?;

        file.unlock().map_err(write_io)?;

        RecordId::new(next.to_string())
    }

    /// Append an event to the change log.
    fn append_change(&self, op: ChangeLogOp) -> Result<()> {
        let log_path = self.change_log_path();
        let lock_path = self.change_lock_path();

        if let Some(parent) = log_path.parent() {
            fs::create_dir_all(parent).map_err(write_io)?;
        }

        let lock_file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(write_io)?;

        lock_file.lock_exclusive().map_err(write_io)?;

        let event = ChangeLogEvent {
            time: Utc::now().to_rfc3339(),
            op,
        };

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .map_err(write_io)?;

        let line = serde_json::to_string(&event).map_err(|e| {
            Error::StoreWrite(StoreWriteError::Unavailable {
                message: e.to_string(),
            })
        })?;

        writeln!(file, "{}", line).map_err(write_io)?;
        file.sync_data().map_err(write_io)?;

        lock_file.unlock().map_err(write_io)?;

        Ok(())
    }

    fn read_record(&self, path: &Path) -> Result<BookmarkRecord> {
        let content = fs::read_to_string(path).map_err(read_io)?;
        serde_json::from_str(&content).map_err(|e| {
            Error::StoreRead(StoreReadError::Corrupt {
                message: format!("{}: {}", path.display(), e),
            })
        })
    }
}

#[async_trait]
impl RecordStore for FileStore {
    #[instrument(skip(self), fields(%owner))]
    async fn list_records(&self, owner: &OwnerId) -> Result<Vec<BookmarkRecord>> {
        let dir = self.records_dir();

        let mut records = Vec::new();

        if dir.exists() {
            for entry in fs::read_dir(&dir).map_err(read_io)? {
                let entry = entry.map_err(read_io)?;
                let path = entry.path();
                if !path.extension().is_some_and(|ext| ext == "json") {
                    continue;
                }

                match self.read_record(&path) {
                    Ok(record) => {
                        if &record.owner == owner {
                            records.push(record);
                        }
                    }
                    Err(err) => {
                        // A single bad file must not take the listing down.
                        warn!(path = %path.display(), error = %err, "skipping unreadable record");
                    }
                }
            }
        }

        records.sort_by(|a, b| b.id.cmp(&a.id));

        debug!(count = records.len(), "listed records");
        Ok(records)
    }

    #[instrument(skip(self, draft), fields(%owner))]
    async fn create_record(
        &self,
        owner: &OwnerId,
        draft: &BookmarkDraft,
    ) -> Result<BookmarkRecord> {
        let id = self.allocate_id()?;

        let record = BookmarkRecord {
            id: id.clone(),
            title: draft.title().to_string(),
            target: draft.target().clone(),
            owner: owner.clone(),
            created_at: Utc::now(),
        };

        let path = self.record_path(&id);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(write_io)?;
        }

        let content = serde_json::to_string_pretty(&record).map_err(|e| {
            Error::StoreWrite(StoreWriteError::Unavailable {
                message: e.to_string(),
            })
        })?;

        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, &content).map_err(write_io)?;
        fs::rename(&temp_path, &path).map_err(write_io)?;

        self.append_change(ChangeLogOp::Create)?;

        debug!(id = %record.id, "created record");

        Ok(record)
    }

    #[instrument(skip(self))]
    async fn delete_record(&self, id: &RecordId) -> Result<()> {
        let path = self.record_path(id);

        if path.exists() {
            fs::remove_file(&path).map_err(write_io)?;

            self.append_change(ChangeLogOp::Delete)?;

            debug!(%id, "deleted record");
        }

        Ok(())
    }

    fn changes(&self) -> Result<BoxedChangeFeed> {
        Ok(Box::pin(FileChanges::from_store(self.clone())?))
    }
}
