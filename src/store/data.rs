//! JSON file store for logs and broadcast sets.
//!
//! The whole document lives in memory behind a mutex. Every mutation
//! rewrites the complete file while the lock is held, so concurrent writers
//! never interleave partial documents or lose appended entries.

use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime, Timelike};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use super::types::{BroadcastSet, ChatRef, LogEntry, LogStatus, StoreDocument};

/// Errors raised while reading or writing the data file.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to access data file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse data file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Loads a document from disk.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not a valid document.
pub fn load_document(path: impl AsRef<Path>) -> Result<StoreDocument, StoreError> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Persistent store backed by a single JSON file.
#[derive(Debug)]
pub struct DataStore {
    path: PathBuf,
    document: Mutex<StoreDocument>,
}

impl DataStore {
    /// Opens the store, falling back to an empty document when the file is
    /// missing or unreadable.
    #[must_use]
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let document = match load_document(&path) {
            Ok(doc) => doc,
            Err(e) => {
                warn!(
                    "Could not read {} ({}), starting with an empty data file",
                    path.display(),
                    e
                );
                StoreDocument::default()
            }
        };

        Self {
            path,
            document: Mutex::new(document),
        }
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends a log entry and persists it immediately.
    pub async fn add_log(
        &self,
        action: &str,
        status: LogStatus,
        message: impl Into<String>,
        user: &str,
    ) {
        let entry = LogEntry {
            time: now_micros(),
            action: action.to_owned(),
            status,
            message: message.into(),
            user: user.to_owned(),
        };
        info!("Log [{}] added: {} - {}", status, entry.action, entry.message);

        let mut doc = self.document.lock().await;
        doc.logs.push(entry);
        self.persist(&doc).await;
    }

    /// Returns every log entry, oldest first.
    pub async fn logs(&self) -> Vec<LogEntry> {
        self.document.lock().await.logs.clone()
    }

    /// Returns up to `limit` most recent entries, newest first.
    pub async fn recent_logs(&self, limit: usize) -> Vec<LogEntry> {
        let doc = self.document.lock().await;
        doc.logs.iter().rev().take(limit).cloned().collect()
    }

    pub async fn broadcast_sets(&self) -> Vec<BroadcastSet> {
        self.document.lock().await.broadcast_sets.clone()
    }

    pub async fn broadcast_set(&self, id: i64) -> Option<BroadcastSet> {
        let doc = self.document.lock().await;
        doc.broadcast_sets.iter().find(|s| s.id == id).cloned()
    }

    /// Creates a set (`id == None`) or replaces the name and channels of an
    /// existing one.
    ///
    /// Returns the id of the stored set, or `None` when `id` names a set
    /// that does not exist (nothing is written in that case).
    pub async fn save_broadcast_set(
        &self,
        name: &str,
        channels: Vec<ChatRef>,
        id: Option<i64>,
    ) -> Option<i64> {
        let mut doc = self.document.lock().await;

        let saved_id = match id {
            None => {
                let new_id = doc.next_set_id();
                doc.broadcast_sets.push(BroadcastSet {
                    id: new_id,
                    name: name.to_owned(),
                    channels,
                });
                new_id
            }
            Some(id) => {
                let Some(set) = doc.broadcast_sets.iter_mut().find(|s| s.id == id) else {
                    warn!("Broadcast set {} not found, nothing saved", id);
                    return None;
                };
                set.name = name.to_owned();
                set.channels = channels;
                id
            }
        };

        self.persist(&doc).await;
        Some(saved_id)
    }

    /// Deletes a set. Unknown ids are a no-op.
    ///
    /// Returns whether a set was removed.
    pub async fn delete_broadcast_set(&self, id: i64) -> bool {
        let mut doc = self.document.lock().await;
        let before = doc.broadcast_sets.len();
        doc.broadcast_sets.retain(|s| s.id != id);
        let removed = doc.broadcast_sets.len() != before;

        self.persist(&doc).await;
        removed
    }

    /// Rewrites the whole file. Must be called with the document lock held.
    async fn persist(&self, doc: &StoreDocument) {
        if let Err(e) = self.write_document(doc).await {
            error!("Failed to write data to {}: {}", self.path.display(), e);
        }
    }

    async fn write_document(&self, doc: &StoreDocument) -> Result<(), StoreError> {
        let content = serde_json::to_string_pretty(doc)?;
        tokio::fs::write(&self.path, content).await?;
        Ok(())
    }
}

/// Local time truncated to whole microseconds, the precision kept on disk.
fn now_micros() -> NaiveDateTime {
    let now = Local::now().naive_local();
    now.with_nanosecond(now.nanosecond() / 1000 * 1000).unwrap_or(now)
}
