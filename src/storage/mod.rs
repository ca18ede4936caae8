use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::debug;

use crate::models::TranscriptionRecord;

/// Persistence collaborator for normalized results.
///
/// `put` has overwrite semantics: writing the same location twice leaves
/// exactly the last record, which is what makes duplicate callback delivery
/// safe. The location is already resolved from the batch context, so one
/// `(batch_id, batch_index)` pair always maps to one key.
#[async_trait]
pub trait ResultStore: Send + Sync {
    async fn put(&self, location: &str, record: &TranscriptionRecord) -> Result<(), StorageError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("failed to serialize record for {location}: {source}")]
    Serialize {
        location: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write {location}: {source}")]
    Write {
        location: String,
        #[source]
        source: std::io::Error,
    },
}

/// Filesystem-backed store: one JSON file per result under a root directory
pub struct LocalDirStore {
    root: PathBuf,
}

impl LocalDirStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, location: &str) -> PathBuf {
        self.root.join(location)
    }
}

#[async_trait]
impl ResultStore for LocalDirStore {
    async fn put(&self, location: &str, record: &TranscriptionRecord) -> Result<(), StorageError> {
        let json =
            serde_json::to_vec_pretty(record).map_err(|source| StorageError::Serialize {
                location: location.to_string(),
                source,
            })?;

        let path = self.path_for(location);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| StorageError::Write {
                    location: location.to_string(),
                    source,
                })?;
        }
        tokio::fs::write(&path, json)
            .await
            .map_err(|source| StorageError::Write {
                location: location.to_string(),
                source,
            })?;

        debug!("Wrote transcription record to {:?}", path);
        Ok(())
    }
}

/// In-memory store for tests and dry runs
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<String, TranscriptionRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, location: &str) -> Option<TranscriptionRecord> {
        self.records.lock().unwrap().get(location).cloned()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ResultStore for MemoryStore {
    async fn put(&self, location: &str, record: &TranscriptionRecord) -> Result<(), StorageError> {
        self.records
            .lock()
            .unwrap()
            .insert(location.to_string(), record.clone());
        Ok(())
    }
}
