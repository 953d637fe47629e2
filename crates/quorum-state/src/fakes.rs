//! In-memory implementations of [`SimilarityStore`]
//!
//! `MemorySimilarityStore` is a process-local append-only log, usable both in
//! tests and as the default backing for a single-process engine.
//! `UnavailableSimilarityStore` fails every call, which is how callers exercise
//! their degraded paths.

use std::collections::HashSet;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::StorageError;
use crate::storage_traits::*;

// ---------------------------------------------------------------------------
// MemorySimilarityStore
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct Log {
    records: Vec<StoredRecord>,
    ids: HashSet<RecordId>,
}

/// Append-only log backed by a `Vec<StoredRecord>` behind an `RwLock`.
///
/// A record is pushed under the write lock in one step, so readers see either
/// the whole record or nothing.
#[derive(Debug, Default)]
pub struct MemorySimilarityStore {
    log: RwLock<Log>,
}

impl MemorySimilarityStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: T) -> StorageError {
    StorageError::Backend("memory log lock poisoned".to_string())
}

#[async_trait]
impl SimilarityStore for MemorySimilarityStore {
    async fn append(&self, record: StoredRecord) -> StorageResult<()> {
        let mut log = self.log.write().map_err(poisoned)?;
        if !log.ids.insert(record.record_id.clone()) {
            return Err(StorageError::DuplicateRecord {
                record_id: record.record_id.0,
            });
        }
        log.records.push(record);
        Ok(())
    }

    async fn scan(&self) -> StorageResult<Vec<StoredRecord>> {
        let log = self.log.read().map_err(poisoned)?;
        Ok(log.records.clone())
    }

    async fn len(&self) -> StorageResult<usize> {
        let log = self.log.read().map_err(poisoned)?;
        Ok(log.records.len())
    }
}

// ---------------------------------------------------------------------------
// UnavailableSimilarityStore
// ---------------------------------------------------------------------------

/// A store whose backend is always down.
#[derive(Debug, Clone)]
pub struct UnavailableSimilarityStore {
    reason: String,
}

impl UnavailableSimilarityStore {
    pub fn new(reason: &str) -> Self {
        Self {
            reason: reason.to_string(),
        }
    }
}

impl Default for UnavailableSimilarityStore {
    fn default() -> Self {
        Self::new("connection refused")
    }
}

#[async_trait]
impl SimilarityStore for UnavailableSimilarityStore {
    async fn append(&self, _record: StoredRecord) -> StorageResult<()> {
        Err(StorageError::Unavailable(self.reason.clone()))
    }

    async fn scan(&self) -> StorageResult<Vec<StoredRecord>> {
        Err(StorageError::Unavailable(self.reason.clone()))
    }

    async fn len(&self) -> StorageResult<usize> {
        Err(StorageError::Unavailable(self.reason.clone()))
    }
}
