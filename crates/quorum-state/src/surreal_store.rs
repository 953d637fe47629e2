//! SurrealDB-backed SimilarityStore implementation
//!
//! Uses `schema::SimilarityRow` for persistence, converting to/from
//! `storage_traits::StoredRecord` at the boundary.

use async_trait::async_trait;
use surrealdb::engine::any::Any;
use surrealdb::Surreal;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::{StateError, StorageError};
use crate::migrations::{self, SIMILARITY_TABLE};
use crate::schema::SimilarityRow;
use crate::storage_traits::{SimilarityStore, StorageResult, StoredRecord};

const NAMESPACE: &str = "quorum";
const DATABASE: &str = "main";

/// SurrealDB-backed implementation of [`SimilarityStore`].
pub struct SurrealSimilarityStore {
    db: Surreal<Any>,
}

impl SurrealSimilarityStore {
    /// Create an in-memory instance.
    ///
    /// Connects to `mem://`, selects `quorum/main`, and runs `init_schema`.
    pub async fn in_memory() -> crate::Result<Self> {
        Self::connect("mem://").await
    }

    /// Connect to any SurrealDB endpoint (`mem://`, `surrealkv://path`, `ws://host:port`).
    pub async fn connect(url: &str) -> crate::Result<Self> {
        let db = surrealdb::engine::any::connect(url)
            .await
            .map_err(|e| StateError::Connection(format!("Failed to connect to {}: {}", url, e)))?;

        db.use_ns(NAMESPACE)
            .use_db(DATABASE)
            .await
            .map_err(|e| StateError::Connection(e.to_string()))?;

        migrations::init_schema(&db).await?;
        info!("SurrealSimilarityStore connected ({})", url);
        Ok(Self { db })
    }

    /// Connect using `QUORUM_SURREALDB_URL`, falling back to local persistence
    /// under `.quorum/db`.
    pub async fn from_env() -> crate::Result<Self> {
        if let Ok(url) = std::env::var("QUORUM_SURREALDB_URL") {
            return Self::connect(&url).await;
        }

        let path = ".quorum/db";
        std::fs::create_dir_all(path).map_err(|e| {
            StateError::Connection(format!(
                "Failed to create database directory {}: {}",
                path, e
            ))
        })?;
        let url = format!("surrealkv://{}", path);
        info!("No QUORUM_SURREALDB_URL found, using local persistence: {}", url);
        Self::connect(&url).await
    }

    async fn contains(&self, record_id: &str) -> StorageResult<bool> {
        let rid_owned = record_id.to_string();
        let mut res = self
            .db
            .query("SELECT * FROM similarity_records WHERE record_id = $rid")
            .bind(("rid", rid_owned))
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        let rows: Vec<SimilarityRow> = res
            .take(0)
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(!rows.is_empty())
    }
}

#[async_trait]
impl SimilarityStore for SurrealSimilarityStore {
    async fn append(&self, record: StoredRecord) -> StorageResult<()> {
        if self.contains(&record.record_id.0).await? {
            return Err(StorageError::DuplicateRecord {
                record_id: record.record_id.0,
            });
        }

        debug!(record_id = %record.record_id, chosen_key = %record.chosen_key, "appending similarity record");

        let row = SimilarityRow::from(record);
        let _created: Option<SimilarityRow> = self
            .db
            .create(SIMILARITY_TABLE)
            .content(row)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        Ok(())
    }

    async fn scan(&self) -> StorageResult<Vec<StoredRecord>> {
        let mut res = self
            .db
            .query("SELECT * FROM similarity_records ORDER BY recorded_at ASC, record_id ASC")
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        let rows: Vec<SimilarityRow> = res
            .take(0)
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        // One unreadable row must not hide the rest of the log.
        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let record_id = row.record_id.clone();
                match StoredRecord::try_from(row) {
                    Ok(record) => Some(record),
                    Err(e) => {
                        warn!(record_id = %record_id, error = %e, "skipping unreadable similarity row");
                        None
                    }
                }
            })
            .collect())
    }

    async fn len(&self) -> StorageResult<usize> {
        let mut res = self
            .db
            .query("SELECT count() AS count FROM similarity_records GROUP ALL")
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        let row: Option<CountRow> = res
            .take(0)
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(row.map(|r| r.count).unwrap_or(0))
    }
}

#[derive(Debug, Deserialize)]
struct CountRow {
    count: usize,
}
