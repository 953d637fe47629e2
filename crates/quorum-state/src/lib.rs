//! Quorum-State: persistence for similarity records
//!
//! The adaptive selector learns from previously seen questions. This crate
//! stores those observations as write-once (question, chosen key, quality)
//! records behind the [`SimilarityStore`] capability.
//!
//! ## Key Components
//!
//! - `SimilarityStore`: async append/scan trait
//! - `MemorySimilarityStore`: process-local append-only log
//! - `SurrealSimilarityStore`: SurrealDB table with update/delete disabled

mod error;
pub mod fakes;
pub mod migrations;
mod schema;
pub mod storage_traits;
pub mod surreal_store;

pub use error::{StateError, StorageError};
pub use fakes::{MemorySimilarityStore, UnavailableSimilarityStore};
pub use schema::SimilarityRow;
pub use storage_traits::{
    normalize_question, QuestionDigest, RecordId, SimilarityStore, StorageResult, StoredRecord,
};
pub use surreal_store::SurrealSimilarityStore;

/// Result type for quorum-state setup operations.
pub type Result<T> = std::result::Result<T, StateError>;
