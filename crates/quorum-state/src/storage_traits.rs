//! Storage trait definitions for similarity records
//!
//! A similarity record ties a previously seen question to the key (skill id or
//! voting strategy) that was chosen for it and the quality observed. Records
//! are write-once: stores append and scan, they never update or delete.
//!
//! All traits are async and backend-agnostic. In-memory fakes are provided
//! via the `fakes` module.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::error::StorageError;

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

// ---------------------------------------------------------------------------
// QuestionDigest — content identity of a question
// ---------------------------------------------------------------------------

/// SHA-256 digest (hex) of a normalized question text.
///
/// Questions are identified by content: text is lower-cased and runs of
/// whitespace collapse to a single space before hashing, so trivially
/// reformatted questions share a digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QuestionDigest(String);

impl QuestionDigest {
    /// Digest of the normalized form of `text`.
    pub fn of_text(text: &str) -> Self {
        use sha2::Digest;
        let normalized = normalize_question(text);
        let mut hasher = Sha256::new();
        hasher.update(normalized.as_bytes());
        QuestionDigest(hex::encode(hasher.finalize()))
    }

    /// Return the full hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short form (first 12 hex chars).
    pub fn short(&self) -> &str {
        &self.0[..12.min(self.0.len())]
    }
}

impl TryFrom<String> for QuestionDigest {
    type Error = StorageError;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        if s.len() != 64 || !s.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(StorageError::InvalidDigest { digest: s });
        }
        Ok(QuestionDigest(s.to_ascii_lowercase()))
    }
}

impl std::fmt::Display for QuestionDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lower-case and collapse whitespace.
pub fn normalize_question(text: &str) -> String {
    text.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

// ---------------------------------------------------------------------------
// StoredRecord
// ---------------------------------------------------------------------------

/// Opaque identifier of a stored record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordId(pub String);

impl RecordId {
    /// Generate a new random RecordId
    pub fn new() -> Self {
        RecordId(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A (question, chosen key, quality) tuple as persisted.
///
/// `chosen_key` is opaque to this crate; the engine encodes skill ids and
/// strategy keys into it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub record_id: RecordId,
    pub question: String,
    pub signature: QuestionDigest,
    pub chosen_key: String,
    pub quality: f64,
    pub recorded_at: DateTime<Utc>,
}

impl StoredRecord {
    /// Build a fresh record stamped with a new id and the current time.
    pub fn new(question: &str, chosen_key: impl Into<String>, quality: f64) -> Self {
        Self {
            record_id: RecordId::new(),
            question: question.to_string(),
            signature: QuestionDigest::of_text(question),
            chosen_key: chosen_key.into(),
            quality,
            recorded_at: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// SimilarityStore
// ---------------------------------------------------------------------------

/// Append-only store of similarity records.
///
/// Guarantees:
/// - `append` is atomic: a record is either fully visible to `scan` or not at all.
/// - Records are never mutated or removed through this trait.
/// - `scan` returns records in append order (oldest first).
/// - Concurrent `append` and `scan` calls are safe.
#[async_trait]
pub trait SimilarityStore: Send + Sync {
    /// Append a record. Returns `StorageError::DuplicateRecord` if the id exists.
    async fn append(&self, record: StoredRecord) -> StorageResult<()>;

    /// Snapshot of every record, oldest first.
    async fn scan(&self) -> StorageResult<Vec<StoredRecord>>;

    /// Number of records currently visible.
    async fn len(&self) -> StorageResult<usize>;
}
