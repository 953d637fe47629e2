//! Schema definitions for the SurrealDB similarity table
//!
//! Tables:
//! - similarity_records: write-once (question, chosen key, quality) rows

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StorageError;
use crate::storage_traits::{QuestionDigest, RecordId, StoredRecord};

/// Module for serializing chrono DateTime to SurrealDB datetime format
mod surreal_datetime {
    use chrono::{DateTime, Utc};
    use serde::{self, Deserialize, Deserializer, Serializer};
    use surrealdb::sql::Datetime as SurrealDatetime;

    pub fn serialize<S>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let sd = SurrealDatetime::from(*date);
        serde::Serialize::serialize(&sd, serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let sd = SurrealDatetime::deserialize(deserializer)?;
        Ok(DateTime::from(sd))
    }
}

/// Similarity row as stored in SurrealDB
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarityRow {
    /// SurrealDB record ID
    pub id: Option<surrealdb::sql::Thing>,
    /// Opaque record id (UUID string)
    pub record_id: String,
    /// Raw question text
    pub question: String,
    /// Question digest (SHA256 of normalized text)
    pub signature: String,
    /// Encoded chosen key, e.g. `skill:qa-bert` or `strategy:weighted_vote`
    pub chosen_key: String,
    /// Observed quality label
    pub quality: f64,
    #[serde(with = "surreal_datetime")]
    pub recorded_at: DateTime<Utc>,
}

impl From<StoredRecord> for SimilarityRow {
    fn from(record: StoredRecord) -> Self {
        SimilarityRow {
            id: None,
            record_id: record.record_id.0,
            question: record.question,
            signature: record.signature.as_str().to_string(),
            chosen_key: record.chosen_key,
            quality: record.quality,
            recorded_at: record.recorded_at,
        }
    }
}

impl TryFrom<SimilarityRow> for StoredRecord {
    type Error = StorageError;

    fn try_from(row: SimilarityRow) -> Result<Self, Self::Error> {
        if !row.quality.is_finite() {
            return Err(StorageError::InvalidRecord(format!(
                "record {} has non-finite quality",
                row.record_id
            )));
        }
        Ok(StoredRecord {
            record_id: RecordId(row.record_id),
            question: row.question,
            signature: QuestionDigest::try_from(row.signature)?,
            chosen_key: row.chosen_key,
            quality: row.quality,
            recorded_at: row.recorded_at,
        })
    }
}
