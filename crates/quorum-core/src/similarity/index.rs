//! Similarity Index over an append-only [`SimilarityStore`].
//!
//! Writes go straight to the store; reads scan a snapshot and rank it with
//! the injected [`SimilarityMetric`]. The index holds no state of its own, so
//! concurrent `record` and `nearest` calls are as safe as the store is.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use quorum_state::{QuestionDigest, RecordId, SimilarityStore, StoredRecord};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::{QuorumError, QuorumResult, SkillId};
use crate::similarity::metric::SimilarityMetric;
use crate::voting::StrategyKey;

/// What was chosen for a past question.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ChosenKey {
    Skill(SkillId),
    Strategy(StrategyKey),
}

impl ChosenKey {
    /// Storage encoding: `skill:<id>` or `strategy:<key>`.
    pub fn encode(&self) -> String {
        match self {
            Self::Skill(id) => format!("skill:{id}"),
            Self::Strategy(key) => format!("strategy:{key}"),
        }
    }

    pub fn decode(raw: &str) -> Option<Self> {
        match raw.split_once(':')? {
            ("skill", id) if !id.is_empty() => Some(Self::Skill(SkillId::new(id))),
            ("strategy", key) => key.parse().ok().map(Self::Strategy),
            _ => None,
        }
    }
}

impl std::fmt::Display for ChosenKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.encode())
    }
}

/// A stored record with its chosen key decoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityRecord {
    pub record_id: RecordId,
    pub question: String,
    pub signature: QuestionDigest,
    pub chosen_key: ChosenKey,
    pub quality: f64,
    pub recorded_at: DateTime<Utc>,
}

impl TryFrom<StoredRecord> for SimilarityRecord {
    type Error = QuorumError;

    fn try_from(stored: StoredRecord) -> Result<Self, Self::Error> {
        let chosen_key = ChosenKey::decode(&stored.chosen_key).ok_or_else(|| {
            QuorumError::IndexUnavailable(format!(
                "record {} has unreadable key {:?}",
                stored.record_id, stored.chosen_key
            ))
        })?;
        Ok(Self {
            record_id: stored.record_id,
            question: stored.question,
            signature: stored.signature,
            chosen_key,
            quality: stored.quality,
            recorded_at: stored.recorded_at,
        })
    }
}

/// One result of [`SimilarityIndex::nearest`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    pub record: SimilarityRecord,
    pub distance: f64,
}

#[derive(Clone)]
pub struct SimilarityIndex {
    store: Arc<dyn SimilarityStore>,
    metric: Arc<dyn SimilarityMetric>,
}

impl SimilarityIndex {
    pub fn new(store: Arc<dyn SimilarityStore>, metric: Arc<dyn SimilarityMetric>) -> Self {
        Self { store, metric }
    }

    pub fn metric_name(&self) -> &'static str {
        self.metric.name()
    }

    /// Append one record. Quality must be finite.
    pub async fn record(
        &self,
        question: &str,
        chosen_key: &ChosenKey,
        quality: f64,
    ) -> QuorumResult<RecordId> {
        if !quality.is_finite() {
            return Err(QuorumError::InvalidRequest(format!(
                "quality label must be finite, got {quality}"
            )));
        }
        let record = StoredRecord::new(question, chosen_key.encode(), quality);
        let id = record.record_id.clone();
        self.store.append(record).await?;
        debug!(record_id = %id, chosen_key = %chosen_key, "similarity record appended");
        Ok(id)
    }

    /// The `k` records closest to `question`, nearest first.
    ///
    /// Equal distances order by recording time, then record id, so the result
    /// is a total order. Records with undecodable keys are skipped.
    pub async fn nearest(&self, question: &str, k: usize) -> QuorumResult<Vec<Neighbor>> {
        let mut neighbors: Vec<Neighbor> = self
            .store
            .scan()
            .await?
            .into_iter()
            .filter_map(|stored| match SimilarityRecord::try_from(stored) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(error = %e, "skipping similarity record");
                    None
                }
            })
            .map(|record| Neighbor {
                distance: self.metric.distance(question, &record.question),
                record,
            })
            .collect();

        neighbors.sort_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then_with(|| a.record.recorded_at.cmp(&b.record.recorded_at))
                .then_with(|| a.record.record_id.cmp(&b.record.record_id))
        });
        neighbors.truncate(k);
        Ok(neighbors)
    }

    pub async fn len(&self) -> QuorumResult<usize> {
        Ok(self.store.len().await?)
    }
}
