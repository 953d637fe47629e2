//! Adaptive Selector: predict skills and strategy from similar past questions.
//!
//! A prediction looks up the `k` nearest records, keeps those within
//! `max_distance`, and tallies their chosen keys. Skill keys vote for the
//! skill subset, strategy keys for the voting strategy. Tallies tie-break by
//! key ascending, mirroring Max-Confidence.
//!
//! Too few neighbours, an empty index or an unreachable store all fall back
//! to "every available skill, Max-Confidence". Prediction never fails.
//!
//! Feedback is appended on a spawned task; failures are logged and counted,
//! never returned to the caller.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::Instrument;

use crate::domain::{QuorumError, QuorumResult, Question, SkillId};
use crate::metrics::METRICS;
use crate::obs;
use crate::similarity::{ChosenKey, Neighbor, SimilarityIndex};
use crate::voting::StrategyKey;

/// How neighbour votes are weighed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    /// One vote per neighbour.
    #[default]
    Majority,
    /// `quality * (1 - distance)` per neighbour.
    ScoreWeighted,
}

/// What the selector predicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMode {
    #[default]
    Strategy,
    Skills,
    Both,
}

impl SelectionMode {
    pub fn predicts_skills(self) -> bool {
        matches!(self, Self::Skills | Self::Both)
    }

    pub fn predicts_strategy(self) -> bool {
        matches!(self, Self::Strategy | Self::Both)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    /// Neighbours consulted per prediction.
    pub k: usize,
    /// Neighbours within `max_distance` required before trusting the index.
    pub min_samples: usize,
    pub max_distance: f64,
    pub aggregation: Aggregation,
    pub mode: SelectionMode,
    /// Size of the predicted skill subset when skills are predicted.
    pub skill_subset_size: usize,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            k: 10,
            min_samples: 3,
            max_distance: 0.8,
            aggregation: Aggregation::Majority,
            mode: SelectionMode::Strategy,
            skill_subset_size: 1,
        }
    }
}

/// Why the default was used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum FallbackReason {
    EmptyIndex,
    BelowThreshold { found: usize, required: usize },
    IndexUnavailable { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PredictionSource {
    Neighbors { count: usize },
    Fallback(FallbackReason),
}

impl PredictionSource {
    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback(_))
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Neighbors { .. } => "neighbors",
            Self::Fallback(FallbackReason::EmptyIndex) => "fallback:empty_index",
            Self::Fallback(FallbackReason::BelowThreshold { .. }) => "fallback:below_threshold",
            Self::Fallback(FallbackReason::IndexUnavailable { .. }) => {
                "fallback:index_unavailable"
            }
        }
    }
}

/// Predicted skill subset and base strategy for one question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub skill_ids: Vec<SkillId>,
    /// Never `Learned`.
    pub strategy: StrategyKey,
    pub source: PredictionSource,
}

impl Prediction {
    /// All of `available`, Max-Confidence.
    pub fn fallback(available: &[SkillId], reason: FallbackReason) -> Self {
        Self {
            skill_ids: available.to_vec(),
            strategy: StrategyKey::MaxConfidence,
            source: PredictionSource::Fallback(reason),
        }
    }
}

#[derive(Clone)]
pub struct AdaptiveSelector {
    index: SimilarityIndex,
    config: SelectorConfig,
}

impl AdaptiveSelector {
    pub fn new(index: SimilarityIndex, config: SelectorConfig) -> Self {
        Self { index, config }
    }

    pub fn config(&self) -> &SelectorConfig {
        &self.config
    }

    pub fn index(&self) -> &SimilarityIndex {
        &self.index
    }

    /// Start the per-query state machine for `question`.
    pub fn session(&self, question: &Question) -> SelectorSession<'_> {
        SelectorSession {
            selector: self,
            question: question.clone(),
            phase: SelectorPhase::Idle,
            prediction: None,
        }
    }

    /// Predict skills and strategy for `question` among `available` skills.
    pub async fn predict(&self, question: &Question, available: &[SkillId]) -> Prediction {
        self.predict_within(question, available, None).await
    }

    /// Like [`predict`](Self::predict), but a lookup still running at
    /// `lookup_deadline` is abandoned and counts as an unavailable index.
    pub async fn predict_before(
        &self,
        question: &Question,
        available: &[SkillId],
        lookup_deadline: Instant,
    ) -> Prediction {
        self.predict_within(question, available, Some(lookup_deadline))
            .await
    }

    async fn predict_within(
        &self,
        question: &Question,
        available: &[SkillId],
        lookup_deadline: Option<Instant>,
    ) -> Prediction {
        let lookup = self.index.nearest(question.text(), self.config.k);
        let found = match lookup_deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, lookup)
                .await
                .unwrap_or_else(|_| {
                    Err(QuorumError::IndexUnavailable(
                        "similarity lookup exceeded its time budget".into(),
                    ))
                }),
            None => lookup.await,
        };

        let prediction = match found {
            Err(e) => Prediction::fallback(
                available,
                FallbackReason::IndexUnavailable {
                    error: e.to_string(),
                },
            ),
            Ok(neighbors) if neighbors.is_empty() => {
                Prediction::fallback(available, FallbackReason::EmptyIndex)
            }
            Ok(neighbors) => {
                let close: Vec<Neighbor> = neighbors
                    .into_iter()
                    .filter(|n| n.distance <= self.config.max_distance)
                    .collect();
                if close.len() < self.config.min_samples.max(1) {
                    Prediction::fallback(
                        available,
                        FallbackReason::BelowThreshold {
                            found: close.len(),
                            required: self.config.min_samples.max(1),
                        },
                    )
                } else {
                    self.tally_neighbors(&close, available)
                }
            }
        };

        if prediction.source.is_fallback() {
            METRICS.inc_fallback_predictions();
        }
        obs::emit_prediction(
            question.digest().short(),
            prediction.strategy.as_str(),
            prediction.skill_ids.len(),
            prediction.source.label(),
        );
        prediction
    }

    fn tally_neighbors(&self, neighbors: &[Neighbor], available: &[SkillId]) -> Prediction {
        let mut skills: BTreeMap<SkillId, f64> = BTreeMap::new();
        let mut strategies: BTreeMap<StrategyKey, f64> = BTreeMap::new();

        for n in neighbors {
            let weight = match self.config.aggregation {
                Aggregation::Majority => 1.0,
                Aggregation::ScoreWeighted => n.record.quality * (1.0 - n.distance),
            };
            match &n.record.chosen_key {
                ChosenKey::Skill(id) if available.contains(id) => {
                    *skills.entry(id.clone()).or_default() += weight;
                }
                ChosenKey::Strategy(key) if *key != StrategyKey::Learned => {
                    *strategies.entry(*key).or_default() += weight;
                }
                _ => {}
            }
        }

        let skill_ids = if self.config.mode.predicts_skills() && !skills.is_empty() {
            ranked_keys(skills)
                .into_iter()
                .take(self.config.skill_subset_size.max(1))
                .collect()
        } else {
            available.to_vec()
        };

        let strategy = if self.config.mode.predicts_strategy() {
            ranked_keys(strategies)
                .into_iter()
                .next()
                .unwrap_or(StrategyKey::MaxConfidence)
        } else {
            StrategyKey::MaxConfidence
        };

        Prediction {
            skill_ids,
            strategy,
            source: PredictionSource::Neighbors {
                count: neighbors.len(),
            },
        }
    }

    /// Append a feedback record without waiting for it.
    ///
    /// The handle resolves once the append has succeeded or been dropped.
    pub fn record(&self, question: &str, chosen_key: ChosenKey, quality: f64) -> JoinHandle<()> {
        let index = self.index.clone();
        let question = question.to_string();
        tokio::spawn(
            async move {
                let key = chosen_key.encode();
                match index.record(&question, &chosen_key, quality).await {
                    Ok(_) => {
                        METRICS.inc_feedback_recorded();
                        obs::emit_feedback_recorded(&key, quality);
                    }
                    Err(e) => {
                        METRICS.inc_feedback_dropped();
                        obs::emit_feedback_dropped(&key, &e);
                    }
                }
            }
            .in_current_span(),
        )
    }
}

/// Keys by descending tally, ties by key ascending.
fn ranked_keys<K: Ord>(tally: BTreeMap<K, f64>) -> Vec<K> {
    let mut entries: Vec<(K, f64)> = tally.into_iter().collect();
    // BTreeMap order is ascending and the sort is stable.
    entries.sort_by(|a, b| b.1.total_cmp(&a.1));
    entries.into_iter().map(|(k, _)| k).collect()
}

/// Phase of one query's pass through the selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectorPhase {
    Idle,
    Predicting,
    /// Prediction made; dispatch happens outside the selector.
    Dispatching,
    Recording,
}

/// `Idle -> Predicting -> Dispatching -> Recording -> Idle` for one question.
pub struct SelectorSession<'a> {
    selector: &'a AdaptiveSelector,
    question: Question,
    phase: SelectorPhase,
    prediction: Option<Prediction>,
}

impl SelectorSession<'_> {
    pub fn phase(&self) -> SelectorPhase {
        self.phase
    }

    pub fn prediction(&self) -> Option<&Prediction> {
        self.prediction.as_ref()
    }

    pub async fn predict(&mut self, available: &[SkillId]) -> QuorumResult<Prediction> {
        self.predict_inner(available, None).await
    }

    /// Predict with the similarity lookup bounded by `lookup_deadline`.
    pub async fn predict_before(
        &mut self,
        available: &[SkillId],
        lookup_deadline: Instant,
    ) -> QuorumResult<Prediction> {
        self.predict_inner(available, Some(lookup_deadline)).await
    }

    async fn predict_inner(
        &mut self,
        available: &[SkillId],
        lookup_deadline: Option<Instant>,
    ) -> QuorumResult<Prediction> {
        if self.phase != SelectorPhase::Idle {
            return Err(self.out_of_order("predict"));
        }
        self.phase = SelectorPhase::Predicting;
        let prediction = self
            .selector
            .predict_within(&self.question, available, lookup_deadline)
            .await;
        self.prediction = Some(prediction.clone());
        self.phase = SelectorPhase::Dispatching;
        Ok(prediction)
    }

    /// Record the outcome of the dispatched round and return to `Idle`.
    pub fn record(&mut self, chosen_key: ChosenKey, quality: f64) -> QuorumResult<JoinHandle<()>> {
        if self.phase != SelectorPhase::Dispatching {
            return Err(self.out_of_order("record"));
        }
        self.phase = SelectorPhase::Recording;
        let handle = self
            .selector
            .record(self.question.text(), chosen_key, quality);
        self.phase = SelectorPhase::Idle;
        self.prediction = None;
        Ok(handle)
    }

    fn out_of_order(&self, op: &str) -> QuorumError {
        QuorumError::InvalidRequest(format!("selector {op} called in phase {:?}", self.phase))
    }
}
