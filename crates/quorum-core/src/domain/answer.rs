//! Candidate answers and the per-round answer set.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::error::{QuorumError, QuorumResult};
use crate::domain::skill::SkillId;

/// Outcome of one skill call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerStatus {
    Ok,
    Timeout,
    Error,
}

impl std::fmt::Display for AnswerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ok => write!(f, "ok"),
            Self::Timeout => write!(f, "timeout"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// One answer text with its normalized confidence in [0,1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredAnswer {
    pub text: String,
    pub confidence: f64,
}

impl ScoredAnswer {
    pub fn new(text: &str, confidence: f64) -> Self {
        Self {
            text: text.to_string(),
            confidence,
        }
    }
}

/// A single skill's response to a single question. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateAnswer {
    skill_id: SkillId,
    /// Sorted by confidence, highest first. Empty unless `status == Ok`.
    answers: Vec<ScoredAnswer>,
    latency_ms: u64,
    status: AnswerStatus,
    failure: Option<QuorumError>,
}

impl CandidateAnswer {
    /// A successful response. Answers are ordered by confidence (stable).
    pub fn ok(skill_id: SkillId, mut answers: Vec<ScoredAnswer>, latency: Duration) -> Self {
        answers.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        Self {
            skill_id,
            answers,
            latency_ms: latency.as_millis() as u64,
            status: AnswerStatus::Ok,
            failure: None,
        }
    }

    /// A call that did not finish before its deadline.
    pub fn timeout(skill_id: SkillId, latency: Duration) -> Self {
        let elapsed_ms = latency.as_millis() as u64;
        Self {
            failure: Some(QuorumError::SkillTimeout {
                skill_id: skill_id.clone(),
                elapsed_ms,
            }),
            skill_id,
            answers: Vec::new(),
            latency_ms: elapsed_ms,
            status: AnswerStatus::Timeout,
        }
    }

    /// A failed call. `SkillTimeout` errors produce a `Timeout` status.
    pub fn failed(skill_id: SkillId, error: QuorumError, latency: Duration) -> Self {
        let status = match error {
            QuorumError::SkillTimeout { .. } => AnswerStatus::Timeout,
            _ => AnswerStatus::Error,
        };
        Self {
            skill_id,
            answers: Vec::new(),
            latency_ms: latency.as_millis() as u64,
            status,
            failure: Some(error),
        }
    }

    pub fn skill_id(&self) -> &SkillId {
        &self.skill_id
    }

    pub fn answers(&self) -> &[ScoredAnswer] {
        &self.answers
    }

    /// The first `n` answers by confidence.
    pub fn top(&self, n: usize) -> &[ScoredAnswer] {
        &self.answers[..n.min(self.answers.len())]
    }

    pub fn status(&self) -> AnswerStatus {
        self.status
    }

    pub fn is_ok(&self) -> bool {
        self.status == AnswerStatus::Ok
    }

    pub fn latency(&self) -> Duration {
        Duration::from_millis(self.latency_ms)
    }

    pub fn failure(&self) -> Option<&QuorumError> {
        self.failure.as_ref()
    }
}

/// Candidate answers of one dispatch round, in request order.
///
/// Holds at most one entry per skill id; entries are never replaced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnswerSet {
    entries: Vec<CandidateAnswer>,
}

impl AnswerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry. Fails with `DuplicateAnswer` if the skill already has one.
    pub fn insert(&mut self, answer: CandidateAnswer) -> QuorumResult<()> {
        if self.contains(answer.skill_id()) {
            return Err(QuorumError::DuplicateAnswer {
                skill_id: answer.skill_id().clone(),
            });
        }
        self.entries.push(answer);
        Ok(())
    }

    pub fn contains(&self, skill_id: &SkillId) -> bool {
        self.entries.iter().any(|e| e.skill_id() == skill_id)
    }

    pub fn get(&self, skill_id: &SkillId) -> Option<&CandidateAnswer> {
        self.entries.iter().find(|e| e.skill_id() == skill_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in request order.
    pub fn iter(&self) -> impl Iterator<Item = &CandidateAnswer> {
        self.entries.iter()
    }

    /// Entries with status `Ok`, in request order.
    pub fn successful(&self) -> impl Iterator<Item = &CandidateAnswer> {
        self.entries.iter().filter(|e| e.is_ok())
    }

    pub fn skill_ids(&self) -> Vec<SkillId> {
        self.entries.iter().map(|e| e.skill_id().clone()).collect()
    }

    /// Status of every dispatched skill.
    pub fn statuses(&self) -> BTreeMap<SkillId, AnswerStatus> {
        self.entries
            .iter()
            .map(|e| (e.skill_id().clone(), e.status()))
            .collect()
    }

    /// `true` when no entry produced a usable answer.
    pub fn has_no_answers(&self) -> bool {
        self.successful().all(|e| e.answers().is_empty())
    }

    /// A copy holding only the entries whose skill is in `skill_ids`.
    pub fn restricted_to(&self, skill_ids: &[SkillId]) -> AnswerSet {
        AnswerSet {
            entries: self
                .entries
                .iter()
                .filter(|e| skill_ids.contains(e.skill_id()))
                .cloned()
                .collect(),
        }
    }
}
