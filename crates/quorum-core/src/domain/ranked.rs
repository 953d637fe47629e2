//! The ranked result returned to callers.

use serde::{Deserialize, Serialize};

use crate::domain::skill::SkillId;
use crate::voting::StrategyKey;

/// Why a ranked result looks the way it does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankOutcome {
    /// At least one entry was ranked.
    Answered,
    /// Skills were dispatched but none produced a usable answer.
    NoAnswerAvailable,
    /// No skill ids were given; nothing was dispatched.
    EmptySelection,
}

/// One entry of a ranked result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedAnswer {
    /// 1-based position.
    pub rank: usize,
    pub text: String,
    pub score: f64,
    /// Skills that contributed this answer.
    pub skill_ids: Vec<SkillId>,
}

/// Ordered answers produced once per round. Order is the external contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedResult {
    pub strategy: StrategyKey,
    pub outcome: RankOutcome,
    pub entries: Vec<RankedAnswer>,
}

impl RankedResult {
    pub fn empty(strategy: StrategyKey, outcome: RankOutcome) -> Self {
        Self {
            strategy,
            outcome,
            entries: Vec::new(),
        }
    }

    /// Build from already-ordered `(text, score, skills)` triples, assigning ranks.
    pub fn from_ordered(strategy: StrategyKey, ordered: Vec<(String, f64, Vec<SkillId>)>) -> Self {
        if ordered.is_empty() {
            return Self::empty(strategy, RankOutcome::NoAnswerAvailable);
        }
        let entries = ordered
            .into_iter()
            .enumerate()
            .map(|(i, (text, score, skill_ids))| RankedAnswer {
                rank: i + 1,
                text,
                score,
                skill_ids,
            })
            .collect();
        Self {
            strategy,
            outcome: RankOutcome::Answered,
            entries,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn top(&self) -> Option<&RankedAnswer> {
        self.entries.first()
    }

    /// Keep at most `max` entries.
    pub fn truncate(&mut self, max: usize) {
        self.entries.truncate(max);
    }

    /// Relabel the strategy that produced this result.
    pub fn with_strategy(mut self, strategy: StrategyKey) -> Self {
        self.strategy = strategy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_ordered_assigns_one_based_ranks() {
        let result = RankedResult::from_ordered(
            StrategyKey::MaxConfidence,
            vec![
                ("Paris".into(), 0.9, vec![SkillId::new("a")]),
                ("Lyon".into(), 0.4, vec![SkillId::new("b")]),
            ],
        );
        assert_eq!(result.outcome, RankOutcome::Answered);
        assert_eq!(result.entries[0].rank, 1);
        assert_eq!(result.entries[1].rank, 2);
        assert_eq!(result.top().unwrap().text, "Paris");
    }

    #[test]
    fn from_ordered_empty_is_no_answer() {
        let result = RankedResult::from_ordered(StrategyKey::WeightedVote, Vec::new());
        assert!(result.is_empty());
        assert_eq!(result.outcome, RankOutcome::NoAnswerAvailable);
    }
}
