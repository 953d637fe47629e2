//! Voting strategies: reduce an [`AnswerSet`] to a [`RankedResult`].
//!
//! Every strategy is a total function over the answer set. Missing, timed
//! out and failed entries are filtered, never raised.
//!
//! # Module layout
//!
//! - [`max_confidence`] — `MaxConfidence`
//! - [`weighted_vote`] — `WeightedVote`, `AnswerEquivalence`, `ExactText`, `NormalizedText`
//! - [`learned`] — `LearnedSelector`, driven by an adaptive-selector prediction

pub mod learned;
pub mod max_confidence;
pub mod weighted_vote;

use serde::{Deserialize, Serialize};

use crate::domain::{AnswerSet, QuorumError, RankOutcome, RankedResult};

pub use learned::LearnedSelector;
pub use max_confidence::MaxConfidence;
pub use weighted_vote::{AnswerEquivalence, ExactText, NormalizedText, WeightedVote};

/// Names a voting strategy.
///
/// Ordering (`MaxConfidence < WeightedVote < Learned`) is the tie-break order
/// when strategies are compared by score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKey {
    MaxConfidence,
    WeightedVote,
    Learned,
}

impl StrategyKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MaxConfidence => "max_confidence",
            Self::WeightedVote => "weighted_vote",
            Self::Learned => "learned",
        }
    }
}

impl std::fmt::Display for StrategyKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for StrategyKey {
    type Err = QuorumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "max_confidence" => Ok(Self::MaxConfidence),
            "weighted_vote" => Ok(Self::WeightedVote),
            "learned" => Ok(Self::Learned),
            other => Err(QuorumError::InvalidConfig(format!(
                "unknown voting strategy: {other}"
            ))),
        }
    }
}

/// Shared contract of all voting strategies.
pub trait VotingStrategy: Send + Sync {
    fn key(&self) -> StrategyKey;

    /// Rank the answer set. Pure: the same input always yields the same output.
    fn select(&self, answers: &AnswerSet, max_results_per_skill: usize) -> RankedResult;
}

/// The strategy applied to one round.
#[derive(Debug, Clone)]
pub enum Strategy {
    MaxConfidence(MaxConfidence),
    WeightedVote(WeightedVote),
    Learned(LearnedSelector),
}

impl VotingStrategy for Strategy {
    fn key(&self) -> StrategyKey {
        match self {
            Self::MaxConfidence(s) => s.key(),
            Self::WeightedVote(s) => s.key(),
            Self::Learned(s) => s.key(),
        }
    }

    fn select(&self, answers: &AnswerSet, max_results_per_skill: usize) -> RankedResult {
        match self {
            Self::MaxConfidence(s) => s.select(answers, max_results_per_skill),
            Self::WeightedVote(s) => s.select(answers, max_results_per_skill),
            Self::Learned(s) => s.select(answers, max_results_per_skill),
        }
    }
}

/// Result for answer sets nothing can be ranked from, if `answers` is one.
pub(crate) fn degenerate(answers: &AnswerSet, strategy: StrategyKey) -> Option<RankedResult> {
    if answers.is_empty() {
        return Some(RankedResult::empty(strategy, RankOutcome::EmptySelection));
    }
    if answers.has_no_answers() {
        return Some(RankedResult::empty(strategy, RankOutcome::NoAnswerAvailable));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_key_parses_its_own_display() {
        for key in [
            StrategyKey::MaxConfidence,
            StrategyKey::WeightedVote,
            StrategyKey::Learned,
        ] {
            assert_eq!(key.to_string().parse::<StrategyKey>().unwrap(), key);
        }
        assert!("borda".parse::<StrategyKey>().is_err());
    }

    #[test]
    fn strategy_key_order_is_tie_break_order() {
        assert!(StrategyKey::MaxConfidence < StrategyKey::WeightedVote);
        assert!(StrategyKey::WeightedVote < StrategyKey::Learned);
    }
}
