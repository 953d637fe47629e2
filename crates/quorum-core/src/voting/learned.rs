//! Strategy driven by an adaptive-selector prediction.

use crate::domain::{AnswerSet, RankedResult};
use crate::selector::Prediction;
use crate::voting::{degenerate, MaxConfidence, StrategyKey, VotingStrategy, WeightedVote};

/// Restricts the answer set to the predicted skills, then applies the
/// predicted base strategy.
///
/// When none of the predicted skills produced a usable answer the whole set
/// is ranked instead, so a bad prediction never hides an answer.
#[derive(Debug, Clone)]
pub struct LearnedSelector {
    prediction: Prediction,
    max_confidence: MaxConfidence,
    weighted_vote: WeightedVote,
}

impl LearnedSelector {
    pub fn new(prediction: Prediction) -> Self {
        Self {
            prediction,
            max_confidence: MaxConfidence::default(),
            weighted_vote: WeightedVote::default(),
        }
    }

    /// Base strategies used once the prediction picked one.
    pub fn with_bases(mut self, max_confidence: MaxConfidence, weighted_vote: WeightedVote) -> Self {
        self.max_confidence = max_confidence;
        self.weighted_vote = weighted_vote;
        self
    }

    pub fn prediction(&self) -> &Prediction {
        &self.prediction
    }

    fn base(&self) -> &dyn VotingStrategy {
        match self.prediction.strategy {
            StrategyKey::WeightedVote => &self.weighted_vote,
            StrategyKey::MaxConfidence | StrategyKey::Learned => &self.max_confidence,
        }
    }
}

impl VotingStrategy for LearnedSelector {
    fn key(&self) -> StrategyKey {
        StrategyKey::Learned
    }

    fn select(&self, answers: &AnswerSet, max_results_per_skill: usize) -> RankedResult {
        if let Some(result) = degenerate(answers, self.key()) {
            return result;
        }

        let restricted = answers.restricted_to(&self.prediction.skill_ids);
        let considered = if restricted.has_no_answers() {
            answers
        } else {
            &restricted
        };

        self.base()
            .select(considered, max_results_per_skill)
            .with_strategy(self.key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CandidateAnswer, RankOutcome, ScoredAnswer, SkillId};
    use crate::selector::PredictionSource;
    use std::time::Duration;

    fn answers() -> AnswerSet {
        let mut set = AnswerSet::new();
        for (id, text, conf) in [("a", "Paris", 0.9), ("b", "Lyon", 0.6), ("c", "Lyon", 0.5)] {
            set.insert(CandidateAnswer::ok(
                SkillId::new(id),
                vec![ScoredAnswer::new(text, conf)],
                Duration::from_millis(3),
            ))
            .unwrap();
        }
        set
    }

    fn prediction(skills: &[&str], strategy: StrategyKey) -> Prediction {
        Prediction {
            skill_ids: skills.iter().map(|s| SkillId::new(s)).collect(),
            strategy,
            source: PredictionSource::Neighbors { count: 4 },
        }
    }

    #[test]
    fn restricts_to_predicted_skills() {
        let selector = LearnedSelector::new(prediction(&["b"], StrategyKey::MaxConfidence));
        let result = selector.select(&answers(), 1);
        assert_eq!(result.strategy, StrategyKey::Learned);
        assert_eq!(result.len(), 1);
        assert_eq!(result.entries[0].text, "Lyon");
    }

    #[test]
    fn applies_predicted_base_strategy() {
        let selector =
            LearnedSelector::new(prediction(&["a", "b", "c"], StrategyKey::WeightedVote));
        let result = selector.select(&answers(), 1);
        assert_eq!(result.entries[0].text, "Lyon");
        assert_eq!(result.entries[0].skill_ids.len(), 2);
    }

    #[test]
    fn falls_back_to_full_set_when_prediction_has_nothing() {
        let selector = LearnedSelector::new(prediction(&["gone"], StrategyKey::MaxConfidence));
        let result = selector.select(&answers(), 1);
        assert_eq!(result.outcome, RankOutcome::Answered);
        assert_eq!(result.entries[0].text, "Paris");
    }
}
