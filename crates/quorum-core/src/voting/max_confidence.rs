//! Highest-confidence-first ranking.

use crate::domain::{AnswerSet, RankedResult, ScoredAnswer, SkillId};
use crate::voting::{degenerate, StrategyKey, VotingStrategy};

/// Ranks every usable answer by confidence.
///
/// Each skill contributes at most `max_results_per_skill` answers. Ties break
/// by skill id ascending, then by the answer's position within its skill.
#[derive(Debug, Clone, Default)]
pub struct MaxConfidence {
    max_results: Option<usize>,
}

impl MaxConfidence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cap the total number of ranked entries.
    pub fn with_max_results(mut self, max: usize) -> Self {
        self.max_results = Some(max);
        self
    }
}

impl VotingStrategy for MaxConfidence {
    fn key(&self) -> StrategyKey {
        StrategyKey::MaxConfidence
    }

    fn select(&self, answers: &AnswerSet, max_results_per_skill: usize) -> RankedResult {
        if let Some(result) = degenerate(answers, self.key()) {
            return result;
        }

        let mut flat: Vec<(&SkillId, usize, &ScoredAnswer)> = answers
            .successful()
            .flat_map(|entry| {
                entry
                    .top(max_results_per_skill)
                    .iter()
                    .enumerate()
                    .map(move |(pos, answer)| (entry.skill_id(), pos, answer))
            })
            .collect();

        flat.sort_by(|a, b| {
            b.2.confidence
                .total_cmp(&a.2.confidence)
                .then_with(|| a.0.cmp(b.0))
                .then_with(|| a.1.cmp(&b.1))
        });

        if let Some(max) = self.max_results {
            flat.truncate(max);
        }

        RankedResult::from_ordered(
            self.key(),
            flat.into_iter()
                .map(|(skill_id, _, answer)| {
                    (answer.text.clone(), answer.confidence, vec![skill_id.clone()])
                })
                .collect(),
        )
    }
}
