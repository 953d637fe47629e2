//! Cross-skill grouping of equivalent answers.
//!
//! Answers that an [`AnswerEquivalence`] maps to the same canonical form form
//! one group. A group's score is the trust-weighted sum of its members'
//! confidences; with default weights that is the plain sum. A skill
//! contributes at most once per group, with its highest confidence.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::domain::{AnswerSet, RankedResult, SkillId};
use crate::voting::{degenerate, StrategyKey, VotingStrategy};

/// Decides which answer texts count as the same answer.
pub trait AnswerEquivalence: Send + Sync + std::fmt::Debug {
    /// Canonical form; two texts are equivalent iff their forms are equal.
    fn canonical(&self, text: &str) -> String;
}

/// Exact text match.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactText;

impl AnswerEquivalence for ExactText {
    fn canonical(&self, text: &str) -> String {
        text.to_string()
    }
}

/// Ignores case, punctuation and whitespace differences.
#[derive(Debug, Clone, Copy, Default)]
pub struct NormalizedText;

impl AnswerEquivalence for NormalizedText {
    fn canonical(&self, text: &str) -> String {
        text.to_lowercase()
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { ' ' })
            .collect::<String>()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Clone)]
pub struct WeightedVote {
    equivalence: Arc<dyn AnswerEquivalence>,
    trust: BTreeMap<SkillId, f64>,
    max_results: Option<usize>,
}

impl Default for WeightedVote {
    fn default() -> Self {
        Self {
            equivalence: Arc::new(ExactText),
            trust: BTreeMap::new(),
            max_results: None,
        }
    }
}

impl WeightedVote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_equivalence(mut self, equivalence: Arc<dyn AnswerEquivalence>) -> Self {
        self.equivalence = equivalence;
        self
    }

    /// Weight applied to `skill_id`'s confidences. Unlisted skills weigh 1.0.
    pub fn with_trust(mut self, skill_id: &str, weight: f64) -> Self {
        self.trust.insert(SkillId::new(skill_id), weight);
        self
    }

    pub fn with_max_results(mut self, max: usize) -> Self {
        self.max_results = Some(max);
        self
    }

    fn weight(&self, skill_id: &SkillId) -> f64 {
        self.trust.get(skill_id).copied().unwrap_or(1.0)
    }
}

struct Group {
    canonical: String,
    text: String,
    best: f64,
    score: f64,
    skill_ids: Vec<SkillId>,
}

impl VotingStrategy for WeightedVote {
    fn key(&self) -> StrategyKey {
        StrategyKey::WeightedVote
    }

    fn select(&self, answers: &AnswerSet, max_results_per_skill: usize) -> RankedResult {
        if let Some(result) = degenerate(answers, self.key()) {
            return result;
        }

        let mut groups: Vec<Group> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        for entry in answers.successful() {
            let skill_id = entry.skill_id();
            let weight = self.weight(skill_id);
            // Answers are sorted best-first, so the first hit per group is the max.
            for answer in entry.top(max_results_per_skill) {
                let canonical = self.equivalence.canonical(&answer.text);
                let idx = *index.entry(canonical.clone()).or_insert_with(|| {
                    groups.push(Group {
                        canonical,
                        text: answer.text.clone(),
                        best: answer.confidence,
                        score: 0.0,
                        skill_ids: Vec::new(),
                    });
                    groups.len() - 1
                });
                let group = &mut groups[idx];
                if group.skill_ids.contains(skill_id) {
                    continue;
                }
                group.score += weight * answer.confidence;
                group.skill_ids.push(skill_id.clone());
                if answer.confidence > group.best {
                    group.best = answer.confidence;
                    group.text = answer.text.clone();
                }
            }
        }

        groups.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.skill_ids.iter().min().cmp(&b.skill_ids.iter().min()))
                .then_with(|| a.canonical.cmp(&b.canonical))
        });

        if let Some(max) = self.max_results {
            groups.truncate(max);
        }

        RankedResult::from_ordered(
            self.key(),
            groups
                .into_iter()
                .map(|g| (g.text, g.score, g.skill_ids))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CandidateAnswer, ScoredAnswer};
    use std::time::Duration;

    fn ok(id: &str, answers: &[(&str, f64)]) -> CandidateAnswer {
        CandidateAnswer::ok(
            SkillId::new(id),
            answers.iter().map(|(t, c)| ScoredAnswer::new(t, *c)).collect(),
            Duration::from_millis(1),
        )
    }

    fn set(entries: Vec<CandidateAnswer>) -> AnswerSet {
        let mut set = AnswerSet::new();
        for e in entries {
            set.insert(e).unwrap();
        }
        set
    }

    #[test]
    fn normalized_text_ignores_case_and_punctuation() {
        let eq = NormalizedText;
        assert_eq!(eq.canonical("  Paris, France. "), eq.canonical("paris france"));
        assert_ne!(eq.canonical("Paris"), eq.canonical("Lyon"));
    }

    #[test]
    fn skill_counts_once_per_group() {
        let answers = set(vec![
            ok("a", &[("Paris", 0.6), ("Paris", 0.4)]),
            ok("b", &[("Paris", 0.5)]),
        ]);
        let result = WeightedVote::new().select(&answers, 5);
        assert_eq!(result.len(), 1);
        assert_eq!(result.entries[0].score, 0.6 + 0.5);
    }

    #[test]
    fn trust_weights_scale_contributions() {
        let answers = set(vec![ok("a", &[("Paris", 0.5)]), ok("b", &[("Lyon", 0.8)])]);
        let result = WeightedVote::new()
            .with_trust("a", 2.0)
            .with_trust("b", 0.5)
            .select(&answers, 1);
        assert_eq!(result.entries[0].text, "Paris");
        assert_eq!(result.entries[0].score, 1.0);
        assert_eq!(result.entries[1].score, 0.4);
    }

    #[test]
    fn normalized_groups_keep_best_surface_text() {
        let answers = set(vec![ok("a", &[("paris", 0.3)]), ok("b", &[("Paris.", 0.7)])]);
        let result = WeightedVote::new()
            .with_equivalence(Arc::new(NormalizedText))
            .select(&answers, 1);
        assert_eq!(result.len(), 1);
        assert_eq!(result.entries[0].text, "Paris.");
        assert_eq!(
            result.entries[0].skill_ids,
            vec![SkillId::new("a"), SkillId::new("b")]
        );
    }

    #[test]
    fn equal_scores_break_by_smallest_skill_id() {
        let answers = set(vec![ok("z", &[("Rome", 0.5)]), ok("m", &[("Oslo", 0.5)])]);
        let result = WeightedVote::new().select(&answers, 1);
        assert_eq!(result.entries[0].text, "Oslo");
    }
}
