//! The immutable question that drives one dispatch round.

use std::collections::BTreeMap;

use quorum_state::QuestionDigest;
use serde::{Deserialize, Serialize};

use crate::domain::skill::SkillId;

/// Per-query options shared by every skill in the round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryOptions {
    /// How many answers of each skill are considered for ranking.
    pub max_results_per_skill: usize,
    /// Opaque skill-specific arguments. Skills without an entry get `{}`.
    #[serde(default)]
    pub skill_args: BTreeMap<SkillId, serde_json::Value>,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            max_results_per_skill: 1,
            skill_args: BTreeMap::new(),
        }
    }
}

impl QueryOptions {
    pub fn with_max_results_per_skill(mut self, n: usize) -> Self {
        self.max_results_per_skill = n;
        self
    }

    pub fn with_skill_args(mut self, skill_id: &str, args: serde_json::Value) -> Self {
        self.skill_args.insert(SkillId::new(skill_id), args);
        self
    }

    /// Arguments for `skill_id`, or an empty object.
    pub fn args_for(&self, skill_id: &SkillId) -> serde_json::Value {
        self.skill_args
            .get(skill_id)
            .cloned()
            .unwrap_or_else(|| serde_json::Value::Object(serde_json::Map::new()))
    }
}

/// A natural-language question plus optional context and options.
///
/// Equality compares every field, options and user id included. The
/// [`digest`](Self::digest) covers the text alone, so questions that differ
/// only in context or options share similarity history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    text: String,
    context: Option<String>,
    options: QueryOptions,
    user_id: Option<String>,
}

impl Question {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            context: None,
            options: QueryOptions::default(),
            user_id: None,
        }
    }

    pub fn with_context(mut self, context: &str) -> Self {
        self.context = Some(context.to_string());
        self
    }

    pub fn with_options(mut self, options: QueryOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_user_id(mut self, user_id: &str) -> Self {
        self.user_id = Some(user_id.to_string());
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    pub fn options(&self) -> &QueryOptions {
        &self.options
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    /// Content digest of the question text.
    pub fn digest(&self) -> QuestionDigest {
        QuestionDigest::of_text(&self.text)
    }
}
