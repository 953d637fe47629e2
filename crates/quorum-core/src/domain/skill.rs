//! Skill identity and the read-only descriptor snapshot used per round.

use serde::{Deserialize, Serialize};

/// Stable, unique identifier of a skill.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SkillId(pub String);

impl SkillId {
    pub fn new(id: &str) -> Self {
        SkillId(id.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SkillId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SkillId {
    fn from(s: &str) -> Self {
        SkillId::new(s)
    }
}

/// How a skill's raw scores map onto the shared confidence scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ScoreScale {
    /// Scores are already in [0,1]; out-of-range values are clamped.
    #[default]
    Unit,
    /// Scores range over [0, max]; divided by `max` then clamped.
    Max(f64),
}

impl ScoreScale {
    /// Map a raw skill score onto [0,1]. Returns `None` for non-finite input.
    pub fn normalize(&self, raw: f64) -> Option<f64> {
        if !raw.is_finite() {
            return None;
        }
        let scaled = match self {
            ScoreScale::Unit => raw,
            ScoreScale::Max(max) if *max > 0.0 && max.is_finite() => raw / max,
            ScoreScale::Max(_) => return None,
        };
        Some(scaled.clamp(0.0, 1.0))
    }
}

/// What a skill declares it can do.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillCapabilities {
    /// Whether the skill reads the context passage.
    #[serde(default)]
    pub supports_context: bool,
    /// Upper bound on answers the skill returns per call, if any.
    #[serde(default)]
    pub max_results: Option<usize>,
}

impl Default for SkillCapabilities {
    fn default() -> Self {
        Self {
            supports_context: true,
            max_results: None,
        }
    }
}

/// Snapshot of one registered skill. Owned by the external registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillDescriptor {
    pub id: SkillId,
    pub name: String,
    /// Base URL; the query endpoint is `{endpoint}/query`.
    pub endpoint: String,
    /// e.g. `extractive-qa`, `multiple-choice`, `abstractive`
    pub skill_type: String,
    #[serde(default)]
    pub capabilities: SkillCapabilities,
    #[serde(default)]
    pub score_scale: ScoreScale,
    pub available: bool,
}

impl SkillDescriptor {
    pub fn new(id: &str, endpoint: &str) -> Self {
        Self {
            id: SkillId::new(id),
            name: id.to_string(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            skill_type: "extractive-qa".to_string(),
            capabilities: SkillCapabilities::default(),
            score_scale: ScoreScale::Unit,
            available: true,
        }
    }

    pub fn with_skill_type(mut self, skill_type: &str) -> Self {
        self.skill_type = skill_type.to_string();
        self
    }

    pub fn with_score_scale(mut self, scale: ScoreScale) -> Self {
        self.score_scale = scale;
        self
    }

    pub fn with_capabilities(mut self, capabilities: SkillCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    pub fn query_url(&self) -> String {
        format!("{}/query", self.endpoint)
    }

    pub fn heartbeat_url(&self) -> String {
        format!("{}/health/heartbeat", self.endpoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_scale_clamps() {
        assert_eq!(ScoreScale::Unit.normalize(0.4), Some(0.4));
        assert_eq!(ScoreScale::Unit.normalize(1.7), Some(1.0));
        assert_eq!(ScoreScale::Unit.normalize(-3.0), Some(0.0));
        assert_eq!(ScoreScale::Unit.normalize(f64::NAN), None);
    }

    #[test]
    fn max_scale_divides() {
        assert_eq!(ScoreScale::Max(10.0).normalize(5.0), Some(0.5));
        assert_eq!(ScoreScale::Max(0.0).normalize(5.0), None);
    }

    #[test]
    fn descriptor_urls_strip_trailing_slash() {
        let skill = SkillDescriptor::new("qa", "http://skills.local:8080/qa/");
        assert_eq!(skill.query_url(), "http://skills.local:8080/qa/query");
        assert_eq!(
            skill.heartbeat_url(),
            "http://skills.local:8080/qa/health/heartbeat"
        );
    }
}
