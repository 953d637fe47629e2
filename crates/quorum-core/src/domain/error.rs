//! Error taxonomy for skill dispatch and selection.

use serde::{Deserialize, Serialize};

use crate::domain::skill::SkillId;

/// Errors produced by the quorum engine.
///
/// Per-skill variants (`Skill*`) never escape a dispatch round as `Err`; they
/// are carried on the skill's [`crate::CandidateAnswer`] instead.
#[derive(Debug, Clone, PartialEq, thiserror::Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QuorumError {
    #[error("skill {skill_id} timed out after {elapsed_ms}ms")]
    SkillTimeout { skill_id: SkillId, elapsed_ms: u64 },

    #[error("skill {skill_id} transport error: {reason}")]
    SkillTransport { skill_id: SkillId, reason: String },

    #[error("skill {skill_id} returned a malformed response: {reason}")]
    SkillMalformedResponse { skill_id: SkillId, reason: String },

    #[error("skill {skill_id} is not available")]
    SkillUnavailable { skill_id: SkillId },

    #[error("no skills were selected")]
    EmptySkillSelection,

    #[error("answer set already holds an entry for skill {skill_id}")]
    DuplicateAnswer { skill_id: SkillId },

    #[error("similarity index unavailable: {0}")]
    IndexUnavailable(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl QuorumError {
    /// The skill this error belongs to, for per-skill variants.
    pub fn skill_id(&self) -> Option<&SkillId> {
        match self {
            Self::SkillTimeout { skill_id, .. }
            | Self::SkillTransport { skill_id, .. }
            | Self::SkillMalformedResponse { skill_id, .. }
            | Self::SkillUnavailable { skill_id }
            | Self::DuplicateAnswer { skill_id } => Some(skill_id),
            _ => None,
        }
    }
}

impl From<quorum_state::StorageError> for QuorumError {
    fn from(err: quorum_state::StorageError) -> Self {
        QuorumError::IndexUnavailable(err.to_string())
    }
}

/// Result type for quorum operations.
pub type QuorumResult<T> = std::result::Result<T, QuorumError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skill_errors_name_the_skill() {
        let err = QuorumError::SkillTimeout {
            skill_id: SkillId::new("qa-bert"),
            elapsed_ms: 2000,
        };
        assert!(err.to_string().contains("qa-bert"));
        assert!(err.to_string().contains("2000ms"));
        assert_eq!(err.skill_id(), Some(&SkillId::new("qa-bert")));

        assert_eq!(QuorumError::EmptySkillSelection.skill_id(), None);
    }

    #[test]
    fn test_storage_error_maps_to_index_unavailable() {
        let err: QuorumError =
            quorum_state::StorageError::Unavailable("connection refused".into()).into();
        assert!(matches!(err, QuorumError::IndexUnavailable(ref m) if m.contains("connection refused")));
    }

    #[test]
    fn test_error_serializes_with_kind_tag() {
        let err = QuorumError::SkillMalformedResponse {
            skill_id: SkillId::new("s1"),
            reason: "missing field `answers`".into(),
        };
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["kind"], "skill_malformed_response");
        assert_eq!(json["skill_id"], "s1");
    }
}
