//! Domain models for the quorum engine.
//!
//! Canonical definitions for the core entities:
//! - `Question`: immutable question text, context and options
//! - `SkillDescriptor`: read-only snapshot of a registered skill
//! - `CandidateAnswer` / `AnswerSet`: per-skill responses of one round
//! - `RankedResult`: the ordered output of a voting strategy

pub mod answer;
pub mod error;
pub mod question;
pub mod ranked;
pub mod skill;

pub use answer::{AnswerSet, AnswerStatus, CandidateAnswer, ScoredAnswer};
pub use error::{QuorumError, QuorumResult};
pub use question::{QueryOptions, Question};
pub use ranked::{RankOutcome, RankedAnswer, RankedResult};
pub use skill::{ScoreScale, SkillCapabilities, SkillDescriptor, SkillId};
