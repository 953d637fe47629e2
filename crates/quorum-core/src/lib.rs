//! Quorum Core Library
//!
//! Fans a question out to remote QA skills under a deadline, ranks their
//! answers with a pluggable voting strategy, and learns which skills and
//! strategies work for which questions.
//!
//! # Module layout
//!
//! - [`domain`] — questions, skill descriptors, answers, ranked results, errors
//! - [`skill_client`] — `SkillClient` trait and the reqwest-backed `HttpSkillClient`
//! - [`registry`] — per-round skill catalog snapshots
//! - [`dispatch`] — deadline-bounded concurrent fan-out
//! - [`voting`] — Max-Confidence, Weighted-Vote and learned strategies
//! - [`similarity`] — nearest-neighbour index over past selections
//! - [`selector`] — adaptive prediction of skills and strategy
//! - [`engine`] — `QueryEngine`, the inbound query contract

pub mod config;
pub mod dispatch;
pub mod domain;
pub mod engine;
pub mod metrics;
pub mod obs;
pub mod registry;
pub mod selector;
pub mod similarity;
pub mod skill_client;
pub mod telemetry;
pub mod voting;

pub use config::{EngineConfig, MAX_RETURN_ITEMS};
pub use dispatch::{DispatchConfig, Dispatcher};
pub use domain::{
    AnswerSet, AnswerStatus, CandidateAnswer, QueryOptions, Question, QuorumError, QuorumResult,
    RankOutcome, RankedAnswer, RankedResult, ScoreScale, ScoredAnswer, SkillCapabilities,
    SkillDescriptor, SkillId,
};
pub use engine::{QueryEngine, QueryRequest, QueryResponse};
pub use registry::{refresh_availability, SkillCatalog, SkillRegistry, StaticSkillRegistry};
pub use selector::{
    AdaptiveSelector, Aggregation, FallbackReason, Prediction, PredictionSource, SelectionMode,
    SelectorConfig, SelectorPhase, SelectorSession,
};
pub use similarity::{
    ChosenKey, Neighbor, SignatureMatch, SimilarityIndex, SimilarityMetric, SimilarityRecord,
    TokenJaccard,
};
pub use skill_client::{
    HttpSkillClient, RetryPolicy, SkillClient, SkillRequest, SkillResponse, WireAnswer,
};
pub use telemetry::{init_tracing, LogFormat};
pub use voting::{
    AnswerEquivalence, ExactText, LearnedSelector, MaxConfidence, NormalizedText, Strategy,
    StrategyKey, VotingStrategy, WeightedVote,
};

pub use quorum_state::{
    MemorySimilarityStore, SimilarityStore, StorageError, SurrealSimilarityStore,
    UnavailableSimilarityStore,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
