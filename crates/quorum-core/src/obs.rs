//! Structured observability hooks for dispatch rounds and selection.
//!
//! This module provides:
//! - A round-scoped span (`round_span`) for instrumenting round futures
//! - Emission functions for round start/finish, per-skill completion,
//!   predictions and feedback
//!
//! Events are emitted at `info!` level except per-skill completion (`debug!`)
//! and dropped feedback (`warn!`).

use std::time::Duration;

use tracing::{debug, info};

use crate::domain::{AnswerStatus, RankOutcome, SkillId};

/// Span covering one dispatch round.
///
/// ```ignore
/// engine.run_round(..).instrument(obs::round_span("3f2a9c1d0b7e")).await
/// ```
pub fn round_span(question_digest: &str) -> tracing::Span {
    tracing::info_span!("quorum.round", question = %question_digest)
}

pub fn emit_round_started(question_digest: &str, skills: usize, strategy: &str) {
    info!(
        event = "round.started",
        question = %question_digest,
        skills = skills,
        strategy = %strategy,
    );
}

pub fn emit_skill_completed(skill_id: &SkillId, status: AnswerStatus, latency: Duration) {
    debug!(
        event = "skill.completed",
        skill_id = %skill_id,
        status = %status,
        latency_ms = latency.as_millis() as u64,
    );
}

pub fn emit_round_finished(
    question_digest: &str,
    outcome: RankOutcome,
    entries: usize,
    elapsed_ms: u64,
) {
    info!(
        event = "round.finished",
        question = %question_digest,
        outcome = ?outcome,
        entries = entries,
        elapsed_ms = elapsed_ms,
    );
}

pub fn emit_prediction(question_digest: &str, strategy: &str, skills: usize, source: &str) {
    info!(
        event = "selector.predicted",
        question = %question_digest,
        strategy = %strategy,
        skills = skills,
        source = %source,
    );
}

pub fn emit_feedback_recorded(chosen_key: &str, quality: f64) {
    info!(event = "selector.recorded", chosen_key = %chosen_key, quality = quality);
}

pub fn emit_feedback_dropped(chosen_key: &str, error: &dyn std::fmt::Display) {
    tracing::warn!(event = "selector.feedback_dropped", chosen_key = %chosen_key, error = %error);
}
