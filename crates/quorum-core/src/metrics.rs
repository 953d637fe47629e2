//! Global atomic counters for quorum observability.
//!
//! Counters are incremented silently at the call site. Call
//! [`Metrics::flush`] to emit current values as a single
//! `tracing::info!` event (e.g. at the end of a round).

use std::sync::atomic::{AtomicU64, Ordering};

use crate::domain::AnswerStatus;

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

/// Lightweight atomic counters — no allocations, no locking.
pub struct Metrics {
    rounds_dispatched: AtomicU64,
    skills_ok: AtomicU64,
    skills_timed_out: AtomicU64,
    skills_failed: AtomicU64,
    fallback_predictions: AtomicU64,
    feedback_recorded: AtomicU64,
    feedback_dropped: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            rounds_dispatched: AtomicU64::new(0),
            skills_ok: AtomicU64::new(0),
            skills_timed_out: AtomicU64::new(0),
            skills_failed: AtomicU64::new(0),
            fallback_predictions: AtomicU64::new(0),
            feedback_recorded: AtomicU64::new(0),
            feedback_dropped: AtomicU64::new(0),
        }
    }

    pub fn inc_rounds(&self) {
        self.rounds_dispatched.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "rounds_dispatched", "counter incremented");
    }

    /// Count one finished skill call under its status.
    pub fn inc_skill_status(&self, status: AnswerStatus) {
        let counter = match status {
            AnswerStatus::Ok => &self.skills_ok,
            AnswerStatus::Timeout => &self.skills_timed_out,
            AnswerStatus::Error => &self.skills_failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_fallback_predictions(&self) {
        self.fallback_predictions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_feedback_recorded(&self) {
        self.feedback_recorded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_feedback_dropped(&self) {
        self.feedback_dropped.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "feedback_dropped", "counter incremented");
    }

    /// Emit all current counter values as a single `info!` event.
    ///
    /// Call this at natural boundaries rather than on every increment.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            rounds_dispatched = self.rounds_dispatched(),
            skills_ok = self.skills_ok(),
            skills_timed_out = self.skills_timed_out(),
            skills_failed = self.skills_failed(),
            fallback_predictions = self.fallback_predictions(),
            feedback_recorded = self.feedback_recorded(),
            feedback_dropped = self.feedback_dropped(),
        );
    }

    pub fn rounds_dispatched(&self) -> u64 {
        self.rounds_dispatched.load(Ordering::Relaxed)
    }

    pub fn skills_ok(&self) -> u64 {
        self.skills_ok.load(Ordering::Relaxed)
    }

    pub fn skills_timed_out(&self) -> u64 {
        self.skills_timed_out.load(Ordering::Relaxed)
    }

    pub fn skills_failed(&self) -> u64 {
        self.skills_failed.load(Ordering::Relaxed)
    }

    pub fn fallback_predictions(&self) -> u64 {
        self.fallback_predictions.load(Ordering::Relaxed)
    }

    pub fn feedback_recorded(&self) -> u64 {
        self.feedback_recorded.load(Ordering::Relaxed)
    }

    pub fn feedback_dropped(&self) -> u64 {
        self.feedback_dropped.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        for counter in [
            &self.rounds_dispatched,
            &self.skills_ok,
            &self.skills_timed_out,
            &self.skills_failed,
            &self.fallback_predictions,
            &self.feedback_recorded,
            &self.feedback_dropped,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_increment() {
        let m = Metrics::new();
        m.inc_rounds();
        m.inc_skill_status(AnswerStatus::Ok);
        m.inc_skill_status(AnswerStatus::Ok);
        m.inc_skill_status(AnswerStatus::Timeout);
        m.inc_skill_status(AnswerStatus::Error);
        m.inc_feedback_dropped();

        assert_eq!(m.rounds_dispatched(), 1);
        assert_eq!(m.skills_ok(), 2);
        assert_eq!(m.skills_timed_out(), 1);
        assert_eq!(m.skills_failed(), 1);
        assert_eq!(m.feedback_dropped(), 1);
    }

    #[test]
    fn reset_zeroes_all() {
        let m = Metrics::new();
        m.inc_rounds();
        m.inc_fallback_predictions();
        m.inc_feedback_recorded();
        m.reset();
        assert_eq!(m.rounds_dispatched(), 0);
        assert_eq!(m.fallback_predictions(), 0);
        assert_eq!(m.feedback_recorded(), 0);
    }
}
