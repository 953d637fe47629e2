//! Engine configuration.
//!
//! Every tunable is explicit here; nothing in the engine reads the
//! environment on its own. `from_env` reads `QUORUM_*` variables and falls
//! back to the defaults below for unset ones.
//!
//! | Variable | Default |
//! |---|---|
//! | `QUORUM_ROUND_DEADLINE_MS` | 5000 |
//! | `QUORUM_MAX_CONCURRENT` | 16 |
//! | `QUORUM_MAX_RETURN_ITEMS` | 1000 |
//! | `QUORUM_SKILL_MAX_ATTEMPTS` | 2 |
//! | `QUORUM_SKILL_RETRY_BACKOFF_MS` | 100 |
//! | `QUORUM_SELECTOR_K` | 10 |
//! | `QUORUM_SELECTOR_MIN_SAMPLES` | 3 |
//! | `QUORUM_SELECTOR_MAX_DISTANCE` | 0.8 |
//! | `QUORUM_SELECTOR_AGGREGATION` | `majority` |
//! | `QUORUM_SELECTOR_MODE` | `strategy` |
//! | `QUORUM_SELECTOR_SUBSET_SIZE` | 1 |
//! | `QUORUM_PREDICTION_SHARE` | 0.2 |
//! | `QUORUM_NARROW_DISPATCH` | false |
//! | `QUORUM_DEFAULT_STRATEGY` | `max_confidence` |
//! | `QUORUM_AUTO_RECORD` | false |
//! | `QUORUM_LOG_FORMAT` | `text` |

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::dispatch::DispatchConfig;
use crate::domain::{QuorumError, QuorumResult};
use crate::selector::{Aggregation, SelectionMode, SelectorConfig};
use crate::skill_client::{duration_ms, RetryPolicy};
use crate::telemetry::LogFormat;
use crate::voting::StrategyKey;

/// Hard cap on ranked entries returned per round.
pub const MAX_RETURN_ITEMS: usize = 1000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Global deadline of one dispatch round.
    #[serde(with = "duration_ms")]
    pub round_deadline: Duration,
    pub max_concurrent: usize,
    pub max_return_items: usize,
    pub retry: RetryPolicy,
    pub selector: SelectorConfig,
    /// Fraction of `round_deadline` the similarity lookup may use before the
    /// selector falls back. Skills always keep the remainder.
    pub prediction_share: f64,
    /// Dispatch only the predicted skill subset when the learned path runs.
    pub narrow_dispatch: bool,
    pub default_strategy: StrategyKey,
    /// Record the applied strategy after each answered round.
    pub auto_record: bool,
    pub log_format: LogFormat,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            round_deadline: Duration::from_millis(5000),
            max_concurrent: 16,
            max_return_items: MAX_RETURN_ITEMS,
            retry: RetryPolicy::default(),
            selector: SelectorConfig::default(),
            prediction_share: 0.2,
            narrow_dispatch: false,
            default_strategy: StrategyKey::MaxConfidence,
            auto_record: false,
            log_format: LogFormat::Text,
        }
    }
}

impl EngineConfig {
    /// Read `QUORUM_*` environment variables over the defaults.
    pub fn from_env() -> QuorumResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> QuorumResult<Self> {
        let mut config = Self::default();

        if let Some(ms) = parse::<u64>(&lookup, "QUORUM_ROUND_DEADLINE_MS")? {
            config.round_deadline = Duration::from_millis(ms);
        }
        if let Some(n) = parse(&lookup, "QUORUM_MAX_CONCURRENT")? {
            config.max_concurrent = n;
        }
        if let Some(n) = parse(&lookup, "QUORUM_MAX_RETURN_ITEMS")? {
            config.max_return_items = n;
        }
        if let Some(n) = parse(&lookup, "QUORUM_SKILL_MAX_ATTEMPTS")? {
            config.retry.max_attempts = n;
        }
        if let Some(ms) = parse::<u64>(&lookup, "QUORUM_SKILL_RETRY_BACKOFF_MS")? {
            config.retry.backoff = Duration::from_millis(ms);
        }
        if let Some(k) = parse(&lookup, "QUORUM_SELECTOR_K")? {
            config.selector.k = k;
        }
        if let Some(n) = parse(&lookup, "QUORUM_SELECTOR_MIN_SAMPLES")? {
            config.selector.min_samples = n;
        }
        if let Some(d) = parse(&lookup, "QUORUM_SELECTOR_MAX_DISTANCE")? {
            config.selector.max_distance = d;
        }
        if let Some(raw) = lookup("QUORUM_SELECTOR_AGGREGATION") {
            config.selector.aggregation = match raw.trim() {
                "majority" => Aggregation::Majority,
                "score_weighted" => Aggregation::ScoreWeighted,
                other => return Err(invalid("QUORUM_SELECTOR_AGGREGATION", other)),
            };
        }
        if let Some(raw) = lookup("QUORUM_SELECTOR_MODE") {
            config.selector.mode = match raw.trim() {
                "strategy" => SelectionMode::Strategy,
                "skills" => SelectionMode::Skills,
                "both" => SelectionMode::Both,
                other => return Err(invalid("QUORUM_SELECTOR_MODE", other)),
            };
        }
        if let Some(n) = parse(&lookup, "QUORUM_SELECTOR_SUBSET_SIZE")? {
            config.selector.skill_subset_size = n;
        }
        if let Some(share) = parse(&lookup, "QUORUM_PREDICTION_SHARE")? {
            config.prediction_share = share;
        }
        if let Some(b) = parse_bool(&lookup, "QUORUM_NARROW_DISPATCH")? {
            config.narrow_dispatch = b;
        }
        if let Some(key) = parse(&lookup, "QUORUM_DEFAULT_STRATEGY")? {
            config.default_strategy = key;
        }
        if let Some(b) = parse_bool(&lookup, "QUORUM_AUTO_RECORD")? {
            config.auto_record = b;
        }
        if let Some(format) = parse(&lookup, "QUORUM_LOG_FORMAT")? {
            config.log_format = format;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> QuorumResult<()> {
        if self.round_deadline.is_zero() {
            return Err(QuorumError::InvalidConfig("round deadline must be positive".into()));
        }
        if self.max_concurrent == 0 {
            return Err(QuorumError::InvalidConfig("max_concurrent must be at least 1".into()));
        }
        if self.max_return_items == 0 {
            return Err(QuorumError::InvalidConfig("max_return_items must be at least 1".into()));
        }
        if self.retry.max_attempts == 0 {
            return Err(QuorumError::InvalidConfig(
                "skill max_attempts must be at least 1".into(),
            ));
        }
        if self.selector.k == 0 {
            return Err(QuorumError::InvalidConfig("selector k must be at least 1".into()));
        }
        if !(0.0..=1.0).contains(&self.selector.max_distance) {
            return Err(QuorumError::InvalidConfig(format!(
                "selector max_distance must be within [0, 1], got {}",
                self.selector.max_distance
            )));
        }
        if !(self.prediction_share > 0.0 && self.prediction_share < 1.0) {
            return Err(QuorumError::InvalidConfig(format!(
                "prediction_share must be within (0, 1), got {}",
                self.prediction_share
            )));
        }
        Ok(())
    }

    /// Time the similarity lookup may take at the start of a round.
    pub fn prediction_budget(&self) -> Duration {
        self.round_deadline.mul_f64(self.prediction_share)
    }

    pub fn dispatch(&self) -> DispatchConfig {
        DispatchConfig {
            max_concurrent: self.max_concurrent,
        }
    }
}

fn invalid(key: &str, value: &str) -> QuorumError {
    QuorumError::InvalidConfig(format!("{key}: invalid value {value:?}"))
}

fn parse<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> QuorumResult<Option<T>> {
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| invalid(key, &raw)),
    }
}

fn parse_bool(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> QuorumResult<Option<bool>> {
    match lookup(key).as_deref().map(str::trim) {
        None => Ok(None),
        Some("1") | Some("true") | Some("yes") => Ok(Some(true)),
        Some("0") | Some("false") | Some("no") => Ok(Some(false)),
        Some(other) => Err(invalid(key, other)),
    }
}
