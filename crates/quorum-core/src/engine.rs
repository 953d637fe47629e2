//! Query Engine: the inbound contract for one question.
//!
//! A round runs validate → snapshot → predict (learned path only) →
//! dispatch → select → cap → optional record. Per-skill failures stay on
//! the per-skill status map; the only errors returned are request,
//! configuration and registry failures.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, Instrument};

use crate::config::EngineConfig;
use crate::dispatch::Dispatcher;
use crate::domain::{
    AnswerStatus, QueryOptions, QuorumError, QuorumResult, Question, RankOutcome, RankedResult,
    SkillId,
};
use crate::metrics::METRICS;
use crate::obs;
use crate::registry::{SkillCatalog, SkillRegistry};
use crate::selector::{
    AdaptiveSelector, FallbackReason, Prediction, PredictionSource, SelectorPhase,
};
use crate::similarity::ChosenKey;
use crate::skill_client::{HttpSkillClient, SkillClient};
use crate::voting::{
    LearnedSelector, MaxConfidence, Strategy, StrategyKey, VotingStrategy, WeightedVote,
};

/// One question as received from the API layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub question_text: String,
    #[serde(default)]
    pub context_text: Option<String>,
    pub selected_skill_ids: Vec<SkillId>,
    pub max_results_per_skill: usize,
    #[serde(default)]
    pub skill_args: BTreeMap<SkillId, serde_json::Value>,
    #[serde(default)]
    pub user_id: Option<String>,
    /// Overrides the configured default strategy for this round.
    #[serde(default)]
    pub strategy: Option<StrategyKey>,
}

impl QueryRequest {
    pub fn new(question_text: &str, skill_ids: &[&str]) -> Self {
        Self {
            question_text: question_text.to_string(),
            context_text: None,
            selected_skill_ids: skill_ids.iter().map(|s| SkillId::new(s)).collect(),
            max_results_per_skill: 1,
            skill_args: BTreeMap::new(),
            user_id: None,
            strategy: None,
        }
    }

    pub fn with_context(mut self, context: &str) -> Self {
        self.context_text = Some(context.to_string());
        self
    }

    pub fn with_max_results_per_skill(mut self, n: usize) -> Self {
        self.max_results_per_skill = n;
        self
    }

    pub fn with_skill_args(mut self, skill_id: &str, args: serde_json::Value) -> Self {
        self.skill_args.insert(SkillId::new(skill_id), args);
        self
    }

    pub fn with_strategy(mut self, strategy: StrategyKey) -> Self {
        self.strategy = Some(strategy);
        self
    }

    fn validate(&self) -> QuorumResult<()> {
        if self.question_text.trim().is_empty() {
            return Err(QuorumError::InvalidRequest("question text is empty".into()));
        }
        if self.max_results_per_skill == 0 {
            return Err(QuorumError::InvalidRequest(
                "max_results_per_skill must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    fn question(&self) -> Question {
        let mut options = QueryOptions::default().with_max_results_per_skill(self.max_results_per_skill);
        options.skill_args = self.skill_args.clone();

        let mut question = Question::new(&self.question_text).with_options(options);
        if let Some(context) = &self.context_text {
            question = question.with_context(context);
        }
        if let Some(user_id) = &self.user_id {
            question = question.with_user_id(user_id);
        }
        question
    }
}

/// Result of one round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub ranked_results: RankedResult,
    /// One entry per dispatched skill.
    pub per_skill_status: BTreeMap<SkillId, AnswerStatus>,
    pub strategy: StrategyKey,
    /// Present when the learned strategy ran.
    pub prediction: Option<Prediction>,
    pub elapsed_ms: u64,
}

impl QueryResponse {
    /// Turn an empty selection into `EmptySkillSelection` for callers that
    /// want it as an error.
    pub fn ensure_selection(self) -> QuorumResult<Self> {
        if self.ranked_results.outcome == RankOutcome::EmptySelection {
            return Err(QuorumError::EmptySkillSelection);
        }
        Ok(self)
    }
}

pub struct QueryEngine {
    registry: Arc<dyn SkillRegistry>,
    dispatcher: Dispatcher,
    selector: Option<AdaptiveSelector>,
    max_confidence: MaxConfidence,
    weighted_vote: WeightedVote,
    config: EngineConfig,
}

impl QueryEngine {
    pub fn new(
        registry: Arc<dyn SkillRegistry>,
        client: Arc<dyn SkillClient>,
        config: EngineConfig,
    ) -> QuorumResult<Self> {
        config.validate()?;
        Ok(Self {
            registry,
            dispatcher: Dispatcher::new(client, config.dispatch()),
            selector: None,
            max_confidence: MaxConfidence::default(),
            weighted_vote: WeightedVote::default(),
            config,
        })
    }

    /// Engine calling skills over HTTP with the configured retry policy.
    pub fn http(registry: Arc<dyn SkillRegistry>, config: EngineConfig) -> QuorumResult<Self> {
        let client = HttpSkillClient::new(config.retry)?;
        Self::new(registry, Arc::new(client), config)
    }

    pub fn with_selector(mut self, selector: AdaptiveSelector) -> Self {
        self.selector = Some(selector);
        self
    }

    /// Replace the Weighted-Vote used directly and as a learned base.
    pub fn with_weighted_vote(mut self, weighted_vote: WeightedVote) -> Self {
        self.weighted_vote = weighted_vote;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn selector(&self) -> Option<&AdaptiveSelector> {
        self.selector.as_ref()
    }

    pub async fn query(&self, request: QueryRequest) -> QuorumResult<QueryResponse> {
        let started = Instant::now();
        request.validate()?;

        let question = request.question();
        let span = obs::round_span(question.digest().short());
        self.run_round(request, question, started)
            .instrument(span)
            .await
    }

    async fn run_round(
        &self,
        request: QueryRequest,
        question: Question,
        started: Instant,
    ) -> QuorumResult<QueryResponse> {
        let digest = question.digest();
        let requested_strategy = request.strategy.unwrap_or(self.config.default_strategy);

        if request.selected_skill_ids.is_empty() {
            let elapsed_ms = started.elapsed().as_millis() as u64;
            obs::emit_round_finished(digest.short(), RankOutcome::EmptySelection, 0, elapsed_ms);
            return Ok(QueryResponse {
                ranked_results: RankedResult::empty(requested_strategy, RankOutcome::EmptySelection),
                per_skill_status: BTreeMap::new(),
                strategy: requested_strategy,
                prediction: None,
                elapsed_ms,
            });
        }

        METRICS.inc_rounds();
        let catalog = self.registry.snapshot().await?;
        // Skills keep at least the remainder of the round after the lookup budget.
        let deadline = started + self.config.round_deadline;
        let lookup_deadline = started + self.config.prediction_budget();

        let mut session = None;
        let mut prediction = None;
        let mut dispatch_ids = request.selected_skill_ids.clone();

        if requested_strategy == StrategyKey::Learned {
            let available = available_in(&catalog, &request.selected_skill_ids);
            let predicted = match &self.selector {
                Some(selector) => {
                    let mut s = selector.session(&question);
                    let p = s.predict_before(&available, lookup_deadline).await?;
                    session = Some(s);
                    p
                }
                None => Prediction::fallback(
                    &available,
                    FallbackReason::IndexUnavailable {
                        error: "no similarity index configured".into(),
                    },
                ),
            };
            if self.narrows(&predicted) {
                // Unreachable ids stay so they are reported, not silently dropped.
                dispatch_ids = request
                    .selected_skill_ids
                    .iter()
                    .filter(|id| predicted.skill_ids.contains(*id) || !available.contains(*id))
                    .cloned()
                    .collect();
            }
            prediction = Some(predicted);
        }

        obs::emit_round_started(digest.short(), dispatch_ids.len(), requested_strategy.as_str());

        let answers = self
            .dispatcher
            .dispatch(&question, &dispatch_ids, &catalog, deadline)
            .await;

        let strategy = self.strategy_for(requested_strategy, prediction.as_ref());
        let mut ranked = strategy.select(&answers, request.max_results_per_skill);
        ranked.truncate(self.config.max_return_items);

        if self.config.auto_record && ranked.outcome == RankOutcome::Answered {
            match &self.selector {
                Some(selector) => {
                    let applied = match &prediction {
                        Some(p) => p.strategy,
                        None => requested_strategy,
                    };
                    let quality = ranked.top().map(|t| t.score.clamp(0.0, 1.0)).unwrap_or(0.0);
                    let mut keys = vec![ChosenKey::Strategy(applied)];
                    if selector.config().mode.predicts_skills() {
                        if let Some(top) = ranked.top() {
                            keys.extend(top.skill_ids.iter().cloned().map(ChosenKey::Skill));
                        }
                    }
                    for key in keys {
                        let _detached = match session.as_mut() {
                            Some(s) if s.phase() == SelectorPhase::Dispatching => {
                                s.record(key, quality)?
                            }
                            _ => selector.record(question.text(), key, quality),
                        };
                    }
                }
                None => debug!("auto record skipped, no similarity index configured"),
            }
        }

        let elapsed_ms = started.elapsed().as_millis() as u64;
        obs::emit_round_finished(digest.short(), ranked.outcome, ranked.len(), elapsed_ms);

        Ok(QueryResponse {
            per_skill_status: answers.statuses(),
            strategy: strategy.key(),
            ranked_results: ranked,
            prediction,
            elapsed_ms,
        })
    }

    /// Forward an explicit quality label for a past question.
    ///
    /// Returns once the append is scheduled; the handle resolves when it has
    /// been stored or dropped.
    pub fn feedback(
        &self,
        question_text: &str,
        chosen_key: ChosenKey,
        quality: f64,
    ) -> QuorumResult<JoinHandle<()>> {
        let selector = self.selector.as_ref().ok_or_else(|| {
            QuorumError::IndexUnavailable("no similarity index configured".into())
        })?;
        if question_text.trim().is_empty() {
            return Err(QuorumError::InvalidRequest("question text is empty".into()));
        }
        if !quality.is_finite() {
            return Err(QuorumError::InvalidRequest(format!(
                "quality label must be finite, got {quality}"
            )));
        }
        Ok(selector.record(question_text, chosen_key, quality))
    }

    /// Narrowing applies only to skill subsets learned from neighbours.
    fn narrows(&self, prediction: &Prediction) -> bool {
        self.config.narrow_dispatch
            && matches!(prediction.source, PredictionSource::Neighbors { .. })
            && self
                .selector
                .as_ref()
                .is_some_and(|s| s.config().mode.predicts_skills())
    }

    fn strategy_for(&self, key: StrategyKey, prediction: Option<&Prediction>) -> Strategy {
        match (key, prediction) {
            (StrategyKey::Learned, Some(p)) => Strategy::Learned(
                LearnedSelector::new(p.clone())
                    .with_bases(self.max_confidence.clone(), self.weighted_vote.clone()),
            ),
            (StrategyKey::WeightedVote, _) => Strategy::WeightedVote(self.weighted_vote.clone()),
            _ => Strategy::MaxConfidence(self.max_confidence.clone()),
        }
    }
}

/// Requested ids the catalog marks available, first occurrence order.
fn available_in(catalog: &SkillCatalog, requested: &[SkillId]) -> Vec<SkillId> {
    let mut out: Vec<SkillId> = Vec::new();
    for id in requested {
        let usable = catalog.get(id).map(|d| d.available).unwrap_or(false);
        if usable && !out.contains(id) {
            out.push(id.clone());
        }
    }
    out
}
