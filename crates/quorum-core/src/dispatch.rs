//! Deadline-bounded fan-out of one question to many skills.
//!
//! Each skill call runs in its own tokio task; a semaphore bounds how many run
//! at once. The round ends when every call has returned or the global
//! deadline passes, whichever comes first. Calls still running at the
//! deadline are aborted and recorded as `timeout`; anything they would have
//! produced later is discarded.
//!
//! The resulting [`AnswerSet`] is ordered by the requested skill ids, never
//! by completion order.

use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::Semaphore;
use tokio::time::Instant;
use tracing::{instrument, warn, Instrument};

use crate::domain::{AnswerSet, CandidateAnswer, QuorumError, Question, SkillId};
use crate::metrics::METRICS;
use crate::obs;
use crate::registry::SkillCatalog;
use crate::skill_client::{self, SkillClient};

/// Configuration for a dispatch round.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Maximum number of concurrent skill calls.
    pub max_concurrent: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self { max_concurrent: 16 }
    }
}

/// Fans questions out to skills through a shared [`SkillClient`].
pub struct Dispatcher {
    client: Arc<dyn SkillClient>,
    config: DispatchConfig,
}

impl Dispatcher {
    pub fn new(client: Arc<dyn SkillClient>, config: DispatchConfig) -> Self {
        Self { client, config }
    }

    pub fn client(&self) -> Arc<dyn SkillClient> {
        Arc::clone(&self.client)
    }

    /// Ask every skill in `skill_ids` and collect one entry per distinct id.
    ///
    /// Ids missing from `catalog` or flagged unavailable get an `error` entry
    /// without a network call. Duplicate ids keep their first position.
    /// Never fails: per-skill failures live on the entries.
    #[instrument(skip_all, fields(skills = skill_ids.len()))]
    pub async fn dispatch(
        &self,
        question: &Question,
        skill_ids: &[SkillId],
        catalog: &SkillCatalog,
        deadline: Instant,
    ) -> AnswerSet {
        let started = Instant::now();
        let ordered = dedupe(skill_ids);
        let mut slots: Vec<Option<CandidateAnswer>> = vec![None; ordered.len()];

        let question = Arc::new(question.clone());
        let sem = Arc::new(Semaphore::new(self.config.max_concurrent.max(1)));
        let mut aborts = Vec::new();
        let mut pending = FuturesUnordered::new();

        for (idx, skill_id) in ordered.iter().enumerate() {
            let skill = match catalog.get(skill_id) {
                Some(skill) if skill.available => skill.clone(),
                _ => {
                    slots[idx] = Some(skill_client::unavailable(skill_id));
                    continue;
                }
            };

            let client = Arc::clone(&self.client);
            let question = Arc::clone(&question);
            let sem = Arc::clone(&sem);

            let task = tokio::spawn(
                async move {
                    let _permit = sem.acquire_owned().await.ok();
                    client.ask(&skill, &question, deadline).await
                }
                .in_current_span(),
            );

            aborts.push(task.abort_handle());
            pending.push(async move { (idx, task.await) });
        }

        let expired = tokio::time::sleep_until(deadline);
        tokio::pin!(expired);

        while !pending.is_empty() {
            tokio::select! {
                biased;
                Some((idx, joined)) = pending.next() => {
                    let skill_id = &ordered[idx];
                    slots[idx] = Some(match joined {
                        Ok(answer) if answer.skill_id() == skill_id => answer,
                        Ok(answer) => CandidateAnswer::failed(
                            skill_id.clone(),
                            QuorumError::SkillMalformedResponse {
                                skill_id: skill_id.clone(),
                                reason: format!("answer attributed to {}", answer.skill_id()),
                            },
                            answer.latency(),
                        ),
                        Err(e) => {
                            warn!(skill_id = %skill_id, error = %e, "skill task did not complete");
                            CandidateAnswer::failed(
                                skill_id.clone(),
                                QuorumError::SkillTransport {
                                    skill_id: skill_id.clone(),
                                    reason: format!("skill task failed: {e}"),
                                },
                                started.elapsed(),
                            )
                        }
                    });
                }
                _ = &mut expired => break,
            }
        }

        // Late results are dropped with their tasks.
        for abort in aborts {
            abort.abort();
        }

        let waited = deadline.saturating_duration_since(started);
        let mut answers = AnswerSet::new();
        for (skill_id, slot) in ordered.into_iter().zip(slots) {
            let answer = slot.unwrap_or_else(|| CandidateAnswer::timeout(skill_id, waited));
            METRICS.inc_skill_status(answer.status());
            obs::emit_skill_completed(answer.skill_id(), answer.status(), answer.latency());
            if let Err(e) = answers.insert(answer) {
                warn!(error = %e, "dropping duplicate answer");
            }
        }
        answers
    }
}

fn dedupe(skill_ids: &[SkillId]) -> Vec<SkillId> {
    let mut seen = std::collections::HashSet::new();
    let mut ordered = Vec::with_capacity(skill_ids.len());
    for id in skill_ids {
        if seen.insert(id) {
            ordered.push(id.clone());
        } else {
            warn!(skill_id = %id, "skill requested twice, keeping first position");
        }
    }
    ordered
}
