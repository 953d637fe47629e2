//! Typed caller for one remote skill.
//!
//! A skill exposes `POST {endpoint}/query` taking a [`SkillRequest`] and
//! answering with a [`SkillResponse`]. The client never raises: every outcome,
//! including transport failures and deadline expiry, becomes a
//! [`CandidateAnswer`] with the matching status.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::domain::{
    CandidateAnswer, QuorumError, QuorumResult, Question, ScoredAnswer, SkillDescriptor, SkillId,
};

/// Request body sent to a skill's query endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillRequest {
    pub question: String,
    pub context: Option<String>,
    pub options: SkillRequestOptions,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

/// Options block of a [`SkillRequest`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillRequestOptions {
    pub max_results: usize,
    pub skill_args: serde_json::Value,
}

impl SkillRequest {
    /// Build the request `skill` receives for `question`.
    pub fn for_skill(skill: &SkillDescriptor, question: &Question) -> Self {
        let options = question.options();
        let max_results = match skill.capabilities.max_results {
            Some(cap) => options.max_results_per_skill.min(cap),
            None => options.max_results_per_skill,
        };
        Self {
            question: question.text().to_string(),
            context: if skill.capabilities.supports_context {
                question.context().map(str::to_string)
            } else {
                None
            },
            options: SkillRequestOptions {
                max_results,
                skill_args: options.args_for(&skill.id),
            },
            user_id: question.user_id().map(str::to_string),
        }
    }
}

/// Response body expected from a skill. Extra fields are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillResponse {
    pub answers: Vec<WireAnswer>,
}

/// One answer as sent by a skill, on the skill's own score scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireAnswer {
    pub text: String,
    pub score: f64,
}

/// Caller for skill endpoints.
///
/// Implementations must return no later than `deadline` (plus scheduling
/// slack) and must not keep state between calls.
#[async_trait]
pub trait SkillClient: Send + Sync {
    /// Ask `skill` the question. Never fails; failures are encoded in the status.
    async fn ask(
        &self,
        skill: &SkillDescriptor,
        question: &Question,
        deadline: Instant,
    ) -> CandidateAnswer;

    /// Whether the skill answers its health probe before `deadline`.
    async fn heartbeat(&self, skill: &SkillDescriptor, deadline: Instant) -> bool;
}

/// Bounded retry for transport failures inside a single call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    #[serde(with = "duration_ms")]
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            backoff: Duration::from_millis(100),
        }
    }
}

impl RetryPolicy {
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            backoff: Duration::ZERO,
        }
    }
}

pub(crate) mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}

/// [`SkillClient`] over HTTP using `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpSkillClient {
    http: reqwest::Client,
    retry: RetryPolicy,
}

impl HttpSkillClient {
    pub fn new(retry: RetryPolicy) -> QuorumResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("quorum-core/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| QuorumError::InvalidConfig(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http, retry })
    }

    /// Build around an existing `reqwest::Client` (shared connection pool).
    pub fn with_client(http: reqwest::Client, retry: RetryPolicy) -> Self {
        Self { http, retry }
    }

    async fn call_once(
        &self,
        skill: &SkillDescriptor,
        body: &SkillRequest,
    ) -> Result<Vec<ScoredAnswer>, CallError> {
        let transport = |reason: String, retryable: bool| CallError {
            error: QuorumError::SkillTransport {
                skill_id: skill.id.clone(),
                reason,
            },
            retryable,
        };
        let malformed = |reason: String| CallError {
            error: QuorumError::SkillMalformedResponse {
                skill_id: skill.id.clone(),
                reason,
            },
            retryable: false,
        };

        let response = self
            .http
            .post(skill.query_url())
            .json(body)
            .send()
            .await
            .map_err(|e| transport(e.to_string(), true))?;

        let status = response.status();
        if !status.is_success() {
            // A rejected request fails the same way on every attempt.
            return Err(transport(format!("HTTP {status}"), status.is_server_error()));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| transport(e.to_string(), true))?;
        let parsed: SkillResponse =
            serde_json::from_slice(&bytes).map_err(|e| malformed(e.to_string()))?;

        parsed
            .answers
            .into_iter()
            .map(|wire| {
                skill
                    .score_scale
                    .normalize(wire.score)
                    .map(|confidence| ScoredAnswer {
                        text: wire.text,
                        confidence,
                    })
                    .ok_or_else(|| malformed(format!("score {} is not usable", wire.score)))
            })
            .collect()
    }
}

/// Failed attempt and whether trying again could change the outcome.
struct CallError {
    error: QuorumError,
    retryable: bool,
}

#[async_trait]
impl SkillClient for HttpSkillClient {
    async fn ask(
        &self,
        skill: &SkillDescriptor,
        question: &Question,
        deadline: Instant,
    ) -> CandidateAnswer {
        let started = Instant::now();
        let body = SkillRequest::for_skill(skill, question);
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            match tokio::time::timeout_at(deadline, self.call_once(skill, &body)).await {
                Err(_) => {
                    debug!(skill_id = %skill.id, attempt, "skill call hit deadline");
                    return CandidateAnswer::timeout(skill.id.clone(), started.elapsed());
                }
                Ok(Ok(answers)) => {
                    return CandidateAnswer::ok(skill.id.clone(), answers, started.elapsed());
                }
                Ok(Err(CallError { error, retryable })) => {
                    let fits = Instant::now() + self.retry.backoff < deadline;
                    if retryable && attempt < self.retry.max_attempts && fits {
                        warn!(skill_id = %skill.id, attempt, error = %error, "retrying skill call");
                        tokio::time::sleep(self.retry.backoff).await;
                        continue;
                    }
                    return CandidateAnswer::failed(skill.id.clone(), error, started.elapsed());
                }
            }
        }
    }

    async fn heartbeat(&self, skill: &SkillDescriptor, deadline: Instant) -> bool {
        let probe = self.http.get(skill.heartbeat_url()).send();
        match tokio::time::timeout_at(deadline, probe).await {
            Ok(Ok(response)) => response.status().is_success(),
            Ok(Err(e)) => {
                debug!(skill_id = %skill.id, error = %e, "heartbeat failed");
                false
            }
            Err(_) => false,
        }
    }
}

/// Error answer for a skill that must not be called.
pub(crate) fn unavailable(skill_id: &SkillId) -> CandidateAnswer {
    CandidateAnswer::failed(
        skill_id.clone(),
        QuorumError::SkillUnavailable {
            skill_id: skill_id.clone(),
        },
        Duration::ZERO,
    )
}
