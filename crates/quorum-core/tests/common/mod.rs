//! Scripted skill client shared by the integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use quorum_core::{
    CandidateAnswer, QuorumError, Question, ScoredAnswer, SkillClient, SkillDescriptor, SkillId,
    StaticSkillRegistry,
};
use tokio::time::Instant;

#[derive(Debug, Clone)]
pub enum Reply {
    Answers(Vec<(String, f64)>),
    Fail(String),
}

#[derive(Debug, Clone)]
struct Script {
    delay: Duration,
    reply: Reply,
}

/// Answers from a fixed script after a fixed delay.
///
/// With `honor_deadline` off the client ignores the deadline entirely, so the
/// dispatcher's own cut-off is what ends the round.
#[derive(Default)]
pub struct ScriptedClient {
    scripts: HashMap<SkillId, Script>,
    down: HashSet<SkillId>,
    ignore_deadline: bool,
    calls: Mutex<Vec<SkillId>>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answer(mut self, skill: &str, delay_ms: u64, answers: &[(&str, f64)]) -> Self {
        self.scripts.insert(
            SkillId::new(skill),
            Script {
                delay: Duration::from_millis(delay_ms),
                reply: Reply::Answers(answers.iter().map(|(t, c)| (t.to_string(), *c)).collect()),
            },
        );
        self
    }

    pub fn fail(mut self, skill: &str, delay_ms: u64, reason: &str) -> Self {
        self.scripts.insert(
            SkillId::new(skill),
            Script {
                delay: Duration::from_millis(delay_ms),
                reply: Reply::Fail(reason.to_string()),
            },
        );
        self
    }

    pub fn down(mut self, skill: &str) -> Self {
        self.down.insert(SkillId::new(skill));
        self
    }

    pub fn ignoring_deadline(mut self) -> Self {
        self.ignore_deadline = true;
        self
    }

    pub fn calls(&self) -> Vec<SkillId> {
        self.calls.lock().unwrap().clone()
    }

    async fn reply(&self, skill: &SkillDescriptor, started: Instant) -> CandidateAnswer {
        let Some(script) = self.scripts.get(&skill.id) else {
            return CandidateAnswer::failed(
                skill.id.clone(),
                QuorumError::SkillTransport {
                    skill_id: skill.id.clone(),
                    reason: "connection refused".into(),
                },
                started.elapsed(),
            );
        };
        tokio::time::sleep(script.delay).await;
        match &script.reply {
            Reply::Answers(answers) => CandidateAnswer::ok(
                skill.id.clone(),
                answers
                    .iter()
                    .map(|(t, c)| ScoredAnswer::new(t, *c))
                    .collect(),
                started.elapsed(),
            ),
            Reply::Fail(reason) => CandidateAnswer::failed(
                skill.id.clone(),
                QuorumError::SkillTransport {
                    skill_id: skill.id.clone(),
                    reason: reason.clone(),
                },
                started.elapsed(),
            ),
        }
    }
}

#[async_trait]
impl SkillClient for ScriptedClient {
    async fn ask(
        &self,
        skill: &SkillDescriptor,
        _question: &Question,
        deadline: Instant,
    ) -> CandidateAnswer {
        self.calls.lock().unwrap().push(skill.id.clone());
        let started = Instant::now();
        if self.ignore_deadline {
            return self.reply(skill, started).await;
        }
        match tokio::time::timeout_at(deadline, self.reply(skill, started)).await {
            Ok(answer) => answer,
            Err(_) => CandidateAnswer::timeout(skill.id.clone(), started.elapsed()),
        }
    }

    async fn heartbeat(&self, skill: &SkillDescriptor, _deadline: Instant) -> bool {
        !self.down.contains(&skill.id)
    }
}

pub fn registry(ids: &[&str]) -> Arc<StaticSkillRegistry> {
    Arc::new(StaticSkillRegistry::new(
        ids.iter()
            .map(|id| SkillDescriptor::new(id, &format!("http://{id}.skills.local"))),
    ))
}

pub fn ids(raw: &[&str]) -> Vec<SkillId> {
    raw.iter().map(|s| SkillId::new(s)).collect()
}
