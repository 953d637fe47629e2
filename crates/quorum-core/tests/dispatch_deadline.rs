//! Dispatcher round tests on tokio's paused clock.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{ids, ScriptedClient};
use quorum_core::{
    refresh_availability, AnswerStatus, DispatchConfig, Dispatcher, MaxConfidence, QuorumError,
    Question, SkillCatalog, SkillDescriptor, SkillId, VotingStrategy,
};
use tokio::time::Instant;

fn catalog(raw: &[&str]) -> SkillCatalog {
    SkillCatalog::new(
        raw.iter()
            .map(|id| SkillDescriptor::new(id, &format!("http://{id}"))),
    )
}

fn abc_client() -> ScriptedClient {
    ScriptedClient::new()
        .answer("A", 300, &[("Paris", 0.9)])
        .answer("B", 10_000, &[("Rome", 0.99)])
        .answer("C", 800, &[("Paris, France", 0.7)])
}

#[tokio::test(start_paused = true)]
async fn slow_skill_times_out_at_global_deadline() {
    for client in [abc_client(), abc_client().ignoring_deadline()] {
        let dispatcher = Dispatcher::new(Arc::new(client), DispatchConfig::default());
        let skills = ids(&["A", "B", "C"]);

        let started = Instant::now();
        let deadline = started + Duration::from_secs(2);
        let answers = dispatcher
            .dispatch(&Question::new("capital of France?"), &skills, &catalog(&["A", "B", "C"]), deadline)
            .await;
        let waited = started.elapsed();

        assert!(waited <= Duration::from_secs(2) + Duration::from_millis(10), "{waited:?}");
        assert_eq!(answers.len(), skills.len());
        assert_eq!(answers.skill_ids(), skills);

        let a = answers.get(&SkillId::new("A")).unwrap();
        assert_eq!(a.status(), AnswerStatus::Ok);
        assert_eq!(a.answers()[0].confidence, 0.9);

        let b = answers.get(&SkillId::new("B")).unwrap();
        assert_eq!(b.status(), AnswerStatus::Timeout);
        assert!(b.answers().is_empty());
        assert!(matches!(b.failure(), Some(QuorumError::SkillTimeout { .. })));

        assert_eq!(
            answers.get(&SkillId::new("C")).unwrap().status(),
            AnswerStatus::Ok
        );

        let ranked = MaxConfidence::new().select(&answers, 1);
        let top: Vec<(&str, f64)> = ranked
            .entries
            .iter()
            .map(|e| (e.skill_ids[0].as_str(), e.score))
            .collect();
        assert_eq!(top, vec![("A", 0.9), ("C", 0.7)]);
    }
}

#[tokio::test(start_paused = true)]
async fn order_follows_request_not_completion() {
    let client = ScriptedClient::new()
        .answer("slow", 900, &[("x", 0.5)])
        .answer("fast", 10, &[("y", 0.5)])
        .answer("mid", 400, &[("z", 0.5)]);
    let dispatcher = Dispatcher::new(Arc::new(client), DispatchConfig::default());
    let skills = ids(&["slow", "fast", "mid"]);

    let answers = dispatcher
        .dispatch(
            &Question::new("q"),
            &skills,
            &catalog(&["slow", "fast", "mid"]),
            Instant::now() + Duration::from_secs(5),
        )
        .await;
    assert_eq!(answers.skill_ids(), skills);
}

#[tokio::test(start_paused = true)]
async fn every_requested_skill_gets_exactly_one_entry() {
    let client = ScriptedClient::new()
        .answer("ok", 10, &[("fine", 0.8)])
        .fail("broken", 20, "HTTP 503")
        .answer("slow", 60_000, &[("late", 1.0)]);
    let dispatcher = Dispatcher::new(Arc::new(client), DispatchConfig { max_concurrent: 2 });
    let mut cat = catalog(&["ok", "broken", "slow"]);
    cat = SkillCatalog::new(
        cat.descriptors()
            .cloned()
            .chain([SkillDescriptor::new("parked", "http://parked").unavailable()]),
    );

    let requested = ids(&["ok", "broken", "slow", "parked", "unknown", "ok"]);
    let answers = dispatcher
        .dispatch(
            &Question::new("q"),
            &requested,
            &cat,
            Instant::now() + Duration::from_secs(1),
        )
        .await;

    assert_eq!(answers.len(), 5);
    let statuses = answers.statuses();
    assert_eq!(statuses[&SkillId::new("ok")], AnswerStatus::Ok);
    assert_eq!(statuses[&SkillId::new("broken")], AnswerStatus::Error);
    assert_eq!(statuses[&SkillId::new("slow")], AnswerStatus::Timeout);
    assert_eq!(statuses[&SkillId::new("parked")], AnswerStatus::Error);
    assert!(matches!(
        answers.get(&SkillId::new("unknown")).unwrap().failure(),
        Some(QuorumError::SkillUnavailable { .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn unavailable_skills_are_never_called() {
    let client = Arc::new(
        ScriptedClient::new()
            .answer("a", 10, &[("x", 0.5)])
            .answer("b", 10, &[("y", 0.5)])
            .down("b"),
    );
    let deadline = Instant::now() + Duration::from_secs(1);
    let refreshed = refresh_availability(client.clone(), &catalog(&["a", "b"]), deadline).await;
    assert_eq!(refreshed.available_ids(), ids(&["a"]));

    let dispatcher = Dispatcher::new(client.clone(), DispatchConfig::default());
    let answers = dispatcher
        .dispatch(&Question::new("q"), &ids(&["a", "b"]), &refreshed, deadline)
        .await;
    assert_eq!(answers.len(), 2);
    assert_eq!(client.calls(), ids(&["a"]));
}

#[tokio::test(start_paused = true)]
async fn all_failures_still_complete_the_round() {
    let client = ScriptedClient::new()
        .fail("a", 5, "connection reset")
        .answer("b", 5_000, &[("late", 0.9)]);
    let dispatcher = Dispatcher::new(Arc::new(client), DispatchConfig::default());
    let answers = dispatcher
        .dispatch(
            &Question::new("q"),
            &ids(&["a", "b"]),
            &catalog(&["a", "b"]),
            Instant::now() + Duration::from_millis(100),
        )
        .await;
    assert!(answers.has_no_answers());

    let ranked = MaxConfidence::new().select(&answers, 3);
    assert!(ranked.is_empty());
    assert_eq!(ranked.outcome, quorum_core::RankOutcome::NoAnswerAvailable);
}
