//! `HttpSkillClient` against fake skill servers built with axum.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use quorum_core::{
    AnswerStatus, HttpSkillClient, QueryOptions, QuorumError, Question, RetryPolicy, ScoreScale,
    SkillClient, SkillDescriptor, SkillRequest,
};
use serde_json::{json, Value};
use tokio::time::Instant;

async fn spawn_skill(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

fn client() -> HttpSkillClient {
    HttpSkillClient::new(RetryPolicy {
        max_attempts: 2,
        backoff: Duration::from_millis(20),
    })
    .unwrap()
}

fn in_secs(secs: u64) -> Instant {
    Instant::now() + Duration::from_secs(secs)
}

#[tokio::test]
async fn ok_response_is_normalized_and_sorted() {
    async fn query(Json(request): Json<SkillRequest>) -> Json<Value> {
        let tag = request.options.skill_args["tag"].as_str().unwrap_or("none").to_string();
        Json(json!({
            "answers": [
                {"text": "Lyon", "score": 20.0},
                {"text": format!("Paris ({tag})"), "score": 80.0, "span": [0, 5]},
            ],
            "model": "extractive-v2",
        }))
    }
    let base = spawn_skill(Router::new().route("/query", post(query))).await;
    let skill = SkillDescriptor::new("geo", &base).with_score_scale(ScoreScale::Max(100.0));
    let question = Question::new("capital of France?").with_options(
        QueryOptions::default().with_skill_args("geo", json!({"tag": "wiki"})),
    );

    let answer = client().ask(&skill, &question, in_secs(5)).await;

    assert_eq!(answer.status(), AnswerStatus::Ok);
    assert_eq!(answer.answers()[0].text, "Paris (wiki)");
    assert_eq!(answer.answers()[0].confidence, 0.8);
    assert_eq!(answer.answers()[1].confidence, 0.2);
}

#[tokio::test]
async fn server_error_is_retried_then_reported() {
    async fn query(State(hits): State<Arc<AtomicUsize>>) -> StatusCode {
        hits.fetch_add(1, Ordering::SeqCst);
        StatusCode::INTERNAL_SERVER_ERROR
    }
    let hits = Arc::new(AtomicUsize::new(0));
    let base = spawn_skill(
        Router::new()
            .route("/query", post(query))
            .with_state(hits.clone()),
    )
    .await;

    let answer = client()
        .ask(&SkillDescriptor::new("flaky", &base), &Question::new("q"), in_secs(5))
        .await;

    assert_eq!(answer.status(), AnswerStatus::Error);
    assert!(matches!(answer.failure(), Some(QuorumError::SkillTransport { .. })));
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn malformed_body_is_not_retried() {
    async fn query(State(hits): State<Arc<AtomicUsize>>) -> Json<Value> {
        hits.fetch_add(1, Ordering::SeqCst);
        Json(json!({"answer": "Paris"}))
    }
    let hits = Arc::new(AtomicUsize::new(0));
    let base = spawn_skill(
        Router::new()
            .route("/query", post(query))
            .with_state(hits.clone()),
    )
    .await;

    let answer = client()
        .ask(&SkillDescriptor::new("odd", &base), &Question::new("q"), in_secs(5))
        .await;

    assert_eq!(answer.status(), AnswerStatus::Error);
    assert!(matches!(
        answer.failure(),
        Some(QuorumError::SkillMalformedResponse { .. })
    ));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn client_error_is_reported_without_retry() {
    async fn query(State(hits): State<Arc<AtomicUsize>>) -> StatusCode {
        hits.fetch_add(1, Ordering::SeqCst);
        StatusCode::BAD_REQUEST
    }
    let hits = Arc::new(AtomicUsize::new(0));
    let base = spawn_skill(
        Router::new()
            .route("/query", post(query))
            .with_state(hits.clone()),
    )
    .await;

    let answer = client()
        .ask(&SkillDescriptor::new("strict", &base), &Question::new("q"), in_secs(5))
        .await;

    assert_eq!(answer.status(), AnswerStatus::Error);
    assert!(matches!(answer.failure(), Some(QuorumError::SkillTransport { .. })));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn score_on_unusable_scale_is_malformed() {
    async fn query() -> Json<Value> {
        Json(json!({"answers": [{"text": "Paris", "score": 3.0}]}))
    }
    let base = spawn_skill(Router::new().route("/query", post(query))).await;

    let answer = client()
        .ask(
            &SkillDescriptor::new("zero-max", &base).with_score_scale(ScoreScale::Max(0.0)),
            &Question::new("q"),
            in_secs(5),
        )
        .await;
    assert!(matches!(
        answer.failure(),
        Some(QuorumError::SkillMalformedResponse { .. })
    ));
}

#[tokio::test]
async fn slow_skill_returns_timeout_at_deadline() {
    async fn query() -> Json<Value> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Json(json!({"answers": []}))
    }
    let base = spawn_skill(Router::new().route("/query", post(query))).await;

    let started = Instant::now();
    let answer = client()
        .ask(
            &SkillDescriptor::new("slow", &base),
            &Question::new("q"),
            Instant::now() + Duration::from_millis(200),
        )
        .await;

    assert_eq!(answer.status(), AnswerStatus::Timeout);
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn unreachable_skill_is_transport_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let answer = HttpSkillClient::new(RetryPolicy::no_retry())
        .unwrap()
        .ask(
            &SkillDescriptor::new("gone", &format!("http://{addr}")),
            &Question::new("q"),
            in_secs(5),
        )
        .await;
    assert_eq!(answer.status(), AnswerStatus::Error);
    assert!(matches!(answer.failure(), Some(QuorumError::SkillTransport { .. })));
}

#[tokio::test]
async fn heartbeat_reflects_health_endpoint() {
    let up = spawn_skill(Router::new().route("/health/heartbeat", get(|| async { "ok" }))).await;
    let no_probe = spawn_skill(Router::new()).await;
    let client = client();

    assert!(client.heartbeat(&SkillDescriptor::new("up", &up), in_secs(5)).await);
    assert!(
        !client
            .heartbeat(&SkillDescriptor::new("no-probe", &no_probe), in_secs(5))
            .await
    );
}
