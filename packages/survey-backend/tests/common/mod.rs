use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use chrono::{Duration, Utc};
use danci_survey::simulation::synthetic_engine;
use danci_survey::{SurveyConfig, VerifiedWord};
use danci_survey_backend::config::Config;
use danci_survey_backend::prior::InMemoryLedger;
use danci_survey_backend::state::AppState;
use danci_survey_backend::{create_app, create_router};
use serde_json::Value;
use tower::ServiceExt;

/// Synthetic content, empty ledger
pub async fn create_test_app() -> Router {
    create_app(&Config::default())
        .await
        .expect("default config builds an app")
}

/// Synthetic content with `learner_id` holding `count` recent verified words
pub fn create_test_app_with_ledger(learner_id: &str, count: usize) -> Router {
    let now = Utc::now();
    let words = (0..count)
        .map(|i| VerifiedWord {
            word_id: format!("w{i}"),
            tier: (i % 8) as u32 + 1,
            verified_at: now - Duration::days(2),
            passed: i % 8 < 5,
        })
        .collect();
    let ledger = InMemoryLedger::new().with_learner(learner_id, words);
    let engine = synthetic_engine(SurveyConfig::default()).expect("default config is valid");
    create_router(AppState::new(engine, Arc::new(ledger)))
}

pub fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
