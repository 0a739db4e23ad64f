use axum::http::StatusCode;
use serde_json::{json, Value};

mod common;

use common::{body_json, get_request, json_request, send};

/// Option id for the target (known) or "unknown" role of the served question
fn option_for(payload: &Value, role: &str) -> String {
    payload["options"]
        .as_array()
        .unwrap()
        .iter()
        .find(|o| o["role"] == role)
        .map(|o| o["id"].as_str().unwrap().to_string())
        .unwrap()
}

// ==================== Health ====================

#[tokio::test]
async fn test_health_root() {
    let app = common::create_test_app().await;

    let response = send(&app, get_request("/health")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["strategy"], "band_probability");
    assert_eq!(body["activeSessions"], 0);
}

#[tokio::test]
async fn test_health_live() {
    let app = common::create_test_app().await;

    let response = send(&app, get_request("/health/live")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "healthy");
}

#[tokio::test]
async fn test_unknown_route_returns_not_found() {
    let app = common::create_test_app().await;

    let response = send(&app, get_request("/api/nothing-here")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "NOT_FOUND");
}

// ==================== Sessions ====================

#[tokio::test]
async fn test_create_session_serves_first_question() {
    let app = common::create_test_app().await;

    let response = send(&app, json_request("POST", "/api/survey/sessions", json!({ "seed": 11 }))).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["mode"], "cold_start");
    let result = &body["data"]["result"];
    assert_eq!(result["status"], "continue");
    assert_eq!(result["payload"]["rank"], 3000);
    assert!(result.get("metrics").is_none());
}

#[tokio::test]
async fn test_session_runs_to_completion() {
    let app = common::create_test_app().await;

    let created = body_json(
        send(&app, json_request("POST", "/api/survey/sessions", json!({ "seed": 5 }))).await,
    )
    .await;
    let session_id = created["data"]["sessionId"].as_str().unwrap().to_string();
    let mut result = created["data"]["result"].clone();
    let step_uri = format!("/api/survey/sessions/{session_id}/step");

    let mut rounds = 0;
    while result["status"] == "continue" {
        rounds += 1;
        assert!(rounds <= 60, "session did not stop");

        let payload = &result["payload"];
        let rank = payload["rank"].as_u64().unwrap();
        let role = if rank <= 4200 { "target" } else { "unknown" };
        let answer = json!({
            "answer": {
                "questionId": payload["questionId"],
                "selectedOptionIds": [option_for(payload, role)],
                "timeTakenMs": 2100
            }
        });

        let response = send(&app, json_request("POST", &step_uri, answer)).await;
        assert_eq!(response.status(), StatusCode::OK);
        result = body_json(response).await["data"].clone();
    }

    assert_eq!(result["status"], "complete");
    let metrics = &result["metrics"];
    assert!(metrics["volume"].as_u64().unwrap() <= 8000);
    assert!(metrics["reach"].as_u64().unwrap() <= 4200);
    let density = metrics["density"].as_f64().unwrap();
    assert!((0.0..=1.0).contains(&density));
    assert_eq!(
        result["detailedHistory"].as_array().unwrap().len() as u64,
        result["debugInfo"]["questionsAsked"].as_u64().unwrap()
    );

    let snapshot = body_json(
        send(&app, get_request(&format!("/api/survey/sessions/{session_id}"))).await,
    )
    .await;
    assert_eq!(snapshot["data"]["complete"], true);
    assert_eq!(snapshot["data"]["state"]["sessionId"], session_id.as_str());
    assert_eq!(snapshot["data"]["diagnostic"]["isHealthy"], true);

    // A finished session keeps returning its final result
    let again = send(&app, json_request("POST", &step_uri, json!({}))).await;
    assert_eq!(again.status(), StatusCode::OK);
    assert_eq!(body_json(again).await["data"]["metrics"], *metrics);
}

#[tokio::test]
async fn test_step_without_answer_repeats_pending_question() {
    let app = common::create_test_app().await;

    let created = body_json(
        send(&app, json_request("POST", "/api/survey/sessions", json!({ "seed": 2 }))).await,
    )
    .await;
    let session_id = created["data"]["sessionId"].as_str().unwrap();
    let first_question = created["data"]["result"]["payload"]["questionId"].clone();

    let response = send(
        &app,
        json_request("POST", &format!("/api/survey/sessions/{session_id}/step"), json!({})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["payload"]["questionId"], first_question);
    assert_eq!(body["data"]["detailedHistory"], json!([]));
}

#[tokio::test]
async fn test_mismatched_answer_is_rejected() {
    let app = common::create_test_app().await;

    let created = body_json(
        send(&app, json_request("POST", "/api/survey/sessions", json!({ "seed": 3 }))).await,
    )
    .await;
    let session_id = created["data"]["sessionId"].as_str().unwrap();

    let answer = json!({
        "answer": {
            "questionId": "not-the-pending-question",
            "selectedOptionIds": ["a"],
            "timeTakenMs": 900
        }
    });
    let response = send(
        &app,
        json_request("POST", &format!("/api/survey/sessions/{session_id}/step"), answer),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "INVALID_ANSWER");

    // The rejected answer left the session untouched
    let snapshot = body_json(
        send(&app, get_request(&format!("/api/survey/sessions/{session_id}"))).await,
    )
    .await;
    assert_eq!(snapshot["data"]["state"]["history"], json!([]));
    assert_eq!(snapshot["data"]["complete"], false);
}

#[tokio::test]
async fn test_unknown_session_returns_not_found() {
    let app = common::create_test_app().await;

    let response = send(
        &app,
        json_request("POST", "/api/survey/sessions/missing/step", json!({})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send(&app, get_request("/api/survey/sessions/missing")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalid_mode_is_rejected() {
    let app = common::create_test_app().await;

    let response = send(
        &app,
        json_request("POST", "/api/survey/sessions", json!({ "mode": "sideways" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_forced_mode_is_honoured() {
    let app = common::create_test_app().await;

    let response = send(
        &app,
        json_request("POST", "/api/survey/sessions", json!({ "mode": "deep_dive", "seed": 9 })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(body_json(response).await["data"]["mode"], "deep_dive");
}

#[tokio::test]
async fn test_delete_session() {
    let app = common::create_test_app().await;

    let created = body_json(
        send(&app, json_request("POST", "/api/survey/sessions", json!({}))).await,
    )
    .await;
    let uri = format!("/api/survey/sessions/{}", created["data"]["sessionId"].as_str().unwrap());

    let delete = axum::http::Request::builder()
        .method("DELETE")
        .uri(&uri)
        .body(axum::body::Body::empty())
        .unwrap();
    assert_eq!(send(&app, delete).await.status(), StatusCode::NO_CONTENT);
    assert_eq!(send(&app, get_request(&uri)).await.status(), StatusCode::NOT_FOUND);
}

// ==================== Prior knowledge ====================

#[tokio::test]
async fn test_learner_with_large_ledger_gets_quick_validation() {
    let app = common::create_test_app_with_ledger("learner-7", 150);

    let response = send(
        &app,
        json_request(
            "POST",
            "/api/survey/sessions",
            json!({ "learnerId": "learner-7", "seed": 4 }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = body_json(response).await;
    assert_eq!(body["data"]["mode"], "quick_validation");
    let debug = &body["data"]["result"]["debugInfo"];
    assert_eq!(debug["priorVerifiedWords"], 150);
    assert!(debug["initialConfidence"].as_f64().unwrap() > 0.0);
}

#[tokio::test]
async fn test_unknown_learner_gets_cold_start() {
    let app = common::create_test_app_with_ledger("learner-7", 150);

    let response = send(
        &app,
        json_request(
            "POST",
            "/api/survey/sessions",
            json!({ "learnerId": "someone-else", "seed": 4 }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(body_json(response).await["data"]["mode"], "cold_start");
}
