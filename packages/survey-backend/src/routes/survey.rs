use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use danci_survey::sanitize::{diagnose_state, StateDiagnostic};
use danci_survey::{AnswerSubmission, SessionStart, SurveyMode, SurveyResult, SurveyState};
use serde::{Deserialize, Serialize};

use crate::response::{ok, AppError};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/sessions", post(create_session))
        .route("/sessions/:sessionId", get(get_session).delete(delete_session))
        .route("/sessions/:sessionId/step", post(step))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct CreateSessionRequest {
    learner_id: Option<String>,
    mode: Option<String>,
    seed: Option<u64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateSessionResponse {
    session_id: String,
    mode: SurveyMode,
    result: SurveyResult,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct StepRequest {
    answer: Option<AnswerSubmission>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionSnapshot {
    state: SurveyState,
    complete: bool,
    diagnostic: StateDiagnostic,
}

/// Start a session and serve its first question
async fn create_session(
    State(state): State<AppState>,
    Json(payload): Json<CreateSessionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let forced_mode = match payload.mode.as_deref() {
        Some(raw) => Some(SurveyMode::parse(raw).ok_or_else(|| {
            AppError::validation(format!(
                "unknown survey mode {raw}; expected cold_start, warm_start, quick_validation or deep_dive"
            ))
        })?),
        None => None,
    };

    let session_id = uuid::Uuid::new_v4().to_string();
    let seed = payload.seed.unwrap_or_else(rand::random::<u64>);
    let mut start = SessionStart::new(session_id.clone(), seed);
    if let Some(mode) = forced_mode {
        start = start.with_mode(mode);
    }

    let engine = state.engine();
    let mut survey = match payload.learner_id.filter(|id| !id.trim().is_empty()) {
        Some(learner_id) => {
            engine.start_for_learner(start.with_learner(learner_id), state.ledger())
        }
        None => engine.start_session(start),
    };

    let result = engine.process_step(&mut survey, None)?;
    let mode = survey.mode;
    state.sessions().insert(survey);

    Ok((
        StatusCode::CREATED,
        ok(CreateSessionResponse {
            session_id,
            mode,
            result,
        }),
    ))
}

/// Submit the answer to the pending question (or re-fetch it with no answer)
async fn step(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(payload): Json<StepRequest>,
) -> Result<impl IntoResponse, AppError> {
    let handle = state
        .sessions()
        .get(&session_id)
        .ok_or_else(|| AppError::not_found(format!("survey session {session_id} not found")))?;

    let mut survey = handle.lock().await;
    let result = state
        .engine()
        .process_step(&mut survey, payload.answer.as_ref())
        .inspect_err(|err| {
            tracing::info!(session_id = %session_id, error = %err, "survey step rejected");
        })?;
    Ok(ok(result))
}

async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let handle = state
        .sessions()
        .get(&session_id)
        .ok_or_else(|| AppError::not_found(format!("survey session {session_id} not found")))?;

    let survey = handle.lock().await.clone();
    let complete = survey.is_complete();
    let diagnostic = diagnose_state(&survey);
    if !diagnostic.is_healthy {
        tracing::warn!(session_id = %session_id, message = %diagnostic.message, "stored session is inconsistent");
    }
    Ok(ok(SessionSnapshot {
        state: survey,
        complete,
        diagnostic,
    }))
}

async fn delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state
        .sessions()
        .remove(&session_id)
        .ok_or_else(|| AppError::not_found(format!("survey session {session_id} not found")))?;
    tracing::info!(session_id = %session_id, "survey session discarded");
    Ok(StatusCode::NO_CONTENT)
}
