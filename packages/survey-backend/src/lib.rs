//! HTTP surface for the vocabulary survey engine.
//!
//! Sessions live in memory; each request drives one round of
//! [`danci_survey::SurveyEngine::process_step`] against the stored state.

pub mod config;
pub mod content;
pub mod logging;
pub mod prior;
pub mod response;
pub mod routes;
pub mod sessions;
pub mod state;

use std::sync::Arc;

use axum::Router;
use danci_survey::{SurveyEngine, SurveyError};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::Config;
use crate::content::{load_content, WordBankError};
use crate::prior::{load_ledger, LedgerError};
use crate::state::AppState;

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("word bank: {0}")]
    WordBank(#[from] WordBankError),
    #[error("prior knowledge ledger: {0}")]
    Ledger(#[from] LedgerError),
    #[error("survey engine: {0}")]
    Engine(#[from] SurveyError),
}

pub async fn build_state(config: &Config) -> Result<AppState, StartupError> {
    let content = load_content(
        config.word_bank_path.as_deref(),
        config.question_time_limit_ms,
    )
    .await?;
    let ledger = load_ledger(config.prior_ledger_path.as_deref()).await?;
    tracing::info!(
        learners = ledger.learner_count(),
        strategy = config.survey.strategy.as_str(),
        "survey state initialized"
    );

    let engine = SurveyEngine::new(config.survey.clone(), content)?;
    Ok(AppState::new(engine, Arc::new(ledger)))
}

pub fn create_router(state: AppState) -> Router {
    routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

pub async fn create_app(config: &Config) -> Result<Router, StartupError> {
    Ok(create_router(build_state(config).await?))
}
