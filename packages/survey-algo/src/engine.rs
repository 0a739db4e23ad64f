//! Survey Engine
//!
//! Orchestrates one round per `process_step` call on a caller-owned
//! [`SurveyState`]:
//!
//! 1. score the submitted answer against the pending question
//! 2. heal the state (see [`crate::sanitize`])
//! 3. record the answer and update bounds and bands through the configured strategy
//! 4. stop with final metrics, or select the next rank and fetch its question
//!
//! The engine keeps no session data and is shared across sessions behind an
//! `Arc`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::band::{band_index, clamp_rank};
use crate::config::{StrategyKind, SurveyConfig};
use crate::content::ContentProvider;
use crate::error::SurveyError;
use crate::evaluator::evaluate_answer;
use crate::sanitize::heal_state;
use crate::strategy::{build_strategy, SurveyStrategy};
use crate::types::{
    AnswerSubmission, HistoryEntry, QuestionPayload, SurveyMode, SurveyResult, SurveyState,
    SurveyStatus, TriMetricReport, BAND_COUNT, BAND_WIDTH,
};
use crate::warm_start::{
    estimate_reach_from_prior, initial_confidence, load_prior_knowledge, select_priority_bands,
    select_survey_mode, warm_start_band_performance, PriorKnowledge, PriorKnowledgeSource,
};

/// Mixes the round index into the session seed
const ROUND_SEED_MIX: u64 = 0x9E37_79B9_7F4A_7C15;

/// Parameters for a new session
#[derive(Debug, Clone)]
pub struct SessionStart {
    pub session_id: String,
    pub learner_id: Option<String>,
    pub prior: Option<PriorKnowledge>,
    pub forced_mode: Option<SurveyMode>,
    pub seed: u64,
    pub now: DateTime<Utc>,
}

impl SessionStart {
    pub fn new(session_id: impl Into<String>, seed: u64) -> Self {
        Self {
            session_id: session_id.into(),
            learner_id: None,
            prior: None,
            forced_mode: None,
            seed,
            now: Utc::now(),
        }
    }

    pub fn with_learner(mut self, learner_id: impl Into<String>) -> Self {
        self.learner_id = Some(learner_id.into());
        self
    }

    pub fn with_prior(mut self, prior: PriorKnowledge) -> Self {
        self.prior = Some(prior);
        self
    }

    pub fn with_mode(mut self, mode: SurveyMode) -> Self {
        self.forced_mode = Some(mode);
        self
    }

    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }
}

pub struct SurveyEngine {
    config: SurveyConfig,
    strategy: Box<dyn SurveyStrategy>,
    content: Arc<dyn ContentProvider>,
}

impl SurveyEngine {
    pub fn new(config: SurveyConfig, content: Arc<dyn ContentProvider>) -> Result<Self, SurveyError> {
        let strategy = build_strategy(&config);
        Self::with_strategy(config, strategy, content)
    }

    pub fn with_strategy(
        config: SurveyConfig,
        strategy: Box<dyn SurveyStrategy>,
        content: Arc<dyn ContentProvider>,
    ) -> Result<Self, SurveyError> {
        config.validate()?;
        Ok(Self {
            config,
            strategy,
            content,
        })
    }

    pub fn config(&self) -> &SurveyConfig {
        &self.config
    }

    pub fn strategy_kind(&self) -> StrategyKind {
        self.strategy.kind()
    }

    // ==================== Session start ====================

    /// Build the initial state: mode, stopping rule, warm-start seeding and
    /// the first rank.
    pub fn start_session(&self, start: SessionStart) -> SurveyState {
        let ws = &self.config.warm_start;
        let prior = start.prior.filter(|p| !p.is_empty());
        let mode = select_survey_mode(prior.as_ref(), start.forced_mode, ws);
        let stopping = self.config.stopping.for_mode(mode);

        let reach = prior.as_ref().and_then(|p| estimate_reach_from_prior(p, ws));
        let start_rank = reach.unwrap_or(self.config.cold_start_rank);

        let mut state = SurveyState::new(
            start.session_id,
            self.strategy.kind(),
            mode,
            stopping,
            start_rank,
            start.seed,
        );
        state.learner_id = start.learner_id;

        if let Some(prior) = prior.as_ref() {
            state.band_performance = warm_start_band_performance(prior, start.now, ws);
            let anchor = reach.unwrap_or(self.config.cold_start_rank);
            for entry in select_priority_bands(prior, anchor, start.now, ws) {
                state.band_priority[band_index(entry.band)] = entry.level as u8;
            }
            state.initial_confidence = initial_confidence(prior, start.now, ws);
            state.confidence = state.initial_confidence;
            state.prior_verified_words = prior.total_verified;
        } else {
            // nothing known: every band is untested
            state.band_priority = [3; BAND_COUNT];
        }

        tracing::info!(
            session_id = %state.session_id,
            mode = mode.as_str(),
            strategy = state.strategy.as_str(),
            start_rank = state.current_rank,
            prior_words = state.prior_verified_words,
            initial_confidence = state.initial_confidence,
            "survey session started"
        );
        state
    }

    /// Like [`start_session`](Self::start_session), loading the learner's
    /// prior knowledge from `source` first. A failing source degrades to a
    /// cold start.
    pub fn start_for_learner(
        &self,
        mut start: SessionStart,
        source: &dyn PriorKnowledgeSource,
    ) -> SurveyState {
        if let Some(learner_id) = start.learner_id.as_deref() {
            match load_prior_knowledge(source, learner_id) {
                Ok(prior) => start.prior = Some(prior),
                Err(e) => {
                    tracing::warn!(
                        session_id = %start.session_id,
                        learner_id,
                        error = %e,
                        "prior knowledge unavailable, falling back to cold start"
                    );
                    start.prior = None;
                }
            }
        }
        self.start_session(start)
    }

    // ==================== Rounds ====================

    /// Run one round. With `answer == None` the first question is served, or
    /// the pending one is served again.
    pub fn process_step(
        &self,
        state: &mut SurveyState,
        answer: Option<&AnswerSubmission>,
    ) -> Result<SurveyResult, SurveyError> {
        if state.strategy != self.strategy.kind() {
            return Err(SurveyError::InvalidConfig(format!(
                "session uses strategy {}, engine runs {}",
                state.strategy.as_str(),
                self.strategy.kind().as_str()
            )));
        }

        if let Some(metrics) = state.final_metrics {
            return Ok(self.build_result(state, SurveyStatus::Complete, None, Some(metrics)));
        }

        // a rejected answer must leave the state exactly as it was
        let scored = match answer {
            Some(submission) => Some((submission, score_pending(state, submission)?)),
            None => None,
        };

        let repairs = heal_state(state);
        state.anomalies.extend(repairs);

        match scored {
            Some((submission, correct)) => self.record_answer(state, submission, correct),
            None => {
                if let Some(pending) = state.pending.clone() {
                    return Ok(self.build_result(
                        state,
                        SurveyStatus::Continue,
                        Some(pending),
                        None,
                    ));
                }
            }
        }

        if self.strategy.should_stop(state) {
            let metrics = self.strategy.compute_metrics(state);
            state.final_metrics = Some(metrics);
            state.estimated_vocab = metrics.volume;
            tracing::info!(
                session_id = %state.session_id,
                questions = state.questions_asked(),
                confidence = state.confidence,
                volume = metrics.volume,
                reach = metrics.reach,
                density = metrics.density,
                "survey complete"
            );
            return Ok(self.build_result(state, SurveyStatus::Complete, None, Some(metrics)));
        }

        let mut rng = round_rng(state);
        let rank = self.strategy.select_next_rank(state, &mut rng);
        let payload = self.fetch_question(state, rank)?;

        state.current_rank =
            clamp_rank(payload.rank as i64).clamp(state.low_bound, state.high_bound);
        state.pending = Some(payload.clone());
        Ok(self.build_result(state, SurveyStatus::Continue, Some(payload), None))
    }

    /// Fold an already scored answer into the state
    fn record_answer(&self, state: &mut SurveyState, submission: &AnswerSubmission, correct: bool) {
        let rank = state
            .pending
            .take()
            .map_or(state.current_rank, |pending| clamp_rank(pending.rank as i64));

        state
            .history
            .push(HistoryEntry::new(rank, correct, submission.time_taken_ms));
        self.strategy.update_on_answer(state, rank, correct);

        state.current_rank = state.current_rank.clamp(state.low_bound, state.high_bound);
        state.confidence = self.strategy.confidence(state).clamp(0.0, 1.0);
        state.estimated_vocab = self.strategy.compute_metrics(state).volume;

        tracing::debug!(
            session_id = %state.session_id,
            rank,
            correct,
            low = state.low_bound,
            high = state.high_bound,
            confidence = state.confidence,
            "answer recorded"
        );
    }

    /// Ask for a question at `rank`, falling back to adjacent bands and then
    /// the bounds themselves when nothing is available. A question for the
    /// word asked in the previous round is only served when nothing else is.
    fn fetch_question(&self, state: &SurveyState, rank: u32) -> Result<QuestionPayload, SurveyError> {
        let (low, high) = (state.low_bound, state.high_bound);
        let previous = state.last_entry().map(|e| e.rank);
        let mut tried: Vec<u32> = Vec::with_capacity(self.config.max_content_retries + 3);
        let mut repeat: Option<QuestionPayload> = None;

        let mut candidates = vec![rank];
        for step in 1..=self.config.max_content_retries.div_ceil(2) as i64 {
            let offset = step * BAND_WIDTH as i64;
            candidates.push(clamp_rank(rank as i64 + offset).clamp(low, high));
            candidates.push(clamp_rank(rank as i64 - offset).clamp(low, high));
        }
        candidates.truncate(self.config.max_content_retries + 1);
        candidates.extend([low, high]);

        for candidate in candidates {
            if tried.contains(&candidate) {
                continue;
            }
            tried.push(candidate);

            match self.content.get_question(candidate) {
                Ok(payload) if payload.is_well_formed() && Some(payload.rank) == previous => {
                    repeat.get_or_insert(payload);
                }
                Ok(payload) if payload.is_well_formed() => {
                    if candidate != rank {
                        tracing::debug!(
                            session_id = %state.session_id,
                            requested = rank,
                            served = payload.rank,
                            "served question from adjacent rank"
                        );
                    }
                    return Ok(payload);
                }
                Ok(payload) => {
                    tracing::warn!(
                        session_id = %state.session_id,
                        rank = candidate,
                        question_id = %payload.question_id,
                        "content provider returned a malformed question"
                    );
                }
                Err(SurveyError::ContentUnavailable { .. }) => {}
                Err(e) => return Err(e),
            }
        }

        if let Some(payload) = repeat {
            tracing::debug!(
                session_id = %state.session_id,
                rank = payload.rank,
                "only the previous word is available, asking it again"
            );
            return Ok(payload);
        }

        tracing::warn!(
            session_id = %state.session_id,
            rank,
            tried = ?tried,
            "no content available near requested rank"
        );
        Err(SurveyError::SurveyAborted(format!(
            "no question available near rank {rank}"
        )))
    }

    fn build_result(
        &self,
        state: &SurveyState,
        status: SurveyStatus,
        payload: Option<QuestionPayload>,
        metrics: Option<TriMetricReport>,
    ) -> SurveyResult {
        SurveyResult {
            status,
            payload,
            metrics,
            detailed_history: state.history.clone(),
            methodology: self.strategy.methodology(),
            debug_info: state.debug_info(),
        }
    }
}

/// Score `submission` against the pending question without touching the state
fn score_pending(state: &SurveyState, submission: &AnswerSubmission) -> Result<bool, SurveyError> {
    let pending = state.pending.as_ref().ok_or_else(|| {
        SurveyError::InvalidAnswer("no question is pending for this session".to_string())
    })?;
    evaluate_answer(submission, pending)
}

/// Per-round RNG: same seed and round give the same draws
fn round_rng(state: &SurveyState) -> ChaCha8Rng {
    let round = state.history.len() as u64;
    ChaCha8Rng::seed_from_u64(state.rng_seed ^ round.wrapping_mul(ROUND_SEED_MIX))
}
