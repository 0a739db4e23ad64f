//! Simulated learners
//!
//! A learner with a sharp knowledge boundary answers correctly at or below the
//! boundary and incorrectly above it, with probability `consistency`; the rest
//! of the time the answer is flipped. Used by the convergence tests and the
//! benchmarks.

use std::sync::Arc;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::band::{clamp_rank, rank_to_band};
use crate::config::SurveyConfig;
use crate::content::ContentProvider;
use crate::engine::{SessionStart, SurveyEngine};
use crate::error::SurveyError;
use crate::types::{
    AnswerSubmission, OptionRole, QuestionOption, QuestionPayload, SurveyResult, SurveyState,
    TriMetricReport,
};

/// Generates a well-formed question for any rank
#[derive(Debug, Clone, Default)]
pub struct SyntheticContent;

impl ContentProvider for SyntheticContent {
    fn get_question(&self, rank: u32) -> Result<QuestionPayload, SurveyError> {
        let rank = clamp_rank(rank as i64);
        Ok(QuestionPayload {
            question_id: format!("syn-{rank}"),
            word: format!("word-{rank:04}"),
            rank,
            band: rank_to_band(rank),
            options: vec![
                QuestionOption {
                    id: "a".to_string(),
                    role: OptionRole::Target,
                    label: format!("meaning of word-{rank:04}"),
                },
                QuestionOption {
                    id: "b".to_string(),
                    role: OptionRole::Trap,
                    label: "a similar-looking word".to_string(),
                },
                QuestionOption {
                    id: "c".to_string(),
                    role: OptionRole::Trap,
                    label: "an unrelated meaning".to_string(),
                },
                QuestionOption {
                    id: "d".to_string(),
                    role: OptionRole::Unknown,
                    label: "I don't know".to_string(),
                },
            ],
            time_limit_ms: 15_000,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulatedLearner {
    pub boundary: u32,
    /// Probability of answering in line with the boundary, [0.5, 1]
    pub consistency: f64,
}

impl SimulatedLearner {
    pub fn new(boundary: u32, consistency: f64) -> Self {
        Self {
            boundary,
            consistency: consistency.clamp(0.5, 1.0),
        }
    }

    pub fn knows(&self, rank: u32, rng: &mut ChaCha8Rng) -> bool {
        let knows = rank <= self.boundary;
        if self.consistency >= 1.0 || rng.gen_bool(self.consistency.clamp(0.0, 1.0)) {
            knows
        } else {
            !knows
        }
    }

    /// Pick options for `payload`: the target when known, otherwise "unknown"
    /// or occasionally a trap.
    pub fn answer(&self, payload: &QuestionPayload, rng: &mut ChaCha8Rng) -> AnswerSubmission {
        let role = if self.knows(payload.rank, rng) {
            OptionRole::Target
        } else if rng.gen_bool(0.3) {
            OptionRole::Trap
        } else {
            OptionRole::Unknown
        };
        let selected = payload
            .options
            .iter()
            .find(|o| o.role == role)
            .map(|o| vec![o.id.clone()])
            .unwrap_or_default();
        AnswerSubmission {
            question_id: payload.question_id.clone(),
            selected_option_ids: selected,
            time_taken_ms: rng.gen_range(800..6000),
        }
    }
}

/// Outcome of one simulated session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationOutcome {
    pub learner: SimulatedLearner,
    pub seed: u64,
    pub questions: u32,
    pub low_bound: u32,
    pub high_bound: u32,
    pub confidence: f64,
    pub metrics: TriMetricReport,
}

impl SimulationOutcome {
    pub fn midpoint(&self) -> u32 {
        ((self.low_bound as u64 + self.high_bound as u64) / 2) as u32
    }

    pub fn width(&self) -> u32 {
        self.high_bound.saturating_sub(self.low_bound)
    }

    /// Midpoint within `tolerance` of the true boundary and a bound range
    /// narrower than `max_width`
    pub fn converged(&self, tolerance: u32, max_width: u32) -> bool {
        let error = (self.midpoint() as i64 - self.learner.boundary as i64).unsigned_abs();
        error <= tolerance as u64 && self.width() < max_width
    }
}

/// Drive `state` to completion with answers from `learner`
pub fn drive_session(
    engine: &SurveyEngine,
    state: &mut SurveyState,
    learner: &SimulatedLearner,
    answer_seed: u64,
) -> Result<SurveyResult, SurveyError> {
    let mut rng = ChaCha8Rng::seed_from_u64(answer_seed);
    let mut result = engine.process_step(state, None)?;
    while let Some(payload) = result.payload.take() {
        let submission = learner.answer(&payload, &mut rng);
        result = engine.process_step(state, Some(&submission))?;
    }
    Ok(result)
}

pub fn run_session(
    engine: &SurveyEngine,
    learner: SimulatedLearner,
    seed: u64,
) -> Result<SimulationOutcome, SurveyError> {
    let mut state = engine.start_session(SessionStart::new(format!("sim-{seed}"), seed));
    let result = drive_session(engine, &mut state, &learner, seed.rotate_left(17))?;
    Ok(SimulationOutcome {
        learner,
        seed,
        questions: state.questions_asked(),
        low_bound: state.low_bound,
        high_bound: state.high_bound,
        confidence: state.confidence,
        metrics: result.metrics.unwrap_or_default(),
    })
}

/// Run one session per `(learner, seed)` pair in parallel
pub fn run_batch(
    engine: &SurveyEngine,
    cases: &[(SimulatedLearner, u64)],
) -> Vec<Result<SimulationOutcome, SurveyError>> {
    cases
        .par_iter()
        .map(|(learner, seed)| run_session(engine, *learner, *seed))
        .collect()
}

/// Engine over [`SyntheticContent`]
pub fn synthetic_engine(config: SurveyConfig) -> Result<SurveyEngine, SurveyError> {
    SurveyEngine::new(config, Arc::new(SyntheticContent))
}
