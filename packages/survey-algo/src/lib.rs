//! # danci-survey - adaptive vocabulary-size survey engine
//!
//! Estimates how many of the 8000 most frequent words a learner knows by
//! asking a short adaptive sequence of multiple-choice questions, one per
//! round, and reports three metrics:
//!
//! - **Volume** - estimated count of actively known words
//! - **Reach** - highest frequency rank the learner still answers correctly
//! - **Density** - how consistent the known zone is
//!
//! ## Module structure
//!
//! - [`engine`] - per-round orchestration on a caller-owned [`SurveyState`]
//! - [`strategy`] - rank selection and bound updates (bound narrowing, band probability)
//! - [`evaluator`] - answer scoring
//! - [`metrics`] - Volume / Reach / Density
//! - [`warm_start`] - prior knowledge, survey modes, initial confidence
//! - [`sanitize`] - repair of inconsistent persisted state
//! - [`simulation`] - simulated learners for convergence checks and benches
//! - [`band`] - rank/band arithmetic
//! - [`config`] - tuning values with env overrides
//! - [`types`] - shared types and constants
//!
//! ## Example
//!
//! ```rust
//! use danci_survey::simulation::{synthetic_engine, SimulatedLearner};
//! use danci_survey::{SessionStart, SurveyConfig};
//!
//! let engine = synthetic_engine(SurveyConfig::default()).unwrap();
//! let mut state = engine.start_session(SessionStart::new("demo", 7));
//! let first = engine.process_step(&mut state, None).unwrap();
//! assert!(first.payload.is_some());
//!
//! let outcome = danci_survey::simulation::run_session(&engine, SimulatedLearner::new(4200, 1.0), 7).unwrap();
//! assert!(outcome.metrics.volume <= 8000);
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod band;
pub mod config;
pub mod content;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod metrics;
pub mod sanitize;
pub mod simulation;
pub mod strategy;
pub mod types;
pub mod warm_start;

// ============================================================================
// Re-exports
// ============================================================================

pub use types::*;

pub use config::{
    BandConfig, BoundConfig, MetricsConfig, StoppingConfig, StoppingTable, StrategyKind,
    SurveyConfig, WarmStartConfig,
};
pub use content::ContentProvider;
pub use engine::{SessionStart, SurveyEngine};
pub use error::SurveyError;
pub use evaluator::evaluate_answer;
pub use metrics::MetricCalculator;
pub use strategy::{BandPerformanceTracker, BoundTracker, SurveyStrategy};
pub use warm_start::{
    PriorBand, PriorKnowledge, PriorKnowledgeSource, PriorityLevel, VerifiedWord,
};
