//! State Sanitization
//!
//! Persisted sessions come back from storage and client round-trips. Before a
//! round is processed the state is checked and repaired so the strategies can
//! rely on their invariants.
//!
//! Repairs:
//! - crossed or out-of-range bounds
//! - current rank outside the bounds
//! - history entries with an invalid rank or stale band label
//! - band counts with `correct > tested` or non-finite prior pseudo-counts
//! - band tables restored from a list that did not hold eight entries
//! - non-finite confidence values and out-of-range phases

use serde::{Deserialize, Serialize};

use crate::band::rank_to_band;
use crate::types::{StateAnomaly, SurveyState, MAX_RANK, MIN_RANK};

/// Check whether any value is NaN or infinite
pub fn has_invalid_values(values: &[f64]) -> bool {
    values.iter().any(|v| !v.is_finite())
}

/// Non-finite values become `fallback`, finite ones are clamped into `[min, max]`
pub fn sanitize_unit(value: f64, fallback: f64, min: f64, max: f64) -> f64 {
    if value.is_finite() {
        value.clamp(min, max)
    } else {
        fallback
    }
}

/// Summary of a state's health, without modifying it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateDiagnostic {
    pub is_healthy: bool,
    pub bounds_valid: bool,
    pub current_rank_valid: bool,
    pub invalid_history_entries: usize,
    pub invalid_bands: usize,
    pub has_nan: bool,
    pub message: String,
}

pub fn diagnose_state(state: &SurveyState) -> StateDiagnostic {
    let bounds_valid = state.low_bound >= MIN_RANK
        && state.high_bound <= MAX_RANK
        && state.low_bound <= state.high_bound;
    let current_rank_valid =
        bounds_valid && (state.low_bound..=state.high_bound).contains(&state.current_rank);
    let invalid_history_entries = state
        .history
        .iter()
        .filter(|e| !history_entry_valid(e.rank, e.band))
        .count();
    let invalid_bands = state
        .band_performance
        .iter()
        .filter(|(_, b)| {
            b.correct > b.tested || has_invalid_values(&[b.prior_tested, b.prior_correct])
        })
        .count();
    let has_nan = has_invalid_values(&[state.confidence, state.initial_confidence]);

    let is_healthy = bounds_valid
        && current_rank_valid
        && invalid_history_entries == 0
        && invalid_bands == 0
        && !has_nan;

    let message = if is_healthy {
        "State is healthy".to_string()
    } else if !bounds_valid {
        format!(
            "State has invalid bounds [{}, {}]",
            state.low_bound, state.high_bound
        )
    } else if invalid_history_entries > 0 {
        format!("State has {invalid_history_entries} invalid history entries")
    } else if invalid_bands > 0 {
        format!("State has {invalid_bands} inconsistent bands")
    } else if has_nan {
        "State contains non-finite confidence".to_string()
    } else {
        format!("Current rank {} is outside the bounds", state.current_rank)
    };

    StateDiagnostic {
        is_healthy,
        bounds_valid,
        current_rank_valid,
        invalid_history_entries,
        invalid_bands,
        has_nan,
        message,
    }
}

fn history_entry_valid(rank: u32, band: u32) -> bool {
    (MIN_RANK..=MAX_RANK).contains(&rank) && band == rank_to_band(rank)
}

/// Repair `state` in place and report every repair made
pub fn heal_state(state: &mut SurveyState) -> Vec<StateAnomaly> {
    let mut anomalies = Vec::new();

    if let Some(found) = state.band_performance.take_restored_from() {
        anomalies.push(StateAnomaly::BandsRestored { found });
    }

    let (low, high) = (state.low_bound, state.high_bound);
    if low > high || low < MIN_RANK || high > MAX_RANK {
        let (a, b) = if low > high { (high, low) } else { (low, high) };
        state.low_bound = a.clamp(MIN_RANK, MAX_RANK);
        state.high_bound = b.clamp(state.low_bound, MAX_RANK);
        anomalies.push(StateAnomaly::CrossedBounds { low, high });
    }

    if !(state.low_bound..=state.high_bound).contains(&state.current_rank) {
        anomalies.push(StateAnomaly::RankOutOfRange {
            rank: state.current_rank,
        });
        state.current_rank = state.current_rank.clamp(state.low_bound, state.high_bound);
    }

    for (index, entry) in state.history.iter_mut().enumerate() {
        if !history_entry_valid(entry.rank, entry.band) {
            entry.rank = entry.rank.clamp(MIN_RANK, MAX_RANK);
            entry.band = rank_to_band(entry.rank);
            anomalies.push(StateAnomaly::HistoryRepaired { index });
        }
    }

    for (band, stats) in state.band_performance.iter_mut() {
        let mut repaired = false;
        if stats.correct > stats.tested {
            stats.correct = stats.tested;
            repaired = true;
        }
        if !stats.prior_tested.is_finite() || stats.prior_tested < 0.0 {
            stats.prior_tested = 0.0;
            repaired = true;
        }
        if !stats.prior_correct.is_finite() || stats.prior_correct < 0.0 {
            stats.prior_correct = 0.0;
            repaired = true;
        }
        if stats.prior_correct > stats.prior_tested {
            stats.prior_correct = stats.prior_tested;
            repaired = true;
        }
        if repaired {
            anomalies.push(StateAnomaly::BandCountsRepaired { band });
        }
    }

    state.confidence = sanitize_unit(state.confidence, 0.0, 0.0, 1.0);
    state.initial_confidence = sanitize_unit(state.initial_confidence, 0.0, 0.0, 1.0);
    state.phase = state.phase.clamp(1, 3);

    if !anomalies.is_empty() {
        tracing::warn!(
            session_id = %state.session_id,
            repairs = anomalies.len(),
            anomalies = ?anomalies,
            "repaired inconsistent survey state"
        );
    }

    anomalies
}
