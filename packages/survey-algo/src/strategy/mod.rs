//! Estimation strategies
//!
//! - [`bound`] - phased bound narrowing (sweep / refine / verify)
//! - [`band_probability`] - per-band accuracy tracking, default
//!
//! Both work directly on the caller-owned [`SurveyState`] and draw all
//! randomness from the per-round RNG handed in by the engine.

pub mod band_probability;
pub mod bound;

use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::band::clamp_rank;
use crate::config::{StrategyKind, SurveyConfig};
use crate::types::{HistoryEntry, Methodology, SurveyState, TriMetricReport, MAX_RANK, MIN_RANK};

pub use band_probability::BandPerformanceTracker;
pub use bound::BoundTracker;

pub trait SurveyStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    /// Next rank to ask; always within `[low_bound, high_bound]`
    fn select_next_rank(&self, state: &SurveyState, rng: &mut ChaCha8Rng) -> u32;

    /// Fold one scored answer (already appended to history) into bounds and bands
    fn update_on_answer(&self, state: &mut SurveyState, rank: u32, correct: bool);

    fn confidence(&self, state: &SurveyState) -> f64;

    fn should_stop(&self, state: &SurveyState) -> bool {
        !state
            .stopping
            .should_continue(state.questions_asked(), state.confidence)
    }

    fn compute_metrics(&self, state: &SurveyState) -> TriMetricReport;

    fn methodology(&self) -> Methodology;
}

pub fn build_strategy(config: &SurveyConfig) -> Box<dyn SurveyStrategy> {
    match config.strategy {
        StrategyKind::BoundNarrowing => Box::new(BoundTracker::new(
            config.bound.clone(),
            config.metrics.clone(),
        )),
        StrategyKind::BandProbability => Box::new(BandPerformanceTracker::new(
            config.band.clone(),
            config.metrics.clone(),
        )),
    }
}

/// Number of history entries a knowledge threshold `t` misclassifies:
/// correct answers above `t` plus incorrect answers at or below `t`.
pub fn misfit(history: &[HistoryEntry], threshold: u32) -> u32 {
    history
        .iter()
        .filter(|e| (e.correct && e.rank > threshold) || (!e.correct && e.rank <= threshold))
        .count() as u32
}

/// Plausible boundary interval given the answers so far.
///
/// Every threshold whose misfit is within `slack` of the best fit is kept; the
/// result spans from the lowest kept threshold to the next observed rank above
/// the highest kept threshold. Always `low <= high`.
pub fn fit_boundary(history: &[HistoryEntry], slack: u32) -> (u32, u32) {
    if history.is_empty() {
        return (MIN_RANK, MAX_RANK);
    }

    let mut thresholds: Vec<u32> = Vec::with_capacity(history.len() + 1);
    thresholds.push(0);
    thresholds.extend(history.iter().map(|e| e.rank.clamp(MIN_RANK, MAX_RANK)));
    thresholds.sort_unstable();
    thresholds.dedup();

    let errors: Vec<u32> = thresholds.iter().map(|&t| misfit(history, t)).collect();
    let best = errors.iter().copied().min().unwrap_or(0);
    let limit = best.saturating_add(slack);

    let first = errors.iter().position(|&e| e <= limit).unwrap_or(0);
    let last = errors.iter().rposition(|&e| e <= limit).unwrap_or(first);

    let low = thresholds[first].max(MIN_RANK);
    let high = thresholds.get(last + 1).copied().unwrap_or(MAX_RANK);
    (low, high.max(low))
}

pub(crate) fn clamp_to_bounds(candidate: i64, low: u32, high: u32) -> u32 {
    clamp_rank(candidate).clamp(low, high.max(low))
}

/// Uniform offset in `[-amplitude, amplitude]`
pub(crate) fn jitter(rng: &mut ChaCha8Rng, amplitude: u32) -> i64 {
    if amplitude == 0 {
        return 0;
    }
    let amplitude = amplitude as i64;
    rng.gen_range(-amplitude..=amplitude)
}

/// Move `candidate` off the previously asked rank when the bounds leave room.
pub(crate) fn avoid_repeat(candidate: u32, previous: Option<u32>, low: u32, high: u32) -> u32 {
    match previous {
        Some(prev) if prev == candidate && high > low => {
            if candidate < high {
                candidate + 1
            } else {
                candidate - 1
            }
        }
        _ => candidate,
    }
}
