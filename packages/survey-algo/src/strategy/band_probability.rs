//! Band-probability strategy
//!
//! Per band: live `{tested, correct}` plus prior pseudo-counts from warm
//! start, smoothed with Beta(1, 1). Bounds are the plausible-boundary interval
//! refit from the whole history after every answer, so a single lucky guess or
//! slip cannot pin them.
//!
//! Selection: among bands overlapping the bounds, pick the one with the
//! highest information value
//!
//! ```text
//! info = p(1 - p) × (1 - certainty) × (1 + boost × priority) × proximity
//! ```
//!
//! and probe near the interval midpoint inside that band.

use rand_chacha::ChaCha8Rng;

use crate::band::{all_bands, band_index, band_midpoint, band_overlap};
use crate::config::{BandConfig, MetricsConfig, StrategyKind};
use crate::metrics::MetricCalculator;
use crate::strategy::{avoid_repeat, clamp_to_bounds, fit_boundary, jitter, SurveyStrategy};
use crate::types::{
    Methodology, StateAnomaly, SurveyState, TriMetricReport, BAND_WIDTH, MAX_RANK, MIN_RANK,
};

pub struct BandPerformanceTracker {
    config: BandConfig,
    metrics: MetricCalculator,
}

/// Scored candidate band for the next probe
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandCandidate {
    pub band: u32,
    pub low: u32,
    pub high: u32,
    pub information: f64,
}

impl BandPerformanceTracker {
    pub fn new(config: BandConfig, metrics: MetricsConfig) -> Self {
        Self {
            config,
            metrics: MetricCalculator::new(metrics),
        }
    }

    /// Bands overlapping the current bounds, most informative first
    pub fn rank_bands(&self, state: &SurveyState) -> Vec<BandCandidate> {
        let mid = state.range_midpoint() as f64;
        let mut candidates: Vec<BandCandidate> = all_bands()
            .filter_map(|band| {
                let (low, high) = band_overlap(band, state.low_bound, state.high_bound)?;
                let stats = state.band_performance.get(band);
                let p = stats.accuracy();
                let certainty = stats.certainty(self.config.evidence_half_saturation);
                let priority = state.band_priority[band_index(band)] as f64;
                let center = (band_midpoint(band) as f64).clamp(low as f64, high as f64);
                let proximity = 1.0 / (1.0 + (center - mid).abs() / BAND_WIDTH as f64);
                let information = p * (1.0 - p)
                    * (1.0 - certainty)
                    * (1.0 + self.config.priority_boost * priority)
                    * proximity;
                Some(BandCandidate {
                    band,
                    low,
                    high,
                    information,
                })
            })
            .collect();

        // stable sort keeps lower bands first on ties
        candidates.sort_by(|a, b| {
            b.information
                .partial_cmp(&a.information)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        candidates
    }

    /// Band holding the midpoint of the bounds
    fn boundary_band(&self, state: &SurveyState) -> u32 {
        crate::band::rank_to_band(state.range_midpoint())
    }
}

impl SurveyStrategy for BandPerformanceTracker {
    fn kind(&self) -> StrategyKind {
        StrategyKind::BandProbability
    }

    fn select_next_rank(&self, state: &SurveyState, rng: &mut ChaCha8Rng) -> u32 {
        let (low, high) = (state.low_bound, state.high_bound);
        let previous = state.last_entry().map(|e| e.rank);
        if previous.is_none() {
            return clamp_to_bounds(state.current_rank as i64, low, high);
        }

        let Some(target) = self.rank_bands(state).into_iter().next() else {
            return clamp_to_bounds(state.range_midpoint() as i64, low, high);
        };

        let anchor = state.range_midpoint().clamp(target.low, target.high);
        let amplitude = ((target.high - target.low) as f64 * self.config.jitter_fraction) as u32;
        let candidate = anchor as i64 + jitter(rng, amplitude);
        let rank = clamp_to_bounds(candidate, target.low, target.high);
        avoid_repeat(rank, previous, low, high)
    }

    fn update_on_answer(&self, state: &mut SurveyState, rank: u32, correct: bool) {
        state.band_performance.record(rank, correct);

        let (old_low, old_high) = (state.low_bound, state.high_bound);
        let contradicts = if correct {
            old_high < MAX_RANK && rank >= old_high
        } else {
            old_low > MIN_RANK && rank <= old_low
        };
        if contradicts {
            tracing::warn!(
                session_id = %state.session_id,
                rank,
                correct,
                low = old_low,
                high = old_high,
                "answer contradicts plausible boundary interval, refitting from history"
            );
            state.anomalies.push(StateAnomaly::BoundConflict {
                rank,
                correct,
                low: old_low,
                high: old_high,
            });
        }

        let (low, high) = fit_boundary(&state.history, self.config.fit_slack);
        state.low_bound = low;
        state.high_bound = high;
    }

    fn confidence(&self, state: &SurveyState) -> f64 {
        if state.history.is_empty() {
            return state.initial_confidence.clamp(0.0, 1.0);
        }
        let scale = self.config.interval_scale.max(1.0);
        let interval = (1.0 - state.range_width() as f64 / scale).clamp(0.0, 1.0);
        let evidence = state
            .band_performance
            .get(self.boundary_band(state))
            .certainty(self.config.evidence_half_saturation);
        let weight = self.config.interval_weight.clamp(0.0, 1.0);
        (weight * interval + (1.0 - weight) * evidence).clamp(0.0, 1.0)
    }

    fn compute_metrics(&self, state: &SurveyState) -> TriMetricReport {
        self.metrics.compute(&state.history, state.low_bound)
    }

    fn methodology(&self) -> Methodology {
        Methodology {
            strategy: StrategyKind::BandProbability,
            algorithm: format!(
                "band probability: Beta(1,1)-smoothed accuracy per 1000-rank band, probes in the most informative band overlapping the plausible boundary interval (fit slack {}), confidence = {:.2} x interval narrowness + {:.2} x boundary band certainty",
                self.config.fit_slack,
                self.config.interval_weight,
                1.0 - self.config.interval_weight
            ),
            bands: all_bands().collect(),
            volume_formula: "sum(rank * weight(correct)) / n".to_string(),
            reach_formula: "max correct rank, x penalty when the last answers mostly fail, else low_bound".to_string(),
            density_formula: "1 - reversals / rank-adjacent pairs".to_string(),
        }
    }
}
