//! Phased bound narrowing
//!
//! Phases, by round index:
//! - 1 (rounds 0-4): coarse sweep, ±1500 from the last rank
//! - 2 (rounds 5-11): probes alternately above/below the bound midpoint, step 200
//! - 3 (rounds 12+): verification near the inferred boundary, step 100
//!
//! Correct answers raise `low_bound`, incorrect answers lower `high_bound`.

use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::band::all_bands;
use crate::config::{BoundConfig, MetricsConfig, StrategyKind};
use crate::metrics::MetricCalculator;
use crate::strategy::{avoid_repeat, clamp_to_bounds, fit_boundary, jitter, SurveyStrategy};
use crate::types::{Methodology, StateAnomaly, SurveyState, TriMetricReport, MAX_RANK, MIN_RANK};

pub struct BoundTracker {
    config: BoundConfig,
    metrics: MetricCalculator,
}

impl BoundTracker {
    pub fn new(config: BoundConfig, metrics: MetricsConfig) -> Self {
        Self {
            config,
            metrics: MetricCalculator::new(metrics),
        }
    }

    pub fn config(&self) -> &BoundConfig {
        &self.config
    }

    /// Apply one answer to the bounds, refitting from history on contradiction.
    fn narrow(&self, state: &mut SurveyState, rank: u32, correct: bool) {
        let (mut low, mut high) = (state.low_bound, state.high_bound);
        if correct {
            low = low.max(rank);
        } else {
            high = high.min(rank);
        }

        if low > high {
            let (fit_low, fit_high) = fit_boundary(&state.history, 0);
            tracing::warn!(
                session_id = %state.session_id,
                rank,
                correct,
                low = state.low_bound,
                high = state.high_bound,
                "answer contradicts bounds, refitting from history"
            );
            state.anomalies.push(StateAnomaly::BoundConflict {
                rank,
                correct,
                low: state.low_bound,
                high: state.high_bound,
            });
            low = fit_low;
            high = fit_high;
        }

        if low == high && state.history.len() > 1 {
            let (fit_low, fit_high) = fit_boundary(&state.history, 1);
            if fit_high > fit_low {
                low = fit_low;
                high = fit_high;
            } else {
                let step = self.config.verify_step;
                low = low.saturating_sub(step).max(MIN_RANK);
                high = (high + step).min(MAX_RANK);
            }
            tracing::debug!(session_id = %state.session_id, rank, low, high, "reopened collapsed bounds");
            state.anomalies.push(StateAnomaly::DegenerateRange { rank });
        }

        state.low_bound = low;
        state.high_bound = high;
    }
}

impl SurveyStrategy for BoundTracker {
    fn kind(&self) -> StrategyKind {
        StrategyKind::BoundNarrowing
    }

    fn select_next_rank(&self, state: &SurveyState, rng: &mut ChaCha8Rng) -> u32 {
        let (low, high) = (state.low_bound, state.high_bound);
        let round = state.history.len();
        let phase = self.config.phase_for_round(round);
        let step = self.config.step_for_phase(phase);
        let mid = state.range_midpoint() as i64;
        let previous = state.last_entry().map(|e| e.rank);

        let candidate: i64 = match (phase, state.last_entry()) {
            (_, None) => state.current_rank as i64,
            (1, Some(last)) => {
                let swept = if last.correct {
                    last.rank as i64 + step as i64
                } else {
                    last.rank as i64 - step as i64
                };
                if swept > low as i64 && swept < high as i64 {
                    swept
                } else {
                    mid
                }
            }
            (2, Some(_)) => {
                let offset = step.min(state.range_width() / 4);
                let above = round % 2 == 0;
                let signed = if above { offset as i64 } else { -(offset as i64) };
                let amplitude = (offset as f64 * self.config.jitter_fraction) as u32;
                mid + signed + jitter(rng, amplitude)
            }
            (_, Some(_)) => {
                let offset = step.min(state.range_width() / 4);
                let signed = if rng.gen_bool(0.5) { offset as i64 } else { -(offset as i64) };
                let amplitude = (offset as f64 * self.config.jitter_fraction) as u32;
                mid + signed + jitter(rng, amplitude)
            }
        };

        let rank = clamp_to_bounds(candidate, low, high);
        avoid_repeat(rank, previous, low, high)
    }

    fn update_on_answer(&self, state: &mut SurveyState, rank: u32, correct: bool) {
        state.band_performance.record(rank, correct);

        let round = state.history.len();
        if !state.pivot_triggered && self.config.phase_for_round(round.saturating_sub(1)) == 1 {
            let flipped = state
                .history
                .iter()
                .rev()
                .nth(1)
                .is_some_and(|prev| prev.correct != correct);
            if flipped {
                state.pivot_triggered = true;
            }
        }

        self.narrow(state, rank, correct);
        state.phase = self.config.phase_for_round(round);
    }

    fn confidence(&self, state: &SurveyState) -> f64 {
        let scale = self.config.width_scale.max(1.0);
        let narrowness = (1.0 - state.range_width() as f64 / scale).clamp(0.0, 1.0);
        let evidence =
            (state.history.len() as f64 / self.config.evidence_rounds.max(1) as f64).min(1.0);
        (narrowness * evidence).clamp(0.0, 1.0)
    }

    fn compute_metrics(&self, state: &SurveyState) -> TriMetricReport {
        self.metrics.compute(&state.history, state.low_bound)
    }

    fn methodology(&self) -> Methodology {
        Methodology {
            strategy: StrategyKind::BoundNarrowing,
            algorithm: format!(
                "phased bound narrowing: sweep ±{} for rounds 0-{}, refine ±{} around the bound midpoint until round {}, verify ±{} afterwards",
                self.config.sweep_step,
                self.config.sweep_rounds.saturating_sub(1),
                self.config.refine_step,
                self.config.refine_until.saturating_sub(1),
                self.config.verify_step
            ),
            bands: all_bands().collect(),
            volume_formula: "sum(rank * weight(correct)) / n".to_string(),
            reach_formula: "max correct rank, x penalty when the last answers mostly fail, else low_bound".to_string(),
            density_formula: "1 - reversals / rank-adjacent pairs".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{StoppingConfig, SurveyConfig};
    use crate::types::{HistoryEntry, SurveyMode};
    use rand::SeedableRng;

    fn tracker() -> BoundTracker {
        let config = SurveyConfig::default();
        BoundTracker::new(config.bound, config.metrics)
    }

    fn state(start: u32) -> SurveyState {
        SurveyState::new(
            "s-bound",
            StrategyKind::BoundNarrowing,
            SurveyMode::ColdStart,
            StoppingConfig::new(15, 0.85, 40),
            start,
            7,
        )
    }

    fn answer(tracker: &BoundTracker, state: &mut SurveyState, rank: u32, correct: bool) {
        state.history.push(HistoryEntry::new(rank, correct, 1000));
        tracker.update_on_answer(state, rank, correct);
        state.current_rank = state.current_rank.clamp(state.low_bound, state.high_bound);
    }

    #[test]
    fn test_correct_raises_low_incorrect_lowers_high() {
        let t = tracker();
        let mut s = state(3000);
        answer(&t, &mut s, 3000, true);
        assert_eq!((s.low_bound, s.high_bound), (3000, MAX_RANK));
        answer(&t, &mut s, 4500, false);
        assert_eq!((s.low_bound, s.high_bound), (3000, 4500));
        assert!(s.pivot_triggered);
        assert!(s.anomalies.is_empty());
    }

    #[test]
    fn test_sweep_steps_then_falls_back_to_midpoint() {
        let t = tracker();
        let mut s = state(3000);
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        answer(&t, &mut s, 3000, true);
        assert_eq!(t.select_next_rank(&s, &mut rng), 4500);

        answer(&t, &mut s, 4500, false);
        // 4500 - 1500 = 3000 is not strictly inside (3000, 4500)
        assert_eq!(t.select_next_rank(&s, &mut rng), 3750);
    }

    #[test]
    fn test_conflict_refits_and_flags() {
        let t = tracker();
        let mut s = state(3000);
        answer(&t, &mut s, 2000, true);
        answer(&t, &mut s, 2600, true);
        answer(&t, &mut s, 3000, false);
        assert_eq!((s.low_bound, s.high_bound), (2600, 3000));

        // a miss far below the low bound contradicts the evidence
        answer(&t, &mut s, 1200, false);
        assert!(s.low_bound <= s.high_bound);
        assert!(matches!(
            s.anomalies.first(),
            Some(StateAnomaly::BoundConflict { rank: 1200, correct: false, .. })
        ));
    }

    #[test]
    fn test_phase_tracks_round() {
        let t = tracker();
        let mut s = state(3000);
        for round in 0..14u32 {
            let rank = 1000 + round * 37;
            answer(&t, &mut s, rank, round % 3 != 0);
            assert_eq!(s.phase, t.config().phase_for_round(s.history.len()));
        }
        assert_eq!(s.phase, 3);
    }

    #[test]
    fn test_selection_stays_in_bounds() {
        let t = tracker();
        let mut s = state(4000);
        let mut rng = ChaCha8Rng::seed_from_u64(99);
        let boundary = 2750;
        for _ in 0..30 {
            let rank = t.select_next_rank(&s, &mut rng);
            assert!(rank >= s.low_bound && rank <= s.high_bound);
            s.current_rank = rank;
            answer(&t, &mut s, rank, rank <= boundary);
            assert!(s.low_bound <= s.high_bound);
        }
        let mid = s.range_midpoint() as i64;
        assert!((mid - boundary as i64).abs() <= 500);
        assert!(s.range_width() < 1000);
    }

    #[test]
    fn test_confidence_grows_as_range_narrows() {
        let t = tracker();
        let mut s = state(3000);
        assert_eq!(t.confidence(&s), 0.0);
        for (rank, correct) in [(3000, true), (4500, false), (3750, false), (3375, true)] {
            answer(&t, &mut s, rank, correct);
        }
        let early = t.confidence(&s);
        for (rank, correct) in [(3500, true), (3600, false), (3550, true), (3580, false)] {
            answer(&t, &mut s, rank, correct);
        }
        let late = t.confidence(&s);
        assert!(late > early);
        assert!((0.0..=1.0).contains(&late));
    }
}
