//! Volume / Reach / Density
//!
//! - Volume: `Σ rank × w(correct) / n`, `w = 1.0` for correct and
//!   `incorrect_weight` for incorrect answers
//! - Reach: highest correctly answered rank, `× recency_penalty` when the last
//!   `recency_window` answers are predominantly incorrect; `low_bound` when
//!   nothing was answered correctly
//! - Density: share of rank-adjacent answer pairs that are not a reversal
//!   (incorrect at the lower rank, correct at the higher rank)

use crate::config::MetricsConfig;
use crate::types::{HistoryEntry, TriMetricReport, MAX_RANK};

#[derive(Debug, Clone, Default)]
pub struct MetricCalculator {
    config: MetricsConfig,
}

impl MetricCalculator {
    pub fn new(config: MetricsConfig) -> Self {
        Self { config }
    }

    pub fn compute(&self, history: &[HistoryEntry], low_bound: u32) -> TriMetricReport {
        TriMetricReport {
            volume: self.volume(history),
            reach: self.reach(history, low_bound),
            density: self.density(history),
        }
    }

    pub fn volume(&self, history: &[HistoryEntry]) -> u32 {
        if history.is_empty() {
            return 0;
        }
        let weighted: f64 = history
            .iter()
            .map(|e| {
                let weight = if e.correct {
                    1.0
                } else {
                    self.config.incorrect_weight
                };
                e.rank as f64 * weight
            })
            .sum();
        let volume = weighted / history.len() as f64;
        volume.round().clamp(0.0, MAX_RANK as f64) as u32
    }

    pub fn reach(&self, history: &[HistoryEntry], low_bound: u32) -> u32 {
        if history.is_empty() {
            return 0;
        }
        let Some(best) = history.iter().filter(|e| e.correct).map(|e| e.rank).max() else {
            return low_bound.min(MAX_RANK);
        };

        let reach = if self.recent_answers_failing(history) {
            ((best as f64) * self.config.recency_penalty).round() as u32
        } else {
            best
        };
        reach.min(MAX_RANK)
    }

    pub fn density(&self, history: &[HistoryEntry]) -> f64 {
        if !history.iter().any(|e| e.correct) {
            return 0.0;
        }
        let mut by_rank: Vec<&HistoryEntry> = history.iter().collect();
        by_rank.sort_by_key(|e| e.rank);

        let pairs = by_rank.len().saturating_sub(1);
        if pairs == 0 {
            return 1.0;
        }
        let reversals = by_rank
            .windows(2)
            .filter(|w| !w[0].correct && w[1].correct)
            .count();
        ((pairs - reversals) as f64 / pairs as f64).clamp(0.0, 1.0)
    }

    fn recent_answers_failing(&self, history: &[HistoryEntry]) -> bool {
        let window = self.config.recency_window;
        if window == 0 || history.len() < window {
            return false;
        }
        let incorrect = history[history.len() - window..]
            .iter()
            .filter(|e| !e.correct)
            .count();
        incorrect >= self.config.recency_min_incorrect
    }
}
