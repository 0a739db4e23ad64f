use serde::{Deserialize, Serialize};

use crate::error::SurveyError;
use crate::types::{SurveyMode, MAX_RANK, MIN_RANK};

/// Which estimation strategy drives rank selection and bound updates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Legacy phased bound narrowing
    BoundNarrowing,
    /// Per-band accuracy tracking
    #[default]
    BandProbability,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BoundNarrowing => "bound_narrowing",
            Self::BandProbability => "band_probability",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "bound_narrowing" | "bound" | "a" => Some(Self::BoundNarrowing),
            "band_probability" | "band" | "b" => Some(Self::BandProbability),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoppingConfig {
    pub min_questions: u32,
    pub confidence_threshold: f64,
    pub max_questions: u32,
}

impl StoppingConfig {
    pub const fn new(min_questions: u32, confidence_threshold: f64, max_questions: u32) -> Self {
        Self {
            min_questions,
            confidence_threshold,
            max_questions,
        }
    }

    pub fn should_continue(&self, questions_asked: u32, confidence: f64) -> bool {
        questions_asked < self.min_questions
            || (confidence < self.confidence_threshold && questions_asked < self.max_questions)
    }

    fn validate(&self, mode: SurveyMode) -> Result<(), SurveyError> {
        if self.min_questions == 0 {
            return Err(SurveyError::InvalidConfig(format!(
                "{}: min_questions must be at least 1",
                mode.as_str()
            )));
        }
        if self.min_questions > self.max_questions {
            return Err(SurveyError::InvalidConfig(format!(
                "{}: min_questions {} exceeds max_questions {}",
                mode.as_str(),
                self.min_questions,
                self.max_questions
            )));
        }
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(SurveyError::InvalidConfig(format!(
                "{}: confidence_threshold must be within [0, 1]",
                mode.as_str()
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoppingTable {
    pub cold_start: StoppingConfig,
    pub warm_start: StoppingConfig,
    pub quick_validation: StoppingConfig,
    pub deep_dive: StoppingConfig,
}

impl Default for StoppingTable {
    fn default() -> Self {
        Self {
            cold_start: StoppingConfig::new(15, 0.85, 40),
            warm_start: StoppingConfig::new(10, 0.80, 30),
            quick_validation: StoppingConfig::new(6, 0.75, 15),
            deep_dive: StoppingConfig::new(30, 0.92, 60),
        }
    }
}

impl StoppingTable {
    pub fn for_mode(&self, mode: SurveyMode) -> StoppingConfig {
        match mode {
            SurveyMode::ColdStart => self.cold_start,
            SurveyMode::WarmStart => self.warm_start,
            SurveyMode::QuickValidation => self.quick_validation,
            SurveyMode::DeepDive => self.deep_dive,
        }
    }
}

/// Phased bound-narrowing parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundConfig {
    pub sweep_step: u32,
    pub refine_step: u32,
    pub verify_step: u32,
    /// Rounds `0..sweep_rounds` are phase 1
    pub sweep_rounds: usize,
    /// Rounds `sweep_rounds..refine_until` are phase 2, later rounds phase 3
    pub refine_until: usize,
    /// Jitter amplitude as a fraction of the probe offset
    pub jitter_fraction: f64,
    /// Range width at which bound narrowness reaches zero
    pub width_scale: f64,
    /// Rounds needed before the evidence factor saturates
    pub evidence_rounds: usize,
}

impl Default for BoundConfig {
    fn default() -> Self {
        Self {
            sweep_step: 1500,
            refine_step: 200,
            verify_step: 100,
            sweep_rounds: 5,
            refine_until: 12,
            jitter_fraction: 0.25,
            width_scale: 1000.0,
            evidence_rounds: 10,
        }
    }
}

impl BoundConfig {
    pub fn phase_for_round(&self, round: usize) -> u8 {
        if round < self.sweep_rounds {
            1
        } else if round < self.refine_until {
            2
        } else {
            3
        }
    }

    pub fn step_for_phase(&self, phase: u8) -> u32 {
        match phase {
            1 => self.sweep_step,
            2 => self.refine_step,
            _ => self.verify_step,
        }
    }
}

/// Band-probability parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BandConfig {
    /// Thresholds within this many misfits of the best fit stay plausible
    pub fit_slack: u32,
    /// Plausible-interval width at which interval confidence reaches zero
    pub interval_scale: f64,
    /// Effective answers at which band certainty reaches one half
    pub evidence_half_saturation: f64,
    /// Share of confidence from interval narrowness (rest from band evidence)
    pub interval_weight: f64,
    /// Information bonus per warm-start priority level
    pub priority_boost: f64,
    /// Jitter amplitude as a fraction of the probed overlap width
    pub jitter_fraction: f64,
}

impl Default for BandConfig {
    fn default() -> Self {
        Self {
            fit_slack: 1,
            interval_scale: 2000.0,
            evidence_half_saturation: 4.0,
            interval_weight: 0.6,
            priority_boost: 0.25,
            jitter_fraction: 0.25,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Volume weight of an incorrect answer (correct answers weigh 1.0)
    pub incorrect_weight: f64,
    pub recency_window: usize,
    /// Incorrect answers within the window that trigger the reach penalty
    pub recency_min_incorrect: usize,
    pub recency_penalty: f64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            incorrect_weight: 0.1,
            recency_window: 3,
            recency_min_incorrect: 2,
            recency_penalty: 0.8,
        }
    }
}

/// Progressive Survey Model tuning values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarmStartConfig {
    /// Verifications at most this old keep full weight
    pub recent_days: f64,
    /// Age at which recency reaches its floor
    pub decay_days: f64,
    pub recency_floor: f64,
    /// Weight of prior evidence relative to live answers
    pub prior_weight: f64,
    /// Verified words at which the volume term saturates
    pub saturation_words: f64,
    pub confidence_cap: f64,
    pub coverage_weight: f64,
    pub volume_weight: f64,
    pub recency_weight: f64,
    pub stale_days: f64,
    /// Below this many verified words the survey runs cold
    pub cold_start_below: u32,
    /// Below this many verified words the survey runs warm, otherwise quick validation
    pub warm_start_below: u32,
    pub efficiency_window_days: f64,
    /// Minimum pass rate for a band to count toward the prior reach
    pub reach_pass_rate: f64,
    /// Bands whose midpoint lies within this distance of the reach are boundary bands
    pub boundary_radius: u32,
}

impl Default for WarmStartConfig {
    fn default() -> Self {
        Self {
            recent_days: 30.0,
            decay_days: 180.0,
            recency_floor: 0.5,
            prior_weight: 0.90,
            saturation_words: 500.0,
            confidence_cap: 0.60,
            coverage_weight: 0.4,
            volume_weight: 0.4,
            recency_weight: 0.2,
            stale_days: 60.0,
            cold_start_below: 20,
            warm_start_below: 100,
            efficiency_window_days: 30.0,
            reach_pass_rate: 0.5,
            boundary_radius: 1000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurveyConfig {
    pub strategy: StrategyKind,
    /// First rank asked in a cold start
    pub cold_start_rank: u32,
    /// Alternative ranks tried when content is missing near the requested one
    pub max_content_retries: usize,
    pub stopping: StoppingTable,
    pub bound: BoundConfig,
    pub band: BandConfig,
    pub metrics: MetricsConfig,
    pub warm_start: WarmStartConfig,
}

impl Default for SurveyConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::default(),
            cold_start_rank: 3000,
            max_content_retries: 8,
            stopping: StoppingTable::default(),
            bound: BoundConfig::default(),
            band: BandConfig::default(),
            metrics: MetricsConfig::default(),
            warm_start: WarmStartConfig::default(),
        }
    }
}

impl SurveyConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("SURVEY_STRATEGY") {
            if let Some(kind) = StrategyKind::parse(&val) {
                config.strategy = kind;
            }
        }
        if let Ok(val) = std::env::var("SURVEY_COLD_START_RANK") {
            config.cold_start_rank = val.parse().unwrap_or(config.cold_start_rank);
        }
        if let Ok(val) = std::env::var("SURVEY_PRIOR_WEIGHT") {
            config.warm_start.prior_weight = val.parse().unwrap_or(config.warm_start.prior_weight);
        }
        if let Ok(val) = std::env::var("SURVEY_RECENT_DAYS") {
            config.warm_start.recent_days = val.parse().unwrap_or(config.warm_start.recent_days);
        }
        if let Ok(val) = std::env::var("SURVEY_DECAY_DAYS") {
            config.warm_start.decay_days = val.parse().unwrap_or(config.warm_start.decay_days);
        }
        if let Ok(val) = std::env::var("SURVEY_SATURATION_WORDS") {
            config.warm_start.saturation_words =
                val.parse().unwrap_or(config.warm_start.saturation_words);
        }
        if let Ok(val) = std::env::var("SURVEY_STALE_DAYS") {
            config.warm_start.stale_days = val.parse().unwrap_or(config.warm_start.stale_days);
        }

        config
    }

    pub fn validate(&self) -> Result<(), SurveyError> {
        for mode in [
            SurveyMode::ColdStart,
            SurveyMode::WarmStart,
            SurveyMode::QuickValidation,
            SurveyMode::DeepDive,
        ] {
            self.stopping.for_mode(mode).validate(mode)?;
        }
        if !(MIN_RANK..=MAX_RANK).contains(&self.cold_start_rank) {
            return Err(SurveyError::InvalidConfig(format!(
                "cold_start_rank {} outside {MIN_RANK}..={MAX_RANK}",
                self.cold_start_rank
            )));
        }
        let bound = &self.bound;
        if !(bound.sweep_step > bound.refine_step && bound.refine_step > bound.verify_step) {
            return Err(SurveyError::InvalidConfig(
                "phase steps must strictly decrease".to_string(),
            ));
        }
        if bound.sweep_rounds > bound.refine_until {
            return Err(SurveyError::InvalidConfig(
                "sweep_rounds must not exceed refine_until".to_string(),
            ));
        }
        let ws = &self.warm_start;
        if ws.decay_days <= ws.recent_days {
            return Err(SurveyError::InvalidConfig(
                "decay_days must exceed recent_days".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&ws.prior_weight) || !(0.0..=1.0).contains(&ws.confidence_cap) {
            return Err(SurveyError::InvalidConfig(
                "prior_weight and confidence_cap must be within [0, 1]".to_string(),
            ));
        }
        if ws.saturation_words <= 0.0 {
            return Err(SurveyError::InvalidConfig(
                "saturation_words must be positive".to_string(),
            ));
        }
        if ws.cold_start_below > ws.warm_start_below {
            return Err(SurveyError::InvalidConfig(
                "cold_start_below must not exceed warm_start_below".to_string(),
            ));
        }
        Ok(())
    }
}
