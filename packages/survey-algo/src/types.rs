//! Common Types and Constants
//!
//! Shared data structures used by the evaluator, the strategies, the metric
//! calculator, warm start and the engine.

use serde::{Deserialize, Serialize};

use crate::band::{band_from_index, band_index, rank_to_band};
use crate::config::{StoppingConfig, StrategyKind};

// ==================== Constants ====================

/// Lowest frequency rank in the survey space
pub const MIN_RANK: u32 = 1;

/// Highest frequency rank in the survey space
pub const MAX_RANK: u32 = 8000;

/// Width of one accuracy-tracking band
pub const BAND_WIDTH: u32 = 1000;

/// Number of bands covering `MIN_RANK..=MAX_RANK`
pub const BAND_COUNT: usize = 8;

/// Beta(1, 1) smoothing applied to band accuracy
pub const ACCURACY_PRIOR: f64 = 1.0;

// ==================== Questions & Answers ====================

/// Role of a multiple-choice option
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionRole {
    /// The correct meaning of the word
    Target,
    /// A plausible but wrong meaning
    Trap,
    /// "I don't know this word"
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionOption {
    pub id: String,
    pub role: OptionRole,
    pub label: String,
}

/// Question produced by the content provider for a requested rank
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionPayload {
    pub question_id: String,
    pub word: String,
    /// Actual rank of the word (near the requested rank)
    pub rank: u32,
    pub band: u32,
    pub options: Vec<QuestionOption>,
    pub time_limit_ms: u64,
}

impl QuestionPayload {
    pub fn option(&self, option_id: &str) -> Option<&QuestionOption> {
        self.options.iter().find(|o| o.id == option_id)
    }

    /// Exactly one target, at least one trap, exactly one unknown option
    pub fn is_well_formed(&self) -> bool {
        let count = |role: OptionRole| self.options.iter().filter(|o| o.role == role).count();
        count(OptionRole::Target) == 1
            && count(OptionRole::Trap) >= 1
            && count(OptionRole::Unknown) == 1
    }
}

/// Learner's answer to the pending question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerSubmission {
    pub question_id: String,
    pub selected_option_ids: Vec<String>,
    pub time_taken_ms: u64,
}

// ==================== Session History ====================

/// One scored round
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub rank: u32,
    pub band: u32,
    pub correct: bool,
    pub response_time_ms: u64,
}

impl HistoryEntry {
    pub fn new(rank: u32, correct: bool, response_time_ms: u64) -> Self {
        Self {
            rank,
            band: rank_to_band(rank),
            correct,
            response_time_ms,
        }
    }
}

/// Where a band's evidence came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BandSource {
    #[default]
    None,
    Prior,
    Live,
    Mixed,
}

/// Per-band evidence: live answer counts plus down-weighted prior pseudo-counts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct BandStats {
    pub tested: u32,
    pub correct: u32,
    #[serde(default)]
    pub prior_tested: f64,
    #[serde(default)]
    pub prior_correct: f64,
    #[serde(default)]
    pub source: BandSource,
}

impl BandStats {
    pub fn effective_tested(&self) -> f64 {
        self.tested as f64 + self.prior_tested
    }

    pub fn effective_correct(&self) -> f64 {
        self.correct as f64 + self.prior_correct
    }

    /// Smoothed accuracy; 0.5 for a band with no evidence
    pub fn accuracy(&self) -> f64 {
        (self.effective_correct() + ACCURACY_PRIOR)
            / (self.effective_tested() + 2.0 * ACCURACY_PRIOR)
    }

    /// `n / (n + half_saturation)`, in [0, 1)
    pub fn certainty(&self, half_saturation: f64) -> f64 {
        let n = self.effective_tested();
        n / (n + half_saturation.max(f64::EPSILON))
    }

    pub fn record(&mut self, correct: bool) {
        self.tested += 1;
        if correct {
            self.correct += 1;
        }
        self.source = match self.source {
            BandSource::None | BandSource::Live => BandSource::Live,
            BandSource::Prior | BandSource::Mixed => BandSource::Mixed,
        };
    }
}

/// Band-indexed performance table. Always holds all eight bands.
///
/// Persisted as a list; a short or long list is padded/truncated on load and
/// `restored_from` remembers the original length so the engine can report it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(from = "Vec<BandStats>", into = "Vec<BandStats>")]
pub struct BandPerformance {
    bands: [BandStats; BAND_COUNT],
    restored_from: Option<usize>,
}

impl BandPerformance {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_bands(bands: [BandStats; BAND_COUNT]) -> Self {
        Self {
            bands,
            restored_from: None,
        }
    }

    /// Stats of the band containing `rank_or_band`
    pub fn get(&self, rank_or_band: u32) -> &BandStats {
        &self.bands[band_index(rank_or_band)]
    }

    pub fn get_mut(&mut self, rank_or_band: u32) -> &mut BandStats {
        &mut self.bands[band_index(rank_or_band)]
    }

    pub fn record(&mut self, rank: u32, correct: bool) {
        self.get_mut(rank).record(correct);
    }

    /// `(band, stats)` pairs in ascending band order
    pub fn iter(&self) -> impl Iterator<Item = (u32, &BandStats)> {
        self.bands
            .iter()
            .enumerate()
            .map(|(idx, stats)| (band_from_index(idx), stats))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (u32, &mut BandStats)> {
        self.bands
            .iter_mut()
            .enumerate()
            .map(|(idx, stats)| (band_from_index(idx), stats))
    }

    /// Number of entries found when this table was deserialized, if it was not eight
    pub fn take_restored_from(&mut self) -> Option<usize> {
        self.restored_from.take()
    }
}

impl From<Vec<BandStats>> for BandPerformance {
    fn from(list: Vec<BandStats>) -> Self {
        let found = list.len();
        let mut bands: [BandStats; BAND_COUNT] = Default::default();
        for (slot, stats) in bands.iter_mut().zip(list) {
            *slot = stats;
        }
        Self {
            bands,
            restored_from: (found != BAND_COUNT).then_some(found),
        }
    }
}

impl From<BandPerformance> for Vec<BandStats> {
    fn from(perf: BandPerformance) -> Self {
        perf.bands.into_iter().collect()
    }
}

// ==================== Survey Modes ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SurveyMode {
    #[default]
    ColdStart,
    WarmStart,
    QuickValidation,
    DeepDive,
}

impl SurveyMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ColdStart => "cold_start",
            Self::WarmStart => "warm_start",
            Self::QuickValidation => "quick_validation",
            Self::DeepDive => "deep_dive",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "cold_start" | "cold" => Some(Self::ColdStart),
            "warm_start" | "warm" => Some(Self::WarmStart),
            "quick_validation" | "quick" => Some(Self::QuickValidation),
            "deep_dive" | "deep" => Some(Self::DeepDive),
            _ => None,
        }
    }
}

// ==================== Results ====================

/// Final survey metrics
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct TriMetricReport {
    /// Estimated count of actively known words, [0, 8000]
    pub volume: u32,
    /// Highest rank still answered correctly, [0, 8000]
    pub reach: u32,
    /// Consistency of the known zone, [0, 1]
    pub density: f64,
}

/// Irregularity found and repaired while processing a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StateAnomaly {
    /// An answer contradicted the current bounds; bounds were refit from history
    BoundConflict { rank: u32, correct: bool, low: u32, high: u32 },
    /// Bounds collapsed to a single rank and were reopened
    DegenerateRange { rank: u32 },
    /// Persisted bounds were crossed or outside the rank space
    CrossedBounds { low: u32, high: u32 },
    /// Persisted current rank was outside the bounds
    RankOutOfRange { rank: u32 },
    /// A history entry had an invalid rank or band
    HistoryRepaired { index: usize },
    /// Band counts were inconsistent (correct > tested, non-finite priors)
    BandCountsRepaired { band: u32 },
    /// Persisted band table did not hold eight entries
    BandsRestored { found: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SurveyStatus {
    Continue,
    Complete,
}

/// Human-readable description of how the estimate was produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Methodology {
    pub strategy: StrategyKind,
    pub algorithm: String,
    pub bands: Vec<u32>,
    pub volume_formula: String,
    pub reach_formula: String,
    pub density_formula: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugInfo {
    pub survey_mode: SurveyMode,
    pub prior_verified_words: u32,
    pub initial_confidence: f64,
    pub stopping_config: StoppingConfig,
    pub confidence: f64,
    pub low_bound: u32,
    pub high_bound: u32,
    pub phase: u8,
    pub questions_asked: u32,
    pub pivot_triggered: bool,
    pub anomalies: Vec<StateAnomaly>,
}

/// Outcome of one `process_step` call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyResult {
    pub status: SurveyStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<QuestionPayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<TriMetricReport>,
    pub detailed_history: Vec<HistoryEntry>,
    pub methodology: Methodology,
    pub debug_info: DebugInfo,
}

impl SurveyResult {
    pub fn is_complete(&self) -> bool {
        self.status == SurveyStatus::Complete
    }
}

// ==================== Session State ====================

/// Complete state of one survey session. Owned by exactly one session and
/// mutated once per round by `SurveyEngine::process_step`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyState {
    pub session_id: String,
    #[serde(default)]
    pub learner_id: Option<String>,
    pub strategy: StrategyKind,
    pub mode: SurveyMode,
    pub stopping: StoppingConfig,
    pub current_rank: u32,
    pub low_bound: u32,
    pub high_bound: u32,
    pub history: Vec<HistoryEntry>,
    pub band_performance: BandPerformance,
    /// Testing priority per band index (0 = fresh .. 3 = no data)
    #[serde(default)]
    pub band_priority: [u8; BAND_COUNT],
    /// Legacy phase of the bound-narrowing strategy (1 = sweep, 2 = refine, 3 = verify)
    pub phase: u8,
    pub confidence: f64,
    #[serde(default)]
    pub initial_confidence: f64,
    pub estimated_vocab: u32,
    pub pivot_triggered: bool,
    #[serde(default)]
    pub prior_verified_words: u32,
    pub rng_seed: u64,
    #[serde(default)]
    pub pending: Option<QuestionPayload>,
    #[serde(default)]
    pub anomalies: Vec<StateAnomaly>,
    #[serde(default)]
    pub final_metrics: Option<TriMetricReport>,
}

impl SurveyState {
    pub fn new(
        session_id: impl Into<String>,
        strategy: StrategyKind,
        mode: SurveyMode,
        stopping: StoppingConfig,
        start_rank: u32,
        rng_seed: u64,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            learner_id: None,
            strategy,
            mode,
            stopping,
            current_rank: start_rank.clamp(MIN_RANK, MAX_RANK),
            low_bound: MIN_RANK,
            high_bound: MAX_RANK,
            history: Vec::new(),
            band_performance: BandPerformance::new(),
            band_priority: [0; BAND_COUNT],
            phase: 1,
            confidence: 0.0,
            initial_confidence: 0.0,
            estimated_vocab: 0,
            pivot_triggered: false,
            prior_verified_words: 0,
            rng_seed,
            pending: None,
            anomalies: Vec::new(),
            final_metrics: None,
        }
    }

    pub fn questions_asked(&self) -> u32 {
        self.history.len() as u32
    }

    pub fn is_complete(&self) -> bool {
        self.final_metrics.is_some()
    }

    pub fn range_width(&self) -> u32 {
        self.high_bound.saturating_sub(self.low_bound)
    }

    pub fn range_midpoint(&self) -> u32 {
        ((self.low_bound as u64 + self.high_bound as u64) / 2) as u32
    }

    pub fn last_entry(&self) -> Option<&HistoryEntry> {
        self.history.last()
    }

    pub fn debug_info(&self) -> DebugInfo {
        DebugInfo {
            survey_mode: self.mode,
            prior_verified_words: self.prior_verified_words,
            initial_confidence: self.initial_confidence,
            stopping_config: self.stopping,
            confidence: self.confidence,
            low_bound: self.low_bound,
            high_bound: self.high_bound,
            phase: self.phase,
            questions_asked: self.questions_asked(),
            pivot_triggered: self.pivot_triggered,
            anomalies: self.anomalies.clone(),
        }
    }
}
