//! Progressive Survey Model
//!
//! Seeds a survey from the learner's previously verified vocabulary so it can
//! stop earlier. Prior evidence never makes a session start "confident": the
//! initial confidence is capped, and seeded band counts are down-weighted
//! against live answers.
//!
//! Parameters (see [`WarmStartConfig`]):
//! - recency: 1.0 up to 30 days, linear decay to 0.5 at 180 days
//! - initial confidence: 0.4 × coverage + 0.4 × min(total / 500, 1) + 0.2 × recency, cap 0.60
//! - prior weight: 0.90 × recency
//! - stale after 60 days

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::band::{all_bands, band_index, band_midpoint, tier_to_band};
use crate::config::{StoppingConfig, StoppingTable, WarmStartConfig};
use crate::error::SurveyError;
use crate::types::{BandPerformance, BandSource, BandStats, SurveyMode, BAND_COUNT};

/// One entry of the learner's verified-word ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedWord {
    pub word_id: String,
    /// Frequency tier, 1 = ranks 1-1000
    pub tier: u32,
    pub verified_at: DateTime<Utc>,
    pub passed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PriorBand {
    pub verified_count: u32,
    pub passed_count: u32,
    pub pass_rate: f64,
    pub last_learned_at: Option<DateTime<Utc>>,
}

/// Verified vocabulary aggregated by band
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PriorKnowledge {
    pub bands: [PriorBand; BAND_COUNT],
    pub total_verified: u32,
    pub oldest_verification: Option<DateTime<Utc>>,
    pub newest_verification: Option<DateTime<Utc>>,
}

impl PriorKnowledge {
    pub fn is_empty(&self) -> bool {
        self.total_verified == 0
    }

    pub fn band(&self, band: u32) -> &PriorBand {
        &self.bands[band_index(band)]
    }

    /// Share of bands holding at least one verified word
    pub fn coverage(&self) -> f64 {
        let covered = self.bands.iter().filter(|b| b.verified_count > 0).count();
        covered as f64 / BAND_COUNT as f64
    }
}

/// Read-only access to the learner's verified-word ledger
pub trait PriorKnowledgeSource: Send + Sync {
    fn verified_words(&self, learner_id: &str) -> Result<Vec<VerifiedWord>, SurveyError>;
}

/// Testing priority of one band; higher is tested first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityLevel {
    Fresh = 0,
    Stale = 1,
    Boundary = 2,
    NoData = 3,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BandPriority {
    pub band: u32,
    pub level: PriorityLevel,
}

pub fn extract_prior_knowledge(words: &[VerifiedWord]) -> PriorKnowledge {
    let mut prior = PriorKnowledge::default();

    for word in words {
        let slot = &mut prior.bands[band_index(tier_to_band(word.tier))];
        slot.verified_count += 1;
        if word.passed {
            slot.passed_count += 1;
        }
        slot.last_learned_at = Some(match slot.last_learned_at {
            Some(at) => at.max(word.verified_at),
            None => word.verified_at,
        });

        prior.oldest_verification = Some(match prior.oldest_verification {
            Some(at) => at.min(word.verified_at),
            None => word.verified_at,
        });
        prior.newest_verification = Some(match prior.newest_verification {
            Some(at) => at.max(word.verified_at),
            None => word.verified_at,
        });
    }

    for band in prior.bands.iter_mut() {
        if band.verified_count > 0 {
            band.pass_rate = band.passed_count as f64 / band.verified_count as f64;
        }
    }
    prior.total_verified = words.len() as u32;
    prior
}

/// Pull the ledger from `source` and aggregate it
pub fn load_prior_knowledge(
    source: &dyn PriorKnowledgeSource,
    learner_id: &str,
) -> Result<PriorKnowledge, SurveyError> {
    let words = source.verified_words(learner_id)?;
    Ok(extract_prior_knowledge(&words))
}

fn age_days(at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    ((now - at).num_seconds() as f64 / 86_400.0).max(0.0)
}

/// 1.0 for recent verifications, linear decay to the floor; 0.0 without any
pub fn recency_factor(
    newest: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    config: &WarmStartConfig,
) -> f64 {
    let Some(newest) = newest else {
        return 0.0;
    };
    let days = age_days(newest, now);
    if days <= config.recent_days {
        return 1.0;
    }
    if days >= config.decay_days {
        return config.recency_floor;
    }
    let progress = (days - config.recent_days) / (config.decay_days - config.recent_days);
    1.0 - progress * (1.0 - config.recency_floor)
}

pub fn initial_confidence(
    prior: &PriorKnowledge,
    now: DateTime<Utc>,
    config: &WarmStartConfig,
) -> f64 {
    let volume = (prior.total_verified as f64 / config.saturation_words).min(1.0);
    let recency = recency_factor(prior.newest_verification, now, config);
    let raw = config.coverage_weight * prior.coverage()
        + config.volume_weight * volume
        + config.recency_weight * recency;
    raw.clamp(0.0, config.confidence_cap)
}

/// Seed band pseudo-counts from prior evidence, weighted by band recency
pub fn warm_start_band_performance(
    prior: &PriorKnowledge,
    now: DateTime<Utc>,
    config: &WarmStartConfig,
) -> BandPerformance {
    let mut bands: [BandStats; BAND_COUNT] = Default::default();
    for (slot, prior_band) in bands.iter_mut().zip(prior.bands.iter()) {
        if prior_band.verified_count == 0 {
            continue;
        }
        let weight = config.prior_weight * recency_factor(prior_band.last_learned_at, now, config);
        let verified = prior_band.verified_count as f64;
        slot.prior_tested = verified * weight;
        slot.prior_correct = verified * prior_band.pass_rate * weight;
        slot.source = BandSource::Prior;
    }
    BandPerformance::from_bands(bands)
}

/// Top of the highest band the ledger shows as mostly passed
pub fn estimate_reach_from_prior(prior: &PriorKnowledge, config: &WarmStartConfig) -> Option<u32> {
    all_bands()
        .filter(|&band| {
            let b = prior.band(band);
            b.verified_count > 0 && b.pass_rate >= config.reach_pass_rate
        })
        .max()
}

/// Bands ordered by testing priority: no data > boundary-adjacent > stale > fresh
pub fn select_priority_bands(
    prior: &PriorKnowledge,
    estimated_reach: u32,
    now: DateTime<Utc>,
    config: &WarmStartConfig,
) -> Vec<BandPriority> {
    let mut ranked: Vec<BandPriority> = all_bands()
        .map(|band| {
            let b = prior.band(band);
            let distance = (band_midpoint(band) as i64 - estimated_reach as i64).unsigned_abs();
            let level = if b.verified_count == 0 {
                PriorityLevel::NoData
            } else if distance <= config.boundary_radius as u64 {
                PriorityLevel::Boundary
            } else if b
                .last_learned_at
                .map_or(true, |at| age_days(at, now) > config.stale_days)
            {
                PriorityLevel::Stale
            } else {
                PriorityLevel::Fresh
            };
            BandPriority { band, level }
        })
        .collect();

    ranked.sort_by(|a, b| b.level.cmp(&a.level).then(a.band.cmp(&b.band)));
    ranked
}

/// Explicit mode wins; otherwise pick by verified-word count. `deep_dive` is
/// never chosen automatically.
pub fn select_survey_mode(
    prior: Option<&PriorKnowledge>,
    forced: Option<SurveyMode>,
    config: &WarmStartConfig,
) -> SurveyMode {
    if let Some(mode) = forced {
        return mode;
    }
    let total = prior.map_or(0, |p| p.total_verified);
    if total < config.cold_start_below {
        SurveyMode::ColdStart
    } else if total < config.warm_start_below {
        SurveyMode::WarmStart
    } else {
        SurveyMode::QuickValidation
    }
}

pub fn stopping_config(mode: SurveyMode, table: &StoppingTable) -> StoppingConfig {
    table.for_mode(mode)
}

/// Volume gained per verified word, normalised to a 30-day window.
/// `None` when nothing was verified or no time has passed.
pub fn efficiency_score(
    volume_delta: i64,
    verified_words_between: u32,
    days_between: f64,
    config: &WarmStartConfig,
) -> Option<f64> {
    if verified_words_between == 0 || days_between <= 0.0 || !days_between.is_finite() {
        return None;
    }
    Some(
        (volume_delta as f64 / verified_words_between as f64)
            * (config.efficiency_window_days / days_between),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn word(id: usize, tier: u32, days_ago: i64, passed: bool) -> VerifiedWord {
        VerifiedWord {
            word_id: format!("w{id}"),
            tier,
            verified_at: now() - Duration::days(days_ago),
            passed,
        }
    }

    #[test]
    fn test_empty_ledger() {
        let config = WarmStartConfig::default();
        let prior = extract_prior_knowledge(&[]);
        assert!(prior.is_empty());
        assert_eq!(initial_confidence(&prior, now(), &config), 0.0);
        assert_eq!(select_survey_mode(Some(&prior), None, &config), SurveyMode::ColdStart);
        assert_eq!(select_survey_mode(None, None, &config), SurveyMode::ColdStart);
    }

    #[test]
    fn test_full_recent_ledger_caps_confidence() {
        let config = WarmStartConfig::default();
        let words: Vec<_> = (0..150)
            .map(|i| word(i, (i % 8) as u32 + 1, (i % 7) as i64, true))
            .collect();
        let prior = extract_prior_knowledge(&words);
        assert_eq!(prior.total_verified, 150);
        assert_eq!(prior.coverage(), 1.0);
        assert_eq!(
            select_survey_mode(Some(&prior), None, &config),
            SurveyMode::QuickValidation
        );
        assert!((initial_confidence(&prior, now(), &config) - 0.60).abs() < 1e-9);
    }

    #[test]
    fn test_extract_aggregates_by_band() {
        let words = vec![
            word(1, 1, 10, true),
            word(2, 1, 3, false),
            word(3, 4, 40, true),
            word(4, 12, 90, true),
        ];
        let prior = extract_prior_knowledge(&words);
        let b1 = prior.band(1000);
        assert_eq!((b1.verified_count, b1.passed_count), (2, 1));
        assert!((b1.pass_rate - 0.5).abs() < 1e-9);
        assert_eq!(b1.last_learned_at, Some(now() - Duration::days(3)));
        // tier 12 folds into the top band
        assert_eq!(prior.band(8000).verified_count, 1);
        assert_eq!(prior.oldest_verification, Some(now() - Duration::days(90)));
        assert_eq!(prior.newest_verification, Some(now() - Duration::days(3)));
    }

    #[test]
    fn test_recency_factor_curve() {
        let config = WarmStartConfig::default();
        let at = |days: i64| recency_factor(Some(now() - Duration::days(days)), now(), &config);
        assert_eq!(at(0), 1.0);
        assert_eq!(at(30), 1.0);
        assert!((at(105) - 0.75).abs() < 1e-9);
        assert_eq!(at(180), 0.5);
        assert_eq!(at(400), 0.5);
        assert_eq!(recency_factor(None, now(), &config), 0.0);
        // a timestamp in the future counts as fresh
        assert_eq!(recency_factor(Some(now() + Duration::days(2)), now(), &config), 1.0);
    }

    #[test]
    fn test_band_seeding_is_down_weighted() {
        let config = WarmStartConfig::default();
        let words: Vec<_> = (0..10).map(|i| word(i, 2, 5, i < 8)).collect();
        let prior = extract_prior_knowledge(&words);
        let perf = warm_start_band_performance(&prior, now(), &config);
        let band = perf.get(2000);
        assert!((band.prior_tested - 9.0).abs() < 1e-9);
        assert!((band.prior_correct - 7.2).abs() < 1e-9);
        assert_eq!(band.source, BandSource::Prior);
        assert_eq!(band.tested, 0);
        assert_eq!(perf.get(5000).source, BandSource::None);
    }

    #[test]
    fn test_old_band_weight_decays() {
        let config = WarmStartConfig::default();
        let words: Vec<_> = (0..10).map(|i| word(i, 3, 200, true)).collect();
        let prior = extract_prior_knowledge(&words);
        let perf = warm_start_band_performance(&prior, now(), &config);
        assert!((perf.get(3000).prior_tested - 4.5).abs() < 1e-9);
    }

    #[test]
    fn test_priority_order() {
        let config = WarmStartConfig::default();
        let words = vec![
            word(1, 1, 5, true),   // fresh, far from reach
            word(2, 2, 90, true),  // stale, far from reach
            word(3, 4, 5, true),   // boundary
            word(4, 5, 100, false), // boundary even though stale
        ];
        let prior = extract_prior_knowledge(&words);
        let reach = estimate_reach_from_prior(&prior, &config).unwrap();
        assert_eq!(reach, 4000);

        let ranked = select_priority_bands(&prior, reach, now(), &config);
        let level = |band: u32| ranked.iter().find(|p| p.band == band).unwrap().level;
        assert_eq!(level(1000), PriorityLevel::Fresh);
        assert_eq!(level(2000), PriorityLevel::Stale);
        assert_eq!(level(4000), PriorityLevel::Boundary);
        assert_eq!(level(5000), PriorityLevel::Boundary);
        assert_eq!(level(3000), PriorityLevel::NoData);

        let order: Vec<u32> = ranked.iter().map(|p| p.band).collect();
        assert_eq!(order, vec![3000, 6000, 7000, 8000, 4000, 5000, 2000, 1000]);
    }

    #[test]
    fn test_mode_thresholds_and_override() {
        let config = WarmStartConfig::default();
        let prior_with = |n: usize| {
            let words: Vec<_> = (0..n).map(|i| word(i, 1, 1, true)).collect();
            extract_prior_knowledge(&words)
        };
        assert_eq!(select_survey_mode(Some(&prior_with(19)), None, &config), SurveyMode::ColdStart);
        assert_eq!(select_survey_mode(Some(&prior_with(20)), None, &config), SurveyMode::WarmStart);
        assert_eq!(select_survey_mode(Some(&prior_with(99)), None, &config), SurveyMode::WarmStart);
        assert_eq!(
            select_survey_mode(Some(&prior_with(100)), None, &config),
            SurveyMode::QuickValidation
        );
        assert_eq!(
            select_survey_mode(Some(&prior_with(5)), Some(SurveyMode::DeepDive), &config),
            SurveyMode::DeepDive
        );
    }

    #[test]
    fn test_efficiency_score() {
        let config = WarmStartConfig::default();
        // 400 volume over 200 words in 60 days -> 2.0 per word, halved for the 30-day window
        assert_eq!(efficiency_score(400, 200, 60.0, &config), Some(1.0));
        assert_eq!(efficiency_score(-100, 50, 30.0, &config), Some(-2.0));
        assert_eq!(efficiency_score(100, 0, 30.0, &config), None);
        assert_eq!(efficiency_score(100, 10, 0.0, &config), None);
    }

    #[test]
    fn test_stopping_config_per_mode() {
        let table = StoppingTable::default();
        let quick = stopping_config(SurveyMode::QuickValidation, &table);
        let deep = stopping_config(SurveyMode::DeepDive, &table);
        assert!(quick.max_questions < deep.max_questions);
        assert!(quick.confidence_threshold < deep.confidence_threshold);
    }
}
