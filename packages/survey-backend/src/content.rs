//! Question content
//!
//! A word bank file holds one entry per frequency rank:
//!
//! ```json
//! [{ "word": "harbor", "rank": 2412, "meaning": "a sheltered port", "distractors": ["a tax", "a loud noise"] }]
//! ```
//!
//! Questions are served from the entry nearest the requested rank within the
//! same band. Without a word bank, synthetic questions are served.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use danci_survey::band::{band_ceiling, band_floor, rank_to_band};
use danci_survey::simulation::SyntheticContent;
use danci_survey::{
    ContentProvider, OptionRole, QuestionOption, QuestionPayload, SurveyError, MAX_RANK, MIN_RANK,
};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WordBankError {
    #[error("failed to read word bank {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse word bank: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("word bank has no usable entries")]
    Empty,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordEntry {
    pub word: String,
    pub rank: u32,
    pub meaning: String,
    pub distractors: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct WordBank {
    entries: BTreeMap<u32, WordEntry>,
    time_limit_ms: u64,
}

impl WordBank {
    /// Build from entries; out-of-range ranks, entries without distractors and
    /// duplicate ranks are skipped.
    pub fn from_entries(
        entries: Vec<WordEntry>,
        time_limit_ms: u64,
    ) -> Result<Self, WordBankError> {
        let total = entries.len();
        let mut by_rank = BTreeMap::new();
        for entry in entries {
            let usable = (MIN_RANK..=MAX_RANK).contains(&entry.rank)
                && !entry.distractors.is_empty()
                && !entry.word.trim().is_empty();
            if usable {
                by_rank.entry(entry.rank).or_insert(entry);
            }
        }
        if by_rank.is_empty() {
            return Err(WordBankError::Empty);
        }
        if by_rank.len() < total {
            tracing::warn!(
                total,
                kept = by_rank.len(),
                "skipped unusable word bank entries"
            );
        }
        Ok(Self {
            entries: by_rank,
            time_limit_ms,
        })
    }

    pub fn from_json(json: &str, time_limit_ms: u64) -> Result<Self, WordBankError> {
        let entries: Vec<WordEntry> = serde_json::from_str(json)?;
        Self::from_entries(entries, time_limit_ms)
    }

    pub async fn load(path: &Path, time_limit_ms: u64) -> Result<Self, WordBankError> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| WordBankError::Io {
                path: path.display().to_string(),
                source,
            })?;
        let bank = Self::from_json(&raw, time_limit_ms)?;
        tracing::info!(path = %path.display(), words = bank.len(), "word bank loaded");
        Ok(bank)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry closest to `rank` inside the band of `rank`
    pub fn nearest(&self, rank: u32) -> Option<&WordEntry> {
        let rank = rank.clamp(MIN_RANK, MAX_RANK);
        let band = rank_to_band(rank);
        let (floor, ceiling) = (band_floor(band), band_ceiling(band));
        let below = self.entries.range(floor..=rank).next_back();
        let above = self.entries.range(rank..=ceiling).next();
        match (below, above) {
            (Some((lo, a)), Some((hi, b))) => {
                if rank - lo <= hi - rank {
                    Some(a)
                } else {
                    Some(b)
                }
            }
            (Some((_, a)), None) => Some(a),
            (None, Some((_, b))) => Some(b),
            (None, None) => None,
        }
    }

    fn build_question(&self, entry: &WordEntry) -> QuestionPayload {
        let mut options: Vec<QuestionOption> = entry
            .distractors
            .iter()
            .map(|label| QuestionOption {
                id: String::new(),
                role: OptionRole::Trap,
                label: label.clone(),
            })
            .collect();
        let target_at = entry.rank as usize % (options.len() + 1);
        options.insert(
            target_at,
            QuestionOption {
                id: String::new(),
                role: OptionRole::Target,
                label: entry.meaning.clone(),
            },
        );
        options.push(QuestionOption {
            id: String::new(),
            role: OptionRole::Unknown,
            label: "I don't know this word".to_string(),
        });
        for (idx, option) in options.iter_mut().enumerate() {
            option.id = format!("opt-{idx}");
        }

        QuestionPayload {
            question_id: uuid::Uuid::new_v4().to_string(),
            word: entry.word.clone(),
            rank: entry.rank,
            band: rank_to_band(entry.rank),
            options,
            time_limit_ms: self.time_limit_ms,
        }
    }
}

impl ContentProvider for WordBank {
    fn get_question(&self, rank: u32) -> Result<QuestionPayload, SurveyError> {
        self.nearest(rank)
            .map(|entry| self.build_question(entry))
            .ok_or(SurveyError::ContentUnavailable { rank })
    }
}

/// Word bank from `path`, or synthetic questions when no path is configured
pub async fn load_content(
    path: Option<&Path>,
    time_limit_ms: u64,
) -> Result<Arc<dyn ContentProvider>, WordBankError> {
    match path {
        Some(path) => Ok(Arc::new(WordBank::load(path, time_limit_ms).await?)),
        None => {
            tracing::info!("WORD_BANK_PATH not set, serving synthetic questions");
            Ok(Arc::new(SyntheticContent))
        }
    }
}
