//! Verified-word ledger
//!
//! Read-only source of each learner's verified vocabulary, loaded from a JSON
//! object keyed by learner id:
//!
//! ```json
//! { "learner-1": [{ "wordId": "w1", "tier": 2, "verifiedAt": "2026-01-10T08:00:00Z", "passed": true }] }
//! ```

use std::collections::HashMap;
use std::path::Path;

use danci_survey::{PriorKnowledgeSource, SurveyError, VerifiedWord};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("failed to read ledger {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse ledger: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryLedger {
    learners: HashMap<String, Vec<VerifiedWord>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_learner(mut self, learner_id: impl Into<String>, words: Vec<VerifiedWord>) -> Self {
        self.learners.insert(learner_id.into(), words);
        self
    }

    pub fn from_json(json: &str) -> Result<Self, LedgerError> {
        let learners: HashMap<String, Vec<VerifiedWord>> = serde_json::from_str(json)?;
        Ok(Self { learners })
    }

    pub async fn load(path: &Path) -> Result<Self, LedgerError> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| LedgerError::Io {
                path: path.display().to_string(),
                source,
            })?;
        let ledger = Self::from_json(&raw)?;
        tracing::info!(
            path = %path.display(),
            learners = ledger.learners.len(),
            "verified-word ledger loaded"
        );
        Ok(ledger)
    }

    pub fn learner_count(&self) -> usize {
        self.learners.len()
    }
}

impl PriorKnowledgeSource for InMemoryLedger {
    /// Unknown learners have an empty ledger
    fn verified_words(&self, learner_id: &str) -> Result<Vec<VerifiedWord>, SurveyError> {
        if learner_id.trim().is_empty() {
            return Err(SurveyError::PriorKnowledgeUnavailable(
                "learner id is empty".to_string(),
            ));
        }
        Ok(self.learners.get(learner_id).cloned().unwrap_or_default())
    }
}

pub async fn load_ledger(path: Option<&Path>) -> Result<InMemoryLedger, LedgerError> {
    match path {
        Some(path) => InMemoryLedger::load(path).await,
        None => Ok(InMemoryLedger::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_parse_ledger() {
        let json = r#"{
            "learner-1": [
                {"wordId": "w1", "tier": 2, "verifiedAt": "2026-01-10T08:00:00Z", "passed": true},
                {"wordId": "w2", "tier": 5, "verifiedAt": "2026-01-11T08:00:00Z", "passed": false}
            ]
        }"#;
        let ledger = InMemoryLedger::from_json(json).unwrap();
        assert_eq!(ledger.learner_count(), 1);
        let words = ledger.verified_words("learner-1").unwrap();
        assert_eq!(words.len(), 2);
        assert_eq!(words[1].tier, 5);
        assert!(!words[1].passed);
    }

    #[test]
    fn test_unknown_learner_is_empty() {
        let ledger = InMemoryLedger::new().with_learner(
            "known",
            vec![VerifiedWord {
                word_id: "w".into(),
                tier: 1,
                verified_at: Utc::now(),
                passed: true,
            }],
        );
        assert!(ledger.verified_words("stranger").unwrap().is_empty());
        assert_eq!(ledger.verified_words("known").unwrap().len(), 1);
        assert!(matches!(
            ledger.verified_words("  "),
            Err(SurveyError::PriorKnowledgeUnavailable(_))
        ));
    }

    #[test]
    fn test_malformed_ledger_rejected() {
        assert!(matches!(
            InMemoryLedger::from_json("[1, 2]"),
            Err(LedgerError::Parse(_))
        ));
    }
}
