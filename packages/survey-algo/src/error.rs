use thiserror::Error;

/// Session-local survey errors. None of them is process-fatal.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SurveyError {
    #[error("no question available near rank {rank}")]
    ContentUnavailable { rank: u32 },
    #[error("survey aborted: {0}")]
    SurveyAborted(String),
    #[error("invalid answer: {0}")]
    InvalidAnswer(String),
    #[error("prior knowledge unavailable: {0}")]
    PriorKnowledgeUnavailable(String),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

impl SurveyError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::ContentUnavailable { .. } => "CONTENT_UNAVAILABLE",
            Self::SurveyAborted(_) => "SURVEY_ABORTED",
            Self::InvalidAnswer(_) => "INVALID_ANSWER",
            Self::PriorKnowledgeUnavailable(_) => "PRIOR_KNOWLEDGE_UNAVAILABLE",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
        }
    }
}
