use crate::error::SurveyError;
use crate::types::QuestionPayload;

/// Supplies the question asked at a rank. The returned payload's `rank` may
/// differ slightly from the requested one; the engine scores against the
/// actual rank.
pub trait ContentProvider: Send + Sync {
    fn get_question(&self, rank: u32) -> Result<QuestionPayload, SurveyError>;
}

impl<T: ContentProvider + ?Sized> ContentProvider for std::sync::Arc<T> {
    fn get_question(&self, rank: u32) -> Result<QuestionPayload, SurveyError> {
        (**self).get_question(rank)
    }
}
