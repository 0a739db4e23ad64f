//! Answer evaluation
//!
//! Scoring rules, in order:
//! - any selected `unknown` option is incorrect
//! - any selected `trap` option is incorrect, even next to the target
//! - an empty selection is incorrect
//! - otherwise only targets were selected, which is correct

use std::collections::HashSet;

use crate::error::SurveyError;
use crate::types::{AnswerSubmission, OptionRole, QuestionPayload};

/// Score `submission` against the question it answers. Pure.
///
/// Returns `InvalidAnswer` when the submission belongs to another question or
/// names an option the question does not have.
pub fn evaluate_answer(
    submission: &AnswerSubmission,
    payload: &QuestionPayload,
) -> Result<bool, SurveyError> {
    if submission.question_id != payload.question_id {
        return Err(SurveyError::InvalidAnswer(format!(
            "answer for question {} does not match pending question {}",
            submission.question_id, payload.question_id
        )));
    }

    let mut roles = HashSet::new();
    for option_id in &submission.selected_option_ids {
        let option = payload.option(option_id).ok_or_else(|| {
            SurveyError::InvalidAnswer(format!(
                "option {option_id} is not part of question {}",
                payload.question_id
            ))
        })?;
        roles.insert(option.role);
    }

    if roles.is_empty() || roles.contains(&OptionRole::Unknown) || roles.contains(&OptionRole::Trap)
    {
        return Ok(false);
    }
    Ok(roles.iter().all(|role| *role == OptionRole::Target))
}
