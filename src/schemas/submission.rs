use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::core::time::format_offset;
use crate::db::models::{Feedback, Submission};
use crate::db::types::SubmissionStatus;

#[derive(Debug, Serialize)]
pub(crate) struct SubmissionResponse {
    pub(crate) id: Uuid,
    pub(crate) exam_id: Uuid,
    pub(crate) user_id: Uuid,
    pub(crate) file_path: Option<String>,
    pub(crate) status: SubmissionStatus,
    pub(crate) submitted_at: String,
}

impl SubmissionResponse {
    pub(crate) fn from_db(submission: Submission) -> Self {
        Self {
            id: submission.id,
            exam_id: submission.exam_id,
            user_id: submission.user_id,
            file_path: submission.file_path,
            status: submission.status,
            submitted_at: format_offset(submission.submitted_at),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[validate(schema(function = "validate_feedback_not_empty"))]
pub(crate) struct FeedbackCreate {
    #[serde(default)]
    #[validate(length(max = 5000, message = "strengths is too long"))]
    pub(crate) strengths: Option<String>,
    #[serde(default)]
    #[validate(length(max = 5000, message = "improvements is too long"))]
    pub(crate) improvements: Option<String>,
    #[serde(default)]
    #[validate(length(max = 5000, message = "comments is too long"))]
    pub(crate) comments: Option<String>,
}

fn validate_feedback_not_empty(payload: &FeedbackCreate) -> Result<(), ValidationError> {
    let filled = [&payload.strengths, &payload.improvements, &payload.comments]
        .into_iter()
        .any(|value| value.as_deref().is_some_and(|text| !text.trim().is_empty()));
    if filled {
        Ok(())
    } else {
        let mut error = ValidationError::new("feedback_empty");
        error.message = Some("feedback must contain at least one section".into());
        Err(error)
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct FeedbackResponse {
    pub(crate) id: Uuid,
    pub(crate) submission_id: Uuid,
    pub(crate) assessor_id: Uuid,
    pub(crate) strengths: Option<String>,
    pub(crate) improvements: Option<String>,
    pub(crate) comments: Option<String>,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl FeedbackResponse {
    pub(crate) fn from_db(feedback: Feedback) -> Self {
        Self {
            id: feedback.id,
            submission_id: feedback.submission_id,
            assessor_id: feedback.assessor_id,
            strengths: feedback.strengths,
            improvements: feedback.improvements,
            comments: feedback.comments,
            created_at: format_offset(feedback.created_at),
            updated_at: format_offset(feedback.updated_at),
        }
    }
}
