use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::db::types::{AppRole, SubmissionStatus};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Profile {
    pub(crate) id: Uuid,
    pub(crate) full_name: Option<String>,
    pub(crate) avatar_url: Option<String>,
    pub(crate) updated_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct UserRoleRow {
    pub(crate) id: Uuid,
    pub(crate) user_id: Uuid,
    pub(crate) role: AppRole,
    pub(crate) created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Exam {
    pub(crate) id: Uuid,
    pub(crate) title: String,
    pub(crate) subject: String,
    pub(crate) description: Option<String>,
    pub(crate) file_path: Option<String>,
    pub(crate) created_by: Uuid,
    pub(crate) created_at: OffsetDateTime,
    pub(crate) updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Submission {
    pub(crate) id: Uuid,
    pub(crate) exam_id: Uuid,
    pub(crate) user_id: Uuid,
    pub(crate) file_path: Option<String>,
    pub(crate) status: SubmissionStatus,
    pub(crate) submitted_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Feedback {
    pub(crate) id: Uuid,
    pub(crate) submission_id: Uuid,
    pub(crate) assessor_id: Uuid,
    pub(crate) strengths: Option<String>,
    pub(crate) improvements: Option<String>,
    pub(crate) comments: Option<String>,
    pub(crate) created_at: OffsetDateTime,
    pub(crate) updated_at: OffsetDateTime,
}

/// Profile joined with the user's first role row, for admin listings.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct UserSummary {
    pub(crate) id: Uuid,
    pub(crate) full_name: Option<String>,
    pub(crate) avatar_url: Option<String>,
    pub(crate) role: Option<AppRole>,
}
