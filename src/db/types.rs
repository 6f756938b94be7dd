use serde::{Deserialize, Serialize};
use sqlx::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "app_role", rename_all = "lowercase")]
pub(crate) enum AppRole {
    Admin,
    Assessor,
    User,
}

impl AppRole {
    pub(crate) const ALL: [AppRole; 3] = [AppRole::User, AppRole::Assessor, AppRole::Admin];

    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Assessor => "assessor",
            Self::User => "user",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "submission_status", rename_all = "snake_case")]
pub(crate) enum SubmissionStatus {
    Pending,
    UnderReview,
    Graded,
}
