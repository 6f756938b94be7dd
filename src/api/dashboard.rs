use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::api::guards::CurrentUser;
use crate::core::state::AppState;
use crate::db::types::{AppRole, SubmissionStatus};
use crate::repositories::StoreResult;
use crate::schemas::exam::ExamResponse;
use crate::schemas::submission::{FeedbackResponse, SubmissionResponse};
use crate::schemas::user::UserResponse;
use crate::services::roles::UserDescriptor;

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/", get(dashboard))
}

/// One independently fetched block of a dashboard. A failed fetch keeps the others usable.
#[derive(Debug, Serialize)]
pub(crate) struct Section<T> {
    pub(crate) items: Vec<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) error: Option<String>,
}

impl<T> Section<T> {
    fn from_result<R>(name: &'static str, result: StoreResult<Vec<R>>, map: impl Fn(R) -> T) -> Self {
        match result {
            Ok(rows) => Self { items: rows.into_iter().map(map).collect(), error: None },
            Err(err) => {
                tracing::warn!(section = name, error = %err, "Dashboard section failed to load");
                Self { items: Vec::new(), error: Some(format!("Failed to load {name}")) }
            }
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub(crate) enum Dashboard {
    Admin {
        exams: Section<ExamResponse>,
        users: Section<UserResponse>,
    },
    Assessor {
        pending: Section<SubmissionResponse>,
        feedback_given: Section<FeedbackResponse>,
    },
    Student {
        exams: Section<ExamResponse>,
        submissions: Section<SubmissionResponse>,
        feedback: Section<FeedbackResponse>,
    },
}

#[derive(Debug, Serialize)]
pub(crate) struct DashboardResponse {
    pub(crate) user: UserDescriptor,
    #[serde(flatten)]
    pub(crate) dashboard: Dashboard,
}

async fn dashboard(
    CurrentUser { user, .. }: CurrentUser,
    State(state): State<AppState>,
) -> Json<DashboardResponse> {
    let records = state.records();

    let dashboard = match user.role {
        AppRole::Admin => {
            let (exams, users) = tokio::join!(records.list_exams(), records.list_users());
            Dashboard::Admin {
                exams: Section::from_result("exams", exams, ExamResponse::from_db),
                users: Section::from_result("users", users, UserResponse::from_db),
            }
        }
        AppRole::Assessor => {
            let (pending, given) = tokio::join!(
                records.submissions_with_status(SubmissionStatus::Pending),
                records.feedback_by_assessor(user.id),
            );
            Dashboard::Assessor {
                pending: Section::from_result(
                    "pending submissions",
                    pending,
                    SubmissionResponse::from_db,
                ),
                feedback_given: Section::from_result("feedback", given, FeedbackResponse::from_db),
            }
        }
        AppRole::User => {
            let (exams, submissions, feedback) = tokio::join!(
                records.list_exams(),
                records.submissions_for_user(user.id),
                records.feedback_for_owner(user.id),
            );
            Dashboard::Student {
                exams: Section::from_result("exams", exams, ExamResponse::from_db),
                submissions: Section::from_result(
                    "submissions",
                    submissions,
                    SubmissionResponse::from_db,
                ),
                feedback: Section::from_result("feedback", feedback, FeedbackResponse::from_db),
            }
        }
    };

    Json(DashboardResponse { user, dashboard })
}
