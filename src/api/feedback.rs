use axum::{extract::State, routing::get, Json, Router};

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::core::state::AppState;
use crate::db::types::AppRole;
use crate::schemas::submission::FeedbackResponse;

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/mine", get(my_feedback))
}

/// Students get feedback on their own submissions; assessors and admins get what they wrote.
async fn my_feedback(
    CurrentUser { user, .. }: CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<FeedbackResponse>>, ApiError> {
    let feedback = match user.role {
        AppRole::User => state.records().feedback_for_owner(user.id).await?,
        AppRole::Assessor | AppRole::Admin => state.records().feedback_by_assessor(user.id).await?,
    };
    Ok(Json(feedback.into_iter().map(FeedbackResponse::from_db).collect()))
}
