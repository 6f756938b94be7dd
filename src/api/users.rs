use axum::{
    extract::{Path, State},
    routing::{get, put},
    Json, Router,
};
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentAdmin;
use crate::core::state::AppState;
use crate::schemas::user::{RoleUpdate, UserResponse};

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/", get(list_users)).route("/:id/role", put(update_role))
}

async fn list_users(
    _admin: CurrentAdmin,
    State(state): State<AppState>,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    let users = state.records().list_users().await?;
    Ok(Json(users.into_iter().map(UserResponse::from_db).collect()))
}

async fn update_role(
    CurrentAdmin(admin): CurrentAdmin,
    Path(user_id): Path<Uuid>,
    State(state): State<AppState>,
    Json(payload): Json<RoleUpdate>,
) -> Result<Json<UserResponse>, ApiError> {
    if user_id == admin.id {
        return Err(ApiError::BadRequest("Admins cannot change their own role".to_string()));
    }

    let records = state.records();
    let profile = records
        .find_profile(user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    records.replace_role(user_id, payload.role).await?;
    let refreshed = state.sessions().refresh_user(user_id).await;
    tracing::info!(
        user_id = %user_id,
        admin_id = %admin.id,
        role = payload.role.as_str(),
        tabs = refreshed,
        "User role changed"
    );

    Ok(Json(UserResponse {
        id: profile.id,
        full_name: profile.full_name,
        avatar_url: profile.avatar_url,
        role: payload.role,
    }))
}
