use axum::{extract::State, routing::get, Json, Router};

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::api::session::settle_timeout;
use crate::api::validation::validate_payload;
use crate::core::state::AppState;
use crate::repositories::ProfileUpdate;
use crate::schemas::user::{ProfilePatch, ProfileResponse};

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/", get(get_profile).patch(update_profile))
}

async fn get_profile(
    CurrentUser { user, .. }: CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let profile = state.records().find_profile(user.id).await?;
    Ok(Json(ProfileResponse::new(user.email, user.role, user.id, profile)))
}

async fn update_profile(
    CurrentUser { user, tab }: CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<ProfilePatch>,
) -> Result<Json<ProfileResponse>, ApiError> {
    validate_payload(&payload)?;
    if payload.full_name.is_none() && payload.avatar_url.is_none() {
        return Err(ApiError::BadRequest("Nothing to update".to_string()));
    }

    let update = ProfileUpdate {
        full_name: payload.full_name.map(|name| name.trim().to_string()),
        avatar_url: payload.avatar_url,
    };
    let profile = state.records().upsert_profile(user.id, update).await?;

    // Every tab signed in as this user shows the new name.
    let refreshed = state.sessions().refresh_user(user.id).await;
    tracing::info!(user_id = %user.id, tabs = refreshed, "Profile updated");
    tab.settled(settle_timeout(&state)).await;

    Ok(Json(ProfileResponse::new(user.email, user.role, user.id, Some(profile))))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use crate::db::types::AppRole;
    use crate::test_support::{build_test_app, json_request, read_json};

    #[tokio::test]
    async fn get_profile_returns_stored_fields() {
        let ctx = build_test_app().await;
        ctx.register("student@example.com", "student123", "Student User", AppRole::User);
        let handle = ctx.signed_in_tab("student@example.com", "student123").await;

        let response = ctx.send(json_request(Method::GET, "/api/v1/profile", Some(handle), None)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body["full_name"], "Student User");
        assert_eq!(body["role"], "user");
        assert_eq!(body["email"], "student@example.com");
    }

    #[tokio::test]
    async fn patch_refreshes_every_tab_of_the_user() {
        let ctx = build_test_app().await;
        ctx.register("student@example.com", "student123", "Student User", AppRole::User);
        let first = ctx.signed_in_tab("student@example.com", "student123").await;
        let second = ctx.signed_in_tab("student@example.com", "student123").await;

        let response = ctx
            .send(json_request(
                Method::PATCH,
                "/api/v1/profile",
                Some(first),
                Some(json!({ "full_name": "  Renamed Student " })),
            ))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(read_json(response).await["full_name"], "Renamed Student");

        for handle in [first, second] {
            let me = ctx.send(json_request(Method::GET, "/api/v1/auth/me", Some(handle), None)).await;
            assert_eq!(read_json(me).await["name"], "Renamed Student");
        }
    }

    #[tokio::test]
    async fn patch_rejects_invalid_avatar_url() {
        let ctx = build_test_app().await;
        ctx.register("student@example.com", "student123", "Student User", AppRole::User);
        let handle = ctx.signed_in_tab("student@example.com", "student123").await;

        let response = ctx
            .send(json_request(
                Method::PATCH,
                "/api/v1/profile",
                Some(handle),
                Some(json!({ "avatar_url": "not a url" })),
            ))
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn empty_patch_is_rejected() {
        let ctx = build_test_app().await;
        ctx.register("student@example.com", "student123", "Student User", AppRole::User);
        let handle = ctx.signed_in_tab("student@example.com", "student123").await;

        let response = ctx
            .send(json_request(Method::PATCH, "/api/v1/profile", Some(handle), Some(json!({}))))
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
