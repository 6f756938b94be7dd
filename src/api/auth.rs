use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};

use crate::api::errors::ApiError;
use crate::api::guards::{CurrentUser, MountedTab};
use crate::api::session::settle_timeout;
use crate::api::validation::validate_payload;
use crate::core::redis::auth_rate_key;
use crate::core::state::AppState;
use crate::repositories::ProfileUpdate;
use crate::schemas::auth::{
    DevSeedResponse, LoginRequest, SessionResponse, SignupRequest, SignupResponse,
};
use crate::services::demo_seed;
use crate::services::roles::UserDescriptor;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(me))
        .route("/dev-seed", post(dev_seed))
}

async fn enforce_rate_limit(
    state: &AppState,
    action: &str,
    email: &str,
    message: &'static str,
) -> Result<(), ApiError> {
    let auth = state.settings().auth();
    let allowed = state
        .redis()
        .rate_limit(&auth_rate_key(action, email), auth.rate_limit, auth.rate_window_seconds)
        .await
        .unwrap_or(true);
    if allowed {
        Ok(())
    } else {
        Err(ApiError::TooManyRequests(message))
    }
}

async fn login(
    State(state): State<AppState>,
    MountedTab { handle, context }: MountedTab,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    validate_payload(&payload)?;
    enforce_rate_limit(&state, "login", &payload.email, "Too many login attempts, try again later")
        .await?;

    let identity = context.login(payload.email.trim(), &payload.password).await?;

    let snapshot = context.wait_for_signed_in(identity.id, settle_timeout(&state)).await;
    Ok(Json(SessionResponse::from_snapshot(handle, snapshot)))
}

async fn signup(
    State(state): State<AppState>,
    MountedTab { context, .. }: MountedTab,
    Json(payload): Json<SignupRequest>,
) -> Result<(StatusCode, Json<SignupResponse>), ApiError> {
    validate_payload(&payload)?;
    enforce_rate_limit(&state, "signup", &payload.email, "Too many signup attempts, try again later")
        .await?;

    let full_name = payload.full_name.trim().to_string();
    let outcome = context.signup(payload.email.trim(), &payload.password, &full_name).await?;

    let update = ProfileUpdate { full_name: Some(full_name), avatar_url: None };
    if let Err(err) = state.records().upsert_profile(outcome.user.id, update).await {
        tracing::warn!(user_id = %outcome.user.id, error = %err, "Failed to create profile on signup");
    }

    let signed_in = outcome.session.is_some();
    if signed_in {
        context.refresh_user();
        context.wait_for_signed_in(outcome.user.id, settle_timeout(&state)).await;
    }

    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            user_id: outcome.user.id,
            email: outcome.user.email,
            signed_in,
            message: if signed_in {
                "Account created"
            } else {
                "Account created; confirm your email to sign in"
            },
        }),
    ))
}

async fn logout(
    State(state): State<AppState>,
    MountedTab { handle, context }: MountedTab,
) -> Result<Json<SessionResponse>, ApiError> {
    context.logout().await?;
    let snapshot = context.settled(settle_timeout(&state)).await;
    Ok(Json(SessionResponse::from_snapshot(handle, snapshot)))
}

async fn me(CurrentUser { user, .. }: CurrentUser) -> Json<UserDescriptor> {
    Json(user)
}

async fn dev_seed(State(state): State<AppState>) -> Result<Json<DevSeedResponse>, ApiError> {
    let settings = state.settings();
    if !settings.demo().seed_enabled || settings.runtime().environment.is_production() {
        return Err(ApiError::NotFound("Not found".to_string()));
    }

    let accounts =
        demo_seed::seed_demo_accounts(state.sessions().connector().as_ref(), state.records())
            .await;
    Ok(Json(DevSeedResponse { accounts }))
}
