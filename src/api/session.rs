use std::time::Duration;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};

use crate::api::errors::ApiError;
use crate::api::guards::{session_handle, MountedTab, SESSION_HEADER};
use crate::core::state::AppState;
use crate::schemas::auth::{MountRequest, SessionResponse};
use crate::services::identity::StoredTokens;

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/", post(mount).get(snapshot).delete(unmount))
}

pub(crate) fn settle_timeout(state: &AppState) -> Duration {
    Duration::from_millis(state.settings().session().settle_timeout_ms)
}

async fn mount(
    State(state): State<AppState>,
    payload: Option<Json<MountRequest>>,
) -> (StatusCode, Json<SessionResponse>) {
    let restore = payload.and_then(|Json(payload)| {
        payload.access_token.map(|access_token| StoredTokens {
            access_token,
            refresh_token: payload.refresh_token,
        })
    });

    let (handle, context) = state.sessions().mount(restore).await;
    let snapshot = context.settled(settle_timeout(&state)).await;

    (StatusCode::CREATED, Json(SessionResponse::from_snapshot(handle, snapshot)))
}

async fn snapshot(
    State(state): State<AppState>,
    MountedTab { handle, context }: MountedTab,
) -> Json<SessionResponse> {
    let snapshot = context.checked(settle_timeout(&state)).await;
    Json(SessionResponse::from_snapshot(handle, snapshot))
}

async fn unmount(State(state): State<AppState>, headers: HeaderMap) -> Result<StatusCode, ApiError> {
    let handle = session_handle(&headers)
        .ok_or_else(|| ApiError::BadRequest(format!("Missing or invalid {SESSION_HEADER} header")))?;

    if state.sessions().unmount(handle).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("Session is not mounted".to_string()))
    }
}
