use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::{FromRequestParts, OriginalUri, State};
use axum::http::{request::Parts, HeaderMap};
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::api::session::settle_timeout;
use crate::core::state::AppState;
use crate::db::types::AppRole;
use crate::services::roles::UserDescriptor;
use crate::services::route_guard::{self, GuardDecision};
use crate::services::session::{SessionContext, SessionSnapshot};

/// Header naming the mounted tab context.
pub(crate) const SESSION_HEADER: &str = "x-session-id";

/// Any signed-in user, plus the tab context that resolved them.
pub(crate) struct CurrentUser {
    pub(crate) user: UserDescriptor,
    pub(crate) tab: Arc<SessionContext>,
}

/// Role `user`.
pub(crate) struct CurrentStudent(pub(crate) UserDescriptor);

/// Role `assessor` or `admin`.
pub(crate) struct CurrentAssessor(pub(crate) UserDescriptor);

pub(crate) struct CurrentAdmin(pub(crate) UserDescriptor);

/// A mounted tab, signed in or not.
pub(crate) struct MountedTab {
    pub(crate) handle: Uuid,
    pub(crate) context: Arc<SessionContext>,
}

/// Tab handle from the `x-session-id` header, if present and well formed.
pub(crate) fn session_handle(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get(SESSION_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| Uuid::parse_str(value.trim()).ok())
}

fn requested_path(parts: &Parts) -> String {
    let uri = parts.extensions.get::<OriginalUri>().map(|original| &original.0).unwrap_or(&parts.uri);
    uri.path_and_query().map(|value| value.as_str().to_string()).unwrap_or_else(|| "/".to_string())
}

async fn app_state(parts: &mut Parts, state: &AppState) -> Result<AppState, ApiError> {
    let State(app_state) = State::<AppState>::from_request_parts(parts, state)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to access application state"))?;
    Ok(app_state)
}

async fn guard(
    parts: &mut Parts,
    state: &AppState,
    allowed: &[AppRole],
) -> Result<(UserDescriptor, Arc<SessionContext>), ApiError> {
    let app_state = app_state(parts, state).await?;
    let path = requested_path(parts);

    let tab = match session_handle(&parts.headers) {
        Some(handle) => app_state.sessions().get(handle).await,
        None => None,
    };

    let snapshot = match tab.as_ref() {
        Some(tab) => tab.checked(settle_timeout(&app_state)).await,
        None => SessionSnapshot::unauthenticated(),
    };

    let decision = route_guard::check(&snapshot, allowed, &path);
    metrics::counter!("guard_decisions_total", "outcome" => decision.outcome()).increment(1);

    match decision {
        GuardDecision::Loading => Err(ApiError::Pending),
        GuardDecision::RedirectToLogin { from } => Err(ApiError::RedirectToLogin { from }),
        GuardDecision::RedirectToDefault => Err(ApiError::RedirectToDefault),
        GuardDecision::Render(user) => {
            tab.map(|tab| (user, tab)).ok_or(ApiError::RedirectToLogin { from: path })
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let (user, tab) = guard(parts, state, &AppRole::ALL).await?;
        Ok(CurrentUser { user, tab })
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentStudent {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let (user, _) = guard(parts, state, &[AppRole::User]).await?;
        Ok(CurrentStudent(user))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentAssessor {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let (user, _) = guard(parts, state, &[AppRole::Assessor, AppRole::Admin]).await?;
        Ok(CurrentAssessor(user))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentAdmin {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let (user, _) = guard(parts, state, &[AppRole::Admin]).await?;
        Ok(CurrentAdmin(user))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for MountedTab {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let app_state = app_state(parts, state).await?;
        let handle = session_handle(&parts.headers)
            .ok_or_else(|| ApiError::BadRequest(format!("Missing or invalid {SESSION_HEADER} header")))?;
        let context = app_state
            .sessions()
            .get(handle)
            .await
            .ok_or_else(|| ApiError::NotFound("Session is not mounted".to_string()))?;
        Ok(MountedTab { handle, context })
    }
}
