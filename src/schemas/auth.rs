use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::core::time::format_offset;
use crate::services::demo_seed::SeedOutcome;
use crate::services::roles::UserDescriptor;
use crate::services::session::{SessionPhase, SessionSnapshot};

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct LoginRequest {
    #[validate(email(message = "email must be a valid address"))]
    pub(crate) email: String,
    #[validate(length(min = 1, message = "password must not be empty"))]
    pub(crate) password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct SignupRequest {
    #[validate(email(message = "email must be a valid address"))]
    pub(crate) email: String,
    #[validate(length(min = 6, message = "password must be at least 6 characters long"))]
    pub(crate) password: String,
    #[serde(alias = "fullName")]
    #[validate(length(min = 1, max = 200, message = "full_name must not be empty"))]
    pub(crate) full_name: String,
}

/// Tokens a returning tab may present when it mounts.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct MountRequest {
    #[serde(default)]
    pub(crate) access_token: Option<String>,
    #[serde(default)]
    pub(crate) refresh_token: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SessionInfo {
    pub(crate) user_id: Uuid,
    pub(crate) email: Option<String>,
    pub(crate) access_token: String,
    pub(crate) refresh_token: Option<String>,
    pub(crate) expires_at: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct SessionResponse {
    pub(crate) session_id: Uuid,
    pub(crate) phase: SessionPhase,
    pub(crate) loading: bool,
    pub(crate) user: Option<UserDescriptor>,
    pub(crate) session: Option<SessionInfo>,
}

impl SessionResponse {
    pub(crate) fn from_snapshot(session_id: Uuid, snapshot: SessionSnapshot) -> Self {
        Self {
            session_id,
            phase: snapshot.phase,
            loading: snapshot.loading,
            user: snapshot.user,
            session: snapshot.session.map(|session| SessionInfo {
                user_id: session.user.id,
                email: session.user.email,
                access_token: session.access_token,
                refresh_token: session.refresh_token,
                expires_at: format_offset(session.expires_at),
            }),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct SignupResponse {
    pub(crate) user_id: Uuid,
    pub(crate) email: Option<String>,
    /// `false` while the provider waits for email confirmation.
    pub(crate) signed_in: bool,
    pub(crate) message: &'static str,
}

#[derive(Debug, Serialize)]
pub(crate) struct DevSeedResponse {
    pub(crate) accounts: Vec<SeedOutcome>,
}
