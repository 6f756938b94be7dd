use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::core::time::format_offset;
use crate::db::models::{Profile, UserSummary};
use crate::db::types::AppRole;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct ProfilePatch {
    #[serde(default, alias = "fullName")]
    #[validate(length(min = 1, max = 200, message = "full_name must not be empty"))]
    pub(crate) full_name: Option<String>,
    #[serde(default, alias = "avatarUrl")]
    #[validate(url(message = "avatar_url must be a valid url"))]
    pub(crate) avatar_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RoleUpdate {
    pub(crate) role: AppRole,
}

#[derive(Debug, Serialize)]
pub(crate) struct ProfileResponse {
    pub(crate) id: Uuid,
    pub(crate) email: String,
    pub(crate) full_name: Option<String>,
    pub(crate) avatar_url: Option<String>,
    pub(crate) role: AppRole,
    pub(crate) updated_at: Option<String>,
}

impl ProfileResponse {
    pub(crate) fn new(email: String, role: AppRole, id: Uuid, profile: Option<Profile>) -> Self {
        let (full_name, avatar_url, updated_at) = match profile {
            Some(profile) => (profile.full_name, profile.avatar_url, profile.updated_at),
            None => (None, None, None),
        };
        Self { id, email, full_name, avatar_url, role, updated_at: updated_at.map(format_offset) }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct UserResponse {
    pub(crate) id: Uuid,
    pub(crate) full_name: Option<String>,
    pub(crate) avatar_url: Option<String>,
    pub(crate) role: AppRole,
}

impl UserResponse {
    pub(crate) fn from_db(user: UserSummary) -> Self {
        Self {
            id: user.id,
            full_name: user.full_name,
            avatar_url: user.avatar_url,
            role: user.role.unwrap_or(AppRole::User),
        }
    }
}
