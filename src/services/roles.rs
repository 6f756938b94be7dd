use serde::Serialize;
use uuid::Uuid;

use crate::db::models::Profile;
use crate::db::types::AppRole;
use crate::repositories::RecordStore;
use crate::services::identity::Identity;

const FALLBACK_NAME: &str = "User";

/// Application-level view of a session's owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct UserDescriptor {
    pub(crate) id: Uuid,
    pub(crate) email: String,
    pub(crate) name: String,
    pub(crate) role: AppRole,
    pub(crate) avatar_url: Option<String>,
}

/// Fetches role rows and profile together and collapses them into a descriptor.
///
/// Store failures never fail resolution: a failed role fetch yields `user`, a failed
/// profile fetch yields no profile.
pub(crate) async fn resolve_user(records: &dyn RecordStore, identity: &Identity) -> UserDescriptor {
    let (roles, profile) =
        tokio::join!(records.roles_for_user(identity.id), records.find_profile(identity.id));

    let roles = roles.unwrap_or_else(|err| {
        tracing::warn!(user_id = %identity.id, error = %err, "Failed to fetch user roles");
        metrics::counter!("session_resolutions_total", "outcome" => "role_fallback").increment(1);
        Vec::new()
    });
    let profile = profile.unwrap_or_else(|err| {
        tracing::warn!(user_id = %identity.id, error = %err, "Failed to fetch user profile");
        metrics::counter!("session_resolutions_total", "outcome" => "profile_fallback")
            .increment(1);
        None
    });

    descriptor_from(identity, &roles, profile.as_ref())
}

pub(crate) fn descriptor_from(
    identity: &Identity,
    roles: &[AppRole],
    profile: Option<&Profile>,
) -> UserDescriptor {
    let email = identity.email.clone().unwrap_or_default();
    UserDescriptor {
        id: identity.id,
        name: display_name(profile, &email),
        email,
        role: primary_role(roles),
        avatar_url: profile.and_then(|profile| profile.avatar_url.clone()),
    }
}

/// First row wins; rows arrive ordered by `created_at`, then `id`.
pub(crate) fn primary_role(roles: &[AppRole]) -> AppRole {
    roles.first().copied().unwrap_or(AppRole::User)
}

pub(crate) fn display_name(profile: Option<&Profile>, email: &str) -> String {
    if let Some(name) = profile
        .and_then(|profile| profile.full_name.as_deref())
        .map(str::trim)
        .filter(|name| !name.is_empty())
    {
        return name.to_string();
    }

    match email.split('@').next().map(str::trim) {
        Some(local) if !local.is_empty() => local.to_string(),
        _ => FALLBACK_NAME.to_string(),
    }
}
