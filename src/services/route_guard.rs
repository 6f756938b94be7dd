use crate::db::types::AppRole;
use crate::services::roles::UserDescriptor;
use crate::services::session::SessionSnapshot;

pub(crate) const LOGIN_PATH: &str = "/login";
pub(crate) const DEFAULT_PATH: &str = "/dashboard";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum GuardDecision {
    /// Resolution in flight; neither redirect nor content.
    Loading,
    RedirectToLogin { from: String },
    RedirectToDefault,
    Render(UserDescriptor),
}

impl GuardDecision {
    pub(crate) fn outcome(&self) -> &'static str {
        match self {
            Self::Loading => "loading",
            Self::RedirectToLogin { .. } => "login",
            Self::RedirectToDefault => "default",
            Self::Render(_) => "render",
        }
    }
}

/// Decides what a protected route shows for the current snapshot.
///
/// An empty `allowed` list only requires a signed-in user.
pub(crate) fn check(snapshot: &SessionSnapshot, allowed: &[AppRole], path: &str) -> GuardDecision {
    if snapshot.loading {
        return GuardDecision::Loading;
    }

    let Some(user) = snapshot.user.as_ref() else {
        return GuardDecision::RedirectToLogin { from: path.to_string() };
    };

    if !allowed.is_empty() && !allowed.contains(&user.role) {
        return GuardDecision::RedirectToDefault;
    }

    GuardDecision::Render(user.clone())
}

pub(crate) fn login_location(from: &str) -> String {
    let query: String = reqwest::Url::parse("http://localhost")
        .map(|mut url| {
            url.query_pairs_mut().append_pair("from", from);
            url.query().unwrap_or_default().to_string()
        })
        .unwrap_or_default();

    if query.is_empty() {
        LOGIN_PATH.to_string()
    } else {
        format!("{LOGIN_PATH}?{query}")
    }
}
