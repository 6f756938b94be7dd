//! Client side of the hosted identity provider.
//!
//! Each browser tab gets its own [`IdentityProvider`] instance holding that tab's session,
//! the way a browser SDK keeps one session per tab. Session changes are announced on a
//! broadcast channel; subscribers own their receiver and release it by dropping it.

pub(crate) mod gotrue;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use time::{Duration, OffsetDateTime};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Tokens are refreshed this long before their nominal expiry.
pub(crate) const EXPIRY_MARGIN: Duration = Duration::seconds(10);

/// Capacity of each client's auth-event channel.
pub(crate) const EVENT_CAPACITY: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct Identity {
    pub(crate) id: Uuid,
    pub(crate) email: Option<String>,
    /// `full_name` metadata attached at sign-up.
    pub(crate) display_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Session {
    pub(crate) access_token: String,
    pub(crate) refresh_token: Option<String>,
    pub(crate) expires_at: OffsetDateTime,
    pub(crate) user: Identity,
}

impl Session {
    pub(crate) fn is_expired(&self, now: OffsetDateTime) -> bool {
        now >= self.expires_at - EXPIRY_MARGIN
    }
}

#[derive(Debug, Clone)]
pub(crate) enum AuthEvent {
    SignedIn(Session),
    TokenRefreshed(Session),
    SignedOut,
}

impl AuthEvent {
    pub(crate) fn into_session(self) -> Option<Session> {
        match self {
            Self::SignedIn(session) | Self::TokenRefreshed(session) => Some(session),
            Self::SignedOut => None,
        }
    }

    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Self::SignedIn(_) => "signed_in",
            Self::TokenRefreshed(_) => "token_refreshed",
            Self::SignedOut => "signed_out",
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct SignUpOutcome {
    pub(crate) user: Identity,
    /// `None` while the provider waits for email confirmation.
    pub(crate) session: Option<Session>,
}

/// Tokens a tab hands back when it reconnects.
#[derive(Debug, Clone)]
pub(crate) struct StoredTokens {
    pub(crate) access_token: String,
    pub(crate) refresh_token: Option<String>,
}

#[derive(Debug, Error)]
pub(crate) enum IdentityError {
    #[error("{0}")]
    InvalidCredentials(String),
    #[error("{0}")]
    AlreadyRegistered(String),
    #[error("{message}")]
    Rejected { status: u16, message: String },
    #[error("identity provider unreachable: {0}")]
    Transport(String),
    #[error("unexpected identity provider response: {0}")]
    Malformed(String),
}

#[async_trait]
pub(crate) trait IdentityProvider: Send + Sync {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, IdentityError>;

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<SignUpOutcome, IdentityError>;

    /// Ends the session. Local state is cleared even when the provider call fails.
    async fn sign_out(&self) -> Result<(), IdentityError>;

    /// Current session, refreshed first when it is about to expire.
    async fn current_session(&self) -> Result<Option<Session>, IdentityError>;

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent>;
}

/// Creates one identity client per mounted tab.
pub(crate) trait IdentityConnector: Send + Sync {
    fn connect(&self, restore: Option<StoredTokens>) -> Arc<dyn IdentityProvider>;
}
