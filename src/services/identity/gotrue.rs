use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::json;
use time::{Duration, OffsetDateTime};
use tokio::sync::{broadcast, Mutex, RwLock};
use uuid::Uuid;

use super::{
    AuthEvent, Identity, IdentityConnector, IdentityError, IdentityProvider, Session,
    SignUpOutcome, StoredTokens, EVENT_CAPACITY,
};
use crate::core::config::{IdentitySettings, Settings};
use crate::core::security::{self, UserMetadata};
use crate::core::time::now_utc;

const DEFAULT_TOKEN_LIFETIME_SECONDS: i64 = 3600;

#[derive(Clone)]
pub(crate) struct GoTrueConnector {
    http: Client,
    settings: IdentitySettings,
}

impl GoTrueConnector {
    pub(crate) fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(StdDuration::from_secs(settings.identity().timeout_seconds))
            .build()?;
        Ok(Self { http, settings: settings.identity().clone() })
    }
}

impl IdentityConnector for GoTrueConnector {
    fn connect(&self, restore: Option<StoredTokens>) -> Arc<dyn IdentityProvider> {
        Arc::new(GoTrueClient::new(self.http.clone(), self.settings.clone(), restore))
    }
}

/// One tab's connection to a GoTrue-compatible auth API.
pub(crate) struct GoTrueClient {
    http: Client,
    settings: IdentitySettings,
    session: RwLock<Option<Session>>,
    restore: Mutex<Option<StoredTokens>>,
    events: broadcast::Sender<AuthEvent>,
}

#[derive(Debug, Deserialize)]
struct UserBody {
    id: Uuid,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    user_metadata: UserMetadata,
}

#[derive(Debug, Deserialize)]
struct TokenBody {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    user: UserBody,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl GoTrueClient {
    pub(crate) fn new(
        http: Client,
        settings: IdentitySettings,
        restore: Option<StoredTokens>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            http,
            settings,
            session: RwLock::new(None),
            restore: Mutex::new(restore),
            events,
        }
    }

    fn request(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.header("apikey", &self.settings.anon_key)
    }

    async fn token_grant(
        &self,
        grant_type: &str,
        body: serde_json::Value,
    ) -> Result<Session, IdentityError> {
        let url = self.settings.endpoint("/token");
        let response = self
            .request(self.http.post(url).query(&[("grant_type", grant_type)]).json(&body))
            .send()
            .await
            .map_err(|err| IdentityError::Transport(err.to_string()))?;

        let status = response.status();
        let text = response.text().await.map_err(|err| IdentityError::Transport(err.to_string()))?;
        if !status.is_success() {
            return Err(provider_error(status, &text));
        }

        let body: TokenBody =
            serde_json::from_str(&text).map_err(|err| IdentityError::Malformed(err.to_string()))?;
        Ok(session_from_token(body, now_utc()))
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Session, IdentityError> {
        self.token_grant("refresh_token", json!({ "refresh_token": refresh_token })).await
    }

    /// Stores the session, then announces it. The lock is released before broadcasting so
    /// subscribers never observe the client mid-update.
    async fn replace_session(&self, session: Option<Session>, event: AuthEvent) {
        {
            let mut guard = self.session.write().await;
            *guard = session;
        }
        // No receivers is not an error: the tab may not have subscribed yet.
        let _ = self.events.send(event);
    }

    async fn restore_session(&self, tokens: StoredTokens) -> Option<Session> {
        match security::decode_access_token(&tokens.access_token, &self.settings.jwt_secret) {
            Ok(claims) => {
                if let Some(expires_at) = OffsetDateTime::from_unix_timestamp(claims.exp).ok() {
                    let session = Session {
                        access_token: tokens.access_token,
                        refresh_token: tokens.refresh_token,
                        expires_at,
                        user: Identity {
                            id: claims.sub,
                            email: claims.email,
                            display_name: claims.user_metadata.full_name,
                        },
                    };
                    *self.session.write().await = Some(session.clone());
                    return Some(session);
                }
            }
            Err(err) => {
                tracing::debug!(error = %err, "Stored access token not usable; trying refresh");
            }
        }

        let refresh_token = tokens.refresh_token?;
        match self.refresh(&refresh_token).await {
            Ok(session) => {
                self.replace_session(Some(session.clone()), AuthEvent::TokenRefreshed(session.clone()))
                    .await;
                Some(session)
            }
            Err(err) => {
                tracing::warn!(error = %err, "Failed to restore session from refresh token");
                None
            }
        }
    }
}

#[async_trait]
impl IdentityProvider for GoTrueClient {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, IdentityError> {
        let session =
            self.token_grant("password", json!({ "email": email, "password": password })).await?;
        tracing::info!(user_id = %session.user.id, "Identity provider sign-in succeeded");
        self.replace_session(Some(session.clone()), AuthEvent::SignedIn(session.clone())).await;
        Ok(session)
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<SignUpOutcome, IdentityError> {
        let url = self.settings.endpoint("/signup");
        let body = json!({
            "email": email,
            "password": password,
            "data": { "full_name": display_name },
        });
        let response = self
            .request(self.http.post(url).json(&body))
            .send()
            .await
            .map_err(|err| IdentityError::Transport(err.to_string()))?;

        let status = response.status();
        let text = response.text().await.map_err(|err| IdentityError::Transport(err.to_string()))?;
        if !status.is_success() {
            return Err(provider_error(status, &text));
        }

        let outcome = parse_sign_up(&text, now_utc())?;
        if let Some(session) = &outcome.session {
            self.replace_session(Some(session.clone()), AuthEvent::SignedIn(session.clone()))
                .await;
        }
        Ok(outcome)
    }

    async fn sign_out(&self) -> Result<(), IdentityError> {
        self.restore.lock().await.take();
        let current = { self.session.read().await.clone() };
        let Some(session) = current else {
            return Ok(());
        };

        let url = self.settings.endpoint("/logout");
        let result = match self
            .request(self.http.post(url).bearer_auth(&session.access_token))
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => Ok(()),
            // The token is already gone on the provider side.
            Ok(response) if response.status() == StatusCode::UNAUTHORIZED => Ok(()),
            Ok(response) => {
                let status = response.status();
                let text = response.text().await.unwrap_or_default();
                Err(provider_error(status, &text))
            }
            Err(err) => Err(IdentityError::Transport(err.to_string())),
        };

        self.replace_session(None, AuthEvent::SignedOut).await;
        result
    }

    async fn current_session(&self) -> Result<Option<Session>, IdentityError> {
        let pending = self.restore.lock().await.take();
        if let Some(tokens) = pending {
            return Ok(self.restore_session(tokens).await);
        }

        let current = { self.session.read().await.clone() };
        let Some(session) = current else {
            return Ok(None);
        };

        if !session.is_expired(now_utc()) {
            return Ok(Some(session));
        }

        let Some(refresh_token) = session.refresh_token.clone() else {
            self.replace_session(None, AuthEvent::SignedOut).await;
            return Ok(None);
        };

        match self.refresh(&refresh_token).await {
            Ok(refreshed) => {
                self.replace_session(
                    Some(refreshed.clone()),
                    AuthEvent::TokenRefreshed(refreshed.clone()),
                )
                .await;
                Ok(Some(refreshed))
            }
            Err(IdentityError::Transport(message)) => Err(IdentityError::Transport(message)),
            Err(err) => {
                tracing::info!(error = %err, "Session refresh rejected; signing out locally");
                self.replace_session(None, AuthEvent::SignedOut).await;
                Ok(None)
            }
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }
}

fn identity_from_user(user: UserBody) -> Identity {
    Identity { id: user.id, email: user.email, display_name: user.user_metadata.full_name }
}

fn session_from_token(body: TokenBody, now: OffsetDateTime) -> Session {
    let expires_at = body
        .expires_at
        .and_then(|value| OffsetDateTime::from_unix_timestamp(value).ok())
        .unwrap_or_else(|| {
            now + Duration::seconds(body.expires_in.unwrap_or(DEFAULT_TOKEN_LIFETIME_SECONDS))
        });

    Session {
        access_token: body.access_token,
        refresh_token: body.refresh_token,
        expires_at,
        user: identity_from_user(body.user),
    }
}

fn parse_sign_up(text: &str, now: OffsetDateTime) -> Result<SignUpOutcome, IdentityError> {
    let value: serde_json::Value =
        serde_json::from_str(text).map_err(|err| IdentityError::Malformed(err.to_string()))?;

    if value.get("access_token").is_some() {
        let body: TokenBody = serde_json::from_value(value)
            .map_err(|err| IdentityError::Malformed(err.to_string()))?;
        let session = session_from_token(body, now);
        return Ok(SignUpOutcome { user: session.user.clone(), session: Some(session) });
    }

    // Confirmation pending: the provider answers with the bare user object.
    let user: UserBody =
        serde_json::from_value(value).map_err(|err| IdentityError::Malformed(err.to_string()))?;
    Ok(SignUpOutcome { user: identity_from_user(user), session: None })
}

fn provider_error(status: StatusCode, text: &str) -> IdentityError {
    let body: ErrorBody = serde_json::from_str(text).unwrap_or_default();
    let message = body
        .error_description
        .clone()
        .or_else(|| body.msg.clone())
        .or_else(|| body.message.clone())
        .or_else(|| body.error.clone())
        .unwrap_or_else(|| format!("Identity provider returned status {}", status.as_u16()));

    let code = body.error_code.as_deref().or(body.error.as_deref()).unwrap_or_default();
    let lowered = message.to_ascii_lowercase();

    if code == "invalid_grant" || code == "invalid_credentials" {
        return IdentityError::InvalidCredentials(message);
    }
    if code == "user_already_exists" || lowered.contains("already registered") {
        return IdentityError::AlreadyRegistered(message);
    }

    IdentityError::Rejected { status: status.as_u16(), message }
}
