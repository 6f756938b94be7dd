//! Per-tab session context.
//!
//! Bridges the identity provider's event stream into a snapshot that handlers can read
//! synchronously. Phases move `Initializing -> Resolving -> Authenticated(role)` and fall
//! back to `Unauthenticated` whenever the session disappears or expires.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use time::OffsetDateTime;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::core::time::now_utc;
use crate::db::types::AppRole;
use crate::repositories::RecordStore;
use crate::services::identity::{
    AuthEvent, Identity, IdentityError, IdentityProvider, Session, SignUpOutcome, EXPIRY_MARGIN,
};
use crate::services::roles::{self, UserDescriptor};

/// Lower bound between expiry re-checks, so a provider handing out near-expired tokens
/// cannot spin the timer.
const MIN_EXPIRY_RECHECK: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "role", rename_all = "snake_case")]
pub(crate) enum SessionPhase {
    Initializing,
    Resolving,
    Authenticated(AppRole),
    Unauthenticated,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SessionSnapshot {
    pub(crate) phase: SessionPhase,
    pub(crate) session: Option<Session>,
    pub(crate) user: Option<UserDescriptor>,
    pub(crate) loading: bool,
}

impl SessionSnapshot {
    pub(crate) fn initializing() -> Self {
        Self { phase: SessionPhase::Initializing, session: None, user: None, loading: true }
    }

    pub(crate) fn unauthenticated() -> Self {
        Self { phase: SessionPhase::Unauthenticated, session: None, user: None, loading: false }
    }
}

struct Shared {
    identity: Arc<dyn IdentityProvider>,
    records: Arc<dyn RecordStore>,
    state: watch::Sender<SessionSnapshot>,
    /// Bumped on every applied session change; resolutions from older generations are dropped.
    generation: AtomicU64,
    resolution: Mutex<Option<(u64, JoinHandle<()>)>>,
    /// Fires when the current session reaches its expiry margin.
    expiry: Mutex<Option<JoinHandle<()>>>,
}

pub(crate) struct SessionContext {
    shared: Arc<Shared>,
    listener: JoinHandle<()>,
    initial_fetch: JoinHandle<()>,
}

impl SessionContext {
    /// Subscribes to auth events and fetches the current session, concurrently.
    pub(crate) fn mount(
        identity: Arc<dyn IdentityProvider>,
        records: Arc<dyn RecordStore>,
    ) -> Self {
        let (state, _) = watch::channel(SessionSnapshot::initializing());
        let shared = Arc::new(Shared {
            identity,
            records,
            state,
            generation: AtomicU64::new(0),
            resolution: Mutex::new(None),
            expiry: Mutex::new(None),
        });

        let events = shared.identity.subscribe();
        let listener = tokio::spawn(listen(Arc::clone(&shared), events));
        let initial_fetch = tokio::spawn(fetch_initial(Arc::clone(&shared)));

        Self { shared, listener, initial_fetch }
    }

    pub(crate) fn snapshot(&self) -> SessionSnapshot {
        self.shared.state.borrow().clone()
    }

    pub(crate) fn is_loading(&self) -> bool {
        self.shared.state.borrow().loading
    }

    pub(crate) fn current_user(&self) -> Option<UserDescriptor> {
        self.shared.state.borrow().user.clone()
    }

    /// Waits until resolution is not in flight, or `timeout` elapses.
    pub(crate) async fn settled(&self, timeout: Duration) -> SessionSnapshot {
        self.wait_until(timeout, |snapshot| !snapshot.loading).await
    }

    /// Settled snapshot whose session, if any, is not past its expiry margin. An expired
    /// session is re-checked with the provider first, which refreshes or drops it.
    pub(crate) async fn checked(&self, timeout: Duration) -> SessionSnapshot {
        let snapshot = if self.is_loading() { self.settled(timeout).await } else { self.snapshot() };
        let expired = snapshot.session.as_ref().is_some_and(|session| session.is_expired(now_utc()));
        if !expired {
            return snapshot;
        }

        self.revalidate().await;
        self.settled(timeout).await
    }

    /// Asks the provider for the current session and applies the answer.
    pub(crate) async fn revalidate(&self) {
        revalidate(&self.shared).await;
    }

    /// Waits until a resolved descriptor is available, or `timeout` elapses.
    #[cfg(test)]
    pub(crate) async fn wait_for_user(&self, timeout: Duration) -> SessionSnapshot {
        self.wait_until(timeout, |snapshot| !snapshot.loading && snapshot.user.is_some()).await
    }

    async fn wait_until(
        &self,
        timeout: Duration,
        predicate: impl FnMut(&SessionSnapshot) -> bool,
    ) -> SessionSnapshot {
        let mut changes = self.shared.state.subscribe();
        let snapshot = match tokio::time::timeout(timeout, changes.wait_for(predicate)).await {
            Ok(Ok(snapshot)) => snapshot.clone(),
            _ => self.snapshot(),
        };
        snapshot
    }

    /// Waits until the descriptor for `user_id` is resolved, or `timeout` elapses.
    pub(crate) async fn wait_for_signed_in(&self, user_id: Uuid, timeout: Duration) -> SessionSnapshot {
        self.wait_until(timeout, |snapshot| {
            !snapshot.loading && snapshot.user.as_ref().is_some_and(|user| user.id == user_id)
        })
        .await
    }

    /// Signs in through the provider. The descriptor is set by the event subscription.
    pub(crate) async fn login(&self, email: &str, password: &str) -> Result<Identity, IdentityError> {
        let session = self.shared.identity.sign_in_with_password(email, password).await?;
        tracing::info!(user_id = %session.user.id, "Login accepted by identity provider");
        Ok(session.user)
    }

    pub(crate) async fn signup(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<SignUpOutcome, IdentityError> {
        let outcome = self.shared.identity.sign_up(email, password, display_name).await?;
        tracing::info!(
            user_id = %outcome.user.id,
            confirmed = outcome.session.is_some(),
            "Signup accepted by identity provider"
        );
        Ok(outcome)
    }

    /// Signs out and clears the descriptor, even when the provider call fails.
    pub(crate) async fn logout(&self) -> Result<(), IdentityError> {
        let result = self.shared.identity.sign_out().await;
        if let Err(err) = &result {
            tracing::warn!(error = %err, "Identity provider sign-out failed; clearing local session");
        }
        apply_session(&self.shared, None, None);
        result
    }

    /// Re-runs role and profile resolution for the current session.
    pub(crate) fn refresh_user(&self) {
        let session = self.shared.state.borrow().session.clone();
        if session.is_some() {
            apply_session(&self.shared, session, None);
        }
    }

    /// Releases the provider subscription and cancels in-flight work.
    pub(crate) fn teardown(&self) {
        self.listener.abort();
        self.initial_fetch.abort();
        self.shared.abort_resolution();
        self.shared.cancel_expiry();
    }
}

impl Drop for SessionContext {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl Shared {
    fn track_resolution(&self, generation: u64, handle: JoinHandle<()>) {
        let mut slot = self.resolution.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if matches!(slot.as_ref(), Some((current, _)) if *current > generation) {
            handle.abort();
            return;
        }
        if let Some((_, previous)) = slot.replace((generation, handle)) {
            previous.abort();
        }
    }

    fn abort_resolution(&self) {
        let mut slot = self.resolution.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some((_, handle)) = slot.take() {
            handle.abort();
        }
    }

    fn watch_expiry(self: &Arc<Self>, expires_at: OffsetDateTime) {
        let wait = Duration::try_from(expires_at - EXPIRY_MARGIN - now_utc())
            .unwrap_or(Duration::ZERO)
            .max(MIN_EXPIRY_RECHECK);
        let shared = Arc::clone(self);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(wait).await;
            tracing::debug!("Session reached its expiry margin; re-checking with provider");
            revalidate(&shared).await;
        });

        let mut slot = self.expiry.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(previous) = slot.replace(handle) {
            previous.abort();
        }
    }

    fn cancel_expiry(&self) {
        let mut slot = self.expiry.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(handle) = slot.take() {
            handle.abort();
        }
    }

    fn finish_resolution(&self, generation: u64, user: UserDescriptor) {
        let applied = self.state.send_if_modified(|snapshot| {
            if self.generation.load(Ordering::SeqCst) != generation {
                return false;
            }
            snapshot.phase = SessionPhase::Authenticated(user.role);
            snapshot.user = Some(user);
            snapshot.loading = false;
            true
        });

        let outcome = if applied { "resolved" } else { "stale" };
        metrics::counter!("session_resolutions_total", "outcome" => outcome).increment(1);
    }
}

/// Applies a session change. With `expected` set, the change is skipped unless no newer
/// change has been applied since that generation.
fn apply_session(shared: &Arc<Shared>, session: Option<Session>, expected: Option<u64>) -> bool {
    let mut started: Option<(u64, Identity, OffsetDateTime)> = None;

    let applied = shared.state.send_if_modified(|snapshot| {
        let current = shared.generation.load(Ordering::SeqCst);
        if expected.is_some_and(|expected| expected != current) {
            return false;
        }

        let generation = current + 1;
        shared.generation.store(generation, Ordering::SeqCst);

        match session {
            None => *snapshot = SessionSnapshot::unauthenticated(),
            Some(session) => {
                started = Some((generation, session.user.clone(), session.expires_at));
                snapshot.phase = SessionPhase::Resolving;
                snapshot.session = Some(session);
                snapshot.loading = true;
            }
        }
        true
    });

    if !applied {
        return false;
    }

    match started {
        // Resolution always runs on its own task, never on the event-dispatch path.
        Some((generation, identity, expires_at)) => {
            let task_shared = Arc::clone(shared);
            let handle = tokio::spawn(async move {
                let user = roles::resolve_user(task_shared.records.as_ref(), &identity).await;
                task_shared.finish_resolution(generation, user);
            });
            shared.track_resolution(generation, handle);
            shared.watch_expiry(expires_at);
        }
        None => {
            shared.abort_resolution();
            shared.cancel_expiry();
        }
    }

    true
}

/// Applies the provider's view of the current session. A session still inside its expiry
/// margin counts as gone. Events applied while the provider call was in flight win.
async fn revalidate(shared: &Arc<Shared>) {
    let generation = shared.generation.load(Ordering::SeqCst);
    let had_session = shared.state.borrow().session.is_some();
    let session = match shared.identity.current_session().await {
        Ok(session) => session.filter(|session| !session.is_expired(now_utc())),
        Err(err) => {
            tracing::warn!(error = %err, "Failed to re-check expiring session; signing out locally");
            None
        }
    };

    if had_session && session.is_none() {
        metrics::counter!("session_expirations_total").increment(1);
        tracing::info!("Session expired; tab is signed out");
    }
    let unchanged = shared.state.borrow().session == session;
    if unchanged {
        // Checked a little early; try again at the margin.
        if let Some(session) = &session {
            shared.watch_expiry(session.expires_at);
        }
        return;
    }
    apply_session(shared, session, Some(generation));
}

async fn listen(shared: Arc<Shared>, mut events: broadcast::Receiver<AuthEvent>) {
    loop {
        match events.recv().await {
            Ok(event) => {
                tracing::debug!(event = event.kind(), "Auth event received");
                apply_session(&shared, event.into_session(), None);
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Auth events lagged; re-reading current session");
                match shared.identity.current_session().await {
                    Ok(session) => {
                        apply_session(&shared, session, None);
                    }
                    Err(err) => tracing::warn!(error = %err, "Failed to re-read session"),
                }
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

async fn fetch_initial(shared: Arc<Shared>) {
    let session = match shared.identity.current_session().await {
        Ok(session) => session,
        Err(err) => {
            tracing::warn!(error = %err, "Failed to fetch current session");
            None
        }
    };

    // An event that arrived while the fetch was in flight is newer than this read.
    if !apply_session(&shared, session, Some(0)) {
        tracing::debug!("Initial session fetch superseded by auth event");
    }
}
