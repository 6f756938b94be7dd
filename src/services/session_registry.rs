use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;
use uuid::Uuid;

use crate::repositories::RecordStore;
use crate::services::identity::{IdentityConnector, StoredTokens};
use crate::services::session::SessionContext;

struct MountedContext {
    context: Arc<SessionContext>,
    last_seen: Mutex<Instant>,
}

impl MountedContext {
    fn new(context: Arc<SessionContext>) -> Self {
        Self { context, last_seen: Mutex::new(Instant::now()) }
    }

    fn touch(&self) {
        *self.last_seen.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = Instant::now();
    }

    fn idle_for(&self, now: Instant) -> Duration {
        let last_seen = *self.last_seen.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        now.saturating_duration_since(last_seen)
    }
}

/// Mounted tab contexts keyed by session handle.
pub(crate) struct SessionRegistry {
    connector: Arc<dyn IdentityConnector>,
    records: Arc<dyn RecordStore>,
    contexts: RwLock<HashMap<Uuid, MountedContext>>,
}

impl SessionRegistry {
    pub(crate) fn new(connector: Arc<dyn IdentityConnector>, records: Arc<dyn RecordStore>) -> Self {
        Self { connector, records, contexts: RwLock::new(HashMap::new()) }
    }

    pub(crate) fn connector(&self) -> &Arc<dyn IdentityConnector> {
        &self.connector
    }

    pub(crate) async fn mount(&self, restore: Option<StoredTokens>) -> (Uuid, Arc<SessionContext>) {
        let identity = self.connector.connect(restore);
        let context = Arc::new(SessionContext::mount(identity, Arc::clone(&self.records)));
        let handle = Uuid::new_v4();

        self.contexts.write().await.insert(handle, MountedContext::new(Arc::clone(&context)));
        metrics::gauge!("session_contexts_mounted").increment(1.0);
        tracing::debug!(session_id = %handle, "Mounted session context");

        (handle, context)
    }

    /// Looks up a tab and marks it as active.
    pub(crate) async fn get(&self, handle: Uuid) -> Option<Arc<SessionContext>> {
        let contexts = self.contexts.read().await;
        let mounted = contexts.get(&handle)?;
        mounted.touch();
        Some(Arc::clone(&mounted.context))
    }

    pub(crate) async fn unmount(&self, handle: Uuid) -> bool {
        let Some(mounted) = self.contexts.write().await.remove(&handle) else {
            return false;
        };
        mounted.context.teardown();
        metrics::gauge!("session_contexts_mounted").decrement(1.0);
        tracing::debug!(session_id = %handle, "Unmounted session context");
        true
    }

    /// Re-resolves every tab signed in as `user_id`. Returns how many were refreshed.
    pub(crate) async fn refresh_user(&self, user_id: Uuid) -> usize {
        let contexts = self.contexts.read().await;
        let mut refreshed = 0;
        for mounted in contexts.values() {
            let signed_in_as =
                mounted.context.snapshot().session.as_ref().map(|session| session.user.id);
            if signed_in_as == Some(user_id) {
                mounted.context.refresh_user();
                refreshed += 1;
            }
        }
        refreshed
    }

    /// Unmounts tabs not looked up for at least `max_idle`. Returns how many were removed.
    pub(crate) async fn sweep_idle(&self, max_idle: Duration) -> usize {
        let now = Instant::now();
        let evicted: Vec<(Uuid, MountedContext)> = {
            let mut contexts = self.contexts.write().await;
            let stale: Vec<Uuid> = contexts
                .iter()
                .filter(|(_, mounted)| mounted.idle_for(now) >= max_idle)
                .map(|(handle, _)| *handle)
                .collect();
            stale
                .into_iter()
                .filter_map(|handle| contexts.remove(&handle).map(|mounted| (handle, mounted)))
                .collect()
        };

        for (handle, mounted) in &evicted {
            let user_id = mounted.context.current_user().map(|user| user.id);
            mounted.context.teardown();
            tracing::debug!(session_id = %handle, user_id = ?user_id, "Unmounted idle session context");
        }

        let count = evicted.len();
        if count > 0 {
            metrics::gauge!("session_contexts_mounted").decrement(count as f64);
            metrics::counter!("session_idle_evictions_total").increment(count as u64);
            tracing::info!(count, "Swept idle session contexts");
        }
        count
    }

    pub(crate) async fn len(&self) -> usize {
        self.contexts.read().await.len()
    }

    pub(crate) async fn teardown_all(&self) {
        let contexts: Vec<_> = self.contexts.write().await.drain().collect();
        let count = contexts.len();
        for (_, mounted) in contexts {
            mounted.context.teardown();
        }
        metrics::gauge!("session_contexts_mounted").set(0.0);
        tracing::info!(count, "Tore down session contexts");
    }
}
