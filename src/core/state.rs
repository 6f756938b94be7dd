use std::sync::Arc;

use crate::core::{config::Settings, redis::RedisHandle};
use crate::repositories::RecordStore;
use crate::services::identity::IdentityConnector;
use crate::services::session_registry::SessionRegistry;
use crate::services::uploads::Uploader;

#[derive(Clone)]
pub(crate) struct AppState {
    inner: Arc<InnerState>,
}

struct InnerState {
    settings: Settings,
    records: Arc<dyn RecordStore>,
    redis: RedisHandle,
    uploads: Option<Uploader>,
    sessions: SessionRegistry,
}

impl AppState {
    pub(crate) fn new(
        settings: Settings,
        records: Arc<dyn RecordStore>,
        redis: RedisHandle,
        uploads: Option<Uploader>,
        connector: Arc<dyn IdentityConnector>,
    ) -> Self {
        let sessions = SessionRegistry::new(connector, Arc::clone(&records));
        Self { inner: Arc::new(InnerState { settings, records, redis, uploads, sessions }) }
    }

    pub(crate) fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    pub(crate) fn records(&self) -> &dyn RecordStore {
        self.inner.records.as_ref()
    }

    pub(crate) fn redis(&self) -> &RedisHandle {
        &self.inner.redis
    }

    pub(crate) fn uploads(&self) -> Option<&Uploader> {
        self.inner.uploads.as_ref()
    }

    pub(crate) fn sessions(&self) -> &SessionRegistry {
        &self.inner.sessions
    }
}
