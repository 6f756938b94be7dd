pub(crate) mod api;
pub(crate) mod core;
pub(crate) mod db;
pub(crate) mod repositories;
pub(crate) mod schemas;
pub(crate) mod services;
pub(crate) mod tasks;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

use tokio::sync::watch;

use crate::core::{config::Settings, redis::RedisHandle, state::AppState, telemetry};
use crate::repositories::PgStore;
use crate::services::identity::gotrue::GoTrueConnector;
use crate::services::storage::S3ObjectStore;
use crate::services::uploads::Uploader;

pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;
    telemetry::init_tracing(&settings)?;
    core::metrics::init(&settings)?;

    let db_pool = db::init_pool(&settings).await?;
    db::run_migrations(&db_pool).await?;

    let redis = RedisHandle::new(settings.redis().redis_url());
    if let Err(err) = redis.connect().await {
        tracing::error!(error = %err, "Failed to connect to Redis; continuing without rate limiting");
    } else {
        tracing::info!("Redis connected successfully");
    }

    let uploads = match S3ObjectStore::from_settings(&settings).await? {
        Some(store) => Some(Uploader::new(Arc::new(store), settings.storage().clone())),
        None => {
            tracing::warn!("Object storage is not configured; uploads and downloads are disabled");
            None
        }
    };
    let connector = GoTrueConnector::from_settings(&settings)?;

    let state =
        AppState::new(settings, Arc::new(PgStore::new(db_pool)), redis, uploads, Arc::new(connector));
    let app = api::router::router(state.clone());
    let listener = tokio::net::TcpListener::bind(state.settings().server_addr()).await?;

    tracing::info!(
        host = %state.settings().server_host(),
        port = state.settings().server_port(),
        environment = %state.settings().runtime().environment.as_str(),
        "ExamVerse API listening"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweeper = tasks::session_sweeper::spawn(state.clone(), shutdown_rx);

    let result =
        axum::serve(listener, app).with_graceful_shutdown(core::shutdown::shutdown_signal()).await;

    if shutdown_tx.send(true).is_err() {
        tracing::warn!("Failed to broadcast shutdown signal to background tasks");
    }
    if let Err(err) = sweeper.await {
        tracing::error!(error = %err, "Session sweeper join failed");
    }
    core::shutdown::drain(&state).await;

    result?;

    Ok(())
}
