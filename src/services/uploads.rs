use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::core::config::StorageSettings;
use crate::core::time;
use crate::services::storage::{Bucket, ObjectStore, PutObject, StorageError};

const NO_FILE: &str = "No file provided";

#[derive(Debug, Clone)]
pub(crate) struct UploadFile {
    pub(crate) file_name: String,
    pub(crate) content_type: Option<String>,
    pub(crate) bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct UploadResult {
    pub(crate) success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) file_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) error: Option<String>,
}

impl UploadResult {
    fn stored(file_path: String) -> Self {
        Self { success: true, file_path: Some(file_path), error: None }
    }

    fn failed(error: impl Into<String>) -> Self {
        Self { success: false, file_path: None, error: Some(error.into()) }
    }
}

/// Upload, link and removal helpers over the configured object store.
#[derive(Clone)]
pub(crate) struct Uploader {
    store: Arc<dyn ObjectStore>,
    settings: StorageSettings,
}

impl Uploader {
    pub(crate) fn new(store: Arc<dyn ObjectStore>, settings: StorageSettings) -> Self {
        Self { store, settings }
    }

    pub(crate) fn settings(&self) -> &StorageSettings {
        &self.settings
    }

    /// Stores `file` under `{prefix}/{unix_millis}.{ext}`. Never overwrites and never errors.
    pub(crate) async fn upload(
        &self,
        file: Option<UploadFile>,
        bucket: Bucket,
        prefix: &str,
    ) -> UploadResult {
        let Some(file) = file else {
            return UploadResult::failed(NO_FILE);
        };

        let key = object_key(prefix, &file.file_name, time::unix_millis(time::now_utc()));
        let object = PutObject {
            body: file.bytes,
            content_type: file.content_type,
            cache_control: format!("max-age={}", self.settings.cache_control_seconds),
        };

        match self.store.put_new(bucket.name(&self.settings), &key, object).await {
            Ok(()) => {
                metrics::counter!("uploads_total", "bucket" => bucket.as_str(), "outcome" => "stored")
                    .increment(1);
                tracing::info!(bucket = bucket.as_str(), key = %key, "Stored upload");
                UploadResult::stored(key)
            }
            Err(err) => {
                metrics::counter!("uploads_total", "bucket" => bucket.as_str(), "outcome" => "failed")
                    .increment(1);
                tracing::warn!(bucket = bucket.as_str(), key = %key, error = %err, "Upload failed");
                UploadResult::failed(err.to_string())
            }
        }
    }

    /// Time-limited download link, or `None` when presigning fails.
    pub(crate) async fn signed_url(
        &self,
        bucket: Bucket,
        path: &str,
        expires_in: Option<Duration>,
    ) -> Option<String> {
        let expires_in = expires_in
            .unwrap_or_else(|| Duration::from_secs(self.settings.signed_url_expire_seconds));

        match self.store.presign_get(bucket.name(&self.settings), path, expires_in).await {
            Ok(url) => Some(url),
            Err(err) => {
                tracing::warn!(bucket = bucket.as_str(), path, error = %err, "Failed to sign url");
                None
            }
        }
    }

    pub(crate) fn public_url(&self, bucket: Bucket, path: &str) -> String {
        format!(
            "{}/{}/{}",
            self.settings.public_url.trim_end_matches('/'),
            bucket.name(&self.settings),
            path.trim_start_matches('/')
        )
    }

    pub(crate) async fn remove(&self, bucket: Bucket, path: &str) -> Result<(), StorageError> {
        self.store.remove(bucket.name(&self.settings), path).await
    }
}

pub(crate) fn object_key(prefix: &str, file_name: &str, unix_millis: i128) -> String {
    let prefix = prefix.trim_end_matches('/');
    match file_extension(file_name) {
        Some(ext) => format!("{prefix}/{unix_millis}.{ext}"),
        None => format!("{prefix}/{unix_millis}"),
    }
}

pub(crate) fn file_extension(file_name: &str) -> Option<&str> {
    Path::new(file_name).extension().and_then(|ext| ext.to_str()).filter(|ext| !ext.is_empty())
}
