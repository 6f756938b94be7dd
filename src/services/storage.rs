use std::time::Duration;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use thiserror::Error;

use crate::core::config::{Settings, StorageSettings};

/// Storage partitions the application writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Bucket {
    ExamPapers,
    Submissions,
}

impl Bucket {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::ExamPapers => "exam_papers",
            Self::Submissions => "submissions",
        }
    }

    /// Configured bucket name.
    pub(crate) fn name(self, settings: &StorageSettings) -> &str {
        match self {
            Self::ExamPapers => &settings.exam_papers_bucket,
            Self::Submissions => &settings.submissions_bucket,
        }
    }
}

#[derive(Debug, Error)]
pub(crate) enum StorageError {
    #[error("object already exists: {0}")]
    AlreadyExists(String),
    #[error("{0}")]
    Provider(String),
    #[error("failed to presign url: {0}")]
    Presign(String),
}

#[derive(Debug, Clone)]
pub(crate) struct PutObject {
    pub(crate) body: Vec<u8>,
    pub(crate) content_type: Option<String>,
    pub(crate) cache_control: String,
}

#[async_trait]
pub(crate) trait ObjectStore: Send + Sync {
    /// Stores a new object; fails with `AlreadyExists` instead of overwriting.
    async fn put_new(&self, bucket: &str, key: &str, object: PutObject) -> Result<(), StorageError>;

    async fn presign_get(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> Result<String, StorageError>;

    async fn remove(&self, bucket: &str, key: &str) -> Result<(), StorageError>;
}

#[derive(Debug, Clone)]
pub(crate) struct S3ObjectStore {
    client: Client,
}

impl S3ObjectStore {
    pub(crate) async fn from_settings(settings: &Settings) -> anyhow::Result<Option<Self>> {
        if !settings.s3().is_configured() {
            return Ok(None);
        }

        let creds = Credentials::new(
            settings.s3().access_key.clone(),
            settings.s3().secret_key.clone(),
            None,
            None,
            "examverse-static",
        );

        let config = aws_config::defaults(BehaviorVersion::latest())
            .endpoint_url(settings.s3().endpoint.clone())
            .region(aws_config::Region::new(settings.s3().region.clone()))
            .credentials_provider(creds)
            .load()
            .await;

        let s3_config = aws_sdk_s3::config::Builder::from(&config).force_path_style(true).build();

        Ok(Some(Self { client: Client::from_conf(s3_config) }))
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put_new(&self, bucket: &str, key: &str, object: PutObject) -> Result<(), StorageError> {
        let mut request = self
            .client
            .put_object()
            .bucket(bucket)
            .key(key)
            .if_none_match("*")
            .cache_control(object.cache_control)
            .body(ByteStream::from(object.body));
        if let Some(content_type) = object.content_type {
            request = request.content_type(content_type);
        }

        request.send().await.map(|_| ()).map_err(|err| {
            let status = err.raw_response().map(|response| response.status().as_u16());
            if status == Some(412) {
                StorageError::AlreadyExists(key.to_string())
            } else {
                StorageError::Provider(DisplayErrorContext(&err).to_string())
            }
        })
    }

    async fn presign_get(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> Result<String, StorageError> {
        let config = PresigningConfig::expires_in(expires_in)
            .map_err(|err| StorageError::Presign(err.to_string()))?;

        let presigned = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .presigned(config)
            .await
            .map_err(|err| StorageError::Presign(DisplayErrorContext(&err).to_string()))?;

        Ok(presigned.uri().to_string())
    }

    async fn remove(&self, bucket: &str, key: &str) -> Result<(), StorageError> {
        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map(|_| ())
            .map_err(|err| StorageError::Provider(DisplayErrorContext(&err).to_string()))
    }
}
