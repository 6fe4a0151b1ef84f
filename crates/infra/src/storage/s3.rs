//! S3 storage gateway.

use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::Client as S3Client;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use async_trait::async_trait;
use tracing::{debug, error, info};

use super::{JSON_CONTENT_TYPE, ObjectTags, StorageError, StorageGateway, encode_json};

/// Connection settings for [`S3Storage`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageSettings {
    pub bucket: String,
    pub region: String,
    /// Custom endpoint for S3-compatible stores (MinIO, LocalStack, ...).
    pub endpoint_url: Option<String>,
    pub force_path_style: bool,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            bucket: "ai-pitchdeck-uploads".to_string(),
            region: "us-east-1".to_string(),
            endpoint_url: None,
            force_path_style: false,
        }
    }
}

/// S3-backed storage. One client per process; cheap to share behind `Arc`.
#[derive(Debug, Clone)]
pub struct S3Storage {
    client: S3Client,
    bucket: String,
}

impl S3Storage {
    /// Build a client from the default AWS credential chain.
    pub async fn connect(settings: &StorageSettings) -> Self {
        let shared = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(settings.region.clone()))
            .load()
            .await;

        let mut builder = aws_sdk_s3::config::Builder::from(&shared);
        if let Some(endpoint) = &settings.endpoint_url {
            builder = builder.endpoint_url(endpoint);
        }
        builder = builder.force_path_style(settings.force_path_style);

        info!(
            bucket = %settings.bucket,
            region = %settings.region,
            endpoint = ?settings.endpoint_url,
            "S3 storage initialized"
        );

        Self::from_client(S3Client::from_conf(builder.build()), settings.bucket.clone())
    }

    pub fn from_client(client: S3Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[async_trait]
impl StorageGateway for S3Storage {
    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        match self.client.head_object().bucket(&self.bucket).key(key).send().await {
            Ok(_) => {
                debug!(key = key, "object exists");
                Ok(true)
            }
            Err(e) if e.as_service_error().is_some_and(|se| se.is_not_found()) => {
                debug!(key = key, "object does not exist");
                Ok(false)
            }
            Err(e) => {
                error!(key = key, error = %DisplayErrorContext(&e), "failed to check object existence");
                Err(StorageError::Transport(format!(
                    "head {}: {}",
                    key,
                    DisplayErrorContext(&e)
                )))
            }
        }
    }

    async fn download(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        info!(bucket = %self.bucket, key = key, "downloading object");

        let response = match self.client.get_object().bucket(&self.bucket).key(key).send().await {
            Ok(r) => r,
            Err(e) if e.as_service_error().is_some_and(|se| se.is_no_such_key()) => {
                return Err(StorageError::NotFound { key: key.to_string() });
            }
            Err(e) => {
                error!(key = key, error = %DisplayErrorContext(&e), "failed to download object");
                return Err(StorageError::Transport(format!(
                    "get {}: {}",
                    key,
                    DisplayErrorContext(&e)
                )));
            }
        };

        let body = response
            .body
            .collect()
            .await
            .map_err(|e| StorageError::Transport(format!("read body of {}: {}", key, e)))?
            .into_bytes()
            .to_vec();

        info!(key = key, bytes = body.len(), "downloaded object");
        Ok(body)
    }

    async fn upload_json(
        &self,
        key: &str,
        document: &serde_json::Value,
        tags: &ObjectTags,
    ) -> Result<String, StorageError> {
        let body = encode_json(document)?;
        info!(bucket = %self.bucket, key = key, bytes = body.len(), "uploading JSON");

        let mut request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type(JSON_CONTENT_TYPE);
        if !tags.is_empty() {
            request = request.set_metadata(Some(tags.clone()));
        }

        request.send().await.map_err(|e| {
            error!(key = key, error = %DisplayErrorContext(&e), "failed to upload JSON");
            StorageError::Transport(format!("put {}: {}", key, DisplayErrorContext(&e)))
        })?;

        let locator = format!("s3://{}/{}", self.bucket, key);
        info!(locator = %locator, "uploaded JSON");
        Ok(locator)
    }
}
