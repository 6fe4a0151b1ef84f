//! Artifact storage gateway.
//!
//! ## Contract
//!
//! - `exists` never fails for a missing key; only transport/auth failures error
//! - `download` fails with [`StorageError::NotFound`] for a missing key
//! - `upload_json` writes pretty-printed JSON with `application/json` content
//!   type and the given tags; it does not enforce write-once, callers do
//!
//! ## Implementations
//!
//! - [`InMemoryStorage`]: tests/dev
//! - [`S3Storage`]: S3 or any S3-compatible endpoint

pub mod memory;
pub mod s3;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use deckgen_core::JobError;

pub use memory::{InMemoryStorage, StoredObject};
pub use s3::{S3Storage, StorageSettings};

/// Key/value tags attached to a stored object.
pub type ObjectTags = HashMap<String, String>;

/// Content type declared for every JSON upload.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Storage gateway error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StorageError {
    #[error("object not found: {key}")]
    NotFound { key: String },
    #[error("storage transport error: {0}")]
    Transport(String),
    #[error("failed to serialize document: {0}")]
    Serialization(String),
}

impl From<StorageError> for JobError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound { key } => JobError::NotFound { key },
            other => JobError::storage(other.to_string()),
        }
    }
}

/// Get/put/exists against the artifact store, keyed by opaque strings.
#[async_trait]
pub trait StorageGateway: Send + Sync {
    /// True iff an object is present at `key`.
    async fn exists(&self, key: &str) -> Result<bool, StorageError>;

    /// Fetch the full object content.
    async fn download(&self, key: &str) -> Result<Vec<u8>, StorageError>;

    /// Write `document` as JSON under `key`. Returns a locator for the object.
    async fn upload_json(
        &self,
        key: &str,
        document: &serde_json::Value,
        tags: &ObjectTags,
    ) -> Result<String, StorageError>;
}

#[async_trait]
impl<S> StorageGateway for Arc<S>
where
    S: StorageGateway + ?Sized,
{
    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        (**self).exists(key).await
    }

    async fn download(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        (**self).download(key).await
    }

    async fn upload_json(
        &self,
        key: &str,
        document: &serde_json::Value,
        tags: &ObjectTags,
    ) -> Result<String, StorageError> {
        (**self).upload_json(key, document, tags).await
    }
}

/// Encode a document the way every backend stores it (2-space indent).
pub fn encode_json(document: &serde_json::Value) -> Result<Vec<u8>, StorageError> {
    serde_json::to_vec_pretty(document).map_err(|e| StorageError::Serialization(e.to_string()))
}
