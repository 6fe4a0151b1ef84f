//! In-memory storage for tests/dev.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use super::{JSON_CONTENT_TYPE, ObjectTags, StorageError, StorageGateway, encode_json};

/// An object held by [`InMemoryStorage`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub body: Vec<u8>,
    pub content_type: Option<String>,
    pub tags: ObjectTags,
}

/// In-memory storage for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    objects: RwLock<HashMap<String, StoredObject>>,
    uploads: AtomicUsize,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Seed an input object.
    pub fn insert(&self, key: impl Into<String>, body: impl Into<Vec<u8>>) {
        self.write().insert(
            key.into(),
            StoredObject {
                body: body.into(),
                content_type: None,
                tags: ObjectTags::new(),
            },
        );
    }

    pub fn get(&self, key: &str) -> Option<StoredObject> {
        self.read().get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<_> = self.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    // A panicked writer leaves the map itself intact; keep serving it.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, StoredObject>> {
        self.objects.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, StoredObject>> {
        self.objects.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Number of `upload_json` calls served so far.
    pub fn upload_count(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StorageGateway for InMemoryStorage {
    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.read().contains_key(key))
    }

    async fn download(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        self.read()
            .get(key)
            .map(|o| o.body.clone())
            .ok_or_else(|| StorageError::NotFound { key: key.to_string() })
    }

    async fn upload_json(
        &self,
        key: &str,
        document: &serde_json::Value,
        tags: &ObjectTags,
    ) -> Result<String, StorageError> {
        let body = encode_json(document)?;
        self.write().insert(
            key.to_string(),
            StoredObject {
                body,
                content_type: Some(JSON_CONTENT_TYPE.to_string()),
                tags: tags.clone(),
            },
        );
        self.uploads.fetch_add(1, Ordering::SeqCst);
        Ok(format!("memory://{key}"))
    }
}
