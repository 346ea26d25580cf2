//! Pholife Vault - Content Store Interface
//!
//! The content-addressable storage collaborator. The core assumes ids are
//! derived from content (same bytes, same id) but does not rely on it for
//! correctness.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::crypto::sha256_hex;
use crate::error::{VaultError, VaultResult};

/// Content address of a stored object
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentId(String);

impl ContentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Address bytes by their SHA-256 digest
    pub fn for_bytes(bytes: &[u8]) -> Self {
        Self(sha256_hex(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ContentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Content-addressable storage backend
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Store bytes, returning their content address
    async fn upload(&self, bytes: Vec<u8>, content_type: &str) -> VaultResult<ContentId>;

    /// Retrieve bytes by content address
    async fn fetch(&self, id: &ContentId) -> VaultResult<Vec<u8>>;

    /// Retrieve bytes by one of this store's URLs
    async fn fetch_url(&self, url: &str) -> VaultResult<Vec<u8>>;

    /// Fetchable URL for a content address
    fn url_for(&self, id: &ContentId) -> String;
}

/// Shared handle to a content store
pub type SharedStore = Arc<dyn ContentStore>;

// ═══════════════════════════════════════════════════════════════════════════
// In-memory reference implementation
// ═══════════════════════════════════════════════════════════════════════════

const MEM_URL_PREFIX: &str = "mem://";

/// In-memory content store for tests and examples
#[derive(Default)]
pub struct MemoryStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.objects.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.lock().is_empty()
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn upload(&self, bytes: Vec<u8>, _content_type: &str) -> VaultResult<ContentId> {
        let id = ContentId::for_bytes(&bytes);
        self.objects.lock().insert(id.as_str().to_string(), bytes);
        Ok(id)
    }

    async fn fetch(&self, id: &ContentId) -> VaultResult<Vec<u8>> {
        self.objects
            .lock()
            .get(id.as_str())
            .cloned()
            .ok_or_else(|| VaultError::StorageFetch {
                id: id.to_string(),
                reason: "not found".into(),
            })
    }

    async fn fetch_url(&self, url: &str) -> VaultResult<Vec<u8>> {
        let id = url
            .strip_prefix(MEM_URL_PREFIX)
            .ok_or_else(|| VaultError::StorageFetch {
                id: url.to_string(),
                reason: "not a mem:// url".into(),
            })?;
        self.fetch(&ContentId::new(id)).await
    }

    fn url_for(&self, id: &ContentId) -> String {
        format!("{MEM_URL_PREFIX}{id}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upload_fetch_roundtrip() {
        let store = MemoryStore::new();

        let id = store.upload(b"photo bytes".to_vec(), "image/jpeg").await.unwrap();
        let bytes = store.fetch(&id).await.unwrap();

        assert_eq!(bytes, b"photo bytes");
    }

    #[tokio::test]
    async fn test_content_addressing_is_idempotent() {
        let store = MemoryStore::new();

        let id1 = store.upload(b"same bytes".to_vec(), "image/png").await.unwrap();
        let id2 = store.upload(b"same bytes".to_vec(), "image/png").await.unwrap();

        assert_eq!(id1, id2);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_by_url() {
        let store = MemoryStore::new();

        let id = store.upload(b"linked".to_vec(), "image/gif").await.unwrap();
        let url = store.url_for(&id);
        assert!(url.starts_with("mem://"));

        assert_eq!(store.fetch_url(&url).await.unwrap(), b"linked");
    }

    #[tokio::test]
    async fn test_missing_object_is_fetch_failure() {
        let store = MemoryStore::new();
        let result = store.fetch(&ContentId::new("missing")).await;
        assert!(matches!(result, Err(VaultError::StorageFetch { .. })));
    }
}
