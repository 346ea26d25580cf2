//! Pholife Vault - Photo Registry Interface
//!
//! The owner-scoped registry collaborator: an append-log of photo rows plus
//! a single private-folder credential slot per owner. Treated as a remote,
//! possibly slow, possibly failing store; the core fails fast and reports,
//! it never retries on its own.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::error::VaultResult;

/// Stable caller identity (wallet address, account id, ...)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OwnerId(String);

impl OwnerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OwnerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One registry row, as persisted.
///
/// `url` is either a bare content URL (public photo) or the JSON pair
/// `{"encrypted": <url>, "thumbnail": <url>}` (private photo); consumers
/// attempt the JSON parse before treating it as a direct URL.
#[derive(Debug, Clone)]
pub struct PhotoRow {
    pub id: String,
    pub url: String,
    pub name: String,
    pub size_bytes: u64,
    pub created_at: DateTime<Utc>,
    pub is_private: bool,
}

/// Owner-scoped photo registry
#[async_trait]
pub trait PhotoRegistry: Send + Sync {
    /// Append a photo row for an owner
    async fn add_photo(&self, owner: &OwnerId, row: PhotoRow) -> VaultResult<()>;

    /// List all photo rows for an owner
    async fn list_photos(&self, owner: &OwnerId) -> VaultResult<Vec<PhotoRow>>;

    /// Read the stored private-folder credential string, if any
    async fn get_private_folder_hash(&self, owner: &OwnerId) -> VaultResult<Option<String>>;

    /// Store (or replace) the private-folder credential string
    async fn set_private_folder_hash(&self, owner: &OwnerId, hash: &str) -> VaultResult<()>;
}

/// Shared handle to a registry
pub type SharedRegistry = Arc<dyn PhotoRegistry>;

// ═══════════════════════════════════════════════════════════════════════════
// In-memory reference implementation
// ═══════════════════════════════════════════════════════════════════════════

/// In-memory registry for tests and examples
#[derive(Default)]
pub struct MemoryRegistry {
    photos: Mutex<HashMap<String, Vec<PhotoRow>>>,
    folders: Mutex<HashMap<String, String>>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PhotoRegistry for MemoryRegistry {
    async fn add_photo(&self, owner: &OwnerId, row: PhotoRow) -> VaultResult<()> {
        self.photos
            .lock()
            .entry(owner.as_str().to_string())
            .or_default()
            .push(row);
        Ok(())
    }

    async fn list_photos(&self, owner: &OwnerId) -> VaultResult<Vec<PhotoRow>> {
        Ok(self
            .photos
            .lock()
            .get(owner.as_str())
            .cloned()
            .unwrap_or_default())
    }

    async fn get_private_folder_hash(&self, owner: &OwnerId) -> VaultResult<Option<String>> {
        Ok(self.folders.lock().get(owner.as_str()).cloned())
    }

    async fn set_private_folder_hash(&self, owner: &OwnerId, hash: &str) -> VaultResult<()> {
        self.folders
            .lock()
            .insert(owner.as_str().to_string(), hash.to_string());
        Ok(())
    }
}

/// Registry wrapper that fails every call, for error-path tests
#[cfg(test)]
pub struct FailingRegistry;

#[cfg(test)]
use crate::error::VaultError;

#[cfg(test)]
#[async_trait]
impl PhotoRegistry for FailingRegistry {
    async fn add_photo(&self, _owner: &OwnerId, _row: PhotoRow) -> VaultResult<()> {
        Err(VaultError::Registry("unreachable".into()))
    }

    async fn list_photos(&self, _owner: &OwnerId) -> VaultResult<Vec<PhotoRow>> {
        Err(VaultError::Registry("unreachable".into()))
    }

    async fn get_private_folder_hash(&self, _owner: &OwnerId) -> VaultResult<Option<String>> {
        Err(VaultError::Registry("unreachable".into()))
    }

    async fn set_private_folder_hash(&self, _owner: &OwnerId, _hash: &str) -> VaultResult<()> {
        Err(VaultError::Registry("unreachable".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: &str, private: bool) -> PhotoRow {
        PhotoRow {
            id: id.to_string(),
            url: format!("mem://{id}"),
            name: format!("{id}.jpg"),
            size_bytes: 123,
            created_at: Utc::now(),
            is_private: private,
        }
    }

    #[tokio::test]
    async fn test_rows_are_owner_scoped() {
        let registry = MemoryRegistry::new();
        let alice = OwnerId::new("alice");
        let bob = OwnerId::new("bob");

        registry.add_photo(&alice, row("a1", false)).await.unwrap();
        registry.add_photo(&alice, row("a2", true)).await.unwrap();
        registry.add_photo(&bob, row("b1", false)).await.unwrap();

        assert_eq!(registry.list_photos(&alice).await.unwrap().len(), 2);
        assert_eq!(registry.list_photos(&bob).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_folder_hash_slot() {
        let registry = MemoryRegistry::new();
        let owner = OwnerId::new("alice");

        assert_eq!(registry.get_private_folder_hash(&owner).await.unwrap(), None);

        registry.set_private_folder_hash(&owner, "stored").await.unwrap();
        assert_eq!(
            registry.get_private_folder_hash(&owner).await.unwrap(),
            Some("stored".to_string())
        );

        // Re-running setup replaces the slot
        registry.set_private_folder_hash(&owner, "replaced").await.unwrap();
        assert_eq!(
            registry.get_private_folder_hash(&owner).await.unwrap(),
            Some("replaced".to_string())
        );
    }
}
