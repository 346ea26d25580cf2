//! Pholife Vault - Photo Library
//!
//! Composition root: owns the record set, the private folder state machine,
//! and the decrypted-artifact cache, and wires them to the storage and
//! registry collaborators. Lock and disconnect release artifacts in the
//! same call that destroys the session, so no decrypted bytes survive the
//! transition.

use chrono::{DateTime, Utc};
use log::{debug, info};
use parking_lot::RwLock;
use tokio::task::JoinSet;

use crate::error::{VaultError, VaultResult};
use crate::gallery::{
    build_gallery, ArtifactCache, DecryptedArtifact, GalleryView, SortOrder, Visibility,
};
use crate::photo::{detect_mime, PhotoRecord, StorageRef};
use crate::registry::{OwnerId, SharedRegistry};
use crate::store::SharedStore;
use crate::thumbs::ThumbnailEngine;
use crate::upload::{
    upload_private_batch, upload_public_batch, BatchReport, ProgressSender, UploadItem,
};
use crate::vault::{FolderState, PrivateFolder};

/// Per-record result of a decrypt-all-private pass
#[derive(Debug, Default)]
pub struct DecryptReport {
    /// Record ids now backed by a cached artifact
    pub decrypted: Vec<String>,
    /// Records whose fetch or decrypt failed; their thumbnails stay up
    pub failed: Vec<(String, VaultError)>,
    /// Results discarded because the folder locked mid-flight
    pub discarded: usize,
}

/// One owner's photo library
pub struct PhotoLibrary {
    store: SharedStore,
    registry: SharedRegistry,
    owner: OwnerId,
    folder: PrivateFolder,
    thumbs: ThumbnailEngine,
    records: RwLock<Vec<PhotoRecord>>,
    artifacts: ArtifactCache,
}

impl PhotoLibrary {
    /// Connect a library for an owner, loading the folder state from the
    /// registry
    pub async fn connect(
        store: SharedStore,
        registry: SharedRegistry,
        owner: OwnerId,
    ) -> VaultResult<Self> {
        let folder = PrivateFolder::load(registry.clone(), owner.clone()).await?;
        Ok(Self {
            store,
            registry,
            owner,
            folder,
            thumbs: ThumbnailEngine::default(),
            records: RwLock::new(Vec::new()),
            artifacts: ArtifactCache::new(),
        })
    }

    // ═══════════════════════════════════════════════════════════════════════
    // FOLDER LIFECYCLE
    // ═══════════════════════════════════════════════════════════════════════

    pub fn vault_state(&self) -> FolderState {
        self.folder.state()
    }

    /// Set up (or replace) the private folder password
    pub async fn setup_private(&self, password: &str, confirm: &str) -> VaultResult<()> {
        self.folder.setup(password, confirm).await
    }

    /// Unlock the private folder
    pub fn unlock(&self, password: &str) -> VaultResult<()> {
        self.folder.unlock(password)
    }

    /// Lock the private folder and release every decrypted artifact
    pub fn lock(&self) {
        self.folder.lock();
        let released = self.artifacts.release_all();
        if released > 0 {
            debug!("released {released} decrypted artifacts on lock");
        }
    }

    /// Identity disconnect: force the lock and clear the record set
    pub fn disconnect(&self) {
        self.folder.disconnect();
        self.artifacts.release_all();
        self.records.write().clear();
        info!("disconnected {}", self.owner);
    }

    // ═══════════════════════════════════════════════════════════════════════
    // RECORDS
    // ═══════════════════════════════════════════════════════════════════════

    /// Reload the record set from the registry, replacing the in-memory set
    /// and releasing stale artifacts. Returns the record count.
    pub async fn refresh(&self) -> VaultResult<usize> {
        let rows = self.registry.list_photos(&self.owner).await?;
        let records: Vec<PhotoRecord> = rows.into_iter().map(PhotoRecord::from_row).collect();
        let count = records.len();

        self.artifacts.release_all();
        *self.records.write() = records;
        Ok(count)
    }

    /// Snapshot of the session record set
    pub fn records(&self) -> Vec<PhotoRecord> {
        self.records.read().clone()
    }

    // ═══════════════════════════════════════════════════════════════════════
    // UPLOADS
    // ═══════════════════════════════════════════════════════════════════════

    /// Upload a batch of public photos; successes are appended to the
    /// record set
    pub async fn upload(&self, items: Vec<UploadItem>, progress: Option<ProgressSender>) -> BatchReport {
        let report = upload_public_batch(
            self.store.clone(),
            self.registry.clone(),
            self.owner.clone(),
            items,
            progress,
        )
        .await;
        self.records.write().extend(report.succeeded.iter().cloned());
        report
    }

    /// Upload a batch of private photos under the session key.
    ///
    /// Requires the folder to be `Unlocked`.
    pub async fn upload_private(
        &self,
        items: Vec<UploadItem>,
        progress: Option<ProgressSender>,
    ) -> VaultResult<BatchReport> {
        let key = self.folder.session_key()?;
        let report = upload_private_batch(
            self.store.clone(),
            self.registry.clone(),
            self.owner.clone(),
            key,
            self.thumbs,
            items,
            progress,
        )
        .await;
        self.records.write().extend(report.succeeded.iter().cloned());
        Ok(report)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // DISPLAY
    // ═══════════════════════════════════════════════════════════════════════

    /// Decrypt every private record into the artifact cache, one task per
    /// file, reporting per-file failures.
    ///
    /// Each task captures the session epoch at start; if the folder locks
    /// while a decrypt is in flight, the result is discarded instead of
    /// re-arming a dead session.
    pub async fn hydrate_private(&self) -> VaultResult<DecryptReport> {
        let (key, epoch) = self.folder.session_key_epoch()?;

        let pending: Vec<(String, String)> = self
            .records
            .read()
            .iter()
            .filter(|r| r.is_private && !self.artifacts.contains(&r.id))
            .filter_map(|r| match &r.storage_ref {
                StorageRef::Private { encrypted_url, .. } => {
                    Some((r.id.clone(), encrypted_url.clone()))
                }
                StorageRef::Plain(_) => None,
            })
            .collect();

        let mut tasks = JoinSet::new();
        for (id, url) in pending {
            let store = self.store.clone();
            let key = key.clone();
            tasks.spawn(async move {
                let result = decrypt_one(store, &url, key).await;
                (id, result)
            });
        }

        let mut report = DecryptReport::default();
        while let Some(joined) = tasks.join_next().await {
            let Ok((id, result)) = joined else { continue };
            match result {
                Ok(bytes) => {
                    let mime = detect_mime(&bytes)
                        .unwrap_or("application/octet-stream")
                        .to_string();
                    // The epoch check runs under the cache lock that
                    // `lock()` releases artifacts with, and the epoch bump
                    // happens before that release: a result from a dead
                    // epoch is either rejected here or swept immediately.
                    let inserted = self.artifacts.insert_if(
                        DecryptedArtifact {
                            photo_id: id.clone(),
                            mime,
                            bytes,
                        },
                        || self.folder.current_epoch() == epoch,
                    );
                    if inserted.is_some() {
                        report.decrypted.push(id);
                    } else {
                        report.discarded += 1;
                    }
                }
                Err(e) => report.failed.push((id, e)),
            }
        }
        Ok(report)
    }

    /// Build the gallery view against wall-clock now
    pub fn gallery(&self, visibility: Visibility, sort: SortOrder) -> GalleryView {
        self.gallery_at(visibility, sort, Utc::now())
    }

    /// Build the gallery view against a fixed "now"
    pub fn gallery_at(
        &self,
        visibility: Visibility,
        sort: SortOrder,
        now: DateTime<Utc>,
    ) -> GalleryView {
        build_gallery(
            &self.records.read(),
            visibility,
            sort,
            self.folder.is_unlocked(),
            &self.artifacts,
            now,
        )
    }

    /// Number of live decrypted artifacts
    pub fn artifact_count(&self) -> usize {
        self.artifacts.len()
    }

    pub fn owner(&self) -> &OwnerId {
        &self.owner
    }
}

async fn decrypt_one(
    store: SharedStore,
    url: &str,
    key: crate::crypto::SymmetricKey,
) -> VaultResult<Vec<u8>> {
    let stored = store.fetch_url(url).await?;
    tokio::task::spawn_blocking(move || {
        let blob = crate::crypto::EncryptedBlob::from_bytes(&stored)?;
        crate::crypto::decrypt(&key, &blob)
    })
    .await
    .map_err(|e| VaultError::CryptoPrimitive(format!("worker failed: {e}")))?
}
