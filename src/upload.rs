//! Pholife Vault - Upload Pipeline
//!
//! One task per file, joined as a batch. Independent files never abort each
//! other: the report names every success and every failure. Progress events
//! per file move through fixed phases with non-decreasing percentages; no
//! ordering is guaranteed across files.

use std::collections::HashMap;

use chrono::Utc;
use log::{debug, warn};
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::crypto::{self, SymmetricKey};
use crate::error::{VaultError, VaultResult};
use crate::photo::{validate_upload, PhotoRecord, StorageRef};
use crate::registry::{OwnerId, SharedRegistry};
use crate::store::SharedStore;
use crate::thumbs::ThumbnailEngine;

/// One file queued for upload
#[derive(Debug, Clone)]
pub struct UploadItem {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Pipeline phase, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum UploadPhase {
    Validated,
    Thumbnail,
    Encrypted,
    Stored,
    Registered,
}

impl UploadPhase {
    /// Completion percentage for the phase
    pub fn percent(&self) -> u8 {
        match self {
            UploadPhase::Validated => 10,
            UploadPhase::Thumbnail => 30,
            UploadPhase::Encrypted => 55,
            UploadPhase::Stored => 80,
            UploadPhase::Registered => 100,
        }
    }
}

/// Per-file progress event
#[derive(Debug, Clone)]
pub struct UploadEvent {
    pub name: String,
    pub phase: UploadPhase,
}

impl UploadEvent {
    pub fn percent(&self) -> u8 {
        self.phase.percent()
    }
}

/// Progress channel; events are best-effort (a dropped receiver never fails
/// an upload)
pub type ProgressSender = mpsc::UnboundedSender<UploadEvent>;

fn emit(progress: &Option<ProgressSender>, name: &str, phase: UploadPhase) {
    if let Some(tx) = progress {
        let _ = tx.send(UploadEvent {
            name: name.to_string(),
            phase,
        });
    }
}

/// One file that failed, with its error
#[derive(Debug)]
pub struct UploadFailure {
    pub name: String,
    pub error: VaultError,
}

/// Per-file batch result: never all-or-nothing
#[derive(Debug, Default)]
pub struct BatchReport {
    pub succeeded: Vec<PhotoRecord>,
    pub failed: Vec<UploadFailure>,
}

impl BatchReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Batch entry points
// ═══════════════════════════════════════════════════════════════════════════

/// Upload a batch of public photos
pub async fn upload_public_batch(
    store: SharedStore,
    registry: SharedRegistry,
    owner: OwnerId,
    items: Vec<UploadItem>,
    progress: Option<ProgressSender>,
) -> BatchReport {
    let mut tasks = JoinSet::new();
    let mut names = HashMap::new();
    for item in items {
        let store = store.clone();
        let registry = registry.clone();
        let owner = owner.clone();
        let progress = progress.clone();
        let task_name = item.name.clone();
        let handle = tasks.spawn(async move {
            let name = item.name.clone();
            (name, upload_public_file(store, registry, owner, item, progress).await)
        });
        names.insert(handle.id(), task_name);
    }
    collect(tasks, names).await
}

/// Upload a batch of private photos under the session key
pub async fn upload_private_batch(
    store: SharedStore,
    registry: SharedRegistry,
    owner: OwnerId,
    key: SymmetricKey,
    thumbs: ThumbnailEngine,
    items: Vec<UploadItem>,
    progress: Option<ProgressSender>,
) -> BatchReport {
    let mut tasks = JoinSet::new();
    let mut names = HashMap::new();
    for item in items {
        let store = store.clone();
        let registry = registry.clone();
        let owner = owner.clone();
        let key = key.clone();
        let progress = progress.clone();
        let task_name = item.name.clone();
        let handle = tasks.spawn(async move {
            let name = item.name.clone();
            (
                name,
                upload_private_file(store, registry, owner, key, thumbs, item, progress).await,
            )
        });
        names.insert(handle.id(), task_name);
    }
    collect(tasks, names).await
}

async fn collect(
    mut tasks: JoinSet<(String, VaultResult<PhotoRecord>)>,
    mut names: HashMap<tokio::task::Id, String>,
) -> BatchReport {
    let mut report = BatchReport::default();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((name, Ok(record))) => {
                debug!("uploaded {name} as {}", record.id);
                report.succeeded.push(record);
            }
            Ok((name, Err(error))) => {
                warn!("upload of {name} failed: {error}");
                report.failed.push(UploadFailure { name, error });
            }
            Err(e) => {
                // Task panicked or was cancelled; recover the file name
                // from the task id so the report still names it
                let name = names
                    .remove(&e.id())
                    .unwrap_or_else(|| "<unknown>".to_string());
                warn!("upload task for {name} died: {e}");
                let error = VaultError::StorageUpload {
                    name: name.clone(),
                    reason: format!("upload task failed: {e}"),
                };
                report.failed.push(UploadFailure { name, error });
            }
        }
    }
    report
}

// ═══════════════════════════════════════════════════════════════════════════
// Per-file pipelines
// ═══════════════════════════════════════════════════════════════════════════

async fn upload_public_file(
    store: SharedStore,
    registry: SharedRegistry,
    owner: OwnerId,
    item: UploadItem,
    progress: Option<ProgressSender>,
) -> VaultResult<PhotoRecord> {
    let UploadItem { name, bytes } = item;
    let size_bytes = bytes.len() as u64;

    let mime = validate_upload(&name, &bytes)?;
    emit(&progress, &name, UploadPhase::Validated);

    let id = store
        .upload(bytes, mime)
        .await
        .map_err(|e| upload_error(&name, e))?;
    emit(&progress, &name, UploadPhase::Stored);

    let record = PhotoRecord {
        id: id.to_string(),
        storage_ref: StorageRef::Plain(store.url_for(&id)),
        name: name.clone(),
        size_bytes,
        created_at: Utc::now(),
        is_private: false,
    };

    registry.add_photo(&owner, record.to_row()).await?;
    emit(&progress, &name, UploadPhase::Registered);

    Ok(record)
}

async fn upload_private_file(
    store: SharedStore,
    registry: SharedRegistry,
    owner: OwnerId,
    key: SymmetricKey,
    thumbs: ThumbnailEngine,
    item: UploadItem,
    progress: Option<ProgressSender>,
) -> VaultResult<PhotoRecord> {
    let UploadItem { name, bytes } = item;
    let size_bytes = bytes.len() as u64;

    validate_upload(&name, &bytes)?;
    emit(&progress, &name, UploadPhase::Validated);

    // Thumbnail and encryption are CPU-bound; keep them off the runtime
    // worker threads.
    let (thumb, blob) = {
        let plaintext = bytes;
        tokio::task::spawn_blocking(move || -> VaultResult<_> {
            let thumb = thumbs.generate(&plaintext)?;
            let blob = crypto::encrypt(&key, &plaintext)?;
            Ok((thumb, blob))
        })
        .await
        .map_err(|e| VaultError::CryptoPrimitive(format!("worker failed: {e}")))??
    };
    emit(&progress, &name, UploadPhase::Thumbnail);
    emit(&progress, &name, UploadPhase::Encrypted);

    let (encrypted_id, thumbnail_id) = tokio::try_join!(
        store.upload(blob.to_bytes(), "application/encrypted"),
        store.upload(thumb, "image/jpeg"),
    )
    .map_err(|e| upload_error(&name, e))?;
    emit(&progress, &name, UploadPhase::Stored);

    let record = PhotoRecord {
        id: encrypted_id.to_string(),
        storage_ref: StorageRef::Private {
            encrypted_url: store.url_for(&encrypted_id),
            thumbnail_url: store.url_for(&thumbnail_id),
        },
        name: name.clone(),
        size_bytes,
        created_at: Utc::now(),
        is_private: true,
    };

    registry.add_photo(&owner, record.to_row()).await?;
    emit(&progress, &name, UploadPhase::Registered);

    Ok(record)
}

fn upload_error(name: &str, source: VaultError) -> VaultError {
    match source {
        e @ VaultError::StorageUpload { .. } => e,
        other => VaultError::StorageUpload {
            name: name.to_string(),
            reason: other.to_string(),
        },
    }
}
