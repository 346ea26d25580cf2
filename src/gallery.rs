//! Pholife Vault - Gallery Index
//!
//! Turns the session record set into a display-ready view: visibility
//! filter gated by the folder state, newest/oldest sort, and time buckets
//! (Today / Yesterday / This Week / This Month / Older) computed against
//! "now" at evaluation time.
//!
//! Decrypted photo bytes are handed out as weak handles into an
//! [`ArtifactCache`]; releasing the cache (on lock, disconnect, or record
//! set change) kills every outstanding handle at once, so no artifact can
//! outlive its unlocked session.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;

use crate::photo::{PhotoRecord, StorageRef};

/// Requested visibility tier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Public,
    Private,
}

/// Sort direction over `created_at`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Newest,
    Oldest,
}

// ═══════════════════════════════════════════════════════════════════════════
// Time buckets
// ═══════════════════════════════════════════════════════════════════════════

/// Display partition of records by age, highest priority first: a photo
/// from today is never placed in "This Week".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GalleryBucket {
    Today,
    Yesterday,
    ThisWeek,
    ThisMonth,
    Older,
}

impl GalleryBucket {
    /// Fixed display order
    pub const DISPLAY_ORDER: [GalleryBucket; 5] = [
        GalleryBucket::Today,
        GalleryBucket::Yesterday,
        GalleryBucket::ThisWeek,
        GalleryBucket::ThisMonth,
        GalleryBucket::Older,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            GalleryBucket::Today => "Today",
            GalleryBucket::Yesterday => "Yesterday",
            GalleryBucket::ThisWeek => "This Week",
            GalleryBucket::ThisMonth => "This Month",
            GalleryBucket::Older => "Older",
        }
    }

    /// Bucket for a timestamp relative to `now`
    pub fn for_timestamp(created_at: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        let date = created_at.date_naive();
        let today = now.date_naive();

        // Clock skew can put a record ahead of `now`; clamp it into Today
        // so it never sorts behind today's photos.
        if date >= today {
            GalleryBucket::Today
        } else if date == today - Duration::days(1) {
            GalleryBucket::Yesterday
        } else if date > today - Duration::days(7) {
            GalleryBucket::ThisWeek
        } else if date > today - Duration::days(30) {
            GalleryBucket::ThisMonth
        } else {
            GalleryBucket::Older
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Decrypted artifacts
// ═══════════════════════════════════════════════════════════════════════════

/// Decrypted photo bytes held for display
pub struct DecryptedArtifact {
    pub photo_id: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

/// Weak handle to a cached artifact.
///
/// Dies the moment the cache releases the entry; holders fall back to the
/// plaintext thumbnail.
#[derive(Clone)]
pub struct ArtifactHandle {
    inner: Weak<DecryptedArtifact>,
}

impl ArtifactHandle {
    /// Upgrade to the artifact, if the owning session is still live
    pub fn get(&self) -> Option<Arc<DecryptedArtifact>> {
        self.inner.upgrade()
    }

    pub fn is_alive(&self) -> bool {
        self.inner.strong_count() > 0
    }
}

/// Cache of decrypted artifacts, keyed by photo id.
///
/// Every entry obtained must have a corresponding release: `release_all`
/// runs on lock, disconnect, and record-set replacement.
#[derive(Default)]
pub struct ArtifactCache {
    entries: Mutex<HashMap<String, Arc<DecryptedArtifact>>>,
}

impl ArtifactCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert (or supersede) an artifact, returning a handle to it
    pub fn insert(&self, artifact: DecryptedArtifact) -> ArtifactHandle {
        let arc = Arc::new(artifact);
        let handle = ArtifactHandle {
            inner: Arc::downgrade(&arc),
        };
        self.entries.lock().insert(arc.photo_id.clone(), arc);
        handle
    }

    /// Insert only if `live` still holds, evaluated under the entries lock.
    ///
    /// `release_all` takes the same lock, so a caller whose liveness check
    /// keys off state that changes before `release_all` runs (the session
    /// epoch) can never slip an entry past a concurrent release: either the
    /// check fails here, or the entry lands first and the release sweeps it.
    pub fn insert_if(
        &self,
        artifact: DecryptedArtifact,
        live: impl FnOnce() -> bool,
    ) -> Option<ArtifactHandle> {
        let mut entries = self.entries.lock();
        if !live() {
            return None;
        }
        let arc = Arc::new(artifact);
        let handle = ArtifactHandle {
            inner: Arc::downgrade(&arc),
        };
        entries.insert(arc.photo_id.clone(), arc);
        Some(handle)
    }

    /// Handle to a cached artifact, if present
    pub fn handle(&self, photo_id: &str) -> Option<ArtifactHandle> {
        self.entries.lock().get(photo_id).map(|arc| ArtifactHandle {
            inner: Arc::downgrade(arc),
        })
    }

    pub fn contains(&self, photo_id: &str) -> bool {
        self.entries.lock().contains_key(photo_id)
    }

    /// Release a single artifact
    pub fn release(&self, photo_id: &str) {
        self.entries.lock().remove(photo_id);
    }

    /// Release everything, killing all outstanding handles. Returns the
    /// number of artifacts dropped.
    pub fn release_all(&self) -> usize {
        let mut entries = self.entries.lock();
        let count = entries.len();
        entries.clear();
        count
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// View building
// ═══════════════════════════════════════════════════════════════════════════

/// What a tile renders from
#[derive(Clone)]
pub enum TileSource {
    /// Public photo: fetchable URL
    Plain(String),
    /// Private photo with a live decrypted artifact
    Decrypted(ArtifactHandle),
    /// Private photo whose artifact is not ready; plaintext thumbnail
    /// fallback, never a blank tile
    Thumbnail(String),
}

/// One photo in the view
pub struct GalleryTile {
    pub record: PhotoRecord,
    pub source: TileSource,
}

/// One non-empty bucket, in display order
pub struct GallerySection {
    pub bucket: GalleryBucket,
    pub tiles: Vec<GalleryTile>,
}

/// Display-ready gallery view
pub struct GalleryView {
    pub sections: Vec<GallerySection>,
}

impl GalleryView {
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn total(&self) -> usize {
        self.sections.iter().map(|s| s.tiles.len()).sum()
    }
}

/// Build the gallery view.
///
/// Private records are only included when the folder is unlocked; a locked
/// (or unset) folder yields an empty private view. Buckets come back in
/// [`GalleryBucket::DISPLAY_ORDER`] with empty buckets omitted; within a
/// bucket, tiles keep the requested sort order.
pub fn build_gallery(
    records: &[PhotoRecord],
    visibility: Visibility,
    sort: SortOrder,
    unlocked: bool,
    artifacts: &ArtifactCache,
    now: DateTime<Utc>,
) -> GalleryView {
    let want_private = visibility == Visibility::Private;
    if want_private && !unlocked {
        return GalleryView {
            sections: Vec::new(),
        };
    }

    let mut filtered: Vec<&PhotoRecord> = records
        .iter()
        .filter(|r| r.is_private == want_private)
        .collect();

    filtered.sort_by(|a, b| match sort {
        SortOrder::Newest => b.created_at.cmp(&a.created_at),
        SortOrder::Oldest => a.created_at.cmp(&b.created_at),
    });

    let mut buckets: HashMap<GalleryBucket, Vec<GalleryTile>> = HashMap::new();
    for record in filtered {
        let bucket = GalleryBucket::for_timestamp(record.created_at, now);
        let source = tile_source(record, artifacts);
        buckets.entry(bucket).or_default().push(GalleryTile {
            record: record.clone(),
            source,
        });
    }

    let sections = GalleryBucket::DISPLAY_ORDER
        .into_iter()
        .filter_map(|bucket| {
            buckets.remove(&bucket).map(|tiles| GallerySection { bucket, tiles })
        })
        .collect();

    GalleryView { sections }
}

fn tile_source(record: &PhotoRecord, artifacts: &ArtifactCache) -> TileSource {
    match &record.storage_ref {
        StorageRef::Plain(url) => TileSource::Plain(url.clone()),
        StorageRef::Private { thumbnail_url, .. } => {
            match artifacts.handle(&record.id).filter(|h| h.is_alive()) {
                Some(handle) => TileSource::Decrypted(handle),
                None => TileSource::Thumbnail(thumbnail_url.clone()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(id: &str, created_at: DateTime<Utc>, private: bool) -> PhotoRecord {
        let storage_ref = if private {
            StorageRef::Private {
                encrypted_url: format!("mem://{id}-enc"),
                thumbnail_url: format!("mem://{id}-thumb"),
            }
        } else {
            StorageRef::Plain(format!("mem://{id}"))
        };
        PhotoRecord {
            id: id.to_string(),
            storage_ref,
            name: format!("{id}.jpg"),
            size_bytes: 100,
            created_at,
            is_private: private,
        }
    }

    fn fixed_now() -> DateTime<Utc> {
        // A Wednesday, mid-month
        Utc.with_ymd_and_hms(2024, 6, 19, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_bucketing_one_record_per_bucket() {
        let now = fixed_now();
        let records = vec![
            record("today", now - Duration::hours(3), false),
            record("yesterday", now - Duration::days(1), false),
            record("six-days", now - Duration::days(6), false),
            record("this-month", now - Duration::days(15), false),
            record("old", now - Duration::days(400), false),
        ];

        let cache = ArtifactCache::new();
        let view = build_gallery(
            &records,
            Visibility::Public,
            SortOrder::Newest,
            false,
            &cache,
            now,
        );

        let labels: Vec<_> = view.sections.iter().map(|s| s.bucket).collect();
        assert_eq!(
            labels,
            vec![
                GalleryBucket::Today,
                GalleryBucket::Yesterday,
                GalleryBucket::ThisWeek,
                GalleryBucket::ThisMonth,
                GalleryBucket::Older,
            ]
        );
        for section in &view.sections {
            assert_eq!(section.tiles.len(), 1);
        }
    }

    #[test]
    fn test_today_never_lands_in_this_week() {
        let now = fixed_now();
        assert_eq!(
            GalleryBucket::for_timestamp(now - Duration::hours(1), now),
            GalleryBucket::Today
        );
        assert_eq!(
            GalleryBucket::for_timestamp(now - Duration::days(1), now),
            GalleryBucket::Yesterday
        );
    }

    #[test]
    fn test_future_timestamp_clamps_to_today() {
        let now = fixed_now();
        assert_eq!(
            GalleryBucket::for_timestamp(now + Duration::hours(5), now),
            GalleryBucket::Today
        );
        assert_eq!(
            GalleryBucket::for_timestamp(now + Duration::days(3), now),
            GalleryBucket::Today
        );
    }

    #[test]
    fn test_month_window_is_rolling() {
        let now = fixed_now();
        assert_eq!(
            GalleryBucket::for_timestamp(now - Duration::days(20), now),
            GalleryBucket::ThisMonth
        );
        assert_eq!(
            GalleryBucket::for_timestamp(now - Duration::days(35), now),
            GalleryBucket::Older
        );
    }

    #[test]
    fn test_empty_buckets_omitted() {
        let now = fixed_now();
        let records = vec![record("only-today", now, false)];

        let cache = ArtifactCache::new();
        let view = build_gallery(
            &records,
            Visibility::Public,
            SortOrder::Newest,
            false,
            &cache,
            now,
        );

        assert_eq!(view.sections.len(), 1);
        assert_eq!(view.sections[0].bucket, GalleryBucket::Today);
    }

    #[test]
    fn test_sort_order() {
        let now = fixed_now();
        let t1 = now - Duration::hours(6);
        let t2 = now - Duration::hours(4);
        let t3 = now - Duration::hours(2);
        // Insertion order t1, t3, t2
        let records = vec![
            record("r1", t1, false),
            record("r3", t3, false),
            record("r2", t2, false),
        ];
        let cache = ArtifactCache::new();

        let newest = build_gallery(
            &records,
            Visibility::Public,
            SortOrder::Newest,
            false,
            &cache,
            now,
        );
        let ids: Vec<_> = newest.sections[0]
            .tiles
            .iter()
            .map(|t| t.record.id.as_str())
            .collect();
        assert_eq!(ids, vec!["r3", "r2", "r1"]);

        let oldest = build_gallery(
            &records,
            Visibility::Public,
            SortOrder::Oldest,
            false,
            &cache,
            now,
        );
        let ids: Vec<_> = oldest.sections[0]
            .tiles
            .iter()
            .map(|t| t.record.id.as_str())
            .collect();
        assert_eq!(ids, vec!["r1", "r2", "r3"]);
    }

    #[test]
    fn test_visibility_filter() {
        let now = fixed_now();
        let records = vec![
            record("pub", now, false),
            record("priv", now, true),
        ];
        let cache = ArtifactCache::new();

        let public = build_gallery(
            &records,
            Visibility::Public,
            SortOrder::Newest,
            true,
            &cache,
            now,
        );
        assert_eq!(public.total(), 1);
        assert_eq!(public.sections[0].tiles[0].record.id, "pub");

        let private = build_gallery(
            &records,
            Visibility::Private,
            SortOrder::Newest,
            true,
            &cache,
            now,
        );
        assert_eq!(private.total(), 1);
        assert_eq!(private.sections[0].tiles[0].record.id, "priv");
    }

    #[test]
    fn test_locked_folder_hides_private_records() {
        let now = fixed_now();
        let records = vec![record("priv", now, true)];
        let cache = ArtifactCache::new();

        let view = build_gallery(
            &records,
            Visibility::Private,
            SortOrder::Newest,
            false,
            &cache,
            now,
        );
        assert!(view.is_empty());
    }

    #[test]
    fn test_private_tile_falls_back_to_thumbnail() {
        let now = fixed_now();
        let records = vec![record("priv", now, true)];
        let cache = ArtifactCache::new();

        let view = build_gallery(
            &records,
            Visibility::Private,
            SortOrder::Newest,
            true,
            &cache,
            now,
        );
        match &view.sections[0].tiles[0].source {
            TileSource::Thumbnail(url) => assert_eq!(url, "mem://priv-thumb"),
            _ => panic!("expected thumbnail fallback"),
        }
    }

    #[test]
    fn test_private_tile_uses_cached_artifact() {
        let now = fixed_now();
        let records = vec![record("priv", now, true)];
        let cache = ArtifactCache::new();
        cache.insert(DecryptedArtifact {
            photo_id: "priv".into(),
            mime: "image/jpeg".into(),
            bytes: vec![1, 2, 3],
        });

        let view = build_gallery(
            &records,
            Visibility::Private,
            SortOrder::Newest,
            true,
            &cache,
            now,
        );
        match &view.sections[0].tiles[0].source {
            TileSource::Decrypted(handle) => {
                assert_eq!(handle.get().unwrap().bytes, vec![1, 2, 3]);
            }
            _ => panic!("expected decrypted artifact"),
        }
    }

    #[test]
    fn test_release_all_kills_handles() {
        let cache = ArtifactCache::new();
        let handle = cache.insert(DecryptedArtifact {
            photo_id: "priv".into(),
            mime: "image/jpeg".into(),
            bytes: vec![1],
        });
        assert!(handle.is_alive());

        assert_eq!(cache.release_all(), 1);
        assert!(!handle.is_alive());
        assert!(handle.get().is_none());
    }

    #[test]
    fn test_insert_if_discards_when_no_longer_live() {
        let cache = ArtifactCache::new();

        let rejected = cache.insert_if(
            DecryptedArtifact {
                photo_id: "priv".into(),
                mime: "image/jpeg".into(),
                bytes: vec![1],
            },
            || false,
        );
        assert!(rejected.is_none());
        assert!(cache.is_empty());

        let handle = cache
            .insert_if(
                DecryptedArtifact {
                    photo_id: "priv".into(),
                    mime: "image/jpeg".into(),
                    bytes: vec![2],
                },
                || true,
            )
            .unwrap();
        assert!(handle.is_alive());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_superseding_entry_kills_old_handle() {
        let cache = ArtifactCache::new();
        let old = cache.insert(DecryptedArtifact {
            photo_id: "priv".into(),
            mime: "image/jpeg".into(),
            bytes: vec![1],
        });
        let new = cache.insert(DecryptedArtifact {
            photo_id: "priv".into(),
            mime: "image/jpeg".into(),
            bytes: vec![2],
        });

        assert!(!old.is_alive());
        assert_eq!(new.get().unwrap().bytes, vec![2]);
        assert_eq!(cache.len(), 1);
    }
}
