//! Pholife Vault - Photo Records
//!
//! A `PhotoRecord` is immutable once created and append-only for the
//! session. The storage reference is a tagged variant decided at
//! construction: registry rows are parsed once with the
//! JSON-pair-then-bare-URL rule, never re-parsed at use sites.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{VaultError, VaultResult};
use crate::registry::PhotoRow;

/// Maximum accepted upload size (10 MiB)
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// The persisted private-reference pair
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PrivateRefJson {
    encrypted: String,
    thumbnail: String,
}

/// Where a photo's bytes live
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageRef {
    /// Public photo: a directly fetchable URL
    Plain(String),
    /// Private photo: ciphertext URL plus plaintext preview thumbnail URL
    Private {
        encrypted_url: String,
        thumbnail_url: String,
    },
}

impl StorageRef {
    /// Parse a registry `url` field.
    ///
    /// Private rows carry `{"encrypted": <url>, "thumbnail": <url>}`;
    /// anything that does not parse as that pair is a bare URL.
    pub fn parse(url_field: &str, is_private: bool) -> Self {
        if is_private {
            if let Ok(pair) = serde_json::from_str::<PrivateRefJson>(url_field) {
                return StorageRef::Private {
                    encrypted_url: pair.encrypted,
                    thumbnail_url: pair.thumbnail,
                };
            }
        }
        StorageRef::Plain(url_field.to_string())
    }

    /// Serialize back to the registry `url` field
    pub fn to_registry_url(&self) -> String {
        match self {
            StorageRef::Plain(url) => url.clone(),
            StorageRef::Private {
                encrypted_url,
                thumbnail_url,
            } => serde_json::to_string(&PrivateRefJson {
                encrypted: encrypted_url.clone(),
                thumbnail: thumbnail_url.clone(),
            })
            .expect("private ref pair serialization"),
        }
    }

    pub fn is_private(&self) -> bool {
        matches!(self, StorageRef::Private { .. })
    }
}

/// One photo in the session record set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoRecord {
    /// Content address of the stored bytes (ciphertext for private photos)
    pub id: String,
    pub storage_ref: StorageRef,
    pub name: String,
    pub size_bytes: u64,
    pub created_at: DateTime<Utc>,
    pub is_private: bool,
}

impl PhotoRecord {
    /// Build a record from a registry row
    pub fn from_row(row: PhotoRow) -> Self {
        let storage_ref = StorageRef::parse(&row.url, row.is_private);
        Self {
            id: row.id,
            storage_ref,
            name: row.name,
            size_bytes: row.size_bytes,
            created_at: row.created_at,
            is_private: row.is_private,
        }
    }

    /// Registry row for this record
    pub fn to_row(&self) -> PhotoRow {
        PhotoRow {
            id: self.id.clone(),
            url: self.storage_ref.to_registry_url(),
            name: self.name.clone(),
            size_bytes: self.size_bytes,
            created_at: self.created_at,
            is_private: self.is_private,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Upload validation
// ═══════════════════════════════════════════════════════════════════════════

/// Detect image MIME type from magic bytes
pub fn detect_mime(data: &[u8]) -> Option<&'static str> {
    if data.len() < 12 {
        return None;
    }
    match &data[0..4] {
        [0xFF, 0xD8, 0xFF, _] => Some("image/jpeg"),
        [0x89, 0x50, 0x4E, 0x47] => Some("image/png"),
        [0x47, 0x49, 0x46, 0x38] => Some("image/gif"),
        [0x52, 0x49, 0x46, 0x46] if &data[8..12] == b"WEBP" => Some("image/webp"),
        _ => None,
    }
}

/// Validate an upload candidate, returning its MIME type.
///
/// Rejects unknown file types and anything over [`MAX_UPLOAD_BYTES`].
pub fn validate_upload(name: &str, data: &[u8]) -> VaultResult<&'static str> {
    let size = data.len() as u64;
    if size > MAX_UPLOAD_BYTES {
        return Err(VaultError::FileTooLarge {
            size,
            max: MAX_UPLOAD_BYTES,
        });
    }
    detect_mime(data).ok_or_else(|| VaultError::UnsupportedFileType(name.to_string()))
}
