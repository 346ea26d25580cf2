//! # Pholife Vault
//!
//! Password-gated private photo vault over content-addressed storage.
//!
//! Photos live behind two visibility tiers: public records carry a bare
//! content URL, private records carry an AES-256-GCM ciphertext plus a
//! plaintext preview thumbnail. The vault key is derived from the owner's
//! password (PBKDF2-HMAC-SHA256) and never persisted; possession of the
//! password is proven by decrypting a known-marker blob stored in the
//! registry.
//!
//! ```text
//! password ──> PrivateFolder ──> crypto::kdf ──> session key
//!                                                    │
//!                      upload path: encrypt ◄────────┤
//!                      display path: decrypt ◄───────┘
//!                                                    │
//!                      gallery: filter / sort / time buckets
//! ```
//!
//! ## Security model
//!
//! - One fixed scheme: PBKDF2-HMAC-SHA256 (100k rounds) into AES-256-GCM.
//! - Fresh random 96-bit IV per encryption, wire format `iv || ciphertext`.
//! - The plaintext password never leaves the process; only a SHA-256 digest
//!   and an encrypted marker are persisted.
//! - Locking the folder destroys the session key and every decrypted
//!   artifact handed out for display.

pub mod credential;
pub mod crypto;
pub mod error;
pub mod gallery;
pub mod library;
pub mod local;
pub mod photo;
pub mod registry;
pub mod store;
pub mod thumbs;
pub mod upload;
pub mod vault;

pub use credential::VaultCredential;
pub use error::{VaultError, VaultResult};
pub use gallery::{build_gallery, ArtifactCache, GalleryBucket, SortOrder, Visibility};
pub use library::PhotoLibrary;
pub use photo::{PhotoRecord, StorageRef};
pub use registry::{OwnerId, PhotoRegistry};
pub use store::{ContentId, ContentStore};
pub use upload::{BatchReport, UploadItem};
pub use vault::{FolderState, PrivateFolder};

/// Pholife Vault version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
