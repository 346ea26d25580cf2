//! Pholife Vault - Cryptography
//!
//! One fixed scheme: PBKDF2-HMAC-SHA256 turns the owner's password into an
//! AES-256 key, AES-256-GCM seals photo bytes with a fresh random IV.

pub mod aead;
pub mod kdf;

pub use aead::{decrypt, encrypt, EncryptedBlob, IV_LEN, TAG_LEN};
pub use kdf::{derive_key, generate_salt, sha256_hex, SymmetricKey, KEY_LEN, SALT_LEN};
