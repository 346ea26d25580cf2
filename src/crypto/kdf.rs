//! Pholife Vault - Key Derivation
//!
//! PBKDF2-HMAC-SHA256 with a deliberately slow round count so a stolen
//! verification blob is costly to brute-force.

use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use secrecy::{ExposeSecret, Secret};
use sha2::{Digest, Sha256};
use zeroize::ZeroizeOnDrop;

/// Key length for AES-256
pub const KEY_LEN: usize = 32;

/// Salt length stored alongside the credential
pub const SALT_LEN: usize = 16;

/// PBKDF2 round count
pub const PBKDF2_ROUNDS: u32 = 100_000;

/// Secure key wrapper with automatic zeroization
#[derive(Clone, ZeroizeOnDrop)]
pub struct SymmetricKey {
    #[zeroize(skip)]
    inner: Secret<[u8; KEY_LEN]>,
}

impl SymmetricKey {
    /// Create a key from raw bytes
    pub fn new(bytes: [u8; KEY_LEN]) -> Self {
        Self {
            inner: Secret::new(bytes),
        }
    }

    /// Expose the key bytes (use with caution)
    pub fn expose(&self) -> &[u8; KEY_LEN] {
        self.inner.expose_secret()
    }

    /// Generate a random key
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_LEN];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self::new(bytes)
    }
}

impl std::fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SymmetricKey(..)")
    }
}

/// Derive a 256-bit key from a password and salt.
///
/// Deterministic: the same (password, salt) pair always yields the same key.
/// The caller enforces the password length minimum before reaching this point.
pub fn derive_key(password: &str, salt: &[u8; SALT_LEN]) -> SymmetricKey {
    let mut okm = [0u8; KEY_LEN];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, PBKDF2_ROUNDS, &mut okm);
    SymmetricKey::new(okm)
}

/// Generate a random per-credential salt
pub fn generate_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);
    salt
}

/// SHA-256 digest as lowercase hex (advisory password hash)
pub fn sha256_hex(data: &[u8]) -> String {
    let digest = Sha256::digest(data);
    hex::encode(digest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_key_deterministic() {
        let salt = [0x11u8; SALT_LEN];
        let k1 = derive_key("hunter2secret", &salt);
        let k2 = derive_key("hunter2secret", &salt);
        assert_eq!(k1.expose(), k2.expose());
    }

    #[test]
    fn test_derive_key_diverges_on_password() {
        let salt = [0x11u8; SALT_LEN];
        let k1 = derive_key("password-one", &salt);
        let k2 = derive_key("password-two", &salt);
        assert_ne!(k1.expose(), k2.expose());
    }

    #[test]
    fn test_derive_key_diverges_on_salt() {
        let k1 = derive_key("same password", &[0x01u8; SALT_LEN]);
        let k2 = derive_key("same password", &[0x02u8; SALT_LEN]);
        assert_ne!(k1.expose(), k2.expose());
    }

    #[test]
    fn test_generate_salt_random() {
        assert_ne!(generate_salt(), generate_salt());
    }

    #[test]
    fn test_sha256_hex() {
        // Known SHA-256 vector
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
