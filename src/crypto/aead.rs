//! Pholife Vault - AEAD Encryption
//!
//! AES-256-GCM over whole photo payloads. Wire format:
//! ```text
//! [IV 12B][random]
//! [CIPHERTEXT variable][AES-256-GCM encrypted]
//! [TAG 16B][GCM auth tag, appended by the primitive]
//! ```
//! No version byte; the credential envelope is the designated evolution
//! point if the scheme ever changes.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use rand::RngCore;

use super::kdf::SymmetricKey;
use crate::error::{VaultError, VaultResult};

/// IV length for AES-GCM (96 bits)
pub const IV_LEN: usize = 12;

/// GCM authentication tag length
pub const TAG_LEN: usize = 16;

/// Ciphertext with its IV
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedBlob {
    /// Fresh random IV, generated inside `encrypt`
    pub iv: [u8; IV_LEN],
    /// Ciphertext with authentication tag appended
    pub ciphertext: Vec<u8>,
}

impl EncryptedBlob {
    /// Serialize to bytes (`iv || ciphertext`)
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(IV_LEN + self.ciphertext.len());
        out.extend_from_slice(&self.iv);
        out.extend_from_slice(&self.ciphertext);
        out
    }

    /// Deserialize from bytes.
    ///
    /// A short input surfaces the same variant as a failed tag check, so a
    /// truncated blob is indistinguishable from a wrong password.
    pub fn from_bytes(data: &[u8]) -> VaultResult<Self> {
        if data.len() < IV_LEN + TAG_LEN {
            return Err(VaultError::AuthenticationFailed);
        }
        let iv: [u8; IV_LEN] = data[..IV_LEN]
            .try_into()
            .map_err(|_| VaultError::AuthenticationFailed)?;
        Ok(Self {
            iv,
            ciphertext: data[IV_LEN..].to_vec(),
        })
    }
}

/// Encrypt a payload with AES-256-GCM under a fresh random IV.
///
/// There is no API for a caller-supplied IV; (key, iv) reuse would void the
/// GCM security guarantees.
pub fn encrypt(key: &SymmetricKey, plaintext: &[u8]) -> VaultResult<EncryptedBlob> {
    let cipher = Aes256Gcm::new_from_slice(key.expose())
        .map_err(|e| VaultError::CryptoPrimitive(e.to_string()))?;

    let mut iv = [0u8; IV_LEN];
    rand::thread_rng().fill_bytes(&mut iv);
    let nonce = Nonce::from_slice(&iv);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|e| VaultError::CryptoPrimitive(e.to_string()))?;

    Ok(EncryptedBlob { iv, ciphertext })
}

/// Decrypt a payload, verifying the GCM tag.
///
/// Fails with [`VaultError::AuthenticationFailed`] on tag mismatch; a
/// tampered ciphertext and a wrong key are deliberately the same signal.
pub fn decrypt(key: &SymmetricKey, blob: &EncryptedBlob) -> VaultResult<Vec<u8>> {
    let cipher = Aes256Gcm::new_from_slice(key.expose())
        .map_err(|e| VaultError::CryptoPrimitive(e.to_string()))?;

    let nonce = Nonce::from_slice(&blob.iv);

    cipher
        .decrypt(nonce, blob.ciphertext.as_slice())
        .map_err(|_| VaultError::AuthenticationFailed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_roundtrip() {
        let key = SymmetricKey::generate();
        let plaintext = b"FAKE JPEG DATA 1234567890";

        let blob = encrypt(&key, plaintext).unwrap();
        let decrypted = decrypt(&key, &blob).unwrap();

        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn test_roundtrip_empty_payload() {
        let key = SymmetricKey::generate();
        let blob = encrypt(&key, b"").unwrap();
        assert_eq!(decrypt(&key, &blob).unwrap(), b"");
    }

    #[test]
    fn test_wrong_key_fails() {
        let k1 = SymmetricKey::generate();
        let k2 = SymmetricKey::generate();

        let blob = encrypt(&k1, b"secret photo").unwrap();
        let result = decrypt(&k2, &blob);

        assert!(matches!(result, Err(VaultError::AuthenticationFailed)));
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let key = SymmetricKey::generate();
        let mut blob = encrypt(&key, b"secret photo").unwrap();
        blob.ciphertext[3] ^= 0xFF;

        let result = decrypt(&key, &blob);
        assert!(matches!(result, Err(VaultError::AuthenticationFailed)));
    }

    #[test]
    fn test_iv_freshness() {
        let key = SymmetricKey::generate();
        let mut seen = HashSet::new();
        for _ in 0..10_000 {
            let blob = encrypt(&key, b"same plaintext").unwrap();
            assert!(seen.insert(blob.iv), "IV repeated");
        }
    }

    #[test]
    fn test_wire_format_roundtrip() {
        let key = SymmetricKey::generate();
        let blob = encrypt(&key, b"payload").unwrap();

        let bytes = blob.to_bytes();
        assert_eq!(&bytes[..IV_LEN], &blob.iv);

        let parsed = EncryptedBlob::from_bytes(&bytes).unwrap();
        assert_eq!(parsed, blob);
        assert_eq!(decrypt(&key, &parsed).unwrap(), b"payload");
    }

    #[test]
    fn test_short_input_rejected() {
        let result = EncryptedBlob::from_bytes(&[0u8; IV_LEN + TAG_LEN - 1]);
        assert!(matches!(result, Err(VaultError::AuthenticationFailed)));
    }
}
