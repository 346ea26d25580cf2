//! Pholife Vault - Vault Credential
//!
//! Proves possession of the folder password without persisting it. Two
//! artifacts are stored: a SHA-256 digest of the password (advisory,
//! setup bookkeeping only) and a known-marker ciphertext. The operative
//! proof is decrypting the marker - if the GCM tag verifies, the password
//! is correct.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};

use crate::crypto::{self, EncryptedBlob, SymmetricKey, SALT_LEN};
use crate::error::{VaultError, VaultResult};

/// Minimum password length, enforced at setup
pub const MIN_PASSWORD_LEN: usize = 6;

/// Known plaintext sealed into the verification blob
const MARKER: &[u8] = b"test";

/// Stored credential for the private folder
#[derive(Debug, Clone)]
pub struct VaultCredential {
    /// SHA-256 hex digest of the password (advisory)
    pub password_hash: String,
    /// Per-credential random KDF salt
    pub salt: [u8; SALT_LEN],
    /// Marker ciphertext; decrypt-success is the real gate
    pub verification: EncryptedBlob,
}

/// JSON envelope persisted in the registry's private-folder slot
#[derive(Serialize, Deserialize)]
struct CredentialEnvelope {
    password_hash: String,
    salt: String,
    verification: String,
}

impl VaultCredential {
    /// Build a credential from a new password.
    ///
    /// Returns the credential together with the derived key so the caller
    /// can begin an unlocked session without re-running the KDF.
    pub fn setup(password: &str) -> VaultResult<(Self, SymmetricKey)> {
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(VaultError::PasswordTooShort(MIN_PASSWORD_LEN));
        }

        let salt = crypto::generate_salt();
        let key = crypto::derive_key(password, &salt);
        let verification = crypto::encrypt(&key, MARKER)?;

        let credential = Self {
            password_hash: crypto::sha256_hex(password.as_bytes()),
            salt,
            verification,
        };
        Ok((credential, key))
    }

    /// Attempt to unlock with a candidate password.
    ///
    /// Derives a key, decrypts the verification blob, and checks the marker.
    /// Every failure mode - bad tag, truncated blob, wrong marker - surfaces
    /// as [`VaultError::IncorrectPassword`]; a corrupted credential is not
    /// distinguishable from a wrong password.
    pub fn unlock_key(&self, password: &str) -> VaultResult<SymmetricKey> {
        let key = crypto::derive_key(password, &self.salt);
        let marker = crypto::decrypt(&key, &self.verification)
            .map_err(|_| VaultError::IncorrectPassword)?;
        if marker != MARKER {
            return Err(VaultError::IncorrectPassword);
        }
        Ok(key)
    }

    /// Check a candidate password
    pub fn verify(&self, password: &str) -> bool {
        self.unlock_key(password).is_ok()
    }

    /// Check the advisory digest only (no KDF work)
    pub fn matches_hash(&self, password: &str) -> bool {
        crypto::sha256_hex(password.as_bytes()) == self.password_hash
    }

    /// Serialize to the registry string
    pub fn encode(&self) -> String {
        let envelope = CredentialEnvelope {
            password_hash: self.password_hash.clone(),
            salt: BASE64.encode(self.salt),
            verification: BASE64.encode(self.verification.to_bytes()),
        };
        // Struct of three strings cannot fail to serialize
        serde_json::to_string(&envelope).expect("credential envelope serialization")
    }

    /// Parse a registry string back into a credential
    pub fn decode(stored: &str) -> VaultResult<Self> {
        let envelope: CredentialEnvelope = serde_json::from_str(stored)?;

        let salt_bytes = BASE64
            .decode(&envelope.salt)
            .map_err(|e| VaultError::Serialization(e.to_string()))?;
        let salt: [u8; SALT_LEN] = salt_bytes
            .as_slice()
            .try_into()
            .map_err(|_| VaultError::Serialization("bad salt length".into()))?;

        let verification_bytes = BASE64
            .decode(&envelope.verification)
            .map_err(|e| VaultError::Serialization(e.to_string()))?;
        let verification = EncryptedBlob::from_bytes(&verification_bytes)
            .map_err(|_| VaultError::Serialization("bad verification blob".into()))?;

        Ok(Self {
            password_hash: envelope.password_hash,
            salt,
            verification,
        })
    }
}
