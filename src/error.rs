//! Pholife Vault - Error Types

use thiserror::Error;

/// Result type for vault operations
pub type VaultResult<T> = Result<T, VaultError>;

/// Vault error types
#[derive(Error, Debug)]
pub enum VaultError {
    // ═══════════════════════════════════════════════════════════════
    // PASSWORD / CREDENTIAL ERRORS
    // ═══════════════════════════════════════════════════════════════
    #[error("Password must be at least {0} characters")]
    PasswordTooShort(usize),

    #[error("Passwords do not match")]
    PasswordMismatch,

    #[error("Incorrect password")]
    IncorrectPassword,

    // ═══════════════════════════════════════════════════════════════
    // CRYPTO ERRORS
    // ═══════════════════════════════════════════════════════════════
    #[error("Decryption failed - wrong key or corrupted data")]
    AuthenticationFailed,

    #[error("Crypto primitive failure: {0}")]
    CryptoPrimitive(String),

    // ═══════════════════════════════════════════════════════════════
    // FOLDER STATE ERRORS
    // ═══════════════════════════════════════════════════════════════
    #[error("Private folder is locked")]
    FolderLocked,

    #[error("Private folder is already set up")]
    AlreadySetup,

    #[error("Private folder is not set up")]
    NotSetup,

    // ═══════════════════════════════════════════════════════════════
    // STORAGE / REGISTRY ERRORS
    // ═══════════════════════════════════════════════════════════════
    #[error("Upload of '{name}' failed: {reason}")]
    StorageUpload { name: String, reason: String },

    #[error("Fetch of '{id}' failed: {reason}")]
    StorageFetch { id: String, reason: String },

    #[error("Registry call failed: {0}")]
    Registry(String),

    // ═══════════════════════════════════════════════════════════════
    // FILE ERRORS
    // ═══════════════════════════════════════════════════════════════
    #[error("Unsupported file type for '{0}'")]
    UnsupportedFileType(String),

    #[error("File too large: {size} bytes (max: {max})")]
    FileTooLarge { size: u64, max: u64 },

    #[error("Thumbnail generation failed: {0}")]
    Thumbnail(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ═══════════════════════════════════════════════════════════════
    // SERIALIZATION / DATABASE ERRORS
    // ═══════════════════════════════════════════════════════════════
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl VaultError {
    /// Setup/unlock errors are final; they must never be silently retried.
    pub fn is_credential_error(&self) -> bool {
        matches!(
            self,
            VaultError::PasswordTooShort(_)
                | VaultError::PasswordMismatch
                | VaultError::IncorrectPassword
        )
    }

    /// Transient collaborator failures a caller may choose to wrap with retry.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            VaultError::StorageUpload { .. }
                | VaultError::StorageFetch { .. }
                | VaultError::Registry(_)
        )
    }
}

impl From<serde_json::Error> for VaultError {
    fn from(e: serde_json::Error) -> Self {
        VaultError::Serialization(e.to_string())
    }
}

impl From<rusqlite::Error> for VaultError {
    fn from(e: rusqlite::Error) -> Self {
        VaultError::Database(e.to_string())
    }
}

impl From<image::ImageError> for VaultError {
    fn from(e: image::ImageError) -> Self {
        VaultError::Thumbnail(e.to_string())
    }
}
