//! Pholife Vault - Private Folder State Machine
//!
//! Lifecycle: `Unset -> SettingUp -> Locked <-> Unlocked`. Locking only
//! returns to `Locked`; the stored credential is never erased, only
//! replaced by re-running setup. The derived key lives in an in-memory
//! session that is destroyed on lock or identity disconnect.

use std::sync::atomic::{AtomicU64, Ordering};

use log::{info, warn};
use parking_lot::RwLock;

use crate::credential::VaultCredential;
use crate::crypto::SymmetricKey;
use crate::error::{VaultError, VaultResult};
use crate::registry::{OwnerId, SharedRegistry};

/// Private folder state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FolderState {
    /// No credential stored for this owner
    Unset,
    /// Setup in flight; credential being persisted
    SettingUp,
    /// Credential exists, no live session
    Locked,
    /// Session key available
    Unlocked,
}

/// Ephemeral unlocked session. Never persisted.
pub struct VaultSession {
    key: SymmetricKey,
    epoch: u64,
}

impl VaultSession {
    /// Session key, shared read-only while unlocked
    pub fn key(&self) -> &SymmetricKey {
        &self.key
    }

    /// Epoch this session was opened at
    pub fn epoch(&self) -> u64 {
        self.epoch
    }
}

/// Owned state object for one owner's private folder.
///
/// Passed by reference to the components that need it (gallery, upload);
/// every transition is an explicit method call.
pub struct PrivateFolder {
    registry: SharedRegistry,
    owner: OwnerId,
    state: RwLock<FolderState>,
    credential: RwLock<Option<VaultCredential>>,
    session: RwLock<Option<VaultSession>>,
    /// Bumped on every unlock and lock; in-flight work captures the epoch
    /// and discards its result if the counter has moved on.
    epoch: AtomicU64,
}

impl PrivateFolder {
    // ═══════════════════════════════════════════════════════════════════════
    // INITIALIZATION
    // ═══════════════════════════════════════════════════════════════════════

    /// Load folder state for an owner from the registry.
    ///
    /// `Unset` when no credential string is stored, else `Locked`. An
    /// unparseable stored string still presents `Locked`; unlock will then
    /// fail with `IncorrectPassword`, same as corruption anywhere else.
    pub async fn load(registry: SharedRegistry, owner: OwnerId) -> VaultResult<Self> {
        let stored = registry.get_private_folder_hash(&owner).await?;

        let (state, credential) = match stored {
            None => (FolderState::Unset, None),
            Some(raw) => match VaultCredential::decode(&raw) {
                Ok(credential) => (FolderState::Locked, Some(credential)),
                Err(e) => {
                    warn!("stored credential for {owner} is unreadable: {e}");
                    (FolderState::Locked, None)
                }
            },
        };

        Ok(Self {
            registry,
            owner,
            state: RwLock::new(state),
            credential: RwLock::new(credential),
            session: RwLock::new(None),
            epoch: AtomicU64::new(0),
        })
    }

    // ═══════════════════════════════════════════════════════════════════════
    // TRANSITIONS
    // ═══════════════════════════════════════════════════════════════════════

    /// Set up (or re-set-up) the folder password.
    ///
    /// Valid from `Unset` and from `Unlocked` (re-running setup replaces the
    /// credential). On success the credential is persisted and the session
    /// begins immediately in `Unlocked`. A registry failure rolls back to
    /// the prior state.
    pub async fn setup(&self, password: &str, confirm: &str) -> VaultResult<()> {
        let prior = *self.state.read();
        match prior {
            FolderState::Unset | FolderState::Unlocked => {}
            FolderState::SettingUp | FolderState::Locked => {
                return Err(VaultError::AlreadySetup)
            }
        }

        if password != confirm {
            return Err(VaultError::PasswordMismatch);
        }

        let (credential, key) = VaultCredential::setup(password)?;
        *self.state.write() = FolderState::SettingUp;

        if let Err(e) = self
            .registry
            .set_private_folder_hash(&self.owner, &credential.encode())
            .await
        {
            *self.state.write() = prior;
            return Err(e);
        }

        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        *self.credential.write() = Some(credential);
        *self.session.write() = Some(VaultSession { key, epoch });
        *self.state.write() = FolderState::Unlocked;

        info!("private folder set up for {}", self.owner);
        Ok(())
    }

    /// Unlock with a candidate password.
    ///
    /// Only meaningful from `Locked`; a wrong password leaves the folder
    /// `Locked` and is never auto-retried. Already `Unlocked` is a no-op.
    pub fn unlock(&self, password: &str) -> VaultResult<()> {
        match *self.state.read() {
            FolderState::Unlocked => return Ok(()),
            FolderState::Unset | FolderState::SettingUp => return Err(VaultError::NotSetup),
            FolderState::Locked => {}
        }

        let key = {
            let credential = self.credential.read();
            match credential.as_ref() {
                // Credential string existed but was unreadable; same signal
                // as a wrong password.
                None => return Err(VaultError::IncorrectPassword),
                Some(credential) => credential.unlock_key(password)?,
            }
        };

        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        *self.session.write() = Some(VaultSession { key, epoch });
        *self.state.write() = FolderState::Unlocked;

        info!("private folder unlocked for {}", self.owner);
        Ok(())
    }

    /// Lock the folder, destroying the session.
    ///
    /// Effective immediately for new reads: the epoch is bumped before the
    /// session is dropped, so in-flight work keyed to the old epoch discards
    /// its result. Idempotent; never erases the credential. From `Unset`
    /// there is nothing to lock and the state stays `Unset`.
    pub fn lock(&self) {
        match *self.state.read() {
            FolderState::Unset | FolderState::Locked => return,
            FolderState::SettingUp | FolderState::Unlocked => {}
        }

        self.epoch.fetch_add(1, Ordering::SeqCst);
        *self.session.write() = None;
        *self.state.write() = FolderState::Locked;

        info!("private folder locked for {}", self.owner);
    }

    /// Forced lock on identity disconnect. Never leaves a session live for
    /// a departed identity.
    pub fn disconnect(&self) {
        self.lock();
    }

    // ═══════════════════════════════════════════════════════════════════════
    // ACCESSORS
    // ═══════════════════════════════════════════════════════════════════════

    /// Current state
    pub fn state(&self) -> FolderState {
        *self.state.read()
    }

    pub fn is_unlocked(&self) -> bool {
        self.state() == FolderState::Unlocked
    }

    /// Whether a credential is stored (even an unreadable one)
    pub fn is_setup(&self) -> bool {
        self.state() != FolderState::Unset
    }

    /// Clone of the session key, or `FolderLocked`
    pub fn session_key(&self) -> VaultResult<SymmetricKey> {
        self.session
            .read()
            .as_ref()
            .map(|s| s.key().clone())
            .ok_or(VaultError::FolderLocked)
    }

    /// Session key together with its epoch, for in-flight work that must
    /// discard results after a lock
    pub fn session_key_epoch(&self) -> VaultResult<(SymmetricKey, u64)> {
        self.session
            .read()
            .as_ref()
            .map(|s| (s.key().clone(), s.epoch()))
            .ok_or(VaultError::FolderLocked)
    }

    /// Current epoch counter
    pub fn current_epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    pub fn owner(&self) -> &OwnerId {
        &self.owner
    }
}
