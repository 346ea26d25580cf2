//! Pholife Vault - Local Backends
//!
//! Directory-backed content store and SQLite-backed registry so the whole
//! flow runs end-to-end from a shell. These stand in for the remote
//! collaborators; the library only ever sees the traits.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection};

use crate::error::{VaultError, VaultResult};
use crate::registry::{OwnerId, PhotoRegistry, PhotoRow};
use crate::store::{ContentId, ContentStore};

const CAS_URL_PREFIX: &str = "cas://";

// ═══════════════════════════════════════════════════════════════════════════
// LocalStore
// ═══════════════════════════════════════════════════════════════════════════

/// Content-addressed store over a local directory.
///
/// Object id is the SHA-256 of the bytes; writes go through a temp file and
/// rename so a crashed upload never leaves a half-written object.
pub struct LocalStore {
    objects: PathBuf,
}

impl LocalStore {
    pub fn open(root: &Path) -> VaultResult<Self> {
        let objects = root.join("objects");
        std::fs::create_dir_all(&objects)?;
        Ok(Self { objects })
    }

    fn path_for(&self, id: &ContentId) -> PathBuf {
        self.objects.join(id.as_str())
    }
}

#[async_trait]
impl ContentStore for LocalStore {
    async fn upload(&self, bytes: Vec<u8>, _content_type: &str) -> VaultResult<ContentId> {
        let id = ContentId::for_bytes(&bytes);
        let path = self.path_for(&id);
        if tokio::fs::try_exists(&path).await? {
            return Ok(id);
        }

        let tmp = self.objects.join(format!("{}.tmp", id.as_str()));
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(id)
    }

    async fn fetch(&self, id: &ContentId) -> VaultResult<Vec<u8>> {
        tokio::fs::read(self.path_for(id))
            .await
            .map_err(|e| VaultError::StorageFetch {
                id: id.to_string(),
                reason: e.to_string(),
            })
    }

    async fn fetch_url(&self, url: &str) -> VaultResult<Vec<u8>> {
        let id = url
            .strip_prefix(CAS_URL_PREFIX)
            .ok_or_else(|| VaultError::StorageFetch {
                id: url.to_string(),
                reason: "not a cas:// url".into(),
            })?;
        self.fetch(&ContentId::new(id)).await
    }

    fn url_for(&self, id: &ContentId) -> String {
        format!("{CAS_URL_PREFIX}{id}")
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// LocalRegistry
// ═══════════════════════════════════════════════════════════════════════════

/// SQLite-backed photo registry
pub struct LocalRegistry {
    conn: Mutex<Connection>,
}

impl LocalRegistry {
    pub fn open(root: &Path) -> VaultResult<Self> {
        std::fs::create_dir_all(root)?;
        let conn = Connection::open(root.join("registry.db"))?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS photos (
                owner TEXT NOT NULL,
                id TEXT NOT NULL,
                url TEXT NOT NULL,
                name TEXT NOT NULL,
                size_bytes INTEGER NOT NULL,
                created_at TEXT NOT NULL,
                is_private INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS folders (
                owner TEXT PRIMARY KEY,
                credential TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_photos_owner ON photos(owner);
            "#,
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

#[async_trait]
impl PhotoRegistry for LocalRegistry {
    async fn add_photo(&self, owner: &OwnerId, row: PhotoRow) -> VaultResult<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO photos (owner, id, url, name, size_bytes, created_at, is_private)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                owner.as_str(),
                row.id,
                row.url,
                row.name,
                row.size_bytes as i64,
                row.created_at.to_rfc3339(),
                row.is_private as i64,
            ],
        )?;
        Ok(())
    }

    async fn list_photos(&self, owner: &OwnerId) -> VaultResult<Vec<PhotoRow>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, url, name, size_bytes, created_at, is_private
             FROM photos WHERE owner = ?1 ORDER BY rowid",
        )?;

        let rows = stmt.query_map(params![owner.as_str()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, i64>(5)?,
            ))
        })?;

        let mut photos = Vec::new();
        for row in rows {
            let (id, url, name, size_bytes, created_at, is_private) = row?;
            let created_at = DateTime::parse_from_rfc3339(&created_at)
                .map_err(|e| VaultError::Database(format!("bad timestamp: {e}")))?
                .with_timezone(&Utc);
            photos.push(PhotoRow {
                id,
                url,
                name,
                size_bytes: size_bytes as u64,
                created_at,
                is_private: is_private != 0,
            });
        }
        Ok(photos)
    }

    async fn get_private_folder_hash(&self, owner: &OwnerId) -> VaultResult<Option<String>> {
        let conn = self.conn.lock();
        let result = conn.query_row(
            "SELECT credential FROM folders WHERE owner = ?1",
            params![owner.as_str()],
            |row| row.get::<_, String>(0),
        );
        match result {
            Ok(credential) => Ok(Some(credential)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set_private_folder_hash(&self, owner: &OwnerId, hash: &str) -> VaultResult<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT OR REPLACE INTO folders (owner, credential) VALUES (?1, ?2)",
            params![owner.as_str(), hash],
        )?;
        Ok(())
    }
}
