//! File-backed secret storage.
//!
//! Entries are kept in one JSON document in the platform data directory:
//! `~/.local/share/agora/session.json` on Linux, the equivalent application
//! data folder elsewhere.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::{Secret, SecretStore, StoreError};

/// File name used inside the data directory.
pub(crate) const SESSION_FILE: &str = "session.json";

/// On-disk format.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct FileStoreData {
    /// Version of the store format (for future migrations).
    version: u32,

    entries: BTreeMap<String, Secret>,
}

impl Default for FileStoreData {
    fn default() -> Self {
        Self {
            version: 1,
            entries: BTreeMap::new(),
        }
    }
}

/// Disk-backed secret store.
///
/// Every mutation rewrites the whole document; the session record is small
/// and written rarely (sign-in, refresh, sign-out).
pub struct FileStore {
    path: PathBuf,
    data: RwLock<FileStoreData>,
}

impl FileStore {
    /// Default location of the session file.
    pub fn default_path() -> Result<PathBuf, StoreError> {
        let dirs = directories::ProjectDirs::from("com", "agora-board", "agora")
            .ok_or(StoreError::DataDirUnavailable)?;
        Ok(dirs.data_dir().join(SESSION_FILE))
    }

    /// Open the store at the default location.
    pub fn load() -> Result<Self, StoreError> {
        Self::load_from_path(Self::default_path()?)
    }

    /// Open the store at a specific path.
    ///
    /// Creates parent directories; a missing file starts empty.
    pub fn load_from_path(path: PathBuf) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let data = if path.exists() {
            let contents = fs::read_to_string(&path)?;
            serde_json::from_str(&contents)?
        } else {
            FileStoreData::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self, data: &FileStoreData) -> Result<(), StoreError> {
        let contents = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, contents)?;
        Ok(())
    }
}

impl std::fmt::Debug for FileStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileStore")
            .field("path", &self.path)
            .field("keys_count", &self.data.read().entries.len())
            .finish()
    }
}

#[async_trait]
impl SecretStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<Secret>, StoreError> {
        Ok(self.data.read().entries.get(key).cloned())
    }

    async fn set(&self, key: &str, secret: &Secret) -> Result<(), StoreError> {
        let mut data = self.data.write();
        data.entries.insert(key.to_string(), secret.clone());
        self.save(&data)
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut data = self.data.write();
        if data.entries.remove(key).is_some() {
            self.save(&data)?;
        }
        Ok(())
    }
}
