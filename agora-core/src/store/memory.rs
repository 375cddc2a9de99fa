//! Process-local session storage.

use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{Secret, SecretStore, StoreError};

/// Records kept for the lifetime of the process.
///
/// Used by tests, by `storage = "memory"`, and as the fallback when the
/// configured backend cannot be opened.
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<BTreeMap<String, Secret>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let records = self.records.lock();
        f.debug_struct("MemoryStore")
            .field("keys", &records.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[async_trait]
impl SecretStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Secret>, StoreError> {
        Ok(self.records.lock().get(key).cloned())
    }

    async fn set(&self, key: &str, secret: &Secret) -> Result<(), StoreError> {
        self.records.lock().insert(key.to_owned(), secret.clone());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.records.lock().remove(key);
        Ok(())
    }
}
