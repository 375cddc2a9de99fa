//! Secret storage backends for the persisted session.
//!
//! This module provides:
//! - [`Secret`] - A wrapper for sensitive values that prevents accidental logging
//! - [`SecretStore`] - Trait for storage backends
//! - [`MemoryStore`] - In-memory implementation for tests and ephemeral sessions
//! - [`FileStore`] - JSON document in the platform data directory
//! - [`KeyringStore`] - OS keyring implementation (with `keyring-store` feature)
//! - [`create_store`] - Helper to select a backend from configuration
//!
//! The session record lives under a single key (see
//! [`CREDENTIAL_KEY`](crate::credential::CREDENTIAL_KEY)), so backends only
//! need point lookups.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

mod file;
#[cfg(feature = "keyring-store")]
mod keyring;
mod memory;

pub use file::FileStore;
#[cfg(feature = "keyring-store")]
pub use keyring::KeyringStore;
pub use memory::MemoryStore;

use crate::config::StorageBackend;

/// A secret value that prevents accidental exposure in logs.
///
/// The inner value is only accessible via [`expose()`](Secret::expose).
/// Debug and Display implementations show `[REDACTED]` instead of the value.
#[derive(Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    /// Create a new secret from a string value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Expose the secret value.
    ///
    /// Use sparingly and never log the result.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Secret([REDACTED])")
    }
}

impl std::fmt::Display for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl PartialEq for Secret {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Secret {}

/// Error type for secret store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The storage backend encountered an error.
    #[error("backend error: {message}")]
    BackendError { message: String },

    /// Reading or writing the backing file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization or deserialization failed.
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// The keyring backend is not available.
    #[error("keyring not available: {message}")]
    KeyringUnavailable { message: String },

    /// No data directory could be determined for file storage.
    #[error("data directory not available")]
    DataDirUnavailable,
}

/// Abstraction over durable client-side storage.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Retrieve a secret by key.
    ///
    /// Returns `Ok(None)` if the key doesn't exist.
    async fn get(&self, key: &str) -> Result<Option<Secret>, StoreError>;

    /// Store a secret at the given key, overwriting any existing value.
    async fn set(&self, key: &str, secret: &Secret) -> Result<(), StoreError>;

    /// Delete a secret by key.
    ///
    /// Returns `Ok(())` even if the key didn't exist.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Check if a key exists without retrieving the value.
    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.get(key).await?.is_some())
    }
}

/// Create a secret store for the configured backend.
///
/// `data_dir` overrides the platform data directory used by [`FileStore`].
/// A backend that cannot be opened falls back to [`MemoryStore`] with a
/// warning; the session then lasts only as long as the process.
pub fn create_store(backend: StorageBackend, data_dir: Option<&Path>) -> Arc<dyn SecretStore> {
    match backend {
        StorageBackend::Memory => {
            tracing::debug!("Using in-memory session storage");
            Arc::new(MemoryStore::new())
        }
        StorageBackend::File => {
            let store = match data_dir {
                Some(dir) => FileStore::load_from_path(dir.join(file::SESSION_FILE)),
                None => FileStore::load(),
            };
            match store {
                Ok(store) => {
                    tracing::debug!("Using file session storage at {:?}", store.path());
                    Arc::new(store)
                }
                Err(e) => {
                    tracing::warn!(
                        "File storage unavailable ({}), falling back to memory store. \
                         Sessions will not persist across restarts.",
                        e
                    );
                    Arc::new(MemoryStore::new())
                }
            }
        }
        StorageBackend::Keyring => keyring_or_memory(),
    }
}

#[cfg(feature = "keyring-store")]
fn keyring_or_memory() -> Arc<dyn SecretStore> {
    match KeyringStore::try_new("agora") {
        Ok(store) => {
            tracing::info!("Using OS keyring for session storage");
            Arc::new(store)
        }
        Err(e) => {
            tracing::warn!(
                "Keyring unavailable ({}), falling back to memory store. \
                 Sessions will not persist across restarts.",
                e
            );
            Arc::new(MemoryStore::new())
        }
    }
}

#[cfg(not(feature = "keyring-store"))]
fn keyring_or_memory() -> Arc<dyn SecretStore> {
    tracing::warn!(
        "Keyring storage requested but keyring-store feature not enabled. \
         Using memory store. Sessions will not persist across restarts."
    );
    Arc::new(MemoryStore::new())
}
