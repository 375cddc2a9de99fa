//! Session storage in the platform credential manager.

use std::collections::HashMap;

use async_trait::async_trait;
use keyring::Entry;

use super::{Secret, SecretStore, StoreError};
use crate::client::COOKIE_KEY;
use crate::credential::CREDENTIAL_KEY;

/// Records the client persists. Each one maps to a single keyring entry.
const RECORD_KEYS: [&str; 2] = [CREDENTIAL_KEY, COOKIE_KEY];

/// Account name of the entry written while checking the backend.
const CHECK_ACCOUNT: &str = "availability-check";

/// Session records kept in the OS keyring: Keychain on macOS, Credential
/// Manager on Windows, Secret Service on Linux.
///
/// Every record is an entry under the store's service name with the record
/// key as its account.
pub struct KeyringStore {
    service_name: String,
    entries: HashMap<&'static str, Entry>,
}

impl KeyringStore {
    /// Open the keyring under `service_name`.
    ///
    /// Writes, reads back, and deletes a throwaway entry first, so a backend
    /// that accepts writes without keeping them (no Secret Service daemon,
    /// the in-process mock) is reported as unavailable.
    pub fn try_new(service_name: &str) -> Result<Self, StoreError> {
        check_round_trip(service_name)?;

        let entries = RECORD_KEYS
            .into_iter()
            .map(|key| Ok((key, open_entry(service_name, key)?)))
            .collect::<Result<HashMap<_, _>, StoreError>>()?;

        Ok(Self {
            service_name: service_name.to_string(),
            entries,
        })
    }

    fn entry(&self, key: &str) -> Result<&Entry, StoreError> {
        self.entries.get(key).ok_or_else(|| StoreError::BackendError {
            message: format!("no keyring entry for record {:?}", key),
        })
    }
}

fn open_entry(service_name: &str, account: &str) -> Result<Entry, StoreError> {
    Entry::new(service_name, account).map_err(|e| StoreError::KeyringUnavailable {
        message: e.to_string(),
    })
}

fn check_round_trip(service_name: &str) -> Result<(), StoreError> {
    let unavailable = |message: String| StoreError::KeyringUnavailable { message };
    let expected = "agora";

    open_entry(service_name, CHECK_ACCOUNT)?
        .set_password(expected)
        .map_err(|e| unavailable(format!("write failed: {}", e)))?;

    // A separate handle reads back, so only a shared backing store passes.
    let reader = open_entry(service_name, CHECK_ACCOUNT)?;
    let read_back = reader.get_password();
    let _ = reader.delete_credential();

    match read_back {
        Ok(value) if value == expected => Ok(()),
        Ok(_) => Err(unavailable("entry read back with a different value".to_string())),
        Err(e) => Err(unavailable(format!("entry was not kept: {}", e))),
    }
}

impl std::fmt::Debug for KeyringStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyringStore")
            .field("service_name", &self.service_name)
            .finish()
    }
}

#[async_trait]
impl SecretStore for KeyringStore {
    async fn get(&self, key: &str) -> Result<Option<Secret>, StoreError> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(Secret::new(value))),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(StoreError::BackendError {
                message: format!("keyring read failed: {}", e),
            }),
        }
    }

    async fn set(&self, key: &str, secret: &Secret) -> Result<(), StoreError> {
        self.entry(key)?
            .set_password(secret.expose())
            .map_err(|e| StoreError::BackendError {
                message: format!("keyring write failed: {}", e),
            })
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(StoreError::BackendError {
                message: format!("keyring delete failed: {}", e),
            }),
        }
    }
}
