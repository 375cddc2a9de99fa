//! The process-wide session credential.
//!
//! This module provides:
//! - [`Credential`] - Snapshot of the access token and identity claims
//! - [`CredentialStore`] - Owner of the current credential, persisted through a [`SecretStore`]
//!
//! Persistence is best-effort: storage failures are logged and otherwise
//! ignored, so a broken backend only means the session is not remembered
//! after a restart.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::store::{Secret, SecretStore};

/// Storage key of the persisted session record.
pub const CREDENTIAL_KEY: &str = "auth-info";

/// Access credential plus the identity it was issued to.
///
/// The identity fields are present exactly when the access token is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    access_token: Option<Secret>,
    subject_id: Option<String>,
    display_name: Option<String>,
}

impl Credential {
    pub fn access_token(&self) -> Option<&Secret> {
        self.access_token.as_ref()
    }

    pub fn subject_id(&self) -> Option<&str> {
        self.subject_id.as_deref()
    }

    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.access_token.is_none()
    }

    /// Drop records that carry only part of a session.
    fn normalized(self) -> Self {
        if self.access_token.is_some() && self.subject_id.is_some() && self.display_name.is_some()
        {
            self
        } else {
            Self::default()
        }
    }
}

/// Owner of the current [`Credential`].
///
/// Reads are synchronous snapshots. Writes update memory first and then
/// persist; concurrent writes are serialized so the persisted record never
/// lags behind an older in-memory state.
pub struct CredentialStore {
    current: RwLock<Credential>,
    storage: Arc<dyn SecretStore>,
    write_lock: tokio::sync::Mutex<()>,
}

impl CredentialStore {
    /// An empty store persisting to `storage`.
    pub fn new(storage: Arc<dyn SecretStore>) -> Self {
        Self {
            current: RwLock::new(Credential::default()),
            storage,
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Rehydrate the credential persisted in `storage`.
    ///
    /// A missing, unreadable, or malformed record yields an empty store.
    pub async fn load(storage: Arc<dyn SecretStore>) -> Self {
        let credential = match storage.get(CREDENTIAL_KEY).await {
            Ok(Some(record)) => match serde_json::from_str::<Credential>(record.expose()) {
                Ok(credential) => credential.normalized(),
                Err(e) => {
                    tracing::warn!("Ignoring malformed persisted session: {}", e);
                    Credential::default()
                }
            },
            Ok(None) => Credential::default(),
            Err(e) => {
                tracing::warn!("Could not read persisted session: {}", e);
                Credential::default()
            }
        };

        if !credential.is_empty() {
            tracing::debug!(
                "Restored session for {}",
                credential.subject_id().unwrap_or("<unknown>")
            );
        }

        Self {
            current: RwLock::new(credential),
            storage,
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Current snapshot.
    pub fn get(&self) -> Credential {
        self.current.read().clone()
    }

    pub fn access_token(&self) -> Option<Secret> {
        self.current.read().access_token.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.current.read().access_token.is_some()
    }

    /// Set token and identity together.
    pub async fn set_session(
        &self,
        access_token: Secret,
        subject_id: impl Into<String>,
        display_name: impl Into<String>,
    ) {
        let subject_id = subject_id.into();
        let display_name = display_name.into();
        self.update(|credential| {
            credential.access_token = Some(access_token);
            credential.subject_id = Some(subject_id);
            credential.display_name = Some(display_name);
        })
        .await;
    }

    /// Replace only the access token, leaving identity untouched.
    pub async fn set_token(&self, access_token: Secret) {
        self.update(|credential| credential.access_token = Some(access_token))
            .await;
    }

    /// Forget the session.
    pub async fn clear(&self) {
        self.update(|credential| *credential = Credential::default())
            .await;
    }

    async fn update(&self, mutate: impl FnOnce(&mut Credential)) {
        let _write = self.write_lock.lock().await;

        let snapshot = {
            let mut current = self.current.write();
            mutate(&mut current);
            current.clone()
        };

        self.persist(&snapshot).await;
    }

    async fn persist(&self, snapshot: &Credential) {
        let result = if snapshot.is_empty() {
            self.storage.delete(CREDENTIAL_KEY).await
        } else {
            match serde_json::to_string(snapshot) {
                Ok(json) => self.storage.set(CREDENTIAL_KEY, &Secret::new(json)).await,
                Err(e) => Err(e.into()),
            }
        };

        if let Err(e) = result {
            tracing::warn!("Failed to persist session, continuing in memory: {}", e);
        }
    }
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore")
            .field("current", &*self.current.read())
            .finish()
    }
}
