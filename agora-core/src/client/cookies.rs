//! Cookie jar shared by every request, saved alongside the session record.
//!
//! The refresh endpoint authenticates with the cookie set at sign-in, so a
//! client restarted from a persisted session needs that cookie back.

use std::sync::Arc;

use cookie_store::CookieStore;
use reqwest_cookie_store::CookieStoreMutex;

use crate::store::{Secret, SecretStore};

/// Storage key of the persisted cookie jar.
pub const COOKIE_KEY: &str = "session-cookies";

pub(crate) struct CookieJar {
    cookies: Arc<CookieStoreMutex>,
    storage: Option<Arc<dyn SecretStore>>,
}

impl CookieJar {
    /// A jar that lives only as long as the client.
    pub(crate) fn in_memory() -> Self {
        Self {
            cookies: Arc::new(CookieStoreMutex::new(CookieStore::default())),
            storage: None,
        }
    }

    /// Restore the jar saved in `storage`, starting empty when there is none.
    pub(crate) async fn load(storage: Arc<dyn SecretStore>) -> Self {
        let cookies = match storage.get(COOKIE_KEY).await {
            Ok(Some(record)) => {
                match cookie_store::serde::json::load(record.expose().as_bytes()) {
                    Ok(cookies) => cookies,
                    Err(e) => {
                        tracing::warn!("Ignoring malformed persisted cookies: {}", e);
                        CookieStore::default()
                    }
                }
            }
            Ok(None) => CookieStore::default(),
            Err(e) => {
                tracing::warn!("Could not read persisted cookies: {}", e);
                CookieStore::default()
            }
        };

        Self {
            cookies: Arc::new(CookieStoreMutex::new(cookies)),
            storage: Some(storage),
        }
    }

    /// The cookie provider handed to the transport.
    pub(crate) fn provider(&self) -> Arc<CookieStoreMutex> {
        Arc::clone(&self.cookies)
    }

    /// Save the current jar. Failures are logged and otherwise ignored.
    pub(crate) async fn persist(&self) {
        let Some(storage) = &self.storage else {
            return;
        };

        let result = match self.snapshot() {
            Ok(Some(json)) => storage.set(COOKIE_KEY, &Secret::new(json)).await,
            Ok(None) => storage.delete(COOKIE_KEY).await,
            Err(message) => {
                tracing::warn!("Could not serialize cookies: {}", message);
                return;
            }
        };

        if let Err(e) = result {
            tracing::warn!("Failed to persist cookies: {}", e);
        }
    }

    /// Serialized jar, or `None` when it holds no live cookie.
    fn snapshot(&self) -> Result<Option<String>, String> {
        let cookies = self
            .cookies
            .lock()
            .map_err(|_| "cookie jar lock poisoned".to_string())?;

        if cookies.iter_unexpired().next().is_none() {
            return Ok(None);
        }

        let mut buf = Vec::new();
        cookie_store::serde::json::save_incl_expired_and_nonpersistent(&cookies, &mut buf)
            .map_err(|e| e.to_string())?;
        String::from_utf8(buf).map(Some).map_err(|e| e.to_string())
    }
}
