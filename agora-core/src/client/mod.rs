//! HTTP client core.
//!
//! [`ApiClient`] sends every request with the current bearer credential. A
//! `401 Unauthorized` starts at most one refresh cycle at a time: the first
//! request to see it calls the refresh endpoint, any other request rejected
//! meanwhile waits for that call, and all of them are replayed once with the
//! new credential. If the refresh fails, every waiter fails with the same
//! error, the session is cleared, and
//! [`SessionEvent::AuthenticationLost`] is emitted.
//!
//! # Example
//!
//! ```rust,no_run
//! # async fn example() -> Result<(), agora_core::ApiError> {
//! use std::sync::Arc;
//! use agora_core::{ApiClient, ApiRequest, ClientConfig, CredentialStore, MemoryStore};
//!
//! let credentials = Arc::new(CredentialStore::new(Arc::new(MemoryStore::new())));
//! let client = ApiClient::new(ClientConfig::default(), credentials)?;
//!
//! let response = client.execute(ApiRequest::get("/boards/categories")).await?;
//! println!("{}", response.text());
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use reqwest::StatusCode;
use reqwest::header::SET_COOKIE;
use serde::Deserialize;
use tokio::sync::broadcast;

mod cookies;
mod error;
mod refresh;
mod request;
mod response;

pub use cookies::COOKIE_KEY;
pub use error::{ApiError, RefreshError};
pub use request::{ApiRequest, MultipartPart, RequestBody};
pub use response::ApiResponse;

use cookies::CookieJar;
use refresh::{RefreshCoordinator, Ticket};

use crate::claims::decode_claims;
use crate::config::ClientConfig;
use crate::credential::CredentialStore;
use crate::events::{EventBus, Navigation, SessionEvent};
use crate::store::{Secret, create_store};

/// Path of the refresh endpoint below the API root.
pub const REFRESH_PATH: &str = "/auth/refresh";

/// Body of the sign-in and refresh endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    #[serde(rename = "accessToken")]
    pub access_token: Secret,
}

/// Client for the board API.
///
/// Cheap to clone; clones share the transport, the credential store, the
/// refresh state, and the event channel.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http: reqwest::Client,
    config: ClientConfig,
    credentials: Arc<CredentialStore>,
    cookies: CookieJar,
    refresh: RefreshCoordinator,
    events: EventBus,
}

impl ApiClient {
    /// Create a client over an existing credential store.
    ///
    /// The transport keeps a cookie jar so the refresh endpoint receives the
    /// session cookie set at sign-in. The jar is not persisted; use
    /// [`connect`](Self::connect) for a client that outlives the process.
    pub fn new(config: ClientConfig, credentials: Arc<CredentialStore>) -> Result<Self, ApiError> {
        Self::with_cookie_jar(config, credentials, CookieJar::in_memory())
    }

    /// Open the configured storage, restore the persisted session and its
    /// cookies, and create a client over them.
    pub async fn connect(config: ClientConfig) -> Result<Self, ApiError> {
        let storage = create_store(config.storage, config.data_dir.as_deref());
        let credentials = Arc::new(CredentialStore::load(Arc::clone(&storage)).await);
        let cookies = CookieJar::load(storage).await;
        Self::with_cookie_jar(config, credentials, cookies)
    }

    fn with_cookie_jar(
        config: ClientConfig,
        credentials: Arc<CredentialStore>,
        cookies: CookieJar,
    ) -> Result<Self, ApiError> {
        let mut builder = reqwest::Client::builder().cookie_provider(cookies.provider());
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            inner: Arc::new(ClientInner {
                http: builder.build()?,
                config,
                credentials,
                cookies,
                refresh: RefreshCoordinator::default(),
                events: EventBus::new(),
            }),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.inner.credentials
    }

    /// Receive session lifecycle events emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    /// Whether a refresh cycle is in flight.
    pub fn is_refreshing(&self) -> bool {
        self.inner.refresh.is_refreshing()
    }

    pub(crate) fn emit(&self, event: SessionEvent) {
        self.inner.events.emit(event);
    }

    /// Send `request`, recovering once from an expired credential.
    pub async fn execute(&self, mut request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let mut bearer = self.inner.credentials.access_token();

        loop {
            let response = self.dispatch(&request, bearer.as_ref()).await?;

            if response.status() != StatusCode::UNAUTHORIZED {
                return ApiResponse::read(&request, response).await;
            }

            if request.is_retried() {
                tracing::warn!(
                    "{} {} rejected again after refresh",
                    request.method(),
                    request.path()
                );
                return Err(ApiError::Unauthorized {
                    method: request.method().to_string(),
                    path: request.path().to_string(),
                });
            }

            request.mark_retried();
            bearer = Some(self.recover().await?);

            tracing::debug!(
                "Replaying {} {} with refreshed credential",
                request.method(),
                request.path()
            );
        }
    }

    async fn dispatch(
        &self,
        request: &ApiRequest,
        bearer: Option<&Secret>,
    ) -> Result<reqwest::Response, ApiError> {
        let url = self.inner.config.endpoint(request.path())?;
        let mut builder = self.inner.http.request(request.method().clone(), url);

        if !request.query_pairs().is_empty() {
            builder = builder.query(request.query_pairs());
        }
        if let Some(token) = bearer {
            builder = builder.bearer_auth(token.expose());
        }
        builder = match request.body() {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Multipart(parts) => builder.multipart(request::build_form(parts)?),
        };

        tracing::debug!("{} {}", request.method(), request.path());
        let response = builder.send().await?;
        self.save_cookies_from(&response).await;
        Ok(response)
    }

    async fn save_cookies_from(&self, response: &reqwest::Response) {
        if response.headers().contains_key(SET_COOKIE) {
            self.inner.cookies.persist().await;
        }
    }

    /// Obtain a fresh credential, either by leading the refresh cycle or by
    /// waiting on the one in flight.
    async fn recover(&self) -> Result<Secret, ApiError> {
        let guard = match self.inner.refresh.begin() {
            Ticket::Follower(waiter) => {
                tracing::debug!("Refresh in flight, queueing request");
                return match waiter.await {
                    Ok(outcome) => outcome.map_err(ApiError::RefreshFailed),
                    Err(_) => Err(ApiError::RefreshFailed(RefreshError::Abandoned)),
                };
            }
            Ticket::Leader(guard) => guard,
        };

        tracing::info!("Access token rejected, refreshing session");

        let outcome = match self.refresh_access_token().await {
            Ok(token) => self.store_refreshed(token).await,
            Err(e) => Err(e),
        };

        match outcome {
            Ok(token) => {
                let released = guard.settle(Ok(token.clone()));
                tracing::info!("Session refreshed, releasing {} queued requests", released);
                self.emit(SessionEvent::TokenRefreshed);
                Ok(token)
            }
            Err(e) => {
                tracing::warn!("Session refresh failed: {}", e);
                self.inner.credentials.clear().await;
                let rejected = guard.settle(Err(e.clone()));
                tracing::debug!("Rejected {} queued requests", rejected);
                self.emit(SessionEvent::AuthenticationLost {
                    reason: e.to_string(),
                    navigation: Navigation::Hard(self.inner.config.login_path.clone()),
                });
                Err(ApiError::RefreshFailed(e))
            }
        }
    }

    /// Record a refreshed token.
    ///
    /// A session that has no identity yet (restored from cookies alone)
    /// takes it from the token's claims.
    async fn store_refreshed(&self, token: Secret) -> Result<Secret, RefreshError> {
        let credentials = &self.inner.credentials;
        if credentials.get().subject_id().is_some() {
            credentials.set_token(token.clone()).await;
            return Ok(token);
        }

        let claims = decode_claims(token.expose()).map_err(|e| RefreshError::InvalidResponse {
            message: e.to_string(),
        })?;
        credentials
            .set_session(token.clone(), claims.username, claims.name)
            .await;
        Ok(token)
    }

    /// Exchange the session cookie for a new access token.
    ///
    /// Goes straight to the transport: no bearer header, no 401 handling.
    async fn refresh_access_token(&self) -> Result<Secret, RefreshError> {
        let url = self
            .inner
            .config
            .endpoint(REFRESH_PATH)
            .map_err(|e| RefreshError::Transport {
                message: e.to_string(),
            })?;

        let response = self
            .inner
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| RefreshError::Transport {
                message: e.to_string(),
            })?;
        self.save_cookies_from(&response).await;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(RefreshError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let body: TokenResponse =
            response
                .json()
                .await
                .map_err(|e| RefreshError::InvalidResponse {
                    message: e.to_string(),
                })?;

        Ok(body.access_token)
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.config.base_url.as_str())
            .field("refreshing", &self.is_refreshing())
            .finish()
    }
}
