//! Domain adapters over [`ApiClient`].
//!
//! Adapters translate user input into requests and responses into domain
//! types. They never look at authorization failures; recovery belongs to the
//! client.
//!
//! # Example
//!
//! ```rust,ignore
//! use agora_core::{Agora, PageQuery, SigninForm, load_config};
//!
//! let agora = Agora::connect(load_config()?).await?;
//! let claims = agora.auth().sign_in(&SigninForm::new("me@example.com", "abcd123!")).await?;
//! let page = agora.boards().list(&PageQuery::default().category("FREE")).await?;
//! ```

mod auth;
mod board;

pub use auth::AuthApi;
pub use board::BoardApi;

use crate::client::{ApiClient, ApiError};
use crate::config::ClientConfig;
use crate::guard::RouteGuard;

/// Entry point bundling the client, its adapters and the route guard.
#[derive(Debug, Clone)]
pub struct Agora {
    client: ApiClient,
    guard: RouteGuard,
}

impl Agora {
    /// Restore the persisted session and build a client for `config`.
    pub async fn connect(config: ClientConfig) -> Result<Self, ApiError> {
        Ok(Self::from_client(ApiClient::connect(config).await?))
    }

    pub fn from_client(client: ApiClient) -> Self {
        let guard = RouteGuard::new(client.config().login_path.clone());
        Self { client, guard }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn auth(&self) -> AuthApi {
        AuthApi::new(self.client.clone())
    }

    pub fn boards(&self) -> BoardApi {
        BoardApi::new(self.client.clone())
    }

    pub fn guard(&self) -> &RouteGuard {
        &self.guard
    }
}
