//! # Agora Core
//!
//! Client library for the Agora board service.
//!
//! This crate provides:
//! - A credential store holding the signed-in session, persisted through
//!   pluggable secret storage backends
//! - An HTTP client that injects the access token and transparently
//!   refreshes it, one refresh at a time, when the server rejects it
//! - Adapters for the account and board endpoints, with local form validation
//! - Route guards and session events for front ends
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use agora_core::{Agora, PageQuery, SessionEvent, load_config};
//!
//! let agora = Agora::connect(load_config()?).await?;
//! let mut events = agora.client().subscribe();
//!
//! match agora.boards().list(&PageQuery::default()).await {
//!     Ok(page) => println!("{} posts", page.total_elements),
//!     Err(e) if e.is_session_expired() => println!("please sign in again"),
//!     Err(e) => return Err(e.into()),
//! }
//! ```

pub mod api;
pub mod claims;
pub mod client;
pub mod config;
pub mod credential;
pub mod error;
pub mod events;
pub mod guard;
pub mod model;
pub mod store;
pub mod validate;

pub use api::{Agora, AuthApi, BoardApi};

pub use claims::{ClaimsError, IdentityClaims, decode_claims};

pub use client::{
    ApiClient,
    ApiError,
    ApiRequest,
    ApiResponse,
    COOKIE_KEY,
    MultipartPart,
    RefreshError,
    RequestBody,
    TokenResponse,
};

pub use config::{ClientConfig, ConfigError, StorageBackend, load_config, load_config_from};

pub use credential::{Credential, CredentialStore};

pub use error::AgoraError;

pub use events::{Navigation, SessionEvent};

pub use guard::{GuardDecision, RouteGuard};

pub use model::{
    Attachment,
    Categories,
    PageQuery,
    Post,
    PostForm,
    PostId,
    PostPage,
    SigninForm,
    SignupForm,
};

pub use store::{
    FileStore,
    MemoryStore,
    Secret,
    SecretStore,
    StoreError,
    create_store,
};

#[cfg(feature = "keyring-store")]
pub use store::KeyringStore;

pub use validate::{FieldError, Validate, ValidationErrors};
