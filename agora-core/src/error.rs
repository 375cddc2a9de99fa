//! Top-level error types for Agora.

use thiserror::Error;

use crate::claims::ClaimsError;
use crate::client::ApiError;
use crate::config::ConfigError;
use crate::store::StoreError;
use crate::validate::ValidationErrors;

/// Top-level error type encompassing all Agora errors.
#[derive(Debug, Error)]
pub enum AgoraError {
    /// Error from secret storage operations.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Error from the board API.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The access credential could not be decoded.
    #[error("credential error: {0}")]
    Claims(#[from] ClaimsError),

    #[error(transparent)]
    Validation(#[from] ValidationErrors),
}

impl AgoraError {
    /// Whether the user has to sign in again.
    pub fn is_session_expired(&self) -> bool {
        matches!(self, Self::Api(e) if e.is_session_expired())
    }
}
