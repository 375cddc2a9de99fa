//! Error types for the HTTP client.

use reqwest::StatusCode;
use thiserror::Error;

use crate::claims::ClaimsError;
use crate::validate::ValidationErrors;

/// Failure of the refresh cycle.
///
/// Cloned to every request that was waiting on the cycle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RefreshError {
    /// The refresh endpoint answered with a non-success status.
    #[error("refresh endpoint returned {status}: {message}")]
    Rejected { status: u16, message: String },

    /// The refresh call never produced a response.
    #[error("refresh request failed: {message}")]
    Transport { message: String },

    /// The refresh response did not carry an access token.
    #[error("refresh response is invalid: {message}")]
    InvalidResponse { message: String },

    /// The task driving the refresh went away before it settled.
    #[error("refresh was abandoned before it settled")]
    Abandoned,
}

#[derive(Debug, Error)]
pub enum ApiError {
    /// Input rejected before dispatch.
    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    /// The request was rejected again after being replayed with a refreshed
    /// credential.
    #[error("{method} {path} is unauthorized")]
    Unauthorized { method: String, path: String },

    /// The session could not be refreshed; the user has to sign in again.
    #[error("session expired: {0}")]
    RefreshFailed(#[from] RefreshError),

    /// Any other non-success status.
    #[error("{method} {path} returned {status}: {body}")]
    Status {
        method: String,
        path: String,
        status: StatusCode,
        body: String,
    },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// A body could not be encoded or decoded.
    #[error("JSON error: {0}")]
    Decode(#[from] serde_json::Error),

    /// The access credential returned by the server could not be read.
    #[error("invalid access credential: {0}")]
    InvalidCredential(#[from] ClaimsError),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl ApiError {
    /// HTTP status behind this error, when there was one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Unauthorized { .. } => Some(StatusCode::UNAUTHORIZED),
            Self::Status { status, .. } => Some(*status),
            Self::Transport(e) => e.status(),
            _ => None,
        }
    }

    /// Whether the user has to authenticate again.
    pub fn is_session_expired(&self) -> bool {
        matches!(self, Self::RefreshFailed(_))
    }

    /// The `message` field of a JSON error body, if the server sent one.
    pub fn server_message(&self) -> Option<String> {
        let Self::Status { body, .. } = self else {
            return None;
        };
        let value: serde_json::Value = serde_json::from_str(body).ok()?;
        value.get("message")?.as_str().map(str::to_string)
    }
}
