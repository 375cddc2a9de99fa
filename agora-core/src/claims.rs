//! Identity claims carried inside the access credential.
//!
//! The access token is a JWT whose payload names the signed-in user. The
//! client only reads the payload; the signature is the server's concern.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClaimsError {
    /// The token is not three dot-separated segments.
    #[error("access token is not a JWT ({segments} segments)")]
    Malformed { segments: usize },

    #[error("payload is not base64url: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("payload is not a claim set: {0}")]
    Json(#[from] serde_json::Error),
}

/// Claims the board server embeds in its access tokens.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IdentityClaims {
    /// Account identifier (the sign-in e-mail address).
    pub username: String,

    /// Display name.
    pub name: String,

    /// Expiry as a Unix timestamp, when present.
    #[serde(default)]
    pub exp: Option<i64>,
}

impl IdentityClaims {
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.exp.and_then(|ts| DateTime::from_timestamp(ts, 0))
    }
}

/// Decode the identity claims from a JWT access token.
pub fn decode_claims(token: &str) -> Result<IdentityClaims, ClaimsError> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err(ClaimsError::Malformed {
            segments: parts.len(),
        });
    }

    let payload = URL_SAFE_NO_PAD.decode(parts[1].trim_end_matches('='))?;
    Ok(serde_json::from_slice(&payload)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jwt(payload: serde_json::Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let body = URL_SAFE_NO_PAD.encode(payload.to_string());
        format!("{}.{}.signature", header, body)
    }

    #[test]
    fn test_decode_claims() {
        let token = jwt(serde_json::json!({
            "username": "a@b.com",
            "name": "Alice",
            "exp": 1_900_000_000
        }));

        let claims = decode_claims(&token).unwrap();
        assert_eq!(claims.username, "a@b.com");
        assert_eq!(claims.name, "Alice");
        assert_eq!(claims.expires_at().unwrap().timestamp(), 1_900_000_000);
    }

    #[test]
    fn test_decode_claims_without_expiry() {
        let token = jwt(serde_json::json!({"username": "a@b.com", "name": "Alice"}));
        assert!(decode_claims(&token).unwrap().expires_at().is_none());
    }

    #[test]
    fn test_decode_rejects_opaque_token() {
        assert!(matches!(
            decode_claims("opaque-token"),
            Err(ClaimsError::Malformed { segments: 1 })
        ));
    }

    #[test]
    fn test_decode_rejects_missing_claims() {
        let token = jwt(serde_json::json!({"sub": "42"}));
        assert!(matches!(decode_claims(&token), Err(ClaimsError::Json(_))));
    }
}
