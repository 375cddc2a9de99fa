use reqwest::StatusCode;
use serde::de::DeserializeOwned;

use super::error::ApiError;
use super::request::ApiRequest;

/// A successful response with its body read into memory.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    status: StatusCode,
    body: Vec<u8>,
}

impl ApiResponse {
    /// Read `response`, turning any non-success status into [`ApiError::Status`].
    pub(crate) async fn read(
        request: &ApiRequest,
        response: reqwest::Response,
    ) -> Result<Self, ApiError> {
        let status = response.status();
        let body = response.bytes().await?.to_vec();

        if status.is_success() {
            Ok(Self { status, body })
        } else {
            Err(ApiError::Status {
                method: request.method().to_string(),
                path: request.path().to_string(),
                status,
                body: String::from_utf8_lossy(&body).into_owned(),
            })
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn bytes(&self) -> &[u8] {
        &self.body
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}
