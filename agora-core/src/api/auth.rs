//! Account endpoints.

use crate::claims::{IdentityClaims, decode_claims};
use crate::client::{ApiClient, ApiError, ApiRequest, ApiResponse, TokenResponse};
use crate::events::SessionEvent;
use crate::model::{SigninForm, SignupForm};
use crate::validate::Validate;

const SIGNUP_PATH: &str = "/auth/signup";
const SIGNIN_PATH: &str = "/auth/signin";

#[derive(Debug, Clone)]
pub struct AuthApi {
    client: ApiClient,
}

impl AuthApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Create an account.
    pub async fn signup(&self, form: &SignupForm) -> Result<ApiResponse, ApiError> {
        let form = form.normalized();
        form.validate()?;

        let request = ApiRequest::post(SIGNUP_PATH).json(&form)?;
        self.client.execute(request).await
    }

    /// Exchange credentials for an access token without touching the session.
    pub async fn signin(&self, form: &SigninForm) -> Result<TokenResponse, ApiError> {
        let form = form.normalized();
        form.validate()?;

        let request = ApiRequest::post(SIGNIN_PATH).json(&form)?;
        self.client.execute(request).await?.json()
    }

    /// Sign in and store the session under the identity carried by the token.
    pub async fn sign_in(&self, form: &SigninForm) -> Result<IdentityClaims, ApiError> {
        let token = self.signin(form).await?.access_token;
        let claims = decode_claims(token.expose())?;

        self.client
            .credentials()
            .set_session(token, claims.username.clone(), claims.name.clone())
            .await;

        tracing::info!("Signed in as {}", claims.username);
        self.client.emit(SessionEvent::SignedIn {
            subject_id: claims.username.clone(),
            display_name: claims.name.clone(),
        });
        Ok(claims)
    }

    /// Forget the local session.
    pub async fn sign_out(&self) {
        self.client.credentials().clear().await;
        tracing::info!("Signed out");
        self.client.emit(SessionEvent::SignedOut);
    }
}
