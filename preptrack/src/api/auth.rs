use async_trait::async_trait;

use crate::api::dto::{
    CredentialsRequest, LoginResponse, PasskeyChallenge, PasskeyOptionsRequest,
    PasskeyVerifyRequest, RegisterResponse,
};
use crate::error::Result;
use crate::http::AuthTransport;
use crate::ports::AuthService;

/// Auth-service endpoints that run before a session exists.
#[derive(Debug, Clone)]
pub struct AuthApi {
    http: AuthTransport,
}

impl AuthApi {
    pub fn new(http: AuthTransport) -> Self {
        Self { http }
    }
}

#[async_trait]
impl AuthService for AuthApi {
    async fn register(&self, email: &str, password: &str) -> Result<RegisterResponse> {
        self.http
            .post_json(
                "/auth/register",
                &CredentialsRequest { email, password },
                "POST /auth/register",
            )
            .await
    }

    async fn login(&self, email: &str, password: &str) -> Result<LoginResponse> {
        self.http
            .post_json(
                "/auth/login",
                &CredentialsRequest { email, password },
                "POST /auth/login",
            )
            .await
    }

    async fn passkey_login_options(&self, email: Option<&str>) -> Result<PasskeyChallenge> {
        self.http
            .post_json(
                "/auth/passkey/login/options",
                &PasskeyOptionsRequest { email },
                "POST /auth/passkey/login/options",
            )
            .await
    }

    async fn passkey_login_verify(
        &self,
        challenge_id: &str,
        credential: &serde_json::Value,
    ) -> Result<LoginResponse> {
        self.http
            .post_json(
                "/auth/passkey/login/verify",
                &PasskeyVerifyRequest {
                    challenge_id,
                    credential,
                    name: None,
                },
                "POST /auth/passkey/login/verify",
            )
            .await
    }
}
