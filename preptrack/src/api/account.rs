use reqwest::Method;

use crate::api::dto::{
    CredentialEnvelope, CredentialList, MessageResponse, PasskeyChallenge, PasskeyVerifyRequest,
    RegisterPasskeyResponse, RenameCredentialRequest,
};
use crate::domain::{PasskeyCredential, UserProfile};
use crate::error::Result;
use crate::http::ProtectedTransport;
use crate::ports::PlatformAuthenticator;

/// Auth-service endpoints for a signed-in user: profile and passkey management.
#[derive(Debug, Clone)]
pub struct AccountApi {
    http: ProtectedTransport,
}

impl AccountApi {
    /// `http` should point at the auth service and carry its API key.
    pub fn new(http: ProtectedTransport) -> Self {
        Self { http }
    }

    pub async fn profile(&self) -> Result<UserProfile> {
        self.http
            .get_json(
                self.http.request(Method::GET, "/users/profile")?,
                "GET /users/profile",
            )
            .await
    }

    pub async fn registration_options(&self) -> Result<PasskeyChallenge> {
        self.http
            .get_json(
                self.http
                    .request(Method::POST, "/auth/passkey/register/options")?,
                "POST /auth/passkey/register/options",
            )
            .await
    }

    pub async fn verify_registration(
        &self,
        challenge_id: &str,
        credential: &serde_json::Value,
        name: Option<&str>,
    ) -> Result<RegisterPasskeyResponse> {
        self.http
            .get_json(
                self.http
                    .request(Method::POST, "/auth/passkey/register/verify")?
                    .json(&PasskeyVerifyRequest {
                        challenge_id,
                        credential,
                        name,
                    }),
                "POST /auth/passkey/register/verify",
            )
            .await
    }

    /// Options, authenticator ceremony, verification.
    pub async fn register_passkey(
        &self,
        authenticator: &dyn PlatformAuthenticator,
        name: Option<&str>,
    ) -> Result<PasskeyCredential> {
        let challenge = self.registration_options().await?;
        let credential = authenticator.register(&challenge.options).await?;
        let response = self
            .verify_registration(&challenge.challenge_id, &credential, name)
            .await?;
        tracing::info!("Registered passkey {}", response.credential.id);
        Ok(response.credential)
    }

    pub async fn list_credentials(&self) -> Result<Vec<PasskeyCredential>> {
        let list: CredentialList = self
            .http
            .get_json(
                self.http.request(Method::GET, "/auth/passkey/credentials")?,
                "GET /auth/passkey/credentials",
            )
            .await?;
        Ok(list.credentials)
    }

    pub async fn rename_credential(&self, id: &str, name: &str) -> Result<PasskeyCredential> {
        let envelope: CredentialEnvelope = self
            .http
            .get_json(
                self.http
                    .request_resource(Method::PATCH, "/auth/passkey/credentials", id)?
                    .json(&RenameCredentialRequest { name }),
                "PATCH /auth/passkey/credentials/:id",
            )
            .await?;
        Ok(envelope.credential)
    }

    pub async fn delete_credential(&self, id: &str) -> Result<()> {
        self.http
            .send_without_body(
                self.http
                    .request_resource(Method::DELETE, "/auth/passkey/credentials", id)?,
                "DELETE /auth/passkey/credentials/:id",
            )
            .await
    }

    /// Turn passkey sign-in off for the account.
    pub async fn opt_out(&self) -> Result<String> {
        let response: MessageResponse = self
            .http
            .get_json(
                self.http.request(Method::POST, "/auth/passkey/opt-out")?,
                "POST /auth/passkey/opt-out",
            )
            .await?;
        Ok(response.message)
    }
}
