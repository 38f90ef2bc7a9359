use serde::{Deserialize, Serialize};

use crate::domain::{PasskeyCredential, User};
use crate::error::{ClientError, Result};

#[derive(Serialize)]
pub struct CredentialsRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Serialize)]
pub struct PasskeyOptionsRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<&'a str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PasskeyVerifyRequest<'a> {
    pub challenge_id: &'a str,
    pub credential: &'a serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<&'a str>,
}

#[derive(Serialize)]
pub struct RenameCredentialRequest<'a> {
    pub name: &'a str,
}

#[derive(Serialize)]
pub struct BulkDeleteRequest<'a> {
    pub ids: &'a [String],
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginUser {
    pub id: String,
    #[serde(default)]
    pub username: Option<String>,
    pub role: String,
}

/// Response of `/auth/login` and `/auth/passkey/login/verify`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub user: LoginUser,
}

impl LoginResponse {
    /// Rejects responses that parsed but cannot back a session.
    pub fn validate(self, call: &str) -> Result<Self> {
        if self.access_token.trim().is_empty() {
            return Err(ClientError::invalid_response(call, "empty access token"));
        }
        if self.user.id.trim().is_empty() {
            return Err(ClientError::invalid_response(call, "empty user id"));
        }
        Ok(self)
    }

    /// The login response has no email, so the caller supplies it.
    pub fn session_user(&self, email: &str) -> User {
        User {
            id: self.user.id.clone(),
            email: email.to_string(),
            username: self.user.username.clone(),
            role: self.user.role.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredUser {
    pub email: String,
    #[serde(rename = "_id")]
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub message: String,
    pub user: RegisteredUser,
}

/// Challenge handed to the platform authenticator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasskeyChallenge {
    pub options: serde_json::Value,
    pub challenge_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterPasskeyResponse {
    pub message: String,
    pub credential: PasskeyCredential,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialList {
    pub credentials: Vec<PasskeyCredential>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialEnvelope {
    pub credential: PasskeyCredential,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}
