//! Request headers and response policies shared by all adapters.
//!
//! Two policies exist and must stay separate. Auth-flow calls (login,
//! register, passkey login) treat a 401 as bad credentials. Protected calls
//! treat a 401 as an expired session: the session is cleared, the user is
//! redirected to login and the call fails with [`ClientError::SessionExpired`].

use std::sync::Arc;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use crate::error::{ClientError, Result, GENERIC_FAILURE};
use crate::ports::LoginRedirect;
use crate::session::SessionHandle;

pub const API_KEY_HEADER: &str = "x-api-key";

/// Headers for auth-service calls: API key plus an optional bearer token.
pub fn auth_headers(api_key: &str, token: Option<&str>) -> Result<HeaderMap> {
    let mut headers = api_headers(token)?;
    headers.insert(
        API_KEY_HEADER,
        HeaderValue::from_str(api_key).map_err(|e| ClientError::InvalidHeader(e.to_string()))?,
    );
    Ok(headers)
}

/// Headers for main-API calls: bearer token when signed in.
pub fn api_headers(token: Option<&str>) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    if let Some(token) = token {
        let mut value = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|e| ClientError::InvalidHeader(e.to_string()))?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
    }
    Ok(headers)
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::to_string)
}

/// Error for a non-success status, carrying the body's `message` when present.
pub fn error_from_body(status: StatusCode, body: &[u8]) -> ClientError {
    let message = serde_json::from_slice::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("message")
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .filter(|message| !message.trim().is_empty())
        .unwrap_or_else(|| GENERIC_FAILURE.to_string());

    ClientError::Status {
        status: status.as_u16(),
        message,
    }
}

/// Parse a success body, reporting schema mismatches against the call.
pub fn parse_body<T: DeserializeOwned>(body: &[u8], call_name: &str) -> Result<T> {
    serde_json::from_slice(body).map_err(|e| ClientError::invalid_response(call_name, e))
}

/// Validated base URL with path-preserving joins.
#[derive(Debug, Clone)]
pub(crate) struct BaseUrl(String);

impl BaseUrl {
    pub(crate) fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim().trim_end_matches('/');
        Url::parse(trimmed).map_err(|e| ClientError::InvalidUrl(format!("{}: {}", raw, e)))?;
        Ok(Self(trimmed.to_string()))
    }

    pub(crate) fn endpoint(&self, path: &str) -> Result<Url> {
        let joined = format!("{}{}", self.0, path);
        Url::parse(&joined).map_err(|e| ClientError::InvalidUrl(format!("{}: {}", joined, e)))
    }

    /// `path` followed by `id` as one escaped path segment.
    pub(crate) fn resource(&self, path: &str, id: &str) -> Result<Url> {
        let mut url = self.endpoint(path)?;
        let shown = url.to_string();
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidUrl(format!("{} cannot take path segments", shown)))?
            .push(id);
        Ok(url)
    }
}

async fn read_checked(response: Response) -> Result<Vec<u8>> {
    let status = response.status();
    let body = response.bytes().await?;
    if !status.is_success() {
        return Err(error_from_body(status, &body));
    }
    Ok(body.to_vec())
}

/// Transport for unauthenticated auth-service calls.
#[derive(Debug, Clone)]
pub struct AuthTransport {
    client: Client,
    base_url: BaseUrl,
    api_key: String,
}

impl AuthTransport {
    pub fn new(client: Client, base_url: &str, api_key: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client,
            base_url: BaseUrl::parse(base_url)?,
            api_key: api_key.into(),
        })
    }

    pub(crate) async fn post_json<B, T>(&self, path: &str, body: &B, call_name: &str) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        tracing::debug!("{}", call_name);
        let response = self
            .client
            .post(self.base_url.endpoint(path)?)
            .headers(auth_headers(&self.api_key, None)?)
            .json(body)
            .send()
            .await?;

        let body = read_checked(response).await?;
        parse_body(&body, call_name)
    }
}

/// Transport for bearer-authenticated calls under the protected policy.
#[derive(Clone)]
pub struct ProtectedTransport {
    client: Client,
    base_url: BaseUrl,
    api_key: Option<String>,
    session: SessionHandle,
    redirect: Arc<dyn LoginRedirect>,
}

impl ProtectedTransport {
    pub fn new(
        client: Client,
        base_url: &str,
        session: SessionHandle,
        redirect: Arc<dyn LoginRedirect>,
    ) -> Result<Self> {
        Ok(Self {
            client,
            base_url: BaseUrl::parse(base_url)?,
            api_key: None,
            session,
            redirect,
        })
    }

    /// Also send the auth-service API key, for auth-service protected routes.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Request with headers for the session's current token.
    pub(crate) fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        self.request_to(method, self.base_url.endpoint(path)?)
    }

    /// Request for the resource `id` under `path`. The id is escaped.
    pub(crate) fn request_resource(
        &self,
        method: Method,
        path: &str,
        id: &str,
    ) -> Result<RequestBuilder> {
        self.request_to(method, self.base_url.resource(path, id)?)
    }

    fn request_to(&self, method: Method, url: Url) -> Result<RequestBuilder> {
        let token = self.session.token();
        let headers = match &self.api_key {
            Some(key) => auth_headers(key, token.as_deref())?,
            None => api_headers(token.as_deref())?,
        };
        Ok(self.client.request(method, url).headers(headers))
    }

    async fn send(&self, request: RequestBuilder, call_name: &str) -> Result<Response> {
        let request = request.build()?;
        let sent_token = bearer_token(request.headers());

        tracing::debug!("{}", call_name);
        let response = self.client.execute(request).await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            tracing::warn!("{} returned 401, session expired", call_name);
            if self.session.expire_if_current(sent_token.as_deref()) {
                self.redirect.redirect_to_login();
            }
            return Err(ClientError::SessionExpired);
        }

        Ok(response)
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        call_name: &str,
    ) -> Result<T> {
        let response = self.send(request, call_name).await?;
        let body = read_checked(response).await?;
        parse_body(&body, call_name)
    }

    /// For calls whose success body is irrelevant or empty (204).
    pub(crate) async fn send_without_body(
        &self,
        request: RequestBuilder,
        call_name: &str,
    ) -> Result<()> {
        let response = self.send(request, call_name).await?;
        read_checked(response).await?;
        Ok(())
    }
}

impl std::fmt::Debug for ProtectedTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProtectedTransport")
            .field("base_url", &self.base_url)
            .field("has_api_key", &self.api_key.is_some())
            .finish_non_exhaustive()
    }
}
