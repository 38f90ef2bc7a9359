//! Seams between the stores and the outside world.
//!
//! The stores depend on these traits rather than on the HTTP adapters so they
//! can be driven by [`crate::mock::MockBackend`] in tests.

use async_trait::async_trait;
use time::Date;

use crate::api::dto::{LoginResponse, PasskeyChallenge, RegisterResponse};
use crate::domain::{
    BulkDeleteResult, CreateEntryBody, DayView, EntriesFilter, Entry, HistoryRange,
    PaginatedEntries, PrepCategory, SourceCount, TagCount, TaskCompletion, TopicCount,
    UpdateEntryBody, UpdateTaskStatusBody,
};
use crate::error::Result;

/// Unauthenticated auth-service calls. Errors follow the auth-flow policy:
/// a 401 means bad credentials, never an expired session.
#[async_trait]
pub trait AuthService: Send + Sync {
    async fn register(&self, email: &str, password: &str) -> Result<RegisterResponse>;

    async fn login(&self, email: &str, password: &str) -> Result<LoginResponse>;

    async fn passkey_login_options(&self, email: Option<&str>) -> Result<PasskeyChallenge>;

    async fn passkey_login_verify(
        &self,
        challenge_id: &str,
        credential: &serde_json::Value,
    ) -> Result<LoginResponse>;
}

/// Entry endpoints of the main API.
#[async_trait]
pub trait EntryService: Send + Sync {
    async fn list(&self, filter: &EntriesFilter) -> Result<PaginatedEntries>;

    async fn get(&self, id: &str) -> Result<Entry>;

    async fn create(&self, body: &CreateEntryBody) -> Result<Entry>;

    async fn update(&self, id: &str, body: &UpdateEntryBody) -> Result<Entry>;

    async fn delete(&self, id: &str) -> Result<()>;

    async fn bulk_delete(&self, ids: &[String]) -> Result<BulkDeleteResult>;

    /// Resolved tasks for the server's current date.
    async fn today(&self) -> Result<DayView>;

    async fn history_day(&self, date: Date) -> Result<DayView>;

    async fn history_range(&self, from: Date, to: Date) -> Result<HistoryRange>;

    async fn update_task_status(&self, body: &UpdateTaskStatusBody) -> Result<TaskCompletion>;

    async fn search(&self, query: &str) -> Result<Vec<Entry>>;

    async fn tags(&self) -> Result<Vec<TagCount>>;

    async fn topics(&self, category: Option<PrepCategory>) -> Result<Vec<TopicCount>>;

    async fn sources(&self) -> Result<Vec<SourceCount>>;
}

/// A WebAuthn-capable authenticator. Options and results are opaque JSON.
#[async_trait]
pub trait PlatformAuthenticator: Send + Sync {
    /// Run an assertion ceremony for a login challenge.
    async fn authenticate(&self, options: &serde_json::Value) -> Result<serde_json::Value>;

    /// Run an attestation ceremony to create a new credential.
    async fn register(&self, options: &serde_json::Value) -> Result<serde_json::Value>;
}

/// Sends the user back to the login entry point after a session expires.
pub trait LoginRedirect: Send + Sync {
    fn redirect_to_login(&self);
}

/// Redirect that does nothing, for callers without a login screen.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRedirect;

impl LoginRedirect for NoRedirect {
    fn redirect_to_login(&self) {}
}
