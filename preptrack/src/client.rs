//! Wires the adapters and stores around one HTTP client and one session.

use std::sync::Arc;

use reqwest::Client;

use crate::api::{AccountApi, AuthApi, EntriesApi, StatsApi};
use crate::entry_store::EntryStore;
use crate::error::{ClientError, Result};
use crate::http::{AuthTransport, ProtectedTransport};
use crate::ports::LoginRedirect;
use crate::session::{SessionHandle, SessionStore};
use crate::storage::SessionStorage;

/// Where the two remote services live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub auth_base_url: String,
    pub auth_api_key: String,
    pub api_base_url: String,
}

pub struct PrepClient {
    session: SessionStore<AuthApi>,
    entries: EntryStore<EntriesApi>,
    stats: StatsApi,
    account: AccountApi,
}

impl PrepClient {
    pub fn new(
        config: &ClientConfig,
        storage: SessionStorage,
        redirect: Arc<dyn LoginRedirect>,
    ) -> Result<Self> {
        let http = Client::builder()
            .build()
            .map_err(|e| ClientError::Network(format!("Failed to build HTTP client: {}", e)))?;
        Self::with_client(http, config, storage, redirect)
    }

    /// Build on an existing `reqwest` client.
    pub fn with_client(
        http: Client,
        config: &ClientConfig,
        storage: SessionStorage,
        redirect: Arc<dyn LoginRedirect>,
    ) -> Result<Self> {
        let auth = AuthApi::new(AuthTransport::new(
            http.clone(),
            &config.auth_base_url,
            config.auth_api_key.clone(),
        )?);
        let session = SessionStore::new(auth, storage);
        let handle = session.handle();

        let api = ProtectedTransport::new(
            http.clone(),
            &config.api_base_url,
            handle.clone(),
            redirect.clone(),
        )?;
        let account = ProtectedTransport::new(http, &config.auth_base_url, handle, redirect)?
            .with_api_key(config.auth_api_key.clone());

        Ok(Self {
            session,
            entries: EntryStore::new(EntriesApi::new(api.clone())),
            stats: StatsApi::new(api),
            account: AccountApi::new(account),
        })
    }

    pub fn session(&self) -> &SessionStore<AuthApi> {
        &self.session
    }

    pub fn session_handle(&self) -> SessionHandle {
        self.session.handle()
    }

    pub fn entries(&self) -> &EntryStore<EntriesApi> {
        &self.entries
    }

    pub fn stats(&self) -> &StatsApi {
        &self.stats
    }

    pub fn account(&self) -> &AccountApi {
        &self.account
    }
}
