//! Session state and the store that signs users in and out.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::api::dto::LoginResponse;
use crate::domain::User;
use crate::error::{ClientError, Result, StorageError};
use crate::ports::{AuthService, PlatformAuthenticator};
use crate::storage::{
    KeyValueStore, PersistencePolicy, SessionStorage, REMEMBER_KEY, TOKEN_KEY, USER_KEY,
};

const LOGIN_CALL: &str = "POST /auth/login";
const PASSKEY_VERIFY_CALL: &str = "POST /auth/passkey/login/verify";

/// Snapshot of the session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub user: Option<User>,
    pub token: Option<String>,
    /// Set once persisted state has been read. Protected views wait for it.
    pub is_hydrated: bool,
    pub is_loading: bool,
    pub error: Option<String>,
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some() && self.token.is_some()
    }
}

/// Shared handle to the single session container.
///
/// Readers (the protected transport, the CLI) get accessors. Writes to the
/// container and to the persistence tiers only happen through crate-internal
/// methods driven by [`SessionStore`] and the protected 401 handler.
#[derive(Clone)]
pub struct SessionHandle {
    state: Arc<Mutex<Session>>,
    storage: SessionStorage,
}

impl SessionHandle {
    fn new(storage: SessionStorage) -> Self {
        Self {
            state: Arc::new(Mutex::new(Session::default())),
            storage,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Session> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn snapshot(&self) -> Session {
        self.lock().clone()
    }

    pub fn token(&self) -> Option<String> {
        self.lock().token.clone()
    }

    pub fn user(&self) -> Option<User> {
        self.lock().user.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.lock().is_authenticated()
    }

    pub fn is_hydrated(&self) -> bool {
        self.lock().is_hydrated
    }

    fn begin(&self) {
        let mut state = self.lock();
        state.is_loading = true;
        state.error = None;
    }

    fn fail(&self, message: String) {
        let mut state = self.lock();
        state.is_loading = false;
        state.error = Some(message);
    }

    fn clear_error(&self) {
        self.lock().error = None;
    }

    /// Persist a new session, then publish it in memory.
    ///
    /// The chosen tier and the `remember` flag are written first. If any of
    /// those writes fails they are restored to their prior values, so the
    /// previously persisted session and the in-memory one stay intact. The
    /// other tier is only pruned once the new session is authoritative.
    fn commit(&self, token: &str, user: &User, policy: PersistencePolicy) -> Result<()> {
        let user_json = serde_json::to_string(user)
            .map_err(|e| StorageError::Corrupt(format!("cannot serialize user: {}", e)))?;

        let tier = self.storage.tier(policy);
        let durable = self.storage.durable();
        let previous = [
            (tier, TOKEN_KEY, tier.get(TOKEN_KEY)?),
            (tier, USER_KEY, tier.get(USER_KEY)?),
            (durable, REMEMBER_KEY, durable.get(REMEMBER_KEY)?),
        ];

        let written = tier
            .set(TOKEN_KEY, token)
            .and_then(|_| tier.set(USER_KEY, &user_json))
            .and_then(|_| durable.set(REMEMBER_KEY, policy.as_flag()));
        if let Err(e) = written {
            for (store, key, value) in &previous {
                restore_logged(*store, key, value.as_deref());
            }
            return Err(e.into());
        }

        let other = match policy {
            PersistencePolicy::Durable => self.storage.ephemeral(),
            PersistencePolicy::Ephemeral => self.storage.durable(),
        };
        remove_logged(other, TOKEN_KEY);
        remove_logged(other, USER_KEY);

        let mut state = self.lock();
        state.token = Some(token.to_string());
        state.user = Some(user.clone());
        state.is_loading = false;
        state.error = None;
        Ok(())
    }

    fn clear_persisted(&self) {
        for tier in [self.storage.durable(), self.storage.ephemeral()] {
            remove_logged(tier, TOKEN_KEY);
            remove_logged(tier, USER_KEY);
        }
        remove_logged(self.storage.durable(), REMEMBER_KEY);
    }

    fn reset(state: &mut Session) {
        state.user = None;
        state.token = None;
        state.error = None;
    }

    pub(crate) fn clear(&self) {
        let mut state = self.lock();
        self.clear_persisted();
        Self::reset(&mut state);
    }

    /// Clear the session if `sent_token` is still the current token.
    ///
    /// Returns whether this call ended the session it was made with. A 401
    /// for a token that a newer sign-in has replaced leaves the new session
    /// alone, and a second 401 for an already-cleared session is a no-op.
    pub(crate) fn expire_if_current(&self, sent_token: Option<&str>) -> bool {
        let mut state = self.lock();
        if state.token.as_deref() != sent_token {
            return false;
        }
        self.clear_persisted();
        Self::reset(&mut state);
        true
    }

    fn hydrate(&self) {
        let mut state = self.lock();
        match self.load_persisted() {
            Ok(Some((token, user))) => {
                tracing::debug!("Restored session for {}", user.email);
                state.token = Some(token);
                state.user = Some(user);
            }
            Ok(None) => {
                self.clear_persisted();
                Self::reset(&mut state);
            }
            Err(e) => {
                tracing::warn!("Ignoring unreadable persisted session: {}", e);
                self.clear_persisted();
                Self::reset(&mut state);
            }
        }
        state.is_hydrated = true;
    }

    fn load_persisted(&self) -> std::result::Result<Option<(String, User)>, StorageError> {
        let flag = self.storage.durable().get(REMEMBER_KEY)?;
        let tier = self
            .storage
            .tier(PersistencePolicy::from_flag(flag.as_deref()));

        let (Some(token), Some(user_json)) = (tier.get(TOKEN_KEY)?, tier.get(USER_KEY)?) else {
            return Ok(None);
        };
        if token.is_empty() {
            return Ok(None);
        }
        let user = serde_json::from_str::<User>(&user_json)
            .map_err(|e| StorageError::Corrupt(format!("persisted user: {}", e)))?;
        Ok(Some((token, user)))
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("SessionHandle")
            .field("authenticated", &state.is_authenticated())
            .field("hydrated", &state.is_hydrated)
            .finish()
    }
}

fn remove_logged(tier: &dyn KeyValueStore, key: &str) {
    if let Err(e) = tier.remove(key) {
        tracing::warn!("Failed to remove {} from session storage: {}", key, e);
    }
}

fn restore_logged(tier: &dyn KeyValueStore, key: &str, value: Option<&str>) {
    let restored = match value {
        Some(value) => tier.set(key, value),
        None => tier.remove(key),
    };
    if let Err(e) = restored {
        tracing::warn!("Failed to restore {} in session storage: {}", key, e);
    }
}

fn describe(err: &ClientError, fallback: &str) -> String {
    let message = err.to_string();
    if message.trim().is_empty() {
        fallback.to_string()
    } else {
        message
    }
}

/// Signs users in and out and owns the persisted session.
pub struct SessionStore<A> {
    auth: A,
    handle: SessionHandle,
}

impl<A: AuthService> SessionStore<A> {
    pub fn new(auth: A, storage: SessionStorage) -> Self {
        Self {
            auth,
            handle: SessionHandle::new(storage),
        }
    }

    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    pub fn session(&self) -> Session {
        self.handle.snapshot()
    }

    pub fn auth(&self) -> &A {
        &self.auth
    }

    /// Restore a persisted session. Run once at start-up, before any
    /// protected view; running it again is harmless.
    pub fn hydrate(&self) {
        self.handle.hydrate();
    }

    /// Sign in with email and password.
    ///
    /// On failure the error is recorded and an existing session stays as it was.
    pub async fn login(&self, email: &str, password: &str, policy: PersistencePolicy) -> Result<User> {
        self.handle.begin();
        let outcome = match self.auth.login(email, password).await {
            Ok(response) => self.establish(response, email, policy, LOGIN_CALL),
            Err(e) => Err(e),
        };
        self.settle(outcome, "Login failed")
    }

    /// Sign in with a passkey.
    ///
    /// `email` narrows the server's credential list; without it the
    /// authenticator offers any discoverable credential.
    pub async fn passkey_login(
        &self,
        email: Option<&str>,
        policy: PersistencePolicy,
        authenticator: &dyn PlatformAuthenticator,
    ) -> Result<User> {
        self.handle.begin();
        let outcome: Result<User> = async {
            let challenge = self.auth.passkey_login_options(email).await?;
            let credential = authenticator.authenticate(&challenge.options).await?;
            let response = self
                .auth
                .passkey_login_verify(&challenge.challenge_id, &credential)
                .await?;
            let email = email
                .map(str::to_string)
                .or_else(|| response.user.username.clone())
                .unwrap_or_default();
            self.establish(response, &email, policy, PASSKEY_VERIFY_CALL)
        }
        .await;
        self.settle(outcome, "Passkey login failed")
    }

    /// Register, then sign in with the same credentials.
    pub async fn signup(&self, email: &str, password: &str, policy: PersistencePolicy) -> Result<User> {
        self.handle.begin();
        let outcome: Result<User> = async {
            self.auth.register(email, password).await?;
            let response = self.auth.login(email, password).await?;
            self.establish(response, email, policy, LOGIN_CALL)
        }
        .await;
        self.settle(outcome, "Signup failed")
    }

    /// Forget the session everywhere. Safe to call when signed out.
    pub fn logout(&self) {
        self.handle.clear();
        tracing::info!("Signed out");
    }

    pub fn clear_error(&self) {
        self.handle.clear_error();
    }

    fn establish(
        &self,
        response: LoginResponse,
        email: &str,
        policy: PersistencePolicy,
        call_name: &str,
    ) -> Result<User> {
        let response = response.validate(call_name)?;
        let user = response.session_user(email);
        self.handle.commit(&response.access_token, &user, policy)?;
        tracing::info!("Signed in as {} ({:?} session)", user.display_name(), policy);
        Ok(user)
    }

    fn settle(&self, outcome: Result<User>, fallback: &str) -> Result<User> {
        if let Err(e) = &outcome {
            tracing::debug!("Sign-in failed: {}", e);
            self.handle.fail(describe(e, fallback));
        }
        outcome
    }
}
