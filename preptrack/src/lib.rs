//! Client core for the preptrack interview-preparation tracker.
//!
//! [`SessionStore`] signs users in and out and persists the session to one of
//! two storage tiers. [`EntryStore`] caches entries and today's tasks. Both sit
//! on thin adapters in [`api`] that talk to the auth service and the main API
//! through the response policies in [`http`].

pub mod api;
pub mod client;
pub mod domain;
pub mod entry_store;
pub mod error;
pub mod http;
pub mod mock;
pub mod ports;
pub mod recurrence;
pub mod session;
pub mod storage;

pub use client::{ClientConfig, PrepClient};
pub use entry_store::{EntryOp, EntryState, EntryStore};
pub use error::{ClientError, Result, StorageError};
pub use ports::{AuthService, EntryService, LoginRedirect, NoRedirect, PlatformAuthenticator};
pub use session::{Session, SessionHandle, SessionStore};
pub use storage::{FileStore, KeyValueStore, MemoryStore, PersistencePolicy, SessionStorage};
