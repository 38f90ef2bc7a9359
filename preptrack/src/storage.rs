//! Persistence tiers for the session.
//!
//! A session lives in exactly one of two key/value tiers: a durable one that
//! survives restarts and an ephemeral one that does not. A durable `remember`
//! flag records which tier is authoritative.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
#[cfg(unix)]
use std::{io::Write, os::unix::fs::OpenOptionsExt};

use crate::error::StorageError;

pub const TOKEN_KEY: &str = "token";
pub const USER_KEY: &str = "user";
pub const REMEMBER_KEY: &str = "remember";

/// A string key/value store, the shape of browser local/session storage.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Process-local store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.read().map(|v| v.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let values = self
            .values
            .read()
            .map_err(|_| StorageError::Corrupt("memory store lock poisoned".to_string()))?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.values
            .write()
            .map_err(|_| StorageError::Corrupt("memory store lock poisoned".to_string()))?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.values
            .write()
            .map_err(|_| StorageError::Corrupt("memory store lock poisoned".to_string()))?
            .remove(key);
        Ok(())
    }
}

/// A JSON object on disk, rewritten on every change.
///
/// The file is created with mode 0600 on unix since it holds bearer tokens.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<BTreeMap<String, String>, StorageError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let raw = std::fs::read_to_string(&self.path)?;
        if raw.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&raw)
            .map_err(|e| StorageError::Corrupt(format!("{}: {}", self.path.display(), e)))
    }

    /// Writes start from scratch when the existing file cannot be parsed.
    fn read_map_for_write(&self) -> Result<BTreeMap<String, String>, StorageError> {
        match self.read_map() {
            Err(StorageError::Corrupt(reason)) => {
                tracing::warn!("Discarding corrupted storage file: {}", reason);
                Ok(BTreeMap::new())
            }
            other => other,
        }
    }

    fn write_map(&self, map: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let content = serde_json::to_string_pretty(map)
            .map_err(|e| StorageError::Corrupt(e.to_string()))?;
        secure_write(&self.path, &content)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.read_map()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut map = self.read_map_for_write()?;
        map.insert(key.to_string(), value.to_string());
        self.write_map(&map)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        if !self.path.exists() {
            return Ok(());
        }
        let mut map = self.read_map_for_write()?;
        if map.remove(key).is_none() && !map.is_empty() {
            return Ok(());
        }
        if map.is_empty() {
            std::fs::remove_file(&self.path)?;
            return Ok(());
        }
        self.write_map(&map)
    }
}

fn secure_write(path: &Path, content: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    #[cfg(unix)]
    {
        std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)?
            .write_all(content.as_bytes())?;
    }

    #[cfg(not(unix))]
    {
        std::fs::write(path, content)?;
    }

    Ok(())
}

/// Which tier holds the session. Chosen by "remember me" at sign-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PersistencePolicy {
    /// Survives restarts.
    #[default]
    Durable,
    /// Lost when the ephemeral tier is discarded.
    Ephemeral,
}

impl PersistencePolicy {
    pub fn from_remember(remember: bool) -> Self {
        if remember {
            Self::Durable
        } else {
            Self::Ephemeral
        }
    }

    /// Reads the persisted flag. Only an explicit `"false"` selects the ephemeral tier.
    pub fn from_flag(flag: Option<&str>) -> Self {
        match flag {
            Some("false") => Self::Ephemeral,
            _ => Self::Durable,
        }
    }

    pub fn as_flag(&self) -> &'static str {
        match self {
            Self::Durable => "true",
            Self::Ephemeral => "false",
        }
    }
}

/// Both persistence tiers, injected into the session store.
#[derive(Clone)]
pub struct SessionStorage {
    durable: Arc<dyn KeyValueStore>,
    ephemeral: Arc<dyn KeyValueStore>,
}

impl SessionStorage {
    pub fn new(durable: Arc<dyn KeyValueStore>, ephemeral: Arc<dyn KeyValueStore>) -> Self {
        Self { durable, ephemeral }
    }

    /// Two fresh in-memory tiers.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()), Arc::new(MemoryStore::new()))
    }

    pub fn tier(&self, policy: PersistencePolicy) -> &dyn KeyValueStore {
        match policy {
            PersistencePolicy::Durable => self.durable.as_ref(),
            PersistencePolicy::Ephemeral => self.ephemeral.as_ref(),
        }
    }

    pub fn durable(&self) -> &dyn KeyValueStore {
        self.durable.as_ref()
    }

    pub fn ephemeral(&self) -> &dyn KeyValueStore {
        self.ephemeral.as_ref()
    }
}

impl std::fmt::Debug for SessionStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStorage").finish_non_exhaustive()
    }
}
