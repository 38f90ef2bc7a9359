use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use preptrack::{ClientConfig, FileStore, SessionStorage};
use serde::{Deserialize, Serialize};

const APP_DIR: &str = "preptrack";
const ENV_PREFIX: &str = "PREPTRACK";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrepConfig {
    /// Base URL of the auth service, e.g. "http://localhost:4000"
    #[serde(default = "default_auth_base_url")]
    pub auth_base_url: String,
    /// API key sent to the auth service
    #[serde(default)]
    pub auth_api_key: String,
    /// Base URL of the main API, e.g. "http://localhost:5000/api"
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Program that performs passkey ceremonies.
    ///
    /// It receives the options JSON on stdin, `PREPTRACK_CEREMONY` set to
    /// `get` or `create`, and must print the credential JSON on stdout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authenticator_command: Option<String>,
}

fn default_auth_base_url() -> String {
    "http://localhost:4000".to_string()
}

fn default_api_base_url() -> String {
    "http://localhost:5000/api".to_string()
}

impl Default for PrepConfig {
    fn default() -> Self {
        Self {
            auth_base_url: default_auth_base_url(),
            auth_api_key: String::new(),
            api_base_url: default_api_base_url(),
            authenticator_command: None,
        }
    }
}

impl PrepConfig {
    pub fn config_dir() -> Result<PathBuf> {
        Ok(dirs::config_dir()
            .context("Cannot determine config directory")?
            .join(APP_DIR))
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Config file (if any) overlaid with `PREPTRACK_*` environment variables.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path).required(false))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).prefix_separator("_"))
            .build()
            .with_context(|| format!("Failed to read config at {}", path.display()))?;

        settings
            .try_deserialize::<Self>()
            .with_context(|| format!("Failed to parse config at {}", path.display()))
    }

    /// Write the default config unless a file already exists.
    pub fn ensure_file(path: &Path) -> Result<bool> {
        if path.exists() {
            return Ok(false);
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let raw = toml::to_string_pretty(&Self::default())?;
        std::fs::write(path, raw)
            .with_context(|| format!("Failed to write config at {}", path.display()))?;
        Ok(true)
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            auth_base_url: self.auth_base_url.clone(),
            auth_api_key: self.auth_api_key.clone(),
            api_base_url: self.api_base_url.clone(),
        }
    }
}

/// Remembered sessions live next to the config; the others in the runtime
/// directory, which the OS clears on logout or reboot.
pub fn session_storage() -> Result<SessionStorage> {
    let durable = PrepConfig::config_dir()?.join("session.json");
    let ephemeral = dirs::runtime_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_DIR)
        .join("session.json");
    Ok(SessionStorage::new(
        Arc::new(FileStore::new(durable)),
        Arc::new(FileStore::new(ephemeral)),
    ))
}
