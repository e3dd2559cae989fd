//! Configuration for the admin portal

use crate::error::{Result, SdkError};
use crate::sync::SyncOptions;
use pioneer_store::RestConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default config file location
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("pioneer-admin").join("config.toml"))
}

/// Connection and timing settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortalConfig {
    /// Realtime database URL
    #[serde(default)]
    pub database_url: Option<String>,

    /// Project web API key, used for sign-in
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default)]
    pub auth_domain: Option<String>,

    #[serde(default)]
    pub project_id: Option<String>,

    /// Seconds to wait for a synchronizer's first snapshot
    #[serde(default = "default_sync_timeout")]
    pub sync_timeout_secs: u64,

    /// Seconds before a write request is abandoned
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_sync_timeout() -> u64 {
    10
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            api_key: None,
            auth_domain: None,
            project_id: None,
            sync_timeout_secs: default_sync_timeout(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Whether a setting has a value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Set,
    Missing,
}

impl fmt::Display for Presence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Presence::Set => f.write_str("Set"),
            Presence::Missing => f.write_str("Missing"),
        }
    }
}

fn presence(value: &Option<String>) -> Presence {
    match value {
        Some(v) if !v.trim().is_empty() => Presence::Set,
        _ => Presence::Missing,
    }
}

impl PortalConfig {
    /// Load config from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| SdkError::Config(format!("reading {}: {}", path.display(), e)))?;
        toml::from_str(&content)
            .map_err(|e| SdkError::Config(format!("parsing {}: {}", path.display(), e)))
    }

    /// Load `path` if given, else the default location if it exists, else defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => match default_config_path() {
                Some(path) if path.exists() => Self::load(path),
                _ => Ok(Self::default()),
            },
        }
    }

    /// Save config to file, creating parent directories
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| SdkError::Config(format!("creating {}: {}", parent.display(), e)))?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| SdkError::Config(format!("serializing config: {}", e)))?;
        std::fs::write(path, content)
            .map_err(|e| SdkError::Config(format!("writing {}: {}", path.display(), e)))
    }

    /// Set/Missing for each connection setting. Values are never included.
    pub fn presence_report(&self) -> Vec<(&'static str, Presence)> {
        vec![
            ("database_url", presence(&self.database_url)),
            ("api_key", presence(&self.api_key)),
            ("auth_domain", presence(&self.auth_domain)),
            ("project_id", presence(&self.project_id)),
        ]
    }

    pub fn sync_options(&self) -> SyncOptions {
        SyncOptions {
            first_snapshot_timeout: Duration::from_secs(self.sync_timeout_secs),
        }
    }

    /// REST store settings for a signed-in token
    pub fn rest_config(&self, auth_token: Option<String>) -> Result<RestConfig> {
        let base_url = self
            .database_url
            .clone()
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| SdkError::Config("database_url is not set".into()))?;
        Ok(RestConfig {
            base_url,
            auth_token,
            timeout_secs: self.request_timeout_secs,
        })
    }

    pub fn require_api_key(&self) -> Result<&str> {
        match self.api_key.as_deref() {
            Some(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(SdkError::Config("api_key is not set".into())),
        }
    }
}
