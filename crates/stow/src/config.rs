//! Declarative store configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use stow_lock::MutexConfig;
use stow_s3::S3Config;
use stow_store::{StoreError, StoreResult};

/// Which backend to open, and with what settings.
///
/// Tagged by `type` in TOML:
///
/// ```toml
/// [backend]
/// type = "s3"
/// bucket = "app-data"
/// namespace = "prod"
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BackendConfig {
    /// Process-local map; contents are lost on drop.
    #[default]
    Memory,
    /// One file per key under `root`.
    Filesystem { root: PathBuf },
    /// Any medium addressable by URL (`file://`, `memory://`, `s3://`, ...).
    ObjectStorage { url: String },
    /// An S3-compatible bucket.
    S3(S3Config),
}

/// Write locking through a Redis lease service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockConfig {
    pub redis_url: String,
    /// Lease time-to-live in milliseconds.
    #[serde(default = "default_ttl_ms")]
    pub ttl_ms: u64,
}

fn default_ttl_ms() -> u64 {
    MutexConfig::default().ttl.as_millis() as u64
}

impl LockConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }

    pub fn mutex_config(&self) -> MutexConfig {
        MutexConfig { ttl: self.ttl() }
    }
}

/// Top-level configuration consumed by [`open_store`](crate::open_store).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StowConfig {
    #[serde(default)]
    pub backend: BackendConfig,
    /// When set, writes are serialized through leases.
    #[serde(default)]
    pub lock: Option<LockConfig>,
}

impl StowConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(s: &str) -> StoreResult<Self> {
        toml::from_str(s).map_err(|e| StoreError::Configuration(e.to_string()))
    }

    /// Read and parse a TOML file.
    pub fn load(path: impl AsRef<Path>) -> StoreResult<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }

    /// Render as TOML.
    pub fn to_toml_string(&self) -> StoreResult<String> {
        toml::to_string(self).map_err(|e| StoreError::Configuration(e.to_string()))
    }
}
