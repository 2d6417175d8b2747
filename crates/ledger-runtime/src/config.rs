//! # Runtime Configuration
//!
//! Engine and storage settings for one `rl-node` process.
//!
//! Values start from [`RuntimeConfig::default`] and are then overridden from
//! the environment:
//!
//! | Variable | Field |
//! |----------|-------|
//! | `RL_CENTRAL_ACCOUNT` | `engine.central_account_id` |
//! | `RL_ISSUANCE_POOL` | `engine.issuance_pool_id` |
//! | `RL_READ_CACHE_CAPACITY` | `engine.read_cache_capacity` |
//! | `RL_MAX_PAGE_SIZE` | `engine.max_page_size` |
//! | `RL_STORAGE_BACKEND` | `storage.backend` (`memory` or `rocksdb`) |
//! | `RL_DATA_DIR` | `storage.data_dir` |
//! | `RL_SYNC_WRITES` | `storage.sync_writes` |

use std::path::PathBuf;
use std::str::FromStr;

use rl_02_ledger_engine::EngineConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

/// Complete runtime configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Engine configuration.
    pub engine: EngineConfig,
    /// Storage configuration.
    pub storage: StorageConfig,
}

impl RuntimeConfig {
    /// Reject configurations the engine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let engine = &self.engine;
        if engine.central_account_id.is_empty() {
            return Err(ConfigError::EmptyAccountId("central account"));
        }
        if engine.issuance_pool_id.is_empty() {
            return Err(ConfigError::EmptyAccountId("issuance pool"));
        }
        if engine.central_account_id == engine.issuance_pool_id {
            return Err(ConfigError::CoincidingAccounts(
                engine.central_account_id.clone(),
            ));
        }
        if engine.max_page_size == 0 {
            return Err(ConfigError::InvalidValue {
                key: "max_page_size",
                value: "0".into(),
            });
        }
        if engine.read_cache_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                key: "read_cache_capacity",
                value: "0".into(),
            });
        }
        Ok(())
    }

    /// Apply `RL_*` overrides read through `lookup`.
    ///
    /// Split from [`load_config`] so tests can supply variables without
    /// touching the process environment.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(id) = lookup("RL_CENTRAL_ACCOUNT") {
            self.engine.central_account_id = id;
        }
        if let Some(id) = lookup("RL_ISSUANCE_POOL") {
            self.engine.issuance_pool_id = id;
        }
        if let Some(value) = lookup("RL_READ_CACHE_CAPACITY") {
            self.engine.read_cache_capacity = parse_var("RL_READ_CACHE_CAPACITY", &value)?;
        }
        if let Some(value) = lookup("RL_MAX_PAGE_SIZE") {
            self.engine.max_page_size = parse_var("RL_MAX_PAGE_SIZE", &value)?;
        }
        if let Some(value) = lookup("RL_STORAGE_BACKEND") {
            self.storage.backend = parse_var("RL_STORAGE_BACKEND", &value)?;
        }
        if let Some(dir) = lookup("RL_DATA_DIR") {
            self.storage.data_dir = PathBuf::from(dir);
        }
        if let Some(value) = lookup("RL_SYNC_WRITES") {
            self.storage.sync_writes = parse_var("RL_SYNC_WRITES", &value)?;
        }
        Ok(())
    }
}

fn parse_var<T: FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: value.to_string(),
    })
}

/// World-state backend selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    RocksDb,
}

impl FromStr for StorageBackend {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "rocksdb" => Ok(Self::RocksDb),
            _ => Err(()),
        }
    }
}

/// Storage configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Which world-state adapter to open.
    pub backend: StorageBackend,
    /// Data directory for the durable backend.
    pub data_dir: PathBuf,
    /// fsync after every committed batch.
    pub sync_writes: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            data_dir: PathBuf::from("./data/world-state"),
            sync_writes: true,
        }
    }
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{0} id must not be empty")]
    EmptyAccountId(&'static str),

    #[error("central account and issuance pool must differ, both are '{0}'")]
    CoincidingAccounts(String),

    #[error("invalid value for {key}: '{value}'")]
    InvalidValue { key: &'static str, value: String },

    #[error("storage backend '{0}' is not compiled in; rebuild with --features rocksdb")]
    BackendUnavailable(&'static str),
}

/// Load configuration from defaults and the process environment.
pub fn load_config() -> Result<RuntimeConfig, ConfigError> {
    let mut config = RuntimeConfig::default();
    config.apply_overrides(|key| std::env::var(key).ok())?;
    if let Err(e) = config.validate() {
        warn!(error = %e, "Rejected runtime configuration");
        return Err(e);
    }
    info!(
        backend = ?config.storage.backend,
        central_account = %config.engine.central_account_id,
        issuance_pool = %config.engine.issuance_pool_id,
        "Configuration loaded"
    );
    Ok(config)
}
