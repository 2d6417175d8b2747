//! Configuration for the Ledger Engine

use rl_01_world_state::DEFAULT_READ_CACHE_CAPACITY;
use serde::{Deserialize, Serialize};

/// Engine configuration.
///
/// Injected into every invocation. The central account id lives here rather
/// than in a process-wide cache so two engines in one host never share it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Account whose entries are restricted-visibility.
    pub central_account_id: String,
    /// Account tracking global supply. Only `issue` may debit it.
    pub issuance_pool_id: String,
    /// LRU bound of the per-invocation read cache
    pub read_cache_capacity: usize,
    /// Upper bound on an explicit page count. A negative count is unbounded.
    pub max_page_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            central_account_id: "central-bank".to_string(),
            issuance_pool_id: "issuance-pool".to_string(),
            read_cache_capacity: DEFAULT_READ_CACHE_CAPACITY,
            max_page_size: 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.central_account_id, "central-bank");
        assert_eq!(config.issuance_pool_id, "issuance-pool");
        assert_eq!(config.max_page_size, 500);
        assert_ne!(config.central_account_id, config.issuance_pool_id);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"central_account_id": "bank"}"#).unwrap();
        assert_eq!(config.central_account_id, "bank");
        assert_eq!(config.read_cache_capacity, DEFAULT_READ_CACHE_CAPACITY);
    }
}
