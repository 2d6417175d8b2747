//! One invocation's view of the world state.

use rl_01_world_state::{CacheStats, StateCache, WorldState};
use serde::de::DeserializeOwned;
use serde::Serialize;
use shared_types::{InvocationContext, Timestamp};

use crate::config::EngineConfig;
use crate::domain::errors::LedgerError;

/// Execution scope of a single invocation.
///
/// All engine operations are implemented on `Session`. Reads see the
/// session's own writes; nothing reaches the store until
/// [`LedgerEngine::execute`](super::engine::LedgerEngine::execute) commits.
pub struct Session<'a, S: WorldState> {
    cache: StateCache<'a, S>,
    config: &'a EngineConfig,
    ctx: InvocationContext,
}

impl<'a, S: WorldState> Session<'a, S> {
    pub(crate) fn new(store: &'a mut S, config: &'a EngineConfig, ctx: InvocationContext) -> Self {
        Self {
            cache: StateCache::with_capacity(store, config.read_cache_capacity),
            config,
            ctx,
        }
    }

    pub fn context(&self) -> &InvocationContext {
        &self.ctx
    }

    /// Logical time of the invocation.
    pub fn time(&self) -> Timestamp {
        self.ctx.time
    }

    pub fn config(&self) -> &EngineConfig {
        self.config
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub(crate) fn into_cache(self) -> StateCache<'a, S> {
        self.cache
    }

    pub(crate) fn get_record<T: DeserializeOwned>(
        &mut self,
        key: &str,
    ) -> Result<Option<T>, LedgerError> {
        match self.cache.get(key.as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    pub(crate) fn put_record<T: Serialize>(&mut self, key: &str, record: &T) -> Result<(), LedgerError> {
        let bytes = serde_json::to_vec(record)?;
        self.cache.put(key.as_bytes(), bytes);
        Ok(())
    }

    /// Decoded records under `prefix`, in key order.
    pub(crate) fn scan_records<T: DeserializeOwned>(
        &mut self,
        prefix: &str,
    ) -> Result<Vec<(String, T)>, LedgerError> {
        let start = prefix.as_bytes();
        let end = rl_01_world_state::prefix_successor(start);
        self.cache
            .range_scan(start, end.as_deref())?
            .into_iter()
            .map(|(key, bytes)| {
                let key = String::from_utf8(key)
                    .map_err(|e| LedgerError::Serialization(e.to_string()))?;
                Ok((key, serde_json::from_slice(&bytes)?))
            })
            .collect()
    }

    pub(crate) fn is_central(&self, account_id: &str) -> bool {
        self.config.central_account_id == account_id
    }

    pub(crate) fn is_issuance_pool(&self, account_id: &str) -> bool {
        self.config.issuance_pool_id == account_id
    }
}
