//! Ledger Engine Service
//!
//! Runs one invocation at a time against the world state.

use rl_01_world_state::WorldState;
use shared_types::InvocationContext;
use tracing::{debug, warn};

use super::session::Session;
use crate::config::EngineConfig;
use crate::domain::errors::LedgerError;

/// Ledger engine over a world-state store.
///
/// Every call to [`LedgerEngine::execute`] is one invocation:
/// 1. Open a [`Session`] with a fresh read cache and write buffer
/// 2. Run the operation
/// 3. On success, commit every buffered write in one atomic batch
/// 4. On failure, drop the buffer so nothing becomes visible
pub struct LedgerEngine<S: WorldState> {
    store: S,
    config: EngineConfig,
}

impl<S: WorldState> LedgerEngine<S> {
    /// Create an engine with default config
    pub fn new(store: S) -> Self {
        Self::with_config(store, EngineConfig::default())
    }

    /// Create an engine with custom config
    pub fn with_config(store: S, config: EngineConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Run `operation` as a single all-or-nothing invocation.
    pub fn execute<T, F>(&mut self, ctx: &InvocationContext, operation: F) -> Result<T, LedgerError>
    where
        F: FnOnce(&mut Session<'_, S>) -> Result<T, LedgerError>,
    {
        if ctx.tx_id.is_empty() {
            return Err(LedgerError::invalid("invocation has no transaction id"));
        }

        let mut session = Session::new(&mut self.store, &self.config, ctx.clone());
        match operation(&mut session) {
            Ok(value) => {
                let stats = session.cache_stats();
                let writes = session.into_cache().commit()?;
                debug!(
                    tx_id = %ctx.tx_id,
                    writes,
                    store_reads = stats.store_reads,
                    cache_hits = stats.cache_hits,
                    "Invocation committed"
                );
                Ok(value)
            }
            Err(err) => {
                warn!(
                    tx_id = %ctx.tx_id,
                    kind = ?err.kind(),
                    error = %err,
                    discarded_writes = session.cache_stats().pending_writes,
                    "Invocation aborted, writes discarded"
                );
                Err(err)
            }
        }
    }
}
