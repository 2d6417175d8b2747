//! Helpers shared by the engine integration tests.

#![allow(dead_code)]

use rl_01_world_state::InMemoryWorldState;
use rl_02_ledger_engine::{
    AccountKind, AccountStore, IssuanceEngine, LedgerEngine, LedgerError, Session,
};
use shared_types::{Amount, InvocationContext};

pub type Engine = LedgerEngine<InMemoryWorldState>;

pub const SUPPLY: Amount = 1_000_000;

/// Runs invocations with increasing tx ids and a controllable clock.
pub struct Harness {
    pub engine: Engine,
    pub time: i64,
    next_tx: u64,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            engine: LedgerEngine::new(InMemoryWorldState::new()),
            time: 1_000,
            next_tx: 0,
        }
    }

    pub fn next_ctx(&mut self) -> InvocationContext {
        self.next_tx += 1;
        InvocationContext::new(format!("tx-{}", self.next_tx), self.time)
    }

    pub fn run<T>(
        &mut self,
        operation: impl FnOnce(&mut Session<'_, InMemoryWorldState>) -> Result<T, LedgerError>,
    ) -> Result<T, LedgerError> {
        let ctx = self.next_ctx();
        self.engine.execute(&ctx, operation)
    }

    /// Issuance pool plus `accounts`, each funded with `balance`.
    pub fn funded(accounts: &[&str], balance: Amount) -> Self {
        let mut harness = Self::new();
        harness
            .run(|s| {
                s.init_issuance_pool(SUPPLY)?;
                for id in accounts {
                    s.create_account(id, AccountKind::Person, id)?;
                    if balance > 0 {
                        s.issue(id, balance, "seed")?;
                    }
                }
                Ok(())
            })
            .unwrap();
        harness
    }

    pub fn rest(&mut self, id: &str) -> Amount {
        self.run(|s| s.balance(id)).unwrap().rest_balance
    }

    pub fn snapshot(&self) -> Vec<(Vec<u8>, Vec<u8>)> {
        self.engine.store().dump()
    }
}
