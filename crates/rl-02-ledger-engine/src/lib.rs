//! # rl-02-ledger-engine
//!
//! Deterministic accounting and rack-financing engine.
//!
//! ## Components
//!
//! | Component | Port | Responsibility |
//! |-----------|------|----------------|
//! | AccountStore | [`AccountStore`] | Accounts, balances, authorization |
//! | Sequencer | [`Sequencer`] | Scoped monotonic counters |
//! | TransactionLog | [`TransactionLog`] | Append-only logs, paginated queries |
//! | TransferEngine | [`TransferEngine`] | Lock-aware value movement |
//! | Issuance | [`IssuanceEngine`] | Supply creation from the pool |
//! | AllocationEngine | [`AllocationEngine`] | Role-weighted splits |
//! | FinancingEngine | [`FinancingEngine`] | Rounds, rollover, bonus, redemption |
//! | LockEngine | [`LockEngine`] | Time-boxed holds |
//!
//! ## Determinism
//!
//! The engine never reads a clock or generates ids. Time and the
//! transaction id come from the caller through [`InvocationContext`], and
//! every record encodes with ordered maps, so replicas executing the same
//! invocations in the same order write identical bytes.
//!
//! ## Atomicity
//!
//! [`LedgerEngine::execute`] runs one invocation inside a [`Session`]. All
//! writes are buffered and committed as one batch only if the operation
//! returns `Ok`.
//!
//! ```no_run
//! use rl_01_world_state::InMemoryWorldState;
//! use rl_02_ledger_engine::{AccountKind, AccountStore, LedgerEngine, TransferEngine, TransferOrder};
//! use shared_types::InvocationContext;
//!
//! let mut engine = LedgerEngine::new(InMemoryWorldState::new());
//! let ctx = InvocationContext::new("tx-1", 1_700_000_000_000);
//! engine.execute(&ctx, |s| {
//!     s.create_account("alice", AccountKind::Person, "alice")?;
//!     s.create_account("bob", AccountKind::Person, "bob")?;
//!     s.transfer(&TransferOrder::new("alice", "bob", 0))
//! })?;
//! # Ok::<(), rl_02_ledger_engine::LedgerError>(())
//! ```

pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

pub use application::{parse_lock_entries, split_allocation, LedgerEngine, Session};
pub use config::EngineConfig;
pub use domain::*;
pub use ports::inbound::*;
pub use shared_types::InvocationContext;
