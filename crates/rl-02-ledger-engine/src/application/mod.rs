//! Application layer for the Ledger Engine

mod accounts;
mod allocation;
mod engine;
mod financing;
mod issuance;
mod locks;
mod sequencer;
mod session;
mod transfer;
mod txlog;

pub use allocation::split_allocation;
pub use engine::LedgerEngine;
pub use locks::parse_lock_entries;
pub use session::Session;
