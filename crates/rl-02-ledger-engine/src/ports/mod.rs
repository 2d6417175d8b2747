//! Ports layer for the Ledger Engine

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
