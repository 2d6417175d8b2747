//! # Shared Types Crate
//!
//! Types shared by every Rack-Ledger crate.
//!
//! ## Design Principles
//!
//! - **Deterministic Inputs**: the logical clock (`Timestamp`) and the
//!   transaction id arrive with each invocation in [`InvocationContext`].
//!   Nothing in the workspace reads a wall clock on the engine path.
//! - **Key Safety**: identifiers are embedded in world-state keys, so they
//!   are validated against [`RESERVED_DELIMITERS`] before first use.

pub mod entities;
pub mod errors;

pub use entities::*;
pub use errors::*;
