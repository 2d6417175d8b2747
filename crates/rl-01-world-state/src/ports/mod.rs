//! # Ports
//!
//! Interfaces the host application implements for the engine.

pub mod outbound;

pub use outbound::{BatchOperation, WorldState};
