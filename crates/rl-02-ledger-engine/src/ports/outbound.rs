//! Outbound Ports (Driven Ports)
//!
//! The engine's only dependency is the key-value world state.

pub use rl_01_world_state::{BatchOperation, WorldState};
