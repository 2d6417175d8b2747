//! # Adapters
//!
//! Concrete [`WorldState`](crate::ports::WorldState) backends.

pub mod memory;
#[cfg(feature = "rocksdb")]
pub mod rocksdb_adapter;

pub use memory::InMemoryWorldState;
#[cfg(feature = "rocksdb")]
pub use rocksdb_adapter::{RocksDbConfig, RocksDbWorldState};
