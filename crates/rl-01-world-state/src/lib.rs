//! # rl-01-world-state
//!
//! Key-value world-state boundary for the Rack-Ledger engine.
//!
//! ## Role in System
//!
//! - **Driven Port**: [`WorldState`] is what the host store must provide:
//!   point reads, writes, ordered range scans and an atomic batch write.
//! - **Invocation Cache**: [`StateCache`] wraps a store for exactly one
//!   invocation. Reads are served from a bounded LRU cache, writes are
//!   buffered, and the buffer reaches the store in one atomic batch on
//!   commit. Dropping an uncommitted cache discards every write.
//!
//! ```text
//! [Engine operation] ──get/put/range──→ [StateCache] ──commit──→ [WorldState]
//!                                         │     ↑
//!                                   write buffer │ LRU read cache
//! ```
//!
//! ## Adapters
//!
//! - `InMemoryWorldState`: ordered map, used by tests and the default runtime.
//! - `RocksDbWorldState`: durable store behind the `rocksdb` feature.

pub mod adapters;
pub mod cache;
pub mod domain;
pub mod ports;

pub use adapters::*;
pub use cache::{CacheStats, StateCache, DEFAULT_READ_CACHE_CAPACITY};
pub use domain::*;
pub use ports::*;
