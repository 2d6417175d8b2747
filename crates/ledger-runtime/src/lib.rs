//! # Rack-Ledger Runtime
//!
//! Bootstrap for an `rl-node` process.
//!
//! ## Modules
//!
//! - `config` - [`RuntimeConfig`] from defaults plus `RL_*` environment overrides
//! - `dispatcher` - command name + ordered string args to one engine invocation
//! - `stream` - newline-delimited JSON requests in, responses out
//!
//! ## Startup Sequence
//!
//! 1. Install the tracing subscriber (stderr)
//! 2. Load and validate configuration
//! 3. Open the configured world-state backend
//! 4. Serve commands from stdin until EOF

pub mod config;
pub mod dispatcher;
pub mod stream;

pub use config::{load_config, ConfigError, RuntimeConfig, StorageBackend, StorageConfig};
pub use dispatcher::{CommandRequest, CommandResponse, Dispatcher, COMMANDS};
pub use stream::{serve, StreamStats};
