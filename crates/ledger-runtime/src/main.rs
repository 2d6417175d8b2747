//! # rl-node
//!
//! Runs the Rack-Ledger engine over stdin/stdout.
//!
//! Input is one JSON request per line:
//!
//! ```text
//! {"tx_id":"tx-7","time":1700000000000,"command":"transfer","args":["alice","bob","100"]}
//! ```
//!
//! Output is one JSON response per line on stdout. Logs go to stderr and
//! honour `RUST_LOG` (default `info`).

use std::io;

use anyhow::{Context, Result};
use ledger_runtime::{load_config, serve, Dispatcher, RuntimeConfig, StorageBackend};
use rl_01_world_state::{InMemoryWorldState, WorldState};
use rl_02_ledger_engine::LedgerEngine;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

fn init_logging() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to install tracing subscriber")
}

fn run_engine<S: WorldState>(store: S, config: &RuntimeConfig) -> Result<()> {
    let engine = LedgerEngine::with_config(store, config.engine.clone());
    let mut dispatcher = Dispatcher::new(engine);
    let stdin = io::stdin();
    let stdout = io::stdout();
    serve(&mut dispatcher, stdin.lock(), stdout.lock())?;
    Ok(())
}

#[cfg(feature = "rocksdb")]
fn run_rocksdb(config: &RuntimeConfig) -> Result<()> {
    use rl_01_world_state::{RocksDbConfig, RocksDbWorldState};

    let storage = &config.storage;
    let store = RocksDbWorldState::open(RocksDbConfig {
        path: storage.data_dir.to_string_lossy().into_owned(),
        sync_writes: storage.sync_writes,
        ..RocksDbConfig::default()
    })
    .with_context(|| format!("Failed to open world state at {:?}", storage.data_dir))?;
    info!(data_dir = ?storage.data_dir, "RocksDB world state opened");
    run_engine(store, config)
}

#[cfg(not(feature = "rocksdb"))]
fn run_rocksdb(_config: &RuntimeConfig) -> Result<()> {
    Err(ledger_runtime::ConfigError::BackendUnavailable("rocksdb").into())
}

fn main() -> Result<()> {
    init_logging()?;

    let config = load_config().context("Invalid runtime configuration")?;

    info!("===========================================");
    info!("  Rack-Ledger Node v{}", env!("CARGO_PKG_VERSION"));
    info!("===========================================");

    match config.storage.backend {
        StorageBackend::Memory => {
            info!("Using in-memory world state; nothing persists past exit");
            run_engine(InMemoryWorldState::new(), &config)
        }
        StorageBackend::RocksDb => run_rocksdb(&config),
    }
}
