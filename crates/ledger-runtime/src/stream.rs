//! Newline-delimited JSON command stream.
//!
//! Each input line is one [`CommandRequest`]; each produces exactly one
//! [`CommandResponse`] line. Blank lines are skipped. A line that is not a
//! valid request gets an `InvalidArgument` response and the stream goes on.

use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use rl_01_world_state::WorldState;
use rl_02_ledger_engine::{LedgerError, LedgerErrorPayload};
use tracing::{info, warn};

use crate::dispatcher::{CommandRequest, CommandResponse, Dispatcher};

/// Counters for one stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamStats {
    pub processed: u64,
    pub failed: u64,
}

fn parse_request(line: &str) -> Result<CommandRequest, LedgerErrorPayload> {
    serde_json::from_str(line).map_err(|e| {
        LedgerErrorPayload::from(LedgerError::invalid(format!("malformed request: {}", e)))
    })
}

/// Serve commands from `input` until EOF.
pub fn serve<S, R, W>(dispatcher: &mut Dispatcher<S>, input: R, mut output: W) -> Result<StreamStats>
where
    S: WorldState,
    R: BufRead,
    W: Write,
{
    let mut stats = StreamStats::default();

    for (line_no, line) in input.lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read input line {}", line_no + 1))?;
        if line.trim().is_empty() {
            continue;
        }

        let response = match parse_request(&line) {
            Ok(request) => dispatcher.handle(&request),
            Err(error) => {
                warn!(line = line_no + 1, error = %error.message, "Malformed request");
                CommandResponse::Error {
                    tx_id: String::new(),
                    error,
                }
            }
        };
        stats.processed += 1;
        if matches!(response, CommandResponse::Error { .. }) {
            stats.failed += 1;
        }

        serde_json::to_writer(&mut output, &response).context("Failed to encode response")?;
        output.write_all(b"\n").context("Failed to write response")?;
        output.flush().context("Failed to flush response")?;
    }

    info!(
        processed = stats.processed,
        failed = stats.failed,
        "Command stream closed"
    );
    Ok(stats)
}
