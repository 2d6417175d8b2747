//! # Core Entities
//!
//! Identifier aliases and the invocation context.

use serde::{Deserialize, Serialize};

use crate::errors::IdentifierError;

/// Account identifier.
pub type AccountId = String;

/// Rack (yield-bearing pool) identifier.
pub type RackId = String;

/// Financing round identifier (FID). Supplied externally.
pub type RoundId = String;

/// Ledger amount in base units. Signed so that negative input can be
/// represented and rejected instead of wrapping.
pub type Amount = i64;

/// Logical timestamp in milliseconds, supplied by the caller.
pub type Timestamp = i64;

/// Characters that separate identifiers inside world-state keys and
/// configuration strings.
pub const RESERVED_DELIMITERS: &[char] = &['~', '|', ':', ';', ','];

/// Deterministic inputs of a single invocation.
///
/// The engine never generates ids or reads the clock; both come from the
/// caller so every replica computes the same writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct InvocationContext {
    /// Unique id of the invocation (transaction id).
    pub tx_id: String,
    /// Logical time of the invocation in milliseconds.
    pub time: Timestamp,
}

impl InvocationContext {
    pub fn new(tx_id: impl Into<String>, time: Timestamp) -> Self {
        Self {
            tx_id: tx_id.into(),
            time,
        }
    }
}

/// Check that `value` can be embedded in a key.
pub fn validate_identifier(label: &'static str, value: &str) -> Result<(), IdentifierError> {
    if value.is_empty() {
        return Err(IdentifierError::Empty { label });
    }
    if let Some(delimiter) = value.chars().find(|c| RESERVED_DELIMITERS.contains(c)) {
        return Err(IdentifierError::ReservedDelimiter {
            label,
            value: value.to_string(),
            delimiter,
        });
    }
    Ok(())
}
