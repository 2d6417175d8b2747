//! # Domain Errors
//!
//! Every engine failure is a [`LedgerError`]. Callers that only need the
//! category use [`LedgerError::kind`]; the dispatcher boundary sends a
//! [`LedgerErrorPayload`].

use rl_01_world_state::WorldStateError;
use serde::{Deserialize, Serialize};
use shared_types::{Amount, IdentifierError};
use thiserror::Error;

/// All errors that can occur in the ledger engine
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// Entity or record absent
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Entity already registered
    #[error("{entity} already exists: {id}")]
    AlreadyExists { entity: &'static str, id: String },

    /// Malformed input, configuration string or percentage
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Balance (net of locks) cannot cover a debit
    #[error("Insufficient funds in {account}: required {required}, available {available}")]
    InsufficientFunds {
        account: String,
        required: Amount,
        available: Amount,
    },

    /// Investment would exceed the rack's round capacity
    #[error("Capacity exceeded for rack {rack_id}: requested {requested}, remaining {remaining}")]
    CapacityExceeded {
        rack_id: String,
        requested: Amount,
        remaining: Amount,
    },

    /// Operation not legal in the current state
    #[error("State conflict: {0}")]
    StateConflict(String),

    /// Reconciliation mismatch. Always fatal, never corrected.
    #[error("Internal invariant violation: {0}")]
    InvariantViolation(String),

    /// Arithmetic left the representable range
    #[error("Amount overflow in {0}")]
    Overflow(&'static str),

    /// World-state backend failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Stored record could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl LedgerError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::StateConflict(message.into())
    }

    /// Caller-facing category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::InvalidArgument(_) | Self::CapacityExceeded { .. } => {
                ErrorKind::InvalidArgument
            }
            Self::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            Self::AlreadyExists { .. } | Self::StateConflict(_) => ErrorKind::StateConflict,
            Self::InvariantViolation(_) | Self::Overflow(_) => {
                ErrorKind::InternalInvariantViolation
            }
            Self::Storage(_) | Self::Serialization(_) => ErrorKind::Storage,
        }
    }
}

impl From<WorldStateError> for LedgerError {
    fn from(err: WorldStateError) -> Self {
        LedgerError::Storage(err.to_string())
    }
}

impl From<IdentifierError> for LedgerError {
    fn from(err: IdentifierError) -> Self {
        LedgerError::InvalidArgument(err.to_string())
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        LedgerError::Serialization(err.to_string())
    }
}

/// Error category enumeration for serialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    NotFound,
    InvalidArgument,
    InsufficientFunds,
    StateConflict,
    InternalInvariantViolation,
    Storage,
}

/// Serializable failure returned to the command dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerErrorPayload {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&LedgerError> for LedgerErrorPayload {
    fn from(err: &LedgerError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl From<LedgerError> for LedgerErrorPayload {
    fn from(err: LedgerError) -> Self {
        Self::from(&err)
    }
}
