//! # Error Types
//!
//! Errors raised while validating shared values.

use thiserror::Error;

/// Identifier rejected before it could be embedded in a key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentifierError {
    /// Identifier is the empty string.
    #[error("{label} must not be empty")]
    Empty { label: &'static str },

    /// Identifier contains a key delimiter.
    #[error("{label} '{value}' contains reserved delimiter '{delimiter}'")]
    ReservedDelimiter {
        label: &'static str,
        value: String,
        delimiter: char,
    },
}
