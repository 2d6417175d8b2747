use thiserror::Error;

/// Failures surfaced by a world-state backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorldStateError {
    /// I/O error during read/write.
    #[error("World state I/O error: {message}")]
    Io { message: String },

    /// Stored bytes could not be interpreted.
    #[error("World state corruption: {message}")]
    Corruption { message: String },

    /// Shared store lock was poisoned by a panicking writer.
    #[error("World state lock poisoned")]
    LockPoisoned,
}
