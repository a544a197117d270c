//! Error types for padlock
//!
//! Provides a unified error type for all padlock operations.

use thiserror::Error;

/// Result type alias for padlock operations
pub type Result<T> = std::result::Result<T, PadlockError>;

/// Unified error type for padlock
#[derive(Error, Debug)]
pub enum PadlockError {
    // ===== Parameter Errors =====
    #[error("bad parameters: {0}")]
    BadParams(String),

    #[error("chunk budget too small: {budget} bytes across {shares} shares per record")]
    ChunkTooSmall { budget: usize, shares: usize },

    // ===== Random Source Errors =====
    #[error("random source exhausted: {0}")]
    RngExhausted(String),

    // ===== Label / Record Errors =====
    #[error("bad collection label: {0}")]
    BadLabel(String),

    #[error("parameter mismatch: {0}")]
    ParameterMismatch(String),

    #[error("truncated stream: {0}")]
    TruncatedStream(String),

    // ===== Decode Stream Errors =====
    #[error("insufficient collections: have {available}, need {required}")]
    InsufficientCollections { available: usize, required: usize },

    #[error("uneven collections: {0}")]
    UnevenCollections(String),

    // ===== I/O Errors =====
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // ===== Cancellation =====
    #[error("operation cancelled")]
    Cancelled,
}
