//! Error types for taolst.
//!
//! Framing noise and out-of-contract command setters are never errors; they
//! are absorbed by the decoder and the command builder. What remains here are
//! collaborator failures (I/O, configuration) and the reply-slot guard.

use thiserror::Error;

/// Main error type for all taolst operations.
#[derive(Debug, Error)]
pub enum TaolstError {
    /// I/O error on the byte source or sink.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error while loading a responder configuration.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A reply is already waiting in the slot and has not been taken.
    #[error("Reply slot is occupied by an unconsumed reply")]
    ReplyPending,
}

/// Result type alias using TaolstError.
pub type Result<T> = std::result::Result<T, TaolstError>;
