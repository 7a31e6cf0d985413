//! Error types for LayDB
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using LayError
pub type Result<T> = std::result::Result<T, LayError>;

/// Unified error type for LayDB operations
#[derive(Debug, Error)]
pub enum LayError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Log Errors
    // -------------------------------------------------------------------------
    /// The log is structurally unreadable. Sticky until the log is reopened.
    #[error("log corrupt: {0}")]
    Corrupt(String),

    #[error("log closed")]
    Closed,

    /// Ordinal read past the last entry of the log
    #[error("end of log reached")]
    Eof,

    // -------------------------------------------------------------------------
    // Key / Entry Errors
    // -------------------------------------------------------------------------
    #[error("key not found")]
    NotFound,

    #[error("invalid key")]
    InvalidKey,

    #[error("invalid entry: {0}")]
    InvalidEntry(String),

    // -------------------------------------------------------------------------
    // Transaction Errors
    // -------------------------------------------------------------------------
    #[error("tx closed")]
    TxClosed,

    #[error("tx not writable")]
    TxNotWritable,

    #[error("database closed")]
    DatabaseClosed,

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl LayError {
    /// True for errors that mean "nothing there" rather than a failure
    pub fn is_not_found(&self) -> bool {
        matches!(self, LayError::NotFound | LayError::Eof)
    }

    /// True if the error disables the log instance it came from
    pub fn is_corrupt(&self) -> bool {
        matches!(self, LayError::Corrupt(_))
    }
}
