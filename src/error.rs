//! Error types for the transfer hub.

use std::io;

use thiserror::Error;

/// Result type for hub setup operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the hub itself, as opposed to by individual transfers.
#[derive(Debug, Error)]
pub enum Error {
    /// The readiness primitive could not be created
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The readiness primitive failed while waiting
    #[error("select() failed: {0}")]
    Select(io::Error),
}

/// Why a transfer ended up failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransferError {
    /// No progress was made before the deadline elapsed
    #[error("timeout occurred")]
    Timeout,

    /// The driver reported an unrecoverable error
    #[error("{0}")]
    Driver(String),
}

impl TransferError {
    pub(crate) const TIMEOUT_MESSAGE: &'static str = "timeout occurred";

    /// The human readable description of the failure.
    pub fn message(&self) -> &str {
        match self {
            TransferError::Timeout => Self::TIMEOUT_MESSAGE,
            TransferError::Driver(msg) => msg,
        }
    }
}
