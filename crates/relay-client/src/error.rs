//! Client error types.

use std::time::Duration;

use thiserror::Error;

use crate::address::AddressError;

/// Result type alias using ClientError.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur on the consumer side.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Ingest service address is invalid.
    #[error("Invalid address: {0}")]
    Address(#[from] AddressError),

    /// HTTP transport or body decode error.
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Ingest service answered with a non-success status.
    #[error("Snapshot request failed with HTTP {0}")]
    Status(u16),

    /// Snapshot fetch did not complete in time.
    #[error("Snapshot fetch timed out after {0:?}")]
    Timeout(Duration),

    /// CSV encoding failed.
    #[error("Export failed: {0}")]
    Export(#[from] csv::Error),

    /// File system error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The poll task panicked or was cancelled.
    #[error("Poll task failed: {0}")]
    Task(String),
}

