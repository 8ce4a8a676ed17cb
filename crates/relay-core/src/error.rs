//! Custom error types shared across the relay.
//!
//! `RelayError` covers the failures that are not tied to a single request:
//!
//! - **`Config`**: wraps errors from `figment`, typically TOML parse errors or
//!   type mismatches in environment overrides.
//! - **`Configuration`**: semantic errors caught by `RelayConfig::validate`
//!   (values that parse but make no sense, such as a zero window capacity).
//! - **`Io`**: socket binding and file errors.
//! - **`Tracing`**: the global subscriber could not be installed.
//!
//! Request-scoped failures (envelope and record errors on ingest, transport
//! errors on the consumer) have their own enums in the server and client
//! crates; a misaligned snapshot is a `ShapeError`.

use thiserror::Error;

/// Convenience alias for results using the relay error type.
pub type RelayResult<T> = std::result::Result<T, RelayError>;

/// Top-level error type for the relay.
#[derive(Error, Debug)]
pub enum RelayError {
    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] figment::Error),

    /// Configuration loaded but failed validation.
    #[error("Configuration validation error: {0}")]
    Configuration(String),

    /// I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Tracing subscriber setup failed.
    #[error("Tracing initialization error: {0}")]
    Tracing(String),
}
