//! Error types for xavier-telemetry

use thiserror::Error;

/// Main error type for the xavier-telemetry library
///
/// Only setup paths return errors. Reporting calls are best-effort by
/// contract and never surface delivery failures to the caller.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Identity store error
    #[error("identity store error: {0}")]
    Store(String),

    /// Transport setup error
    #[error("transport error: {0}")]
    Transport(String),
}

/// Result type alias for xavier-telemetry
pub type Result<T> = std::result::Result<T, Error>;
