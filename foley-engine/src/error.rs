//! Engine error types.

use thiserror::Error;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by the playback engine.
///
/// Failure to open or decode an asset is reported as [`Error::DecodeOpen`]
/// but callers inside the engine generally absorb it: a sound that cannot
/// be decoded plays as silence rather than stopping the game loop.
/// [`Error::Internal`] indicates a broken engine invariant and is the only
/// variant the host should treat as fatal.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// An asset could not be opened or its decoder refused it
    #[error("Decode open failed: {0}")]
    DecodeOpen(String),

    /// Caller passed an out-of-range channel, volume, or position
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// A bounded resource (play queue) is full
    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    /// Saved state does not match the loaded game data
    #[error("Save state mismatch: {0}")]
    SaveMismatch(String),

    /// Broken engine invariant; not recoverable
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<foley_common::Error> for Error {
    fn from(e: foley_common::Error) -> Self {
        match e {
            foley_common::Error::Io(io) => Error::Io(io),
            foley_common::Error::Config(msg) => Error::Config(msg),
            foley_common::Error::InvalidInput(msg) => Error::InvalidParameter(msg),
            foley_common::Error::Internal(msg) => Error::Internal(msg),
        }
    }
}
