//! Unified error types for the Persimmon library.

use thiserror::Error;

/// Main error type for Persimmon operations.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error (short read, failed seek)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// File does not start with the PSD magic
    #[error("Not a valid PSD file")]
    NotPsdFile,

    /// Invalid file format (bad magic, unsupported version)
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// Parse error occurred
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Unsupported construct
    #[error("Unsupported: {0}")]
    Unsupported(String),
}

impl From<crate::common::binary::BinaryError> for Error {
    fn from(err: crate::common::binary::BinaryError) -> Self {
        Error::ParseError(err.to_string())
    }
}

/// Result type for Persimmon operations.
pub type Result<T> = std::result::Result<T, Error>;
