//! Error types for qemesh

use thiserror::Error;

/// Main error type for qemesh core operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Index {index} out of bounds for {what} of length {len}")]
    IndexOutOfBounds {
        what: &'static str,
        index: usize,
        len: usize,
    },

    #[error("Unsupported operation: {0}")]
    Unsupported(String),
}

/// Result type alias for qemesh core operations
pub type Result<T> = std::result::Result<T, Error>;
