//! Error types shared across dinotax crates

use thiserror::Error;

/// Result type alias for shared dinotax operations
pub type Result<T> = std::result::Result<T, DinotaxError>;

/// Errors raised by the shared utilities
#[derive(Error, Debug)]
pub enum DinotaxError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Checksum mismatch for {file}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        file: String,
        expected: String,
        actual: String,
    },
}
