use thiserror::Error;

/// Errors from parsing keys and resolving paths.
#[derive(Debug, Error)]
pub enum TypeError {
    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    #[error("invalid byte length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("cannot resolve working directory: {0}")]
    WorkingDirectory(#[from] std::io::Error),
}
