use std::io;

use thiserror::Error;

/// Errors surfaced to callers. Unsafe markup is never an error: it is either cleaned away or
/// reported as invalid.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("failed to serialize html: {0}")]
    Io(#[from] io::Error),

    #[error("malformed policy file: {0}")]
    PolicyFile(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn invalid_argument(message: impl Into<String>) -> Self {
        Error::InvalidArgument(message.into())
    }
}
