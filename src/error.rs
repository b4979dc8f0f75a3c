//! Error handling utilities shared across the crate.

use std::path::PathBuf;
use std::string::FromUtf8Error;

use thiserror::Error;

use crate::vocab::TokenId;

/// Convenient result type used throughout the crate.
pub type Result<T, E = BpeError> = std::result::Result<T, E>;

/// Domain-specific error describing failures during training, encoding, decoding, or IO.
#[derive(Debug, Error)]
pub enum BpeError {
    /// A token id is known to neither the byte vocabulary nor the special-token overlay.
    #[error("unknown token id {id}")]
    UnknownId {
        /// The offending id.
        id: TokenId,
    },
    /// Decoded bytes do not form valid UTF-8 text.
    #[error("decoded bytes are not valid UTF-8: {0}")]
    InvalidUtf8(#[from] FromUtf8Error),
    /// A token was learned twice; the trainer never does this.
    #[error("token {token:?} is already present in the vocabulary")]
    DuplicateToken {
        /// Printable rendering of the duplicated token bytes.
        token: String,
    },
    /// Configuration or argument validation failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// Filesystem IO error with optional context path.
    #[error("io error while processing {path:?}: {source}")]
    Io {
        /// Underlying IO error returned by the standard library.
        source: std::io::Error,
        /// Target path associated with the IO failure if available.
        path: Option<PathBuf>,
    },
    /// Serialization failure or an inconsistent persisted vocabulary.
    #[error("serialization error: {0}")]
    Serialization(String),
    /// Catch-all variant for invariants that should not occur.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for BpeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl BpeError {
    /// Helper constructor that attaches an optional path when wrapping IO errors.
    pub fn io(source: std::io::Error, path: Option<PathBuf>) -> Self {
        Self::Io { source, path }
    }
}
