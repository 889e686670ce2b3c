//! Error types for bundle parsing and trust store construction.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for chain operations
pub type Result<T> = std::result::Result<T, ChainError>;

/// Errors raised while reading inputs or building a trust store
#[derive(Error, Debug)]
pub enum ChainError {
    /// A `BEGIN CERTIFICATE` delimiter had no matching `END` delimiter
    #[error("malformed bundle: certificate block opened at byte {offset} is never closed")]
    MalformedBundle {
        /// Byte offset of the unmatched `BEGIN` delimiter
        offset: usize,
    },

    /// A bundle entry could not be decoded as an X.509 certificate
    #[error("bundle entry {index} is not a valid certificate: {reason}")]
    InvalidAnchorCertificate {
        /// Zero-based position in the bundle
        index: usize,
        /// Decoder diagnostic
        reason: String,
    },

    /// The certificate under verification could not be decoded
    #[error("leaf certificate is invalid: {0}")]
    InvalidLeafCertificate(String),

    /// An input file could not be read
    #[error("cannot read {}: {source}", path.display())]
    Io {
        /// File that failed
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },
}

impl ChainError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
