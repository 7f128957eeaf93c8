//! Error types for the cross-domain bus

use thiserror::Error;

/// Bus error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// The bridge refused to accept the send
    #[error("Send rejected: {0}")]
    Rejected(String),

    /// Identifier could not be parsed
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),
}

/// Result type
pub type Result<T> = std::result::Result<T, Error>;
