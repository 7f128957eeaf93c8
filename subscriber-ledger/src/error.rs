//! Error types for the subscriber ledger

use crate::types::Commitment;
use thiserror::Error;
use xdomain_bus::Address;

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Ledger errors
#[derive(Error, Debug)]
pub enum Error {
    /// Inbound message or flow event carries an asset other than the configured one
    #[error("Wrong asset: expected {expected}, got {actual}")]
    WrongAsset {
        /// Configured asset
        expected: Address,
        /// Asset that was presented
        actual: Address,
    },

    /// Bulk replay root differs from the relayed commitment
    #[error("Commitment mismatch: relayed {expected}, computed {computed}")]
    CommitmentMismatch {
        /// Relayed commitment the replay had to reproduce
        expected: Commitment,
        /// Root computed over the replayed log
        computed: Commitment,
    },

    /// Inbound payload is not exactly one commitment value
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    /// Flow-rate lookup against the streaming protocol failed
    #[error("Flow lookup failed: {0}")]
    FlowLookup(String),

    /// Custody balance cannot cover a transfer
    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds {
        /// Amount requested
        required: u128,
        /// Amount held
        available: u128,
    },

    /// Balance arithmetic overflowed
    #[error("Arithmetic overflow in {0}")]
    Overflow(&'static str),

    /// Bridge refused the send
    #[error("Bridge error: {0}")]
    Bridge(#[from] xdomain_bus::Error),

    /// Concurrency error (actor mailbox closed, etc.)
    #[error("Concurrency error: {0}")]
    Concurrency(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
