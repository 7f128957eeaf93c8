//! Subscriber Ledger
//!
//! Append-only subscriber log with a Merkle commitment, fed by stream
//! lifecycle callbacks and mirrored onto a second domain.
//!
//! # Architecture
//!
//! - **Source domain**: flow callbacks become ledger appends; the root is
//!   relayed together with accrued funds through a bridge
//! - **Mirror domain**: stores the last relayed root and accepts bulk replays
//!   of the log only when they hash to it
//! - **Full recompute**: every mutation rebuilds the tree from the leaves
//! - **Actors**: each domain runs on one task; calls never interleave
//!
//! # Invariants
//!
//! - Commitment integrity: `commitment == root(records)` after every call
//! - Append-only: records are never modified, reordered, or removed
//! - Replay atomicity: a rejected replay leaves the mirror unchanged
//! - Determinism: the same record sequence always yields the same root

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, missing_debug_implementations)]

pub mod types;
pub mod merkle;
pub mod ledger;
pub mod flow;
pub mod relay;
pub mod source;
pub mod mirror;
pub mod actor;
pub mod config;
pub mod metrics;
pub mod error;

// Re-exports
pub use error::{Error, Result};
pub use types::{Commitment, FlowRate, SubscriberRecord};
pub use ledger::SubscriberLedger;
pub use source::SourceDomain;
pub use mirror::MirrorLedger;
pub use config::Config;
pub use xdomain_bus::{Address, DomainId};
