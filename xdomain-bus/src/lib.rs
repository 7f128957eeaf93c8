//! Cross-domain messaging boundary
//!
//! Provides the interface between a domain and the bridge that carries
//! value and opaque payloads to another domain:
//! - Primitive identifiers shared by both sides of a bridge
//! - Outbound `xcall` requests and inbound message envelopes
//! - The `Bridge` trait implemented by concrete transports
//! - An in-memory bridge for simulation and tests
//!
//! The channel makes no ordering, delivery, or exactly-once promises.
//! Consumers must tolerate loss, duplication, and reordering.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod bridge;
pub mod error;
pub mod message;
pub mod types;

pub use bridge::{Bridge, InMemoryBridge};
pub use error::{Error, Result};
pub use message::{Envelope, InboundMessage, XcallRequest};
pub use types::{Address, DomainId, TransferId};
