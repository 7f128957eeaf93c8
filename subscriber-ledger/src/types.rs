//! Core types for the subscriber ledger
//!
//! All types are designed for:
//! - Deterministic byte encoding (leaf hashing, wire payloads)
//! - Cheap copies (fixed-width values only)
//! - Hex rendering in logs and config files

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use xdomain_bus::Address;

/// Width of an encoded leaf: identity (20) + flow rate (16)
pub const LEAF_ENCODING_LEN: usize = 20 + 16;

/// Signed rate of a continuous payment stream (units per second)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlowRate(pub i128);

impl FlowRate {
    /// No active stream
    pub const ZERO: FlowRate = FlowRate(0);

    /// Whether a stream is running at this rate
    pub fn is_active(&self) -> bool {
        self.0 != 0
    }
}

impl From<i128> for FlowRate {
    fn from(rate: i128) -> Self {
        Self(rate)
    }
}

impl fmt::Display for FlowRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One subscriber's rate at the time the record was appended
///
/// A zero rate marks a terminated stream. Records are never removed, so the
/// same identity may appear many times; the latest one is authoritative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriberRecord {
    /// Subscriber identity
    pub identity: Address,

    /// Flow rate
    pub flow_rate: FlowRate,
}

impl SubscriberRecord {
    /// Create a record
    pub fn new(identity: Address, flow_rate: impl Into<FlowRate>) -> Self {
        Self {
            identity,
            flow_rate: flow_rate.into(),
        }
    }

    /// Termination record for `identity`
    pub fn terminated(identity: Address) -> Self {
        Self::new(identity, FlowRate::ZERO)
    }

    /// Canonical bytes hashed into a leaf
    ///
    /// `identity || flow_rate`, the rate as 16 big-endian two's complement bytes.
    pub fn leaf_encoding(&self) -> [u8; LEAF_ENCODING_LEN] {
        let mut out = [0u8; LEAF_ENCODING_LEN];
        out[..20].copy_from_slice(self.identity.as_bytes());
        out[20..].copy_from_slice(&self.flow_rate.0.to_be_bytes());
        out
    }
}

/// Merkle root over a ledger's leaves
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Commitment([u8; 32]);

impl Commitment {
    /// Commitment of an empty ledger; default genesis value
    pub const ZERO: Commitment = Commitment([0u8; 32]);

    /// Width of the wire payload
    pub const PAYLOAD_LEN: usize = 32;

    /// Create from raw bytes
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get raw bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Encode as the relay payload
    pub fn to_payload(&self) -> bytes::Bytes {
        bytes::Bytes::copy_from_slice(&self.0)
    }

    /// Decode a relay payload
    ///
    /// Anything but exactly one 32-byte value is rejected.
    pub fn from_payload(payload: &[u8]) -> crate::Result<Self> {
        let bytes: [u8; 32] = payload.try_into().map_err(|_| {
            crate::Error::MalformedPayload(format!(
                "expected {} bytes, got {}",
                Self::PAYLOAD_LEN,
                payload.len()
            ))
        })?;
        Ok(Self(bytes))
    }
}

impl From<[u8; 32]> for Commitment {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Commitment({})", self)
    }
}

impl FromStr for Commitment {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(digits, &mut bytes)
            .map_err(|e| crate::Error::Config(format!("invalid commitment {}: {}", s, e)))?;
        Ok(Self(bytes))
    }
}

impl Serialize for Commitment {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Commitment {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
