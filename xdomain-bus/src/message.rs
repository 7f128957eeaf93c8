//! Outbound requests and inbound envelopes

use crate::types::{Address, DomainId, TransferId};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum slippage tolerance in basis points (100%)
pub const MAX_SLIPPAGE_BPS: u32 = 10_000;

/// Request to move funds and an opaque payload to another domain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XcallRequest {
    /// Destination domain
    pub destination: DomainId,

    /// Receiving contract on the destination domain
    pub to: Address,

    /// Asset carried across
    pub asset: Address,

    /// Party allowed to act on the transfer on the destination side
    pub delegate: Address,

    /// Amount of `asset` moved out of the sender's custody
    pub amount: u128,

    /// Slippage tolerance in basis points
    pub slippage_bps: u32,

    /// Fee paid to relayers on top of `amount`
    pub relayer_fee: u128,

    /// Opaque payload delivered verbatim
    pub payload: Bytes,
}

/// Message as seen by the receiving contract
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Transfer identifier assigned at send time
    pub transfer_id: TransferId,

    /// Amount delivered
    pub amount: u128,

    /// Asset delivered
    pub asset: Address,

    /// Original sender on the origin domain
    pub origin_sender: Address,

    /// Domain the message came from
    pub origin_domain: DomainId,

    /// Opaque payload bytes
    pub payload: Bytes,
}

/// An accepted send travelling through the bridge
#[derive(Debug, Clone)]
pub struct Envelope {
    /// Transfer ID
    pub transfer_id: TransferId,

    /// Origin domain
    pub origin_domain: DomainId,

    /// Origin sender
    pub origin_sender: Address,

    /// The request as submitted
    pub request: XcallRequest,

    /// Time the bridge accepted the send
    pub accepted_at: DateTime<Utc>,
}

impl Envelope {
    /// Render the envelope as the receiving contract sees it
    pub fn to_inbound(&self) -> InboundMessage {
        InboundMessage {
            transfer_id: self.transfer_id,
            amount: self.request.amount,
            asset: self.request.asset,
            origin_sender: self.origin_sender,
            origin_domain: self.origin_domain,
            payload: self.request.payload.clone(),
        }
    }

    /// Destination domain of the wrapped request
    pub fn destination(&self) -> DomainId {
        self.request.destination
    }
}

/// Summary written to logs, with the payload rendered as hex
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvelopeSummary {
    /// Transfer ID
    pub transfer_id: TransferId,
    /// Origin domain
    pub origin_domain: DomainId,
    /// Destination domain
    pub destination: DomainId,
    /// Amount
    pub amount: u128,
    /// Payload (hex)
    pub payload: String,
}

impl From<&Envelope> for EnvelopeSummary {
    fn from(envelope: &Envelope) -> Self {
        Self {
            transfer_id: envelope.transfer_id,
            origin_domain: envelope.origin_domain,
            destination: envelope.request.destination,
            amount: envelope.request.amount,
            payload: hex::encode(&envelope.request.payload),
        }
    }
}
