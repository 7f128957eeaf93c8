//! Bridge interface and in-memory transport
//!
//! A `Bridge` accepts a send and returns as soon as the send is taken into
//! custody. Delivery happens later, possibly never, possibly twice, and in no
//! particular order.

use crate::message::{Envelope, EnvelopeSummary, XcallRequest, MAX_SLIPPAGE_BPS};
use crate::types::{Address, DomainId, TransferId};
use crate::{Error, Result};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::{HashSet, VecDeque};
use uuid::Uuid;

/// Cross-domain messaging bridge
#[async_trait]
pub trait Bridge: Send + Sync {
    /// Submit a send on behalf of `sender`.
    ///
    /// On `Ok` the bridge holds `request.amount` of `request.asset`; on `Err`
    /// nothing was taken.
    async fn xcall(&self, sender: Address, request: XcallRequest) -> Result<TransferId>;

    /// Domain this bridge endpoint lives on
    fn origin_domain(&self) -> DomainId;
}

#[derive(Debug, Default)]
struct BridgeState {
    /// Accepted, not yet taken for delivery
    in_flight: VecDeque<Envelope>,

    /// Total amount ever taken into custody
    escrowed: u128,

    /// Assets the bridge will carry (empty = any)
    supported_assets: HashSet<Address>,

    /// Reject every send while set
    rejecting: bool,
}

/// In-process bridge endpoint
///
/// Accepted sends queue up as envelopes. Tests and simulations take them out
/// and hand them to the receiving side in whatever order they like, which is
/// how loss, duplication, and reordering are modelled.
#[derive(Debug)]
pub struct InMemoryBridge {
    origin_domain: DomainId,
    state: Mutex<BridgeState>,
}

impl InMemoryBridge {
    /// Create a bridge endpoint on `origin_domain`
    pub fn new(origin_domain: DomainId) -> Self {
        Self {
            origin_domain,
            state: Mutex::new(BridgeState::default()),
        }
    }

    /// Restrict the assets this bridge carries
    pub fn with_supported_asset(self, asset: Address) -> Self {
        self.state.lock().supported_assets.insert(asset);
        self
    }

    /// Toggle rejection of new sends
    pub fn set_rejecting(&self, rejecting: bool) {
        self.state.lock().rejecting = rejecting;
    }

    /// Number of envelopes waiting for delivery
    pub fn in_flight_len(&self) -> usize {
        self.state.lock().in_flight.len()
    }

    /// Take every waiting envelope, oldest first
    pub fn take_in_flight(&self) -> Vec<Envelope> {
        self.state.lock().in_flight.drain(..).collect()
    }

    /// Take the oldest waiting envelope
    pub fn pop_next(&self) -> Option<Envelope> {
        self.state.lock().in_flight.pop_front()
    }

    /// Total amount taken into custody by accepted sends
    pub fn escrowed(&self) -> u128 {
        self.state.lock().escrowed
    }

    fn check(state: &BridgeState, request: &XcallRequest) -> Result<()> {
        if state.rejecting {
            return Err(Error::Rejected("bridge is not accepting sends".to_string()));
        }

        if !state.supported_assets.is_empty() && !state.supported_assets.contains(&request.asset) {
            return Err(Error::Rejected(format!(
                "asset {} is not supported",
                request.asset
            )));
        }

        if request.slippage_bps > MAX_SLIPPAGE_BPS {
            return Err(Error::Rejected(format!(
                "slippage {} bps exceeds {}",
                request.slippage_bps, MAX_SLIPPAGE_BPS
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl Bridge for InMemoryBridge {
    async fn xcall(&self, sender: Address, request: XcallRequest) -> Result<TransferId> {
        let mut state = self.state.lock();
        Self::check(&state, &request)?;

        let escrowed = state
            .escrowed
            .checked_add(request.amount)
            .ok_or_else(|| Error::Rejected("custody overflow".to_string()))?;

        let envelope = Envelope {
            transfer_id: Uuid::now_v7(),
            origin_domain: self.origin_domain,
            origin_sender: sender,
            request,
            accepted_at: Utc::now(),
        };
        let transfer_id = envelope.transfer_id;

        tracing::debug!(envelope = ?EnvelopeSummary::from(&envelope), "xcall accepted");

        state.escrowed = escrowed;
        state.in_flight.push_back(envelope);

        Ok(transfer_id)
    }

    fn origin_domain(&self) -> DomainId {
        self.origin_domain
    }
}
