//! Flow-event adapter
//!
//! Turns stream lifecycle callbacks from the continuous-payment protocol into
//! ledger appends. Created and updated events re-read the sender's current
//! rate from the protocol at call time; rates carried by the event itself are
//! never trusted. A deleted stream is recorded as a zero-rate append.

use crate::{
    ledger::SubscriberLedger,
    types::{FlowRate, SubscriberRecord},
    Error, Result,
};
use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use xdomain_bus::Address;

/// Read access to current stream rates
pub trait FlowRateOracle: Send + Sync {
    /// Current rate of the stream `sender -> receiver` in `asset`
    fn flow_rate(&self, asset: &Address, sender: &Address, receiver: &Address) -> Result<FlowRate>;
}

/// Stream rates held in memory
#[derive(Debug, Default)]
pub struct InMemoryFlowRates {
    rates: RwLock<HashMap<(Address, Address, Address), FlowRate>>,
}

impl InMemoryFlowRates {
    /// Create an empty rate table
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the rate of a stream (zero closes it)
    pub fn set_rate(&self, asset: Address, sender: Address, receiver: Address, rate: impl Into<FlowRate>) {
        let rate = rate.into();
        let mut rates = self.rates.write();
        if rate.is_active() {
            rates.insert((asset, sender, receiver), rate);
        } else {
            rates.remove(&(asset, sender, receiver));
        }
    }
}

impl FlowRateOracle for InMemoryFlowRates {
    fn flow_rate(&self, asset: &Address, sender: &Address, receiver: &Address) -> Result<FlowRate> {
        Ok(self
            .rates
            .read()
            .get(&(*asset, *sender, *receiver))
            .copied()
            .unwrap_or(FlowRate::ZERO))
    }
}

/// Stream lifecycle signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowEventKind {
    /// Stream opened
    Created,
    /// Stream rate changed
    Updated,
    /// Stream closed
    Deleted,
}

/// Callback payload from the streaming protocol
#[derive(Debug, Clone)]
pub struct FlowEvent {
    /// Lifecycle signal
    pub kind: FlowEventKind,

    /// Streaming asset the flow is denominated in
    pub asset: Address,

    /// Party streaming to this component
    pub counterparty: Address,

    /// Opaque protocol context, handed back unchanged
    pub context: Bytes,
}

impl FlowEvent {
    /// Create an event with empty context
    pub fn new(kind: FlowEventKind, asset: Address, counterparty: Address) -> Self {
        Self {
            kind,
            asset,
            counterparty,
            context: Bytes::new(),
        }
    }
}

/// Adapter from stream callbacks to ledger appends
#[derive(Clone)]
pub struct FlowEventAdapter {
    /// Rate source
    oracle: Arc<dyn FlowRateOracle>,

    /// Accepted streaming asset
    streaming_asset: Address,

    /// This component's address (receiver of every stream)
    receiver: Address,
}

impl FlowEventAdapter {
    /// Create an adapter
    pub fn new(oracle: Arc<dyn FlowRateOracle>, streaming_asset: Address, receiver: Address) -> Self {
        Self {
            oracle,
            streaming_asset,
            receiver,
        }
    }

    /// Accepted streaming asset
    pub fn streaming_asset(&self) -> Address {
        self.streaming_asset
    }

    /// Stream opened
    pub fn on_flow_created(
        &self,
        ledger: &mut SubscriberLedger,
        asset: Address,
        counterparty: Address,
        context: Bytes,
    ) -> Result<Bytes> {
        self.apply(ledger, FlowEvent { kind: FlowEventKind::Created, asset, counterparty, context })
    }

    /// Stream rate changed
    pub fn on_flow_updated(
        &self,
        ledger: &mut SubscriberLedger,
        asset: Address,
        counterparty: Address,
        context: Bytes,
    ) -> Result<Bytes> {
        self.apply(ledger, FlowEvent { kind: FlowEventKind::Updated, asset, counterparty, context })
    }

    /// Stream closed
    pub fn on_flow_deleted(
        &self,
        ledger: &mut SubscriberLedger,
        asset: Address,
        counterparty: Address,
        context: Bytes,
    ) -> Result<Bytes> {
        self.apply(ledger, FlowEvent { kind: FlowEventKind::Deleted, asset, counterparty, context })
    }

    /// Apply any lifecycle event; returns the context unchanged
    pub fn apply(&self, ledger: &mut SubscriberLedger, event: FlowEvent) -> Result<Bytes> {
        let record = self.record_for(&event)?;
        ledger.append(record);
        Ok(event.context)
    }

    /// Record an event would append, without touching any ledger
    pub fn record_for(&self, event: &FlowEvent) -> Result<SubscriberRecord> {
        if event.asset != self.streaming_asset {
            return Err(Error::WrongAsset {
                expected: self.streaming_asset,
                actual: event.asset,
            });
        }

        let rate = match event.kind {
            FlowEventKind::Created | FlowEventKind::Updated => {
                self.oracle
                    .flow_rate(&event.asset, &event.counterparty, &self.receiver)?
            }
            FlowEventKind::Deleted => FlowRate::ZERO,
        };

        Ok(SubscriberRecord::new(event.counterparty, rate))
    }
}

impl std::fmt::Debug for FlowEventAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlowEventAdapter")
            .field("streaming_asset", &self.streaming_asset)
            .field("receiver", &self.receiver)
            .finish_non_exhaustive()
    }
}
