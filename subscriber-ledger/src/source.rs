//! Source domain
//!
//! Owns the subscriber ledger fed by stream callbacks, the custody balances
//! that accrue from those streams, and the relay that ships the commitment to
//! the mirror domain.

use crate::{
    config::SourceConfig,
    flow::{FlowEvent, FlowEventAdapter, FlowEventKind, FlowRateOracle},
    ledger::SubscriberLedger,
    metrics::Metrics,
    relay::{CommitmentRelay, Custody, RelayReceipt, RelayTarget},
    types::{Commitment, SubscriberRecord},
    Result,
};
use bytes::Bytes;
use std::sync::Arc;
use xdomain_bus::{Address, Bridge, DomainId};

/// Source-side component
#[derive(Debug)]
pub struct SourceDomain {
    ledger: SubscriberLedger,
    adapter: FlowEventAdapter,
    custody: Custody,
    relay: CommitmentRelay,
}

impl SourceDomain {
    /// Create a source domain with an empty ledger
    pub fn new(config: &SourceConfig, oracle: Arc<dyn FlowRateOracle>, bridge: Arc<dyn Bridge>) -> Self {
        Self {
            ledger: SubscriberLedger::new(),
            adapter: FlowEventAdapter::new(oracle, config.streaming_asset, config.address),
            custody: Custody::default(),
            relay: CommitmentRelay::new(bridge, config.address, config.accepted_asset, config.slippage_bps),
        }
    }

    /// Attach metrics to the ledger and relay
    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.ledger = self.ledger.with_metrics(metrics.clone());
        self.relay = self.relay.with_metrics(metrics);
        self
    }

    /// Stream opened
    pub fn on_flow_created(&mut self, asset: Address, counterparty: Address, context: Bytes) -> Result<Bytes> {
        self.on_flow_event(FlowEvent {
            kind: FlowEventKind::Created,
            asset,
            counterparty,
            context,
        })
    }

    /// Stream rate changed
    pub fn on_flow_updated(&mut self, asset: Address, counterparty: Address, context: Bytes) -> Result<Bytes> {
        self.on_flow_event(FlowEvent {
            kind: FlowEventKind::Updated,
            asset,
            counterparty,
            context,
        })
    }

    /// Stream closed
    pub fn on_flow_deleted(&mut self, asset: Address, counterparty: Address, context: Bytes) -> Result<Bytes> {
        self.on_flow_event(FlowEvent {
            kind: FlowEventKind::Deleted,
            asset,
            counterparty,
            context,
        })
    }

    /// Apply a lifecycle event of any kind
    pub fn on_flow_event(&mut self, event: FlowEvent) -> Result<Bytes> {
        let kind = event.kind;
        let context = self.adapter.apply(&mut self.ledger, event)?;

        if kind == FlowEventKind::Deleted {
            tracing::info!("Stream closed; {} subscribers still active", self.ledger.active_subscribers().len());
        }

        Ok(context)
    }

    /// Credit funds streamed to this component
    pub fn deposit_streaming(&mut self, amount: u128) -> Result<()> {
        self.custody.deposit_streaming(amount)
    }

    /// Relay the current commitment and all held funds
    pub async fn relay(
        &mut self,
        target_domain: DomainId,
        target_address: Address,
        relayer_fee: u128,
    ) -> Result<RelayReceipt> {
        let target = RelayTarget {
            domain: target_domain,
            to: target_address,
            relayer_fee,
        };
        self.relay
            .relay(&mut self.custody, self.ledger.commitment(), target)
            .await
    }

    /// Current commitment
    pub fn commitment(&self) -> Commitment {
        self.ledger.commitment()
    }

    /// Records in insertion order
    pub fn records(&self) -> &[SubscriberRecord] {
        self.ledger.records()
    }

    /// Underlying ledger
    pub fn ledger(&self) -> &SubscriberLedger {
        &self.ledger
    }

    /// Current balances
    pub fn custody(&self) -> Custody {
        self.custody
    }
}
