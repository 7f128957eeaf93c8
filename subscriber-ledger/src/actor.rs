//! Actor-based sequential execution for each domain
//!
//! Every domain owns its state inside one Tokio task. Callers talk to it
//! through a cloneable handle, so calls against one ledger are applied one at
//! a time, each running to completion (including the full tree rebuild)
//! before the next is looked at.
//!
//! # Architecture
//!
//! ```text
//!   flow callbacks / relay trigger         bridge deliveries / replays
//!              │                                      │
//!              ▼                                      ▼
//!   ┌──────────────────────┐               ┌──────────────────────┐
//!   │  SourceHandle (Clone)│               │  MirrorHandle (Clone)│
//!   └──────────┬───────────┘               └──────────┬───────────┘
//!              │ mpsc (bounded)                       │ mpsc (bounded)
//!              ▼                                      ▼
//!   ┌──────────────────────┐    xcall     ┌──────────────────────┐
//!   │ SourceActor          │ ───────────▶ │ MirrorActor          │
//!   │  SourceDomain        │  (unordered, │  MirrorLedger        │
//!   └──────────────────────┘   lossy)     └──────────────────────┘
//! ```

use crate::{
    flow::FlowEvent,
    mirror::{MirrorLedger, MirrorSnapshot},
    relay::RelayReceipt,
    source::SourceDomain,
    types::{Commitment, SubscriberRecord},
    Error, Result,
};
use bytes::Bytes;
use tokio::sync::{mpsc, oneshot};
use xdomain_bus::{Address, DomainId, InboundMessage};

/// Mailbox capacity per actor
const MAILBOX_CAPACITY: usize = 1000;

/// Message sent to the source actor
#[derive(Debug)]
pub enum SourceMessage {
    /// Stream lifecycle callback
    FlowEvent {
        event: FlowEvent,
        response: oneshot::Sender<Result<Bytes>>,
    },

    /// Credit streamed funds
    DepositStreaming {
        amount: u128,
        response: oneshot::Sender<Result<()>>,
    },

    /// Relay the current commitment
    Relay {
        target_domain: DomainId,
        target_address: Address,
        relayer_fee: u128,
        response: oneshot::Sender<Result<RelayReceipt>>,
    },

    /// Get current commitment
    GetCommitment {
        response: oneshot::Sender<Commitment>,
    },

    /// Get all records
    GetRecords {
        response: oneshot::Sender<Vec<SubscriberRecord>>,
    },

    /// Shutdown actor
    Shutdown,
}

/// Message sent to the mirror actor
#[derive(Debug)]
pub enum MirrorMessage {
    /// Bridge delivery
    Inbound {
        message: InboundMessage,
        response: oneshot::Sender<Result<Commitment>>,
    },

    /// Bulk replay
    ReplaceBulk {
        records: Vec<SubscriberRecord>,
        response: oneshot::Sender<Result<Commitment>>,
    },

    /// Get state summary
    GetSnapshot {
        response: oneshot::Sender<MirrorSnapshot>,
    },

    /// Shutdown actor
    Shutdown,
}

/// Actor wrapping the source domain
#[derive(Debug)]
pub struct SourceActor {
    domain: SourceDomain,
    mailbox: mpsc::Receiver<SourceMessage>,
}

impl SourceActor {
    /// Run the actor event loop
    pub async fn run(mut self) {
        while let Some(msg) = self.mailbox.recv().await {
            match msg {
                SourceMessage::FlowEvent { event, response } => {
                    let _ = response.send(self.domain.on_flow_event(event));
                }

                SourceMessage::DepositStreaming { amount, response } => {
                    let _ = response.send(self.domain.deposit_streaming(amount));
                }

                SourceMessage::Relay {
                    target_domain,
                    target_address,
                    relayer_fee,
                    response,
                } => {
                    let result = self
                        .domain
                        .relay(target_domain, target_address, relayer_fee)
                        .await;
                    let _ = response.send(result);
                }

                SourceMessage::GetCommitment { response } => {
                    let _ = response.send(self.domain.commitment());
                }

                SourceMessage::GetRecords { response } => {
                    let _ = response.send(self.domain.records().to_vec());
                }

                SourceMessage::Shutdown => break,
            }
        }

        tracing::debug!("Source actor stopped with {} records", self.domain.records().len());
    }
}

/// Actor wrapping the mirror ledger
#[derive(Debug)]
pub struct MirrorActor {
    mirror: MirrorLedger,
    mailbox: mpsc::Receiver<MirrorMessage>,
}

impl MirrorActor {
    /// Run the actor event loop
    pub async fn run(mut self) {
        while let Some(msg) = self.mailbox.recv().await {
            match msg {
                MirrorMessage::Inbound { message, response } => {
                    let _ = response.send(self.mirror.on_message(&message));
                }

                MirrorMessage::ReplaceBulk { records, response } => {
                    let _ = response.send(self.mirror.replace_bulk(records));
                }

                MirrorMessage::GetSnapshot { response } => {
                    let _ = response.send(self.mirror.snapshot());
                }

                MirrorMessage::Shutdown => break,
            }
        }

        tracing::debug!("Mirror actor stopped with {} records", self.mirror.ledger().len());
    }
}

async fn request<M, T>(
    sender: &mpsc::Sender<M>,
    build: impl FnOnce(oneshot::Sender<T>) -> M,
) -> Result<T> {
    let (tx, rx) = oneshot::channel();
    sender
        .send(build(tx))
        .await
        .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;

    rx.await
        .map_err(|_| Error::Concurrency("Response channel closed".to_string()))
}

/// Handle for sending messages to the source actor
#[derive(Clone, Debug)]
pub struct SourceHandle {
    sender: mpsc::Sender<SourceMessage>,
}

impl SourceHandle {
    /// Deliver a stream lifecycle callback
    pub async fn flow_event(&self, event: FlowEvent) -> Result<Bytes> {
        request(&self.sender, |response| SourceMessage::FlowEvent { event, response }).await?
    }

    /// Credit streamed funds
    pub async fn deposit_streaming(&self, amount: u128) -> Result<()> {
        request(&self.sender, |response| SourceMessage::DepositStreaming { amount, response }).await?
    }

    /// Relay the current commitment
    pub async fn relay(
        &self,
        target_domain: DomainId,
        target_address: Address,
        relayer_fee: u128,
    ) -> Result<RelayReceipt> {
        request(&self.sender, |response| SourceMessage::Relay {
            target_domain,
            target_address,
            relayer_fee,
            response,
        })
        .await?
    }

    /// Get current commitment
    pub async fn commitment(&self) -> Result<Commitment> {
        request(&self.sender, |response| SourceMessage::GetCommitment { response }).await
    }

    /// Get all records
    pub async fn records(&self) -> Result<Vec<SubscriberRecord>> {
        request(&self.sender, |response| SourceMessage::GetRecords { response }).await
    }

    /// Shutdown actor
    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(SourceMessage::Shutdown)
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))
    }
}

/// Handle for sending messages to the mirror actor
#[derive(Clone, Debug)]
pub struct MirrorHandle {
    sender: mpsc::Sender<MirrorMessage>,
}

impl MirrorHandle {
    /// Deliver a bridge message
    pub async fn deliver(&self, message: InboundMessage) -> Result<Commitment> {
        request(&self.sender, |response| MirrorMessage::Inbound { message, response }).await?
    }

    /// Submit a bulk replay
    pub async fn replace_bulk(&self, records: Vec<SubscriberRecord>) -> Result<Commitment> {
        request(&self.sender, |response| MirrorMessage::ReplaceBulk { records, response }).await?
    }

    /// Get state summary
    pub async fn snapshot(&self) -> Result<MirrorSnapshot> {
        request(&self.sender, |response| MirrorMessage::GetSnapshot { response }).await
    }

    /// Shutdown actor
    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(MirrorMessage::Shutdown)
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))
    }
}

/// Spawn the source actor
pub fn spawn_source_actor(domain: SourceDomain) -> SourceHandle {
    let (tx, rx) = mpsc::channel(MAILBOX_CAPACITY); // Bounded channel for backpressure
    let actor = SourceActor { domain, mailbox: rx };

    tokio::spawn(async move {
        actor.run().await;
    });

    SourceHandle { sender: tx }
}

/// Spawn the mirror actor
pub fn spawn_mirror_actor(mirror: MirrorLedger) -> MirrorHandle {
    let (tx, rx) = mpsc::channel(MAILBOX_CAPACITY);
    let actor = MirrorActor { mirror, mailbox: rx };

    tokio::spawn(async move {
        actor.run().await;
    });

    MirrorHandle { sender: tx }
}
