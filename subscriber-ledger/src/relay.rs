//! Commitment relay
//!
//! Sends the current commitment, together with every unit of the accepted
//! asset held in custody, through the bridge to the mirror domain.
//!
//! The send is fire-and-forget: success means the bridge accepted it, not that
//! anything arrived. Funds leave custody only when the bridge accepts the
//! send; a refused send leaves them in place.

use crate::{metrics::Metrics, types::Commitment, Error, Result};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use xdomain_bus::{Address, Bridge, DomainId, TransferId, XcallRequest};

/// Balances held by the source component
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Custody {
    /// Accrued streaming balance, not yet transferable
    pub streaming: u128,

    /// Transferable balance of the accepted asset
    pub underlying: u128,
}

impl Custody {
    /// Credit streamed funds
    pub fn deposit_streaming(&mut self, amount: u128) -> Result<()> {
        self.streaming = self
            .streaming
            .checked_add(amount)
            .ok_or(Error::Overflow("streaming balance"))?;
        Ok(())
    }

    /// Credit transferable funds
    pub fn deposit_underlying(&mut self, amount: u128) -> Result<()> {
        self.underlying = self
            .underlying
            .checked_add(amount)
            .ok_or(Error::Overflow("underlying balance"))?;
        Ok(())
    }

    /// Convert the whole streaming balance into the transferable asset
    ///
    /// Returns the resulting transferable balance.
    pub fn downgrade_all(&mut self) -> Result<u128> {
        let streaming = std::mem::take(&mut self.streaming);
        match self.underlying.checked_add(streaming) {
            Some(total) => {
                self.underlying = total;
                Ok(total)
            }
            None => {
                self.streaming = streaming;
                Err(Error::Overflow("underlying balance"))
            }
        }
    }

    /// Remove `amount` of the transferable asset
    pub fn withdraw(&mut self, amount: u128) -> Result<()> {
        if amount > self.underlying {
            return Err(Error::InsufficientFunds {
                required: amount,
                available: self.underlying,
            });
        }
        self.underlying -= amount;
        Ok(())
    }
}

/// Where a relay is headed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayTarget {
    /// Destination domain
    pub domain: DomainId,

    /// Mirror contract on the destination domain
    pub to: Address,

    /// Fee paid to bridge relayers
    pub relayer_fee: u128,
}

/// Proof that the bridge accepted a relay
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayReceipt {
    /// Bridge transfer ID
    pub transfer_id: TransferId,

    /// Amount moved out of custody
    pub amount: u128,

    /// Commitment carried as payload
    pub commitment: Commitment,

    /// Destination domain
    pub destination: DomainId,

    /// Send time
    pub sent_at: DateTime<Utc>,
}

/// Packages commitments and funds into bridge sends
#[derive(Clone)]
pub struct CommitmentRelay {
    bridge: Arc<dyn Bridge>,

    /// This component's address (sender and delegate)
    sender: Address,

    /// Asset carried across
    asset: Address,

    /// Slippage tolerance in basis points
    slippage_bps: u32,

    metrics: Option<Metrics>,
}

impl CommitmentRelay {
    /// Create a relay
    pub fn new(bridge: Arc<dyn Bridge>, sender: Address, asset: Address, slippage_bps: u32) -> Self {
        Self {
            bridge,
            sender,
            asset,
            slippage_bps,
            metrics: None,
        }
    }

    /// Attach metrics
    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Relay `commitment` and the whole custody balance to `target`
    pub async fn relay(
        &self,
        custody: &mut Custody,
        commitment: Commitment,
        target: RelayTarget,
    ) -> Result<RelayReceipt> {
        let amount = custody.downgrade_all()?;

        let request = XcallRequest {
            destination: target.domain,
            to: target.to,
            asset: self.asset,
            delegate: self.sender,
            amount,
            slippage_bps: self.slippage_bps,
            relayer_fee: target.relayer_fee,
            payload: commitment.to_payload(),
        };

        let transfer_id = match self.bridge.xcall(self.sender, request).await {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!("Relay to domain {} refused: {}", target.domain, e);
                if let Some(ref metrics) = self.metrics {
                    metrics.record_relay(false);
                }
                return Err(e.into());
            }
        };

        // The bridge now holds `amount`; balance was exactly `amount` before the send.
        custody.withdraw(amount)?;

        tracing::info!(
            %transfer_id,
            destination = %target.domain,
            amount,
            %commitment,
            "commitment relayed"
        );

        if let Some(ref metrics) = self.metrics {
            metrics.record_relay(true);
        }

        Ok(RelayReceipt {
            transfer_id,
            amount,
            commitment,
            destination: target.domain,
            sent_at: Utc::now(),
        })
    }
}

impl std::fmt::Debug for CommitmentRelay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommitmentRelay")
            .field("origin_domain", &self.bridge.origin_domain())
            .field("sender", &self.sender)
            .field("asset", &self.asset)
            .field("slippage_bps", &self.slippage_bps)
            .finish()
    }
}
