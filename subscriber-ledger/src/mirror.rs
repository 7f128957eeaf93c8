//! Mirror ledger (destination side)
//!
//! Stores the commitment most recently relayed from the source domain and
//! accepts bulk replays of the source log only when the replayed log hashes to
//! that commitment.
//!
//! Inbound messages overwrite the relayed commitment unconditionally: there is
//! no sequence number in the payload, so a late, stale message replaces a
//! fresher one. Replays simply fail until a matching commitment arrives again.
//!
//! A matching root does not pin the replay length. The last node of an odd
//! level is paired with itself, so `[a, b, c]` and `[a, b, c, c]` share a root
//! and either replay is accepted against it. Callers that need the mirror log
//! to equal the source log must also compare lengths.

use crate::{
    config::MirrorConfig,
    ledger::SubscriberLedger,
    metrics::Metrics,
    types::{Commitment, SubscriberRecord},
    Error, Result,
};
use xdomain_bus::{Address, InboundMessage};

/// Destination-side component
#[derive(Debug)]
pub struct MirrorLedger {
    ledger: SubscriberLedger,

    /// Last commitment delivered through the bridge
    relayed: Commitment,

    /// Asset inbound messages must carry
    accepted_asset: Address,

    metrics: Option<Metrics>,
}

/// Point-in-time view of a mirror
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MirrorSnapshot {
    /// Records held
    pub len: usize,

    /// Root over held records
    pub commitment: Commitment,

    /// Last relayed commitment
    pub relayed: Commitment,
}

impl MirrorLedger {
    /// Create a mirror with the configured genesis commitment
    pub fn new(config: &MirrorConfig) -> Self {
        let ledger = if config.track_leaf_set {
            SubscriberLedger::with_leaf_set()
        } else {
            SubscriberLedger::new()
        };

        Self {
            ledger,
            relayed: config.genesis_commitment,
            accepted_asset: config.accepted_asset,
            metrics: None,
        }
    }

    /// Attach metrics
    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.ledger = self.ledger.with_metrics(metrics.clone());
        self.metrics = Some(metrics);
        self
    }

    /// Handle a message delivered by the bridge
    ///
    /// Returns the relayed commitment it replaced.
    pub fn on_message(&mut self, message: &InboundMessage) -> Result<Commitment> {
        let result = self.store_relayed(message);

        if let Some(ref metrics) = self.metrics {
            metrics.record_inbound(result.is_ok());
        }

        match result {
            Ok(previous) => {
                tracing::info!(
                    transfer_id = %message.transfer_id,
                    origin_domain = %message.origin_domain,
                    %previous,
                    relayed = %self.relayed,
                    "relayed commitment stored"
                );
                Ok(previous)
            }
            Err(e) => {
                tracing::warn!("Inbound message {} rejected: {}", message.transfer_id, e);
                Err(e)
            }
        }
    }

    fn store_relayed(&mut self, message: &InboundMessage) -> Result<Commitment> {
        if message.asset != self.accepted_asset {
            return Err(Error::WrongAsset {
                expected: self.accepted_asset,
                actual: message.asset,
            });
        }

        let commitment = Commitment::from_payload(&message.payload)?;
        Ok(std::mem::replace(&mut self.relayed, commitment))
    }

    /// Append a replayed batch if it reproduces the relayed commitment
    ///
    /// All-or-nothing: on `CommitmentMismatch` nothing changes.
    pub fn replace_bulk(&mut self, records: Vec<SubscriberRecord>) -> Result<Commitment> {
        let count = records.len();
        let result = self.ledger.append_checked(&records, self.relayed);

        if let Some(ref metrics) = self.metrics {
            metrics.record_replay(result.is_ok());
        }

        match result {
            Ok(commitment) => {
                tracing::info!("Bulk replay of {} records accepted at {}", count, commitment);
                Ok(commitment)
            }
            Err(e) => {
                tracing::warn!("Bulk replay of {} records rejected: {}", count, e);
                Err(e)
            }
        }
    }

    /// Last relayed commitment
    pub fn relayed_commitment(&self) -> Commitment {
        self.relayed
    }

    /// Root over held records
    pub fn commitment(&self) -> Commitment {
        self.ledger.commitment()
    }

    /// Underlying ledger
    pub fn ledger(&self) -> &SubscriberLedger {
        &self.ledger
    }

    /// Current state summary
    pub fn snapshot(&self) -> MirrorSnapshot {
        MirrorSnapshot {
            len: self.ledger.len(),
            commitment: self.ledger.commitment(),
            relayed: self.relayed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merkle;
    use bytes::Bytes;
    use uuid::Uuid;
    use xdomain_bus::DomainId;

    const ASSET: Address = Address::repeat_byte(0x0d);

    fn config() -> MirrorConfig {
        MirrorConfig {
            accepted_asset: ASSET,
            ..MirrorConfig::default()
        }
    }

    fn message(asset: Address, payload: Bytes) -> InboundMessage {
        InboundMessage {
            transfer_id: Uuid::now_v7(),
            amount: 100,
            asset,
            origin_sender: Address::repeat_byte(0x50),
            origin_domain: DomainId(1),
            payload,
        }
    }

    fn records() -> Vec<SubscriberRecord> {
        vec![
            SubscriberRecord::new(Address::repeat_byte(0xa1), 5),
            SubscriberRecord::new(Address::repeat_byte(0xb0), 3),
        ]
    }

    #[test]
    fn test_genesis_commitment() {
        let mut cfg = config();
        cfg.genesis_commitment = Commitment::from_bytes([4u8; 32]);
        let mirror = MirrorLedger::new(&cfg);

        assert_eq!(mirror.relayed_commitment(), Commitment::from_bytes([4u8; 32]));
        assert!(mirror.ledger().is_empty());
    }

    #[test]
    fn test_on_message_stores_commitment() {
        let mut mirror = MirrorLedger::new(&config());
        let root = Commitment::from_bytes([9u8; 32]);

        let previous = mirror.on_message(&message(ASSET, root.to_payload())).unwrap();
        assert_eq!(previous, Commitment::ZERO);
        assert_eq!(mirror.relayed_commitment(), root);
    }

    #[test]
    fn test_on_message_wrong_asset() {
        let mut mirror = MirrorLedger::new(&config());
        let result = mirror.on_message(&message(Address::repeat_byte(1), Bytes::from_static(&[9u8; 32])));

        assert!(matches!(result, Err(Error::WrongAsset { .. })));
        assert_eq!(mirror.relayed_commitment(), Commitment::ZERO);
    }

    #[test]
    fn test_on_message_malformed_payload() {
        let mut mirror = MirrorLedger::new(&config());
        mirror
            .on_message(&message(ASSET, Bytes::from_static(&[1u8; 32])))
            .unwrap();

        for bad in [&[][..], &[2u8; 31][..], &[2u8; 33][..], &[2u8; 64][..]] {
            let result = mirror.on_message(&message(ASSET, Bytes::copy_from_slice(bad)));
            assert!(matches!(result, Err(Error::MalformedPayload(_))));
        }
        assert_eq!(mirror.relayed_commitment(), Commitment::from_bytes([1u8; 32]));
    }

    #[test]
    fn test_last_writer_wins() {
        let mut mirror = MirrorLedger::new(&config());
        let newer = Commitment::from_bytes([2u8; 32]);
        let older = Commitment::from_bytes([1u8; 32]);

        mirror.on_message(&message(ASSET, newer.to_payload())).unwrap();
        // Delivered late; still overwrites
        mirror.on_message(&message(ASSET, older.to_payload())).unwrap();

        assert_eq!(mirror.relayed_commitment(), older);
    }

    #[test]
    fn test_replace_bulk_matching() {
        let mut mirror = MirrorLedger::new(&config());
        let root = merkle::root_of(&records());
        mirror.on_message(&message(ASSET, root.to_payload())).unwrap();

        assert_eq!(mirror.replace_bulk(records()).unwrap(), root);
        assert_eq!(mirror.snapshot(), MirrorSnapshot { len: 2, commitment: root, relayed: root });
    }

    #[test]
    fn test_replace_bulk_mismatch_is_atomic() {
        let metrics = Metrics::new().unwrap();
        let mut mirror = MirrorLedger::new(&config()).with_metrics(metrics.clone());
        let root = merkle::root_of(&records());
        mirror.on_message(&message(ASSET, root.to_payload())).unwrap();

        let before = mirror.snapshot();
        let result = mirror.replace_bulk(records()[..1].to_vec());

        assert!(matches!(result, Err(Error::CommitmentMismatch { .. })));
        assert_eq!(mirror.snapshot(), before);
        assert_eq!(metrics.replays_rejected.get(), 1);
        assert_eq!(metrics.inbound_stored.get(), 1);
    }

    #[test]
    fn test_replay_against_genesis_only_accepts_empty() {
        let mut mirror = MirrorLedger::new(&config());
        assert!(mirror.replace_bulk(records()).is_err());
        assert_eq!(mirror.replace_bulk(Vec::new()).unwrap(), Commitment::ZERO);
    }

    #[test]
    fn test_leaf_set_tracking_from_config() {
        let mut cfg = config();
        cfg.track_leaf_set = true;
        let mut mirror = MirrorLedger::new(&cfg);
        let root = merkle::root_of(&records());
        mirror.on_message(&message(ASSET, root.to_payload())).unwrap();
        mirror.replace_bulk(records()).unwrap();

        assert_eq!(mirror.ledger().leaf_set().map(|s| s.len()), Some(2));
    }

    #[test]
    fn test_duplicated_tail_shares_root() {
        let a = SubscriberRecord::new(Address::repeat_byte(0xa1), 5);
        let b = SubscriberRecord::new(Address::repeat_byte(0xb0), 3);
        let c = SubscriberRecord::new(Address::repeat_byte(0xa1), 7);
        let root = merkle::root_of(&[a, b, c]);
        assert_eq!(merkle::root_of(&[a, b, c, c]), root);

        let mut mirror = MirrorLedger::new(&config());
        mirror.on_message(&message(ASSET, root.to_payload())).unwrap();

        assert_eq!(mirror.replace_bulk(vec![a, b, c, c]).unwrap(), root);
        assert_eq!(mirror.ledger().len(), 4);
    }
}
