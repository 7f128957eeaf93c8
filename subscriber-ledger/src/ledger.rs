//! Append-only subscriber ledger
//!
//! The log is an event history, not a keyed map: an identity may appear many
//! times and the latest record wins. The commitment is always the Merkle root
//! of the full log and is recomputed from scratch after every mutation.
//!
//! # Invariants
//!
//! - Append-only: records are never modified, reordered, or removed
//! - `commitment == root_of(records)` after every public call returns
//! - A rejected batch leaves the ledger exactly as it was

use crate::{
    merkle::{self, Hash},
    metrics::Metrics,
    types::{Commitment, FlowRate, SubscriberRecord},
    Error, Result,
};
use std::collections::{HashMap, HashSet};
use std::time::Instant;
use xdomain_bus::Address;

/// Ordered subscriber log with its derived commitment
#[derive(Debug, Clone, Default)]
pub struct SubscriberLedger {
    /// Records in insertion order
    records: Vec<SubscriberRecord>,

    /// Root over `records`
    commitment: Commitment,

    /// Latest rate per identity, with first-seen position
    latest: HashMap<Address, (usize, FlowRate)>,

    /// Every leaf hash ever committed (audit only)
    leaf_set: Option<HashSet<Hash>>,

    /// Metrics sink
    metrics: Option<Metrics>,
}

impl SubscriberLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty ledger that records every committed leaf hash
    pub fn with_leaf_set() -> Self {
        Self {
            leaf_set: Some(HashSet::new()),
            ..Self::default()
        }
    }

    /// Attach metrics
    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        metrics.set_ledger_len(self.records.len());
        self.metrics = Some(metrics);
        self
    }

    /// Append a record and recompute the commitment
    pub fn append(&mut self, record: SubscriberRecord) -> Commitment {
        self.records.push(record);

        let (leaves, commitment) = self.rebuild(&self.records);
        self.commitment = commitment;
        self.index(&[record], &leaves);

        tracing::debug!(
            identity = %record.identity,
            flow_rate = %record.flow_rate,
            len = self.records.len(),
            commitment = %self.commitment,
            "record appended"
        );

        if let Some(ref metrics) = self.metrics {
            metrics.record_appended(1);
            metrics.set_ledger_len(self.records.len());
        }

        self.commitment
    }

    /// Append `batch` only if the resulting root equals `expected`
    ///
    /// On mismatch nothing is applied and `CommitmentMismatch` is returned.
    pub fn append_checked(
        &mut self,
        batch: &[SubscriberRecord],
        expected: Commitment,
    ) -> Result<Commitment> {
        let mut candidate = Vec::with_capacity(self.records.len() + batch.len());
        candidate.extend_from_slice(&self.records);
        candidate.extend_from_slice(batch);

        let (leaves, computed) = self.rebuild(&candidate);

        if computed != expected {
            return Err(Error::CommitmentMismatch { expected, computed });
        }

        self.records = candidate;
        self.commitment = computed;
        self.index(batch, &leaves);

        if let Some(ref metrics) = self.metrics {
            metrics.record_appended(batch.len());
            metrics.set_ledger_len(self.records.len());
        }

        Ok(self.commitment)
    }

    /// Records in insertion order
    pub fn records(&self) -> &[SubscriberRecord] {
        &self.records
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the ledger is empty
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Current commitment
    pub fn commitment(&self) -> Commitment {
        self.commitment
    }

    /// Latest rate recorded for `identity`
    pub fn current_rate(&self, identity: &Address) -> Option<FlowRate> {
        self.latest.get(identity).map(|(_, rate)| *rate)
    }

    /// Identities whose latest rate is non-zero, in first-seen order
    pub fn active_subscribers(&self) -> Vec<(Address, FlowRate)> {
        let mut active: Vec<_> = self
            .latest
            .iter()
            .filter(|(_, (_, rate))| rate.is_active())
            .map(|(identity, (first_seen, rate))| (*first_seen, *identity, *rate))
            .collect();

        active.sort_by_key(|(first_seen, _, _)| *first_seen);
        active.into_iter().map(|(_, identity, rate)| (identity, rate)).collect()
    }

    /// Leaf hashes committed so far, if tracking is enabled
    pub fn leaf_set(&self) -> Option<&HashSet<Hash>> {
        self.leaf_set.as_ref()
    }

    /// Rebuild every leaf and the root over `records`
    fn rebuild(&self, records: &[SubscriberRecord]) -> (Vec<Hash>, Commitment) {
        let start = Instant::now();
        let leaves = merkle::leaves_of(records);
        let root = Commitment::from_bytes(merkle::merkle_root(&leaves));

        if let Some(ref metrics) = self.metrics {
            metrics.record_recompute(start.elapsed().as_secs_f64());
        }

        (leaves, root)
    }

    /// Fold newly committed records into the derived indexes
    fn index(&mut self, added: &[SubscriberRecord], leaves: &[Hash]) {
        let base = self.records.len() - added.len();
        for (offset, record) in added.iter().enumerate() {
            self.latest
                .entry(record.identity)
                .and_modify(|(_, rate)| *rate = record.flow_rate)
                .or_insert((base + offset, record.flow_rate));
        }

        if let Some(ref mut set) = self.leaf_set {
            set.extend(leaves.iter().copied());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(byte: u8) -> Address {
        Address::repeat_byte(byte)
    }

    #[test]
    fn test_empty_ledger() {
        let ledger = SubscriberLedger::new();
        assert!(ledger.is_empty());
        assert_eq!(ledger.len(), 0);
        assert_eq!(ledger.commitment(), Commitment::ZERO);
        assert!(ledger.leaf_set().is_none());
    }

    #[test]
    fn test_append_recomputes_commitment() {
        let mut ledger = SubscriberLedger::new();

        let r1 = SubscriberRecord::new(addr(1), 5);
        let c1 = ledger.append(r1);
        assert_eq!(ledger.len(), 1);
        assert_eq!(c1, merkle::root_of(&[r1]));

        let r2 = SubscriberRecord::new(addr(2), 3);
        let c2 = ledger.append(r2);
        assert_eq!(ledger.len(), 2);
        assert_ne!(c1, c2);
        assert_eq!(c2, merkle::root_of(&[r1, r2]));
        assert_eq!(ledger.commitment(), c2);
    }

    #[test]
    fn test_duplicate_identities_accumulate() {
        let mut ledger = SubscriberLedger::new();
        ledger.append(SubscriberRecord::new(addr(1), 5));
        ledger.append(SubscriberRecord::new(addr(1), 5));
        ledger.append(SubscriberRecord::new(addr(1), 7));

        assert_eq!(ledger.len(), 3);
        assert_eq!(ledger.current_rate(&addr(1)), Some(FlowRate(7)));
    }

    #[test]
    fn test_termination_keeps_history() {
        let mut ledger = SubscriberLedger::new();
        ledger.append(SubscriberRecord::new(addr(1), 5));
        ledger.append(SubscriberRecord::new(addr(2), 3));
        ledger.append(SubscriberRecord::terminated(addr(1)));

        assert_eq!(ledger.len(), 3);
        assert_eq!(ledger.current_rate(&addr(1)), Some(FlowRate::ZERO));
        assert_eq!(ledger.active_subscribers(), vec![(addr(2), FlowRate(3))]);
    }

    #[test]
    fn test_active_subscribers_first_seen_order() {
        let mut ledger = SubscriberLedger::new();
        ledger.append(SubscriberRecord::new(addr(9), 1));
        ledger.append(SubscriberRecord::new(addr(3), 2));
        ledger.append(SubscriberRecord::new(addr(9), 4));

        assert_eq!(
            ledger.active_subscribers(),
            vec![(addr(9), FlowRate(4)), (addr(3), FlowRate(2))]
        );
        assert_eq!(ledger.current_rate(&addr(7)), None);
    }

    #[test]
    fn test_append_checked_accepts_matching_batch() {
        let batch = vec![
            SubscriberRecord::new(addr(1), 5),
            SubscriberRecord::new(addr(2), 3),
        ];
        let expected = merkle::root_of(&batch);

        let mut ledger = SubscriberLedger::new();
        let committed = ledger.append_checked(&batch, expected).unwrap();

        assert_eq!(committed, expected);
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.records(), batch.as_slice());
    }

    #[test]
    fn test_append_checked_rejects_atomically() {
        let mut ledger = SubscriberLedger::with_leaf_set();
        ledger.append(SubscriberRecord::new(addr(1), 5));
        let before = ledger.commitment();
        let leaves_before = ledger.leaf_set().unwrap().len();

        let batch = vec![SubscriberRecord::new(addr(2), 3)];
        let result = ledger.append_checked(&batch, Commitment::from_bytes([7u8; 32]));

        match result {
            Err(Error::CommitmentMismatch { expected, computed }) => {
                assert_eq!(expected, Commitment::from_bytes([7u8; 32]));
                assert_ne!(computed, before);
            }
            other => panic!("expected mismatch, got {:?}", other),
        }

        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.commitment(), before);
        assert_eq!(ledger.current_rate(&addr(2)), None);
        assert_eq!(ledger.leaf_set().unwrap().len(), leaves_before);
    }

    #[test]
    fn test_append_checked_extends_existing_log() {
        let mut ledger = SubscriberLedger::new();
        let first = SubscriberRecord::new(addr(1), 5);
        ledger.append(first);

        let batch = vec![SubscriberRecord::new(addr(2), 3)];
        let expected = merkle::root_of(&[first, batch[0]]);

        assert!(ledger.append_checked(&batch, expected).is_ok());
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn test_leaf_set_tracks_committed_leaves() {
        let mut ledger = SubscriberLedger::with_leaf_set();
        let r = SubscriberRecord::new(addr(1), 5);
        ledger.append(r);
        ledger.append(r);

        let set = ledger.leaf_set().unwrap();
        assert_eq!(set.len(), 1);
        assert!(set.contains(&merkle::hash_leaf(&r)));
    }
}
