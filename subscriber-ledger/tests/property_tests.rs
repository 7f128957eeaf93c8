//! Property-based tests for ledger invariants
//!
//! These tests use proptest to verify:
//! - Determinism: same record sequence → same root
//! - Commitment integrity: every append leaves `commitment == root(records)`
//! - Replay atomicity: a rejected replay changes nothing on the mirror
//! - Mirror convergence: replaying the relayed log reproduces the source root

use proptest::prelude::*;
use std::sync::Arc;
use subscriber_ledger::{
    config::{MirrorConfig, SourceConfig},
    flow::{FlowEvent, FlowEventKind, InMemoryFlowRates},
    merkle, Address, Commitment, Error, FlowRate, MirrorLedger, SourceDomain, SubscriberLedger,
    SubscriberRecord,
};
use xdomain_bus::InMemoryBridge;

/// Strategy for generating identities from a small pool, so repeats happen
fn identity_strategy() -> impl Strategy<Value = Address> {
    (0u8..8).prop_map(Address::repeat_byte)
}

/// Strategy for generating flow rates, including zero and negatives
fn rate_strategy() -> impl Strategy<Value = FlowRate> {
    prop_oneof![
        Just(FlowRate::ZERO),
        (1i128..1_000_000).prop_map(FlowRate),
        (-1_000i128..0).prop_map(FlowRate),
        any::<i128>().prop_map(FlowRate),
    ]
}

/// Strategy for generating records
fn record_strategy() -> impl Strategy<Value = SubscriberRecord> {
    (identity_strategy(), rate_strategy()).prop_map(|(identity, rate)| SubscriberRecord::new(identity, rate))
}

fn records_strategy(max: usize) -> impl Strategy<Value = Vec<SubscriberRecord>> {
    prop::collection::vec(record_strategy(), 0..max)
}

fn ledger_of(records: &[SubscriberRecord]) -> SubscriberLedger {
    let mut ledger = SubscriberLedger::new();
    for record in records {
        ledger.append(*record);
    }
    ledger
}

fn mirror_with(relayed: Commitment) -> MirrorLedger {
    MirrorLedger::new(&MirrorConfig {
        genesis_commitment: relayed,
        ..MirrorConfig::default()
    })
}

proptest! {
    /// Property: Two ledgers fed the same sequence agree on the root
    #[test]
    fn prop_deterministic_root(records in records_strategy(40)) {
        let a = ledger_of(&records);
        let b = ledger_of(&records);

        prop_assert_eq!(a.commitment(), b.commitment());
        prop_assert_eq!(a.commitment(), merkle::root_of(&records));
    }

    /// Property: Every append grows the log by one and recomputes the root
    #[test]
    fn prop_append_integrity(records in records_strategy(40)) {
        let mut ledger = SubscriberLedger::new();

        for (i, record) in records.iter().enumerate() {
            let committed = ledger.append(*record);

            prop_assert_eq!(ledger.len(), i + 1);
            prop_assert_eq!(committed, ledger.commitment());
            prop_assert_eq!(committed, merkle::root_of(&records[..=i]));
        }
    }

    /// Property: Changing any single record changes the root
    #[test]
    fn prop_root_binds_every_record(
        records in prop::collection::vec(record_strategy(), 1..30),
        index in any::<prop::sample::Index>(),
        bump in 1i128..1_000,
    ) {
        let i = index.index(records.len());
        let mut altered = records.clone();
        altered[i].flow_rate = FlowRate(altered[i].flow_rate.0.wrapping_add(bump));

        prop_assert_ne!(merkle::root_of(&records), merkle::root_of(&altered));
    }

    /// Property: Depth matches the number of halving rounds
    #[test]
    fn prop_tree_depth_bounds(n in 1usize..100_000) {
        let depth = merkle::tree_depth(n);
        prop_assert!(1usize << depth >= n);
        if depth > 0 {
            prop_assert!(1usize << (depth - 1) < n);
        }
    }

    /// Property: A replay that does not hash to the relayed commitment is rejected atomically
    #[test]
    fn prop_replay_atomicity(
        relayed in prop::collection::vec(record_strategy(), 1..20),
        submitted in records_strategy(20),
    ) {
        prop_assume!(merkle::root_of(&relayed) != merkle::root_of(&submitted));

        let mut mirror = mirror_with(merkle::root_of(&relayed));
        let before = mirror.snapshot();

        let result = mirror.replace_bulk(submitted);
        let is_mismatch = matches!(result, Err(Error::CommitmentMismatch { .. }));
        prop_assert!(is_mismatch);
        prop_assert_eq!(mirror.snapshot(), before);
        prop_assert!(mirror.ledger().is_empty());
    }

    /// Property: Replaying the source log reproduces the source root on the mirror
    #[test]
    fn prop_mirror_converges(events in prop::collection::vec((0u8..3, identity_strategy(), 1i128..500), 0..30)) {
        let runtime = tokio::runtime::Runtime::new().unwrap();

        runtime.block_on(async {
            let stream = Address::repeat_byte(0xee);
            let config = SourceConfig {
                address: Address::repeat_byte(0x50),
                streaming_asset: stream,
                ..SourceConfig::default()
            };
            let rates = Arc::new(InMemoryFlowRates::new());
            let bridge = Arc::new(InMemoryBridge::new(config.origin_domain));
            let mut source = SourceDomain::new(&config, rates.clone(), bridge.clone());

            for (kind, subscriber, rate) in &events {
                let kind = match kind {
                    0 => FlowEventKind::Created,
                    1 => FlowEventKind::Updated,
                    _ => FlowEventKind::Deleted,
                };
                rates.set_rate(stream, *subscriber, config.address, *rate);
                source.on_flow_event(FlowEvent::new(kind, stream, *subscriber)).unwrap();
            }

            source
                .relay(MirrorConfig::default().domain, Address::repeat_byte(0x60), 0)
                .await
                .unwrap();

            let mut mirror = MirrorLedger::new(&MirrorConfig::default());
            for envelope in bridge.take_in_flight() {
                mirror.on_message(&envelope.to_inbound()).unwrap();
            }

            let committed = mirror.replace_bulk(source.records().to_vec()).unwrap();
            assert_eq!(committed, source.commitment());
            assert_eq!(mirror.ledger().records(), source.records());
        });
    }
}

#[test]
fn test_tree_depth_matches_levels() {
    // One combining round per halving
    for (n, depth) in [(1, 0), (2, 1), (3, 2), (4, 2), (5, 3), (8, 3), (9, 4), (1024, 10), (1025, 11)] {
        assert_eq!(merkle::tree_depth(n), depth, "n = {}", n);
    }
}
