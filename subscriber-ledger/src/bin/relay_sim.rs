//! Relay simulation binary
//!
//! Runs both domains in one process over an in-memory bridge: a handful of
//! streams open and change on the source, the commitment is relayed, and the
//! mirror is brought up to date by replaying the source log.
//!
//! Usage: `relay-sim [CONFIG.toml]` (falls back to `SUBLEDGER_*` variables)

use anyhow::Context;
use bytes::Bytes;
use std::sync::Arc;
use subscriber_ledger::{
    actor::{spawn_mirror_actor, spawn_source_actor},
    flow::{FlowEvent, FlowEventKind, InMemoryFlowRates},
    metrics::Metrics,
    Address, Config, MirrorLedger, SourceDomain,
};
use xdomain_bus::InMemoryBridge;

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => Config::from_file(&path).with_context(|| format!("loading {}", path))?,
        None => Config::from_env().context("loading config from environment")?,
    };

    init_tracing(config.json_logs);
    tracing::info!(
        service = %config.service_name,
        version = %config.service_version,
        origin = %config.source.origin_domain,
        mirror = %config.mirror.domain,
        "Starting relay simulation"
    );

    let source_metrics = Metrics::for_domain("source").context("registering source metrics")?;
    let mirror_metrics = Metrics::for_domain("mirror").context("registering mirror metrics")?;
    let rates = Arc::new(InMemoryFlowRates::new());
    let bridge = Arc::new(
        InMemoryBridge::new(config.source.origin_domain).with_supported_asset(config.source.accepted_asset),
    );

    let source = spawn_source_actor(
        SourceDomain::new(&config.source, rates.clone(), bridge.clone()).with_metrics(source_metrics.clone()),
    );
    let mirror = spawn_mirror_actor(MirrorLedger::new(&config.mirror).with_metrics(mirror_metrics.clone()));

    // Streams opening, changing, and closing on the source domain
    let asset = config.source.streaming_asset;
    let receiver = config.source.address;
    let schedule = [
        (FlowEventKind::Created, Address::repeat_byte(0xa1), 5),
        (FlowEventKind::Created, Address::repeat_byte(0xb0), 3),
        (FlowEventKind::Updated, Address::repeat_byte(0xa1), 7),
        (FlowEventKind::Created, Address::repeat_byte(0xc2), 11),
        (FlowEventKind::Deleted, Address::repeat_byte(0xb0), 0),
    ];

    for (kind, subscriber, rate) in schedule {
        rates.set_rate(asset, subscriber, receiver, rate);
        let event = FlowEvent {
            kind,
            asset,
            counterparty: subscriber,
            context: Bytes::from_static(b"relay-sim"),
        };
        source.flow_event(event).await?;
    }
    source.deposit_streaming(1_000).await?;

    let receipt = source
        .relay(
            config.mirror.domain,
            config.mirror.address,
            u128::from(config.relay.relayer_fee),
        )
        .await?;
    tracing::info!(transfer_id = %receipt.transfer_id, amount = receipt.amount, "Relay accepted");

    // Deliver whatever the bridge is carrying
    for envelope in bridge.take_in_flight() {
        if let Err(e) = mirror.deliver(envelope.to_inbound()).await {
            tracing::warn!("Delivery of {} failed: {}", envelope.transfer_id, e);
        }
    }

    let records = source.records().await?;
    match mirror.replace_bulk(records).await {
        Ok(commitment) => tracing::info!(%commitment, "Mirror caught up with source"),
        Err(e) => tracing::warn!("Mirror replay rejected: {}", e),
    }

    let snapshot = mirror.snapshot().await?;
    tracing::info!(
        records = snapshot.len,
        commitment = %snapshot.commitment,
        relayed = %snapshot.relayed,
        source = %source.commitment().await?,
        "Simulation finished"
    );

    tracing::info!(
        appended = source_metrics.records_appended.get(),
        ledger_length = source_metrics.ledger_length.get(),
        relays = source_metrics.relays_total.get(),
        relay_failures = source_metrics.relay_failures.get(),
        "Source metrics"
    );
    tracing::info!(
        appended = mirror_metrics.records_appended.get(),
        ledger_length = mirror_metrics.ledger_length.get(),
        inbound_stored = mirror_metrics.inbound_stored.get(),
        replays_accepted = mirror_metrics.replays_accepted.get(),
        replays_rejected = mirror_metrics.replays_rejected.get(),
        "Mirror metrics"
    );

    source.shutdown().await?;
    mirror.shutdown().await?;
    Ok(())
}
