//! Metrics collection for observability
//!
//! Prometheus metrics for both domains, kept in a registry owned by the
//! collector so several domains can live in one process.
//!
//! # Metrics
//!
//! - `subledger_records_appended_total` - Records committed to the log
//! - `subledger_recompute_duration_seconds` - Full tree rebuild latency
//! - `subledger_ledger_length` - Current log length
//! - `subledger_relays_total` - Relays accepted by the bridge
//! - `subledger_relay_failures_total` - Relays the bridge refused
//! - `subledger_inbound_stored_total` - Relayed commitments stored
//! - `subledger_inbound_rejected_total` - Inbound messages refused
//! - `subledger_replays_accepted_total` - Bulk replays committed
//! - `subledger_replays_rejected_total` - Bulk replays discarded

use prometheus::{Histogram, HistogramOpts, IntCounter, IntGauge, Opts, Registry};
use std::fmt;
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Records appended
    pub records_appended: IntCounter,

    /// Recompute duration histogram
    pub recompute_duration: Histogram,

    /// Ledger length
    pub ledger_length: IntGauge,

    /// Relays sent
    pub relays_total: IntCounter,

    /// Relays refused
    pub relay_failures: IntCounter,

    /// Relayed commitments stored
    pub inbound_stored: IntCounter,

    /// Inbound messages refused
    pub inbound_rejected: IntCounter,

    /// Bulk replays accepted
    pub replays_accepted: IntCounter,

    /// Bulk replays rejected
    pub replays_rejected: IntCounter,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

fn opts(name: &str, help: &str, domain: Option<&str>) -> Opts {
    let opts = Opts::new(name, help);
    match domain {
        Some(domain) => opts.const_label("domain", domain),
        None => opts,
    }
}

fn counter(registry: &Registry, opts: Opts) -> prometheus::Result<IntCounter> {
    let counter = IntCounter::with_opts(opts)?;
    registry.register(Box::new(counter.clone()))?;
    Ok(counter)
}

impl Metrics {
    /// Create new metrics collector
    pub fn new() -> prometheus::Result<Self> {
        Self::build(None)
    }

    /// Create a collector whose series carry a `domain` label
    ///
    /// Each domain in a process gets its own collector, so one ledger's length
    /// and append counts never mix with another's.
    pub fn for_domain(domain: &str) -> prometheus::Result<Self> {
        Self::build(Some(domain))
    }

    fn build(domain: Option<&str>) -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let records_appended = counter(
            &registry,
            opts(
                "subledger_records_appended_total",
                "Records committed to the subscriber log",
                domain,
            ),
        )?;

        let mut histogram_opts = HistogramOpts::new(
            "subledger_recompute_duration_seconds",
            "Full Merkle rebuild latency",
        )
        .buckets(vec![0.000_01, 0.000_1, 0.001, 0.005, 0.010, 0.050, 0.100, 0.500, 1.0]);
        if let Some(domain) = domain {
            histogram_opts = histogram_opts.const_label("domain", domain);
        }
        let recompute_duration = Histogram::with_opts(histogram_opts)?;
        registry.register(Box::new(recompute_duration.clone()))?;

        let ledger_length = IntGauge::with_opts(opts("subledger_ledger_length", "Current log length", domain))?;
        registry.register(Box::new(ledger_length.clone()))?;

        let relays_total = counter(
            &registry,
            opts("subledger_relays_total", "Relays accepted by the bridge", domain),
        )?;
        let relay_failures = counter(
            &registry,
            opts("subledger_relay_failures_total", "Relays refused by the bridge", domain),
        )?;
        let inbound_stored = counter(
            &registry,
            opts("subledger_inbound_stored_total", "Relayed commitments stored", domain),
        )?;
        let inbound_rejected = counter(
            &registry,
            opts("subledger_inbound_rejected_total", "Inbound messages refused", domain),
        )?;
        let replays_accepted = counter(
            &registry,
            opts("subledger_replays_accepted_total", "Bulk replays committed", domain),
        )?;
        let replays_rejected = counter(
            &registry,
            opts("subledger_replays_rejected_total", "Bulk replays discarded", domain),
        )?;

        Ok(Self {
            records_appended,
            recompute_duration,
            ledger_length,
            relays_total,
            relay_failures,
            inbound_stored,
            inbound_rejected,
            replays_accepted,
            replays_rejected,
            registry,
        })
    }

    /// Record committed records
    pub fn record_appended(&self, count: usize) {
        self.records_appended.inc_by(count as u64);
    }

    /// Record a tree rebuild
    pub fn record_recompute(&self, duration_seconds: f64) {
        self.recompute_duration.observe(duration_seconds);
    }

    /// Update ledger length
    pub fn set_ledger_len(&self, len: usize) {
        self.ledger_length.set(len as i64);
    }

    /// Record a relay outcome
    pub fn record_relay(&self, accepted: bool) {
        if accepted {
            self.relays_total.inc();
        } else {
            self.relay_failures.inc();
        }
    }

    /// Record an inbound message outcome
    pub fn record_inbound(&self, stored: bool) {
        if stored {
            self.inbound_stored.inc();
        } else {
            self.inbound_rejected.inc();
        }
    }

    /// Record a bulk replay outcome
    pub fn record_replay(&self, accepted: bool) {
        if accepted {
            self.replays_accepted.inc();
        } else {
            self.replays_rejected.inc();
        }
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

impl fmt::Debug for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Metrics")
            .field("records_appended", &self.records_appended.get())
            .field("ledger_length", &self.ledger_length.get())
            .finish_non_exhaustive()
    }
}
