//! Metrics collection for observability
//!
//! # Metrics
//!
//! - `ledger_transactions_accepted_total` - Accepted transactions, by kind
//! - `ledger_transactions_rejected_total` - Rejected proposals, by reason
//! - `ledger_accounts_created_total` - Lazily created accounts
//! - `ledger_propose_duration_seconds` - Histogram of propose latencies

use crate::types::TxKind;
use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry};
use std::sync::Arc;

/// Metrics collector
///
/// Built against its own registry rather than the process-global one, so
/// multiple engines can coexist in a single test process.
#[derive(Clone)]
pub struct Metrics {
    /// Accepted transactions, labeled by kind
    pub accepted_total: IntCounterVec,

    /// Rejected proposals, labeled by reason
    pub rejected_total: IntCounterVec,

    /// Accounts lazily created
    pub accounts_created: IntCounter,

    /// Propose latency histogram
    pub propose_duration: Histogram,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl Metrics {
    /// Create new metrics collector
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let accepted_total = IntCounterVec::new(
            Opts::new(
                "ledger_transactions_accepted_total",
                "Accepted transactions by kind",
            ),
            &["kind"],
        )?;
        registry.register(Box::new(accepted_total.clone()))?;

        let rejected_total = IntCounterVec::new(
            Opts::new(
                "ledger_transactions_rejected_total",
                "Rejected proposals by reason",
            ),
            &["reason"],
        )?;
        registry.register(Box::new(rejected_total.clone()))?;

        let accounts_created = IntCounter::new(
            "ledger_accounts_created_total",
            "Accounts created on first access",
        )?;
        registry.register(Box::new(accounts_created.clone()))?;

        let propose_duration = Histogram::with_opts(
            HistogramOpts::new(
                "ledger_propose_duration_seconds",
                "Histogram of propose latencies",
            )
            .buckets(vec![0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0]),
        )?;
        registry.register(Box::new(propose_duration.clone()))?;

        Ok(Self {
            accepted_total,
            rejected_total,
            accounts_created,
            propose_duration,
            registry,
        })
    }

    /// Record an accepted transaction
    pub fn record_accepted(&self, kind: TxKind) {
        self.accepted_total.with_label_values(&[kind.as_str()]).inc();
    }

    /// Record a rejected proposal
    pub fn record_rejected(&self, reason: &str) {
        self.rejected_total.with_label_values(&[reason]).inc();
    }

    /// Record a lazily created account
    pub fn record_account_created(&self) {
        self.accounts_created.inc();
    }

    /// Record propose latency
    pub fn record_propose_duration(&self, duration_seconds: f64) {
        self.propose_duration.observe(duration_seconds);
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new().expect("Failed to create metrics")
    }
}
