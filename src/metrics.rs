//! Metrics collection for observability
//!
//! Prometheus collectors on a private registry:
//!
//! - `bank_transactions_applied_total` - Transactions applied successfully
//! - `bank_transactions_rejected_total` - Transactions rejected with a transaction error
//! - `bank_apply_duration_seconds` - Histogram of apply latencies
//! - `bank_accounts_total` - Current number of accounts

use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, IntGauge, Registry, TextEncoder};
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Transactions applied successfully
    pub transactions_applied: IntCounter,

    /// Transactions rejected with a transaction error
    pub transactions_rejected: IntCounter,

    /// Apply duration histogram
    pub apply_duration: Histogram,

    /// Current number of accounts
    pub accounts: IntGauge,

    registry: Arc<Registry>,
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics").finish_non_exhaustive()
    }
}

impl Metrics {
    /// Create a new collector with its own registry
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let transactions_applied = IntCounter::new(
            "bank_transactions_applied_total",
            "Transactions applied successfully",
        )?;
        registry.register(Box::new(transactions_applied.clone()))?;

        let transactions_rejected = IntCounter::new(
            "bank_transactions_rejected_total",
            "Transactions rejected with a transaction error",
        )?;
        registry.register(Box::new(transactions_rejected.clone()))?;

        let apply_duration = Histogram::with_opts(
            HistogramOpts::new("bank_apply_duration_seconds", "Histogram of apply latencies")
                .buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.010, 0.025, 0.050, 0.100]),
        )?;
        registry.register(Box::new(apply_duration.clone()))?;

        let accounts = IntGauge::new("bank_accounts_total", "Current number of accounts")?;
        registry.register(Box::new(accounts.clone()))?;

        Ok(Self {
            transactions_applied,
            transactions_rejected,
            apply_duration,
            accounts,
            registry,
        })
    }

    /// Record one apply outcome and its duration
    pub fn record_apply(&self, succeeded: bool, duration_seconds: f64) {
        if succeeded {
            self.transactions_applied.inc();
        } else {
            self.transactions_rejected.inc();
        }
        self.apply_duration.observe(duration_seconds);
    }

    /// Update the account-count gauge
    pub fn set_account_count(&self, count: usize) {
        self.accounts.set(count as i64);
    }

    /// Render the registry in the Prometheus text format
    pub fn encode(&self) -> prometheus::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer).unwrap_or_default())
    }
}
