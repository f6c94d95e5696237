//! Metrics collection for manager monitoring.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use custodian_common::CustodianError;

/// Manager metrics.
#[derive(Debug)]
pub struct Metrics {
    /// Assets deposited into custody.
    pub deposits: AtomicU64,
    /// Liquidations started.
    pub liquidations_started: AtomicU64,
    /// Assets sold through the exchange.
    pub exchange_sales: AtomicU64,
    /// Assets disposed of through the vault.
    pub vault_sales: AtomicU64,
    /// Window length changes.
    pub window_changes: AtomicU64,
    /// Calls refused by a local guard.
    pub calls_rejected: AtomicU64,
    /// Calls refused by an external collaborator.
    pub delegated_failures: AtomicU64,
    /// Assets currently in custody.
    pub assets_held: AtomicU64,
}

impl Metrics {
    /// Create new metrics instance.
    pub fn new() -> Self {
        Self {
            deposits: AtomicU64::new(0),
            liquidations_started: AtomicU64::new(0),
            exchange_sales: AtomicU64::new(0),
            vault_sales: AtomicU64::new(0),
            window_changes: AtomicU64::new(0),
            calls_rejected: AtomicU64::new(0),
            delegated_failures: AtomicU64::new(0),
            assets_held: AtomicU64::new(0),
        }
    }

    pub fn deposit(&self) {
        self.deposits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn liquidation_started(&self) {
        self.liquidations_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn exchange_sale(&self) {
        self.exchange_sales.fetch_add(1, Ordering::Relaxed);
    }

    pub fn vault_sale(&self) {
        self.vault_sales.fetch_add(1, Ordering::Relaxed);
    }

    pub fn window_changed(&self) {
        self.window_changes.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed call, split by where it failed.
    pub fn call_failed(&self, error: &CustodianError) {
        match error {
            CustodianError::DelegatedFailure { .. } => {
                self.delegated_failures.fetch_add(1, Ordering::Relaxed);
            }
            _ => {
                self.calls_rejected.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Set assets held count.
    pub fn set_assets_held(&self, count: u64) {
        self.assets_held.store(count, Ordering::Relaxed);
    }

    /// Get current metrics snapshot.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            deposits: self.deposits.load(Ordering::Relaxed),
            liquidations_started: self.liquidations_started.load(Ordering::Relaxed),
            exchange_sales: self.exchange_sales.load(Ordering::Relaxed),
            vault_sales: self.vault_sales.load(Ordering::Relaxed),
            window_changes: self.window_changes.load(Ordering::Relaxed),
            calls_rejected: self.calls_rejected.load(Ordering::Relaxed),
            delegated_failures: self.delegated_failures.load(Ordering::Relaxed),
            assets_held: self.assets_held.load(Ordering::Relaxed),
        }
    }

    /// Export metrics in Prometheus format.
    pub fn to_prometheus(&self) -> String {
        let snapshot = self.snapshot();
        let series = [
            ("deposits_total", "counter", "Assets deposited into custody", snapshot.deposits),
            (
                "liquidations_started_total",
                "counter",
                "Liquidations started",
                snapshot.liquidations_started,
            ),
            (
                "exchange_sales_total",
                "counter",
                "Assets sold through the exchange",
                snapshot.exchange_sales,
            ),
            (
                "vault_sales_total",
                "counter",
                "Assets disposed of through the vault",
                snapshot.vault_sales,
            ),
            (
                "window_changes_total",
                "counter",
                "Auction window changes",
                snapshot.window_changes,
            ),
            (
                "calls_rejected_total",
                "counter",
                "Calls refused by a local guard",
                snapshot.calls_rejected,
            ),
            (
                "delegated_failures_total",
                "counter",
                "Calls refused by an external collaborator",
                snapshot.delegated_failures,
            ),
            ("assets_held", "gauge", "Assets currently in custody", snapshot.assets_held),
        ];

        let mut out = String::new();
        for (name, kind, help, value) in series {
            out.push_str(&format!(
                "# HELP custodian_{name} {help}\n# TYPE custodian_{name} {kind}\ncustodian_{name} {value}\n\n"
            ));
        }
        out
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of metrics at a point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub deposits: u64,
    pub liquidations_started: u64,
    pub exchange_sales: u64,
    pub vault_sales: u64,
    pub window_changes: u64,
    pub calls_rejected: u64,
    pub delegated_failures: u64,
    pub assets_held: u64,
}

/// Shared metrics instance.
pub type SharedMetrics = Arc<Metrics>;

#[cfg(test)]
mod tests {
    use super::*;
    use custodian_common::{Collaborator, Rejection};

    #[test]
    fn test_failures_split_by_origin() {
        let metrics = Metrics::new();
        metrics.call_failed(&CustodianError::ReentrantCall);
        metrics.call_failed(&CustodianError::delegated(
            Collaborator::Exchange,
            Rejection::new("bad signature"),
        ));

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.calls_rejected, 1);
        assert_eq!(snapshot.delegated_failures, 1);
    }

    #[test]
    fn test_prometheus_export() {
        let metrics = Metrics::new();
        metrics.deposit();
        metrics.set_assets_held(1);

        let output = metrics.to_prometheus();
        assert!(output.contains("custodian_deposits_total 1"));
        assert!(output.contains("# TYPE custodian_assets_held gauge"));
    }
}
