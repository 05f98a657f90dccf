//! Metrics collection for exchange monitoring.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;

use bondcurve_common::ExchangeError;

/// Exchange metrics.
#[derive(Debug, Default)]
pub struct ExchangeMetrics {
    /// Committed buys.
    pub buys: AtomicU64,
    /// Committed sales.
    pub sells: AtomicU64,
    /// Committed transfers, direct and delegated.
    pub transfers: AtomicU64,
    /// Committed approvals.
    pub approvals: AtomicU64,
    /// Committed seed mints.
    pub seed_mints: AtomicU64,
    /// Accepted deposits.
    pub deposits: AtomicU64,
    /// Rejected operations of any kind.
    pub rejections: AtomicU64,
    /// Sales undone because the payout failed.
    pub sales_rolled_back: AtomicU64,
    rejections_by_code: Mutex<BTreeMap<&'static str, u64>>,
}

impl ExchangeMetrics {
    /// Create new metrics instance.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn buy(&self) {
        self.buys.fetch_add(1, Ordering::Relaxed);
    }

    pub fn sell(&self) {
        self.sells.fetch_add(1, Ordering::Relaxed);
    }

    pub fn transfer(&self) {
        self.transfers.fetch_add(1, Ordering::Relaxed);
    }

    pub fn approval(&self) {
        self.approvals.fetch_add(1, Ordering::Relaxed);
    }

    pub fn seed_mint(&self) {
        self.seed_mints.fetch_add(1, Ordering::Relaxed);
    }

    pub fn deposit(&self) {
        self.deposits.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a rejected operation.
    pub fn rejected(&self, err: &ExchangeError) {
        self.rejections.fetch_add(1, Ordering::Relaxed);
        if matches!(err, ExchangeError::TransferFailed(_)) {
            self.sales_rolled_back.fetch_add(1, Ordering::Relaxed);
        }
        *self
            .rejections_by_code
            .lock()
            .entry(err.error_code())
            .or_insert(0) += 1;
    }

    /// Get current metrics snapshot.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            buys: self.buys.load(Ordering::Relaxed),
            sells: self.sells.load(Ordering::Relaxed),
            transfers: self.transfers.load(Ordering::Relaxed),
            approvals: self.approvals.load(Ordering::Relaxed),
            seed_mints: self.seed_mints.load(Ordering::Relaxed),
            deposits: self.deposits.load(Ordering::Relaxed),
            rejections: self.rejections.load(Ordering::Relaxed),
            sales_rolled_back: self.sales_rolled_back.load(Ordering::Relaxed),
            rejections_by_code: self.rejections_by_code.lock().clone(),
        }
    }

    /// Export metrics in Prometheus format.
    pub fn to_prometheus(&self) -> String {
        let snapshot = self.snapshot();
        let mut out = String::new();

        let counters = [
            ("buys_total", "Total committed buys", snapshot.buys),
            ("sells_total", "Total committed sales", snapshot.sells),
            ("transfers_total", "Total committed transfers", snapshot.transfers),
            ("approvals_total", "Total committed approvals", snapshot.approvals),
            ("seed_mints_total", "Total seed mints", snapshot.seed_mints),
            ("deposits_total", "Total accepted deposits", snapshot.deposits),
            ("rejections_total", "Total rejected operations", snapshot.rejections),
            (
                "sales_rolled_back_total",
                "Total sales undone by a failed payout",
                snapshot.sales_rolled_back,
            ),
        ];

        for (name, help, value) in counters {
            let _ = writeln!(out, "# HELP bondcurve_{} {}", name, help);
            let _ = writeln!(out, "# TYPE bondcurve_{} counter", name);
            let _ = writeln!(out, "bondcurve_{} {}", name, value);
            out.push('\n');
        }

        let _ = writeln!(
            out,
            "# HELP bondcurve_rejections_by_code_total Rejected operations by error code"
        );
        let _ = writeln!(out, "# TYPE bondcurve_rejections_by_code_total counter");
        for (code, count) in &snapshot.rejections_by_code {
            let _ = writeln!(
                out,
                "bondcurve_rejections_by_code_total{{code=\"{}\"}} {}",
                code, count
            );
        }

        out
    }
}

/// Snapshot of metrics at a point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub buys: u64,
    pub sells: u64,
    pub transfers: u64,
    pub approvals: u64,
    pub seed_mints: u64,
    pub deposits: u64,
    pub rejections: u64,
    pub sales_rolled_back: u64,
    pub rejections_by_code: BTreeMap<&'static str, u64>,
}

impl MetricsSnapshot {
    /// Committed stateful operations.
    pub fn committed(&self) -> u64 {
        self.buys + self.sells + self.transfers + self.approvals + self.seed_mints + self.deposits
    }
}

/// Shared metrics instance.
pub type SharedMetrics = Arc<ExchangeMetrics>;
