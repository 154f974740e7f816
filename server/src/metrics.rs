//! Metrics collection for server monitoring.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Server metrics.
pub struct Metrics {
    /// Transactions created.
    pub transactions_created: AtomicU64,
    /// Signer approvals accepted.
    pub signatures_added: AtomicU64,
    /// Notary signatures accepted.
    pub notary_signatures_added: AtomicU64,
    /// Transactions completed.
    pub transactions_completed: AtomicU64,
    /// Total HTTP requests served.
    pub requests_total: AtomicU64,
    /// Requests answered with a 4xx status.
    pub requests_rejected: AtomicU64,
    /// Requests answered with a 5xx status.
    pub requests_failed: AtomicU64,
}

impl Metrics {
    /// Create new metrics instance.
    pub fn new() -> Self {
        Self {
            transactions_created: AtomicU64::new(0),
            signatures_added: AtomicU64::new(0),
            notary_signatures_added: AtomicU64::new(0),
            transactions_completed: AtomicU64::new(0),
            requests_total: AtomicU64::new(0),
            requests_rejected: AtomicU64::new(0),
            requests_failed: AtomicU64::new(0),
        }
    }

    /// Increment transactions created.
    pub fn transaction_created(&self) {
        self.transactions_created.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment signatures added.
    pub fn signature_added(&self) {
        self.signatures_added.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment notary signatures added.
    pub fn notary_signature_added(&self) {
        self.notary_signatures_added.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment transactions completed.
    pub fn transaction_completed(&self) {
        self.transactions_completed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a served request by its status code.
    pub fn request_served(&self, status: u16) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
        match status {
            400..=499 => {
                self.requests_rejected.fetch_add(1, Ordering::Relaxed);
            }
            500..=599 => {
                self.requests_failed.fetch_add(1, Ordering::Relaxed);
            }
            _ => {}
        }
    }

    /// Get current metrics snapshot.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            transactions_created: self.transactions_created.load(Ordering::Relaxed),
            signatures_added: self.signatures_added.load(Ordering::Relaxed),
            notary_signatures_added: self.notary_signatures_added.load(Ordering::Relaxed),
            transactions_completed: self.transactions_completed.load(Ordering::Relaxed),
            requests_total: self.requests_total.load(Ordering::Relaxed),
            requests_rejected: self.requests_rejected.load(Ordering::Relaxed),
            requests_failed: self.requests_failed.load(Ordering::Relaxed),
        }
    }

    /// Export metrics in Prometheus format. `transactions_held` is the
    /// ledger's current record count.
    pub fn to_prometheus(&self, transactions_held: usize) -> String {
        let snapshot = self.snapshot();
        format!(
            r#"# HELP zkbank_transactions_created Total transactions created
# TYPE zkbank_transactions_created counter
zkbank_transactions_created {}

# HELP zkbank_signatures_added Total signer approvals accepted
# TYPE zkbank_signatures_added counter
zkbank_signatures_added {}

# HELP zkbank_notary_signatures_added Total notary signatures accepted
# TYPE zkbank_notary_signatures_added counter
zkbank_notary_signatures_added {}

# HELP zkbank_transactions_completed Total transactions completed
# TYPE zkbank_transactions_completed counter
zkbank_transactions_completed {}

# HELP zkbank_transactions_held Transactions currently held in memory
# TYPE zkbank_transactions_held gauge
zkbank_transactions_held {}

# HELP zkbank_requests_total Total HTTP requests served
# TYPE zkbank_requests_total counter
zkbank_requests_total {}

# HELP zkbank_requests_rejected Total HTTP requests answered with 4xx
# TYPE zkbank_requests_rejected counter
zkbank_requests_rejected {}

# HELP zkbank_requests_failed Total HTTP requests answered with 5xx
# TYPE zkbank_requests_failed counter
zkbank_requests_failed {}
"#,
            snapshot.transactions_created,
            snapshot.signatures_added,
            snapshot.notary_signatures_added,
            snapshot.transactions_completed,
            transactions_held,
            snapshot.requests_total,
            snapshot.requests_rejected,
            snapshot.requests_failed,
        )
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of metrics at a point in time.
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub transactions_created: u64,
    pub signatures_added: u64,
    pub notary_signatures_added: u64,
    pub transactions_completed: u64,
    pub requests_total: u64,
    pub requests_rejected: u64,
    pub requests_failed: u64,
}

/// Shared metrics instance.
pub type SharedMetrics = Arc<Metrics>;
