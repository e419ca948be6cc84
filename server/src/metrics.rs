//! Request counters for service monitoring.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use currencies_common::ErrorKind;

/// Which endpoint a request hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Rates,
    Exchange,
}

/// Service metrics.
#[derive(Debug)]
pub struct Metrics {
    /// Total `/rates` requests.
    pub rates_requests: AtomicU64,
    /// Total `/exchange` requests.
    pub exchange_requests: AtomicU64,
    /// Requests answered with a result.
    pub requests_success: AtomicU64,
    /// Requests rejected for bad input.
    pub requests_rejected: AtomicU64,
    /// Requests failed because the provider failed.
    pub upstream_failures: AtomicU64,
    /// Cross-rate rows served.
    pub cross_rates_served: AtomicU64,
}

impl Metrics {
    /// Create new metrics instance.
    pub fn new() -> Self {
        Self {
            rates_requests: AtomicU64::new(0),
            exchange_requests: AtomicU64::new(0),
            requests_success: AtomicU64::new(0),
            requests_rejected: AtomicU64::new(0),
            upstream_failures: AtomicU64::new(0),
            cross_rates_served: AtomicU64::new(0),
        }
    }

    /// Count an incoming request.
    pub fn request_received(&self, endpoint: Endpoint) {
        let counter = match endpoint {
            Endpoint::Rates => &self.rates_requests,
            Endpoint::Exchange => &self.exchange_requests,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a successful `/rates` response of `rows` rows.
    pub fn rates_served(&self, rows: usize) {
        self.requests_success.fetch_add(1, Ordering::Relaxed);
        self.cross_rates_served
            .fetch_add(rows as u64, Ordering::Relaxed);
    }

    /// Record a successful `/exchange` response.
    pub fn conversion_served(&self) {
        self.requests_success.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed request.
    pub fn request_failed(&self, kind: ErrorKind) {
        let counter = match kind {
            ErrorKind::BadRequest => &self.requests_rejected,
            ErrorKind::UpstreamFailure => &self.upstream_failures,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current metrics snapshot.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            rates_requests: self.rates_requests.load(Ordering::Relaxed),
            exchange_requests: self.exchange_requests.load(Ordering::Relaxed),
            requests_success: self.requests_success.load(Ordering::Relaxed),
            requests_rejected: self.requests_rejected.load(Ordering::Relaxed),
            upstream_failures: self.upstream_failures.load(Ordering::Relaxed),
            cross_rates_served: self.cross_rates_served.load(Ordering::Relaxed),
        }
    }

    /// Export metrics in Prometheus format.
    pub fn to_prometheus(&self) -> String {
        let snapshot = self.snapshot();
        format!(
            r#"# HELP currencies_rates_requests_total Total /rates requests
# TYPE currencies_rates_requests_total counter
currencies_rates_requests_total {}

# HELP currencies_exchange_requests_total Total /exchange requests
# TYPE currencies_exchange_requests_total counter
currencies_exchange_requests_total {}

# HELP currencies_requests_success_total Requests answered with a result
# TYPE currencies_requests_success_total counter
currencies_requests_success_total {}

# HELP currencies_requests_rejected_total Requests rejected for bad input
# TYPE currencies_requests_rejected_total counter
currencies_requests_rejected_total {}

# HELP currencies_upstream_failures_total Requests failed by the rate provider
# TYPE currencies_upstream_failures_total counter
currencies_upstream_failures_total {}

# HELP currencies_cross_rates_served_total Cross-rate rows returned
# TYPE currencies_cross_rates_served_total counter
currencies_cross_rates_served_total {}
"#,
            snapshot.rates_requests,
            snapshot.exchange_requests,
            snapshot.requests_success,
            snapshot.requests_rejected,
            snapshot.upstream_failures,
            snapshot.cross_rates_served,
        )
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of metrics at a point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub rates_requests: u64,
    pub exchange_requests: u64,
    pub requests_success: u64,
    pub requests_rejected: u64,
    pub upstream_failures: u64,
    pub cross_rates_served: u64,
}

/// Shared metrics instance.
pub type SharedMetrics = Arc<Metrics>;
