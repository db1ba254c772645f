//! Request metrics for the JSON-RPC endpoint.
//!
//! Exposed in Prometheus text format on `/metrics`, together with the
//! filter registry counters.

use crate::service::FilterStatsSnapshot;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// JSON-RPC request metrics
#[derive(Debug, Default)]
pub struct RpcMetrics {
    pub requests_total: AtomicU64,
    pub requests_success: AtomicU64,
    pub requests_error: AtomicU64,
    pub batches_total: AtomicU64,

    // Latency tracking (simplified - in production use histograms)
    pub total_latency_ms: AtomicU64,
    pub request_count_for_latency: AtomicU64,
}

impl RpcMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one JSON-RPC call
    pub fn record_request(&self, success: bool, latency_ms: u64) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
        if success {
            self.requests_success.fetch_add(1, Ordering::Relaxed);
        } else {
            self.requests_error.fetch_add(1, Ordering::Relaxed);
        }
        self.total_latency_ms
            .fetch_add(latency_ms, Ordering::Relaxed);
        self.request_count_for_latency
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_batch(&self) {
        self.batches_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Get average latency in ms
    pub fn average_latency_ms(&self) -> f64 {
        let total = self.total_latency_ms.load(Ordering::Relaxed);
        let count = self.request_count_for_latency.load(Ordering::Relaxed);
        if count == 0 {
            0.0
        } else {
            total as f64 / count as f64
        }
    }

    /// Export metrics in Prometheus text format
    pub fn to_prometheus(&self, filters: &FilterStatsSnapshot) -> String {
        let counters = [
            (
                "log_filters_rpc_requests_total",
                "Total number of JSON-RPC calls",
                "counter",
                self.requests_total.load(Ordering::Relaxed),
            ),
            (
                "log_filters_rpc_requests_success_total",
                "Successful JSON-RPC calls",
                "counter",
                self.requests_success.load(Ordering::Relaxed),
            ),
            (
                "log_filters_rpc_requests_error_total",
                "Failed JSON-RPC calls",
                "counter",
                self.requests_error.load(Ordering::Relaxed),
            ),
            (
                "log_filters_rpc_batches_total",
                "Batch requests received",
                "counter",
                self.batches_total.load(Ordering::Relaxed),
            ),
            (
                "log_filters_active",
                "Installed filters",
                "gauge",
                filters.active as u64,
            ),
            (
                "log_filters_created_total",
                "Filters created",
                "counter",
                filters.created,
            ),
            (
                "log_filters_uninstalled_total",
                "Filters uninstalled",
                "counter",
                filters.uninstalled,
            ),
            (
                "log_filters_expired_total",
                "Filters removed after the idle TTL",
                "counter",
                filters.expired,
            ),
            (
                "log_filters_polls_total",
                "eth_getFilterChanges calls served",
                "counter",
                filters.polls,
            ),
            (
                "log_filters_logs_delivered_total",
                "Logs returned by eth_getFilterChanges",
                "counter",
                filters.logs_delivered,
            ),
        ];

        let mut output = String::new();
        for (name, help, kind, value) in counters {
            output.push_str(&format!(
                "# HELP {name} {help}\n# TYPE {name} {kind}\n{name} {value}\n"
            ));
        }

        output.push_str(&format!(
            "# HELP log_filters_rpc_average_latency_ms Average request latency\n\
             # TYPE log_filters_rpc_average_latency_ms gauge\n\
             log_filters_rpc_average_latency_ms {:.2}\n",
            self.average_latency_ms()
        ));

        output
    }
}

/// Request timer for latency tracking
pub struct RequestTimer {
    start: Instant,
    metrics: Arc<RpcMetrics>,
}

impl RequestTimer {
    pub fn new(metrics: Arc<RpcMetrics>) -> Self {
        Self {
            start: Instant::now(),
            metrics,
        }
    }

    pub fn finish(self, success: bool) {
        let latency_ms = self.start.elapsed().as_millis() as u64;
        self.metrics.record_request(success, latency_ms);
    }
}
