//! Prometheus metrics for order placement and lifecycle.
//!
//! This module provides metric collection for:
//! - Order placement outcomes and latency
//! - Reconciliation retries and exhaustion
//! - Status transitions and stock compensation
//!
//! # Example
//!
//! ```rust,no_run
//! use order_engine_runtime::metrics::MetricsServer;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut server = MetricsServer::new("0.0.0.0:9090".parse()?);
//! server.start()?;
//!
//! // The web layer serves `server.render()` at GET /metrics
//! # Ok(())
//! # }
//! ```

use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

// Re-export metrics macros for use in other modules
pub use metrics::{counter, histogram};

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Prometheus recorder handle.
///
/// Installs the global recorder and renders the scrape payload.
pub struct MetricsServer {
    addr: SocketAddr,
    handle: Option<PrometheusHandle>,
}

impl MetricsServer {
    /// Create a new metrics server.
    ///
    /// # Arguments
    ///
    /// * `addr` - Address the metrics are advertised on (logged only)
    #[must_use]
    pub const fn new(addr: SocketAddr) -> Self {
        Self { addr, handle: None }
    }

    /// Describe every metric and install the Prometheus recorder.
    ///
    /// # Errors
    ///
    /// Returns error if the exporter cannot be built or installed.
    ///
    /// # Note
    ///
    /// If a recorder is already installed (e.g., in tests), this logs a warning
    /// and leaves the handle empty.
    pub fn start(&mut self) -> Result<(), MetricsError> {
        register_metrics();

        let builder = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[
                    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
                ],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?;

        match builder.install_recorder() {
            Ok(handle) => {
                self.handle = Some(handle);
                tracing::info!(
                    addr = %self.addr,
                    "Metrics recorder installed - available at http://{}/metrics",
                    self.addr
                );
                Ok(())
            }
            Err(e) => {
                let err_msg = e.to_string();
                if err_msg.contains("already initialized") {
                    tracing::warn!("Metrics recorder already initialized, skipping re-initialization");
                    Ok(())
                } else {
                    Err(MetricsError::Install(err_msg))
                }
            }
        }
    }

    /// Get the metrics handle for rendering.
    #[must_use]
    pub const fn handle(&self) -> Option<&PrometheusHandle> {
        self.handle.as_ref()
    }

    /// Render current metrics in Prometheus format.
    ///
    /// Returns `None` if the recorder was not installed by this instance.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

/// Register all metric descriptions.
fn register_metrics() {
    // Placement
    describe_counter!("orders_placed_total", "Total number of orders placed");
    describe_counter!(
        "orders_rejected_total",
        "Total number of order placements rejected, by reason"
    );
    describe_histogram!(
        "order_placement_duration_seconds",
        "Time taken to place an order, from cart read to commit"
    );

    // Reconciliation
    describe_counter!(
        "reconciliation_retries_total",
        "Total number of reconciliation attempts retried after transient contention"
    );
    describe_counter!(
        "reconciliation_exhausted_total",
        "Total number of reconciliations that gave up"
    );

    // Lifecycle
    describe_counter!(
        "order_transitions_total",
        "Total number of accepted order status transitions, by event"
    );
    describe_counter!(
        "illegal_transitions_total",
        "Total number of rejected order status transitions"
    );
    describe_counter!(
        "stock_compensations_total",
        "Total number of cancellations that credited stock back"
    );

    // Stock administration
    describe_counter!(
        "stock_adjustments_total",
        "Total number of administrative stock adjustments, by action"
    );
    describe_counter!(
        "stock_withdrawals_refused_total",
        "Total number of administrative withdrawals refused for short stock"
    );
}

/// Placement metrics recorder.
pub struct PlacementMetrics;

impl PlacementMetrics {
    /// Record a placed order.
    pub fn record_placed(duration: Duration) {
        counter!("orders_placed_total").increment(1);
        histogram!("order_placement_duration_seconds").record(duration.as_secs_f64());
    }

    /// Record a rejected placement.
    pub fn record_rejected(reason: &'static str) {
        counter!("orders_rejected_total", "reason" => reason).increment(1);
    }
}

/// Reconciliation metrics recorder.
pub struct ReconciliationMetrics;

impl ReconciliationMetrics {
    /// Record a retried attempt.
    pub fn record_retry() {
        counter!("reconciliation_retries_total").increment(1);
    }

    /// Record exhausted retries or an expired deadline.
    pub fn record_exhausted() {
        counter!("reconciliation_exhausted_total").increment(1);
    }
}

/// Order lifecycle metrics recorder.
pub struct LifecycleMetrics;

impl LifecycleMetrics {
    /// Record an accepted transition.
    pub fn record_transition(event: &'static str) {
        counter!("order_transitions_total", "event" => event).increment(1);
    }

    /// Record a rejected transition.
    pub fn record_illegal() {
        counter!("illegal_transitions_total").increment(1);
    }

    /// Record a compensating stock credit.
    pub fn record_compensation() {
        counter!("stock_compensations_total").increment(1);
    }
}

/// Stock administration metrics recorder.
pub struct StockMetrics;

impl StockMetrics {
    /// Record an applied adjustment.
    pub fn record_adjustment(action: &'static str) {
        counter!("stock_adjustments_total", "action" => action).increment(1);
    }

    /// Record a refused withdrawal.
    pub fn record_refused() {
        counter!("stock_withdrawals_refused_total").increment(1);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_metrics_server_creation() {
        let addr = "127.0.0.1:0".parse().unwrap();
        let server = MetricsServer::new(addr);
        assert!(server.handle().is_none());
    }

    #[tokio::test]
    async fn test_metrics_server_render() {
        let addr = "127.0.0.1:0".parse().unwrap();
        let mut server = MetricsServer::new(addr);
        server.start().unwrap();

        PlacementMetrics::record_placed(Duration::from_millis(40));
        PlacementMetrics::record_rejected("insufficient_stock");
        ReconciliationMetrics::record_retry();
        LifecycleMetrics::record_transition("PaymentConfirmed");
        LifecycleMetrics::record_compensation();
        StockMetrics::record_adjustment("withdraw");

        // handle is None when another test installed the recorder first
        if let Some(rendered) = server.render() {
            assert!(rendered.contains("orders_placed_total"));
            assert!(rendered.contains("orders_rejected_total"));
            assert!(rendered.contains("reconciliation_retries_total"));
            assert!(rendered.contains("stock_compensations_total"));
        }
    }
}
