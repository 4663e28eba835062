//! Application state for Axum handlers.

use axum::async_trait;
use metrics_exporter_prometheus::PrometheusHandle;
use order_engine_core::environment::{Clock, IdGenerator};
use order_engine_core::store::CommerceStore;
use order_engine_postgres::PostgresCommerceStore;
use order_engine_runtime::{
    CartService, OrderService, OrderServiceConfig, PaymentEventHandler, StockService,
};
use std::sync::Arc;

/// Dependency probe behind `GET /ready`.
#[async_trait]
pub trait ReadinessCheck: Send + Sync {
    /// Succeeds when the dependency can serve requests.
    async fn check(&self) -> Result<(), String>;
}

#[async_trait]
impl ReadinessCheck for PostgresCommerceStore {
    async fn check(&self) -> Result<(), String> {
        self.ping().await.map_err(|e| e.to_string())
    }
}

/// Application state shared across all HTTP handlers.
///
/// Cloned per request; every field is reference counted.
#[derive(Clone)]
pub struct AppState {
    /// Order placement, lookup and lifecycle
    pub orders: OrderService,
    /// Cart mutation
    pub carts: CartService,
    /// Payment outcome intake
    pub payments: PaymentEventHandler,
    /// Product lookup and stock administration
    pub stock: StockService,
    /// Readiness probe for the backing store
    pub readiness: Arc<dyn ReadinessCheck>,
    /// Prometheus recorder, when one is installed
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Wire every service over `store`.
    #[must_use]
    pub fn new(
        store: Arc<dyn CommerceStore>,
        ids: Arc<dyn IdGenerator>,
        clock: Arc<dyn Clock>,
        config: OrderServiceConfig,
        readiness: Arc<dyn ReadinessCheck>,
    ) -> Self {
        let orders = OrderService::new(
            Arc::clone(&store),
            Arc::clone(&ids),
            Arc::clone(&clock),
            config,
        );
        let payments = PaymentEventHandler::new(orders.order_store().clone());
        let stock = StockService::new(Arc::clone(&store));
        let carts = CartService::new(store, ids, clock);
        Self {
            orders,
            carts,
            payments,
            stock,
            readiness,
            metrics: None,
        }
    }

    /// Serve `handle` on `GET /metrics`.
    #[must_use]
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_is_clone() {
        fn assert_clone<T: Clone + Send + Sync + 'static>() {}
        assert_clone::<AppState>();
    }
}
