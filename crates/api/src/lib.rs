//! Shopping cart HTTP service.
//!
//! Exposes cart creation, item addition and checkout over REST, with
//! structured logging (tracing) and Prometheus metrics. Checkout is
//! delegated to [`checkout::CheckoutCoordinator`].

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use broker::MessageBroker;
use cart_store::CartStore;
use checkout::{CheckoutCoordinator, PaymentAuthorizer};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::carts::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/shopping-cart", post(routes::carts::create))
        .route("/shopping-carts/{id}", get(routes::carts::get))
        .route("/shopping-carts/{id}/addItem", post(routes::carts::add_item))
        .route("/shopping-carts/{id}/checkout", post(routes::carts::checkout))
        .with_state(state)
        .merge(metrics_router)
        .fallback(routes::carts::not_found)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Wires the cart store, payment authorizer and broker into the
/// application state, publishing orders to `orders_queue`.
pub fn create_state(
    carts: Arc<dyn CartStore>,
    payments: Arc<dyn PaymentAuthorizer>,
    broker: Arc<dyn MessageBroker>,
    orders_queue: &str,
) -> Arc<AppState> {
    let checkout = CheckoutCoordinator::new(Arc::clone(&carts), payments, broker)
        .with_queue(orders_queue);

    Arc::new(AppState {
        carts,
        checkout: Arc::new(checkout),
    })
}
