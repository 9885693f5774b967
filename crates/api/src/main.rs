//! Cart service entry point.

use std::sync::Arc;

use api::config::Config;
use broker::{JetStreamBroker, MessageBroker};
use cart_store::InMemoryCartStore;
use checkout::HttpPaymentAuthorizer;
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    // 1. Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Install Prometheus metrics recorder
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Connect to the broker and make sure the orders queue exists
    let broker = Arc::new(
        JetStreamBroker::connect(&config.broker_url)
            .await
            .expect("failed to connect to broker"),
    );
    broker
        .declare_queue(&config.orders_queue)
        .await
        .expect("failed to declare orders queue");

    // 4. Build the payment client and application state
    let payments = HttpPaymentAuthorizer::new(&config.authorizer_url, config.authorizer_timeout)
        .expect("failed to build payment authorizer client");
    tracing::info!(endpoint = payments.endpoint(), "using payment authorizer");

    let state = api::create_state(
        Arc::new(InMemoryCartStore::new()),
        Arc::new(payments),
        broker.clone() as Arc<dyn MessageBroker>,
        &config.orders_queue,
    );
    let app = api::create_app(state, metrics_handle);

    // 5. Start server
    let addr = config.addr();
    tracing::info!(%addr, "starting cart service");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    if let Err(e) = broker.close().await {
        tracing::warn!(error = %e, "broker close failed");
    }
    tracing::info!("server shut down gracefully");
}
