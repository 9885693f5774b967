//! Warehouse consumer entry point.

use std::sync::Arc;

use broker::{JetStreamBroker, MessageBroker};
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use warehouse::WarehouseConfig;

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
        () = ctrl_c => tracing::info!("received SIGINT"),
        () = terminate => tracing::info!("received SIGTERM"),
    }
}

#[tokio::main]
async fn main() {
    let config = WarehouseConfig::from_env();

    tracing_subscriber::registry()
        .with(EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let broker: Arc<dyn MessageBroker> = match JetStreamBroker::connect(&config.broker_url).await {
        Ok(broker) => Arc::new(broker),
        Err(e) => {
            // Stay up without consuming so the process can still be stopped cleanly.
            tracing::error!(url = %config.broker_url, error = %e, "failed to connect to broker");
            shutdown_signal().await;
            return;
        }
    };

    match warehouse::run(broker, &config, shutdown_signal()).await {
        Ok(_) => tracing::info!("warehouse stopped cleanly"),
        Err(e) => tracing::error!(error = %e, "warehouse stopped without consuming"),
    }
}
