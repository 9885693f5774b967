//! Warehouse lifecycle: start the pool, run until shutdown, drain.

use std::future::Future;
use std::sync::Arc;

use broker::MessageBroker;

use crate::config::WarehouseConfig;
use crate::counters::{AggregateCounters, CountersSnapshot};
use crate::pool::{OrderConsumerPool, PoolHandle};
use crate::Result;

/// Consumes orders until `shutdown` resolves, then closes the broker, waits
/// for every worker and returns the final totals.
///
/// If the queue cannot be declared or the pool cannot start, the error is
/// logged and returned only after `shutdown` resolves, so the process stays
/// up and stoppable the same way as when the broker is unreachable.
#[tracing::instrument(skip_all, fields(queue = %config.pool.queue))]
pub async fn run(
    broker: Arc<dyn MessageBroker>,
    config: &WarehouseConfig,
    shutdown: impl Future<Output = ()>,
) -> Result<CountersSnapshot> {
    let counters = Arc::new(if config.deduplicate {
        AggregateCounters::with_deduplication()
    } else {
        AggregateCounters::new()
    });

    let handle = match start_pool(&broker, &counters, config).await {
        Ok(handle) => handle,
        Err(e) => {
            tracing::error!(error = %e, "failed to start consumer pool, idling until shutdown");
            shutdown.await;
            return Err(e);
        }
    };
    tracing::info!(
        workers = config.pool.workers,
        deduplicate = config.deduplicate,
        "warehouse consuming orders"
    );

    shutdown.await;
    tracing::info!("shutting down warehouse");

    if let Err(e) = broker.close().await {
        tracing::warn!(error = %e, "broker close failed");
    }
    let reports = handle.wait().await;

    let snapshot = counters.snapshot().await;
    tracing::info!(
        total_orders = snapshot.total_orders,
        products = snapshot.by_product.len(),
        workers_stopped = reports.len(),
        "Total Order number: {}",
        snapshot.total_orders
    );
    Ok(snapshot)
}

async fn start_pool(
    broker: &Arc<dyn MessageBroker>,
    counters: &Arc<AggregateCounters>,
    config: &WarehouseConfig,
) -> Result<PoolHandle> {
    broker.declare_queue(&config.pool.queue).await?;
    OrderConsumerPool::new(Arc::clone(broker), Arc::clone(counters), config.pool.clone())
        .start()
        .await
}
