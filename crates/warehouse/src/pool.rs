//! Fixed-size pool of order consumers.

use std::sync::Arc;

use broker::{DeliveryStream, MessageBroker};
use common::OrderMessage;
use futures_util::StreamExt;
use tokio::task::JoinSet;

use crate::config::PoolConfig;
use crate::counters::{AggregateCounters, RecordOutcome};
use crate::{Result, WarehouseError};

/// What one worker did before its delivery stream closed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerReport {
    pub worker_id: usize,
    /// Orders added to the counters.
    pub processed: u64,
    /// Orders skipped as duplicates.
    pub duplicates: u64,
    /// Payloads that failed to decode and were dropped.
    pub discarded: u64,
}

/// Runs `workers` independent consumers of the orders queue.
///
/// Each worker has its own subscription, and therefore its own prefetch
/// window. Every delivery is decoded, applied to the shared
/// [`AggregateCounters`], and only then acknowledged; a crash between the
/// two leads to redelivery and, without deduplication, double counting.
pub struct OrderConsumerPool {
    broker: Arc<dyn MessageBroker>,
    counters: Arc<AggregateCounters>,
    config: PoolConfig,
}

impl OrderConsumerPool {
    pub fn new(
        broker: Arc<dyn MessageBroker>,
        counters: Arc<AggregateCounters>,
        config: PoolConfig,
    ) -> Self {
        Self {
            broker,
            counters,
            config,
        }
    }

    pub fn counters(&self) -> &Arc<AggregateCounters> {
        &self.counters
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Subscribes every worker and starts them.
    ///
    /// If any subscription fails, the workers already started are aborted
    /// and the error is returned.
    #[tracing::instrument(skip(self), fields(queue = %self.config.queue, workers = self.config.workers))]
    pub async fn start(&self) -> Result<PoolHandle> {
        if self.config.workers == 0 {
            return Err(WarehouseError::InvalidConfig(
                "worker count must be at least 1".to_string(),
            ));
        }

        let mut workers = JoinSet::new();
        for worker_id in 0..self.config.workers {
            let deliveries = self
                .broker
                .subscribe(&self.config.queue, self.config.prefetch)
                .await?;
            workers.spawn(run_worker(
                worker_id,
                deliveries,
                Arc::clone(&self.counters),
            ));
        }

        tracing::info!(prefetch = self.config.prefetch, "consumer pool started");
        Ok(PoolHandle { workers })
    }
}

/// Handle to the running workers.
pub struct PoolHandle {
    workers: JoinSet<WorkerReport>,
}

impl PoolHandle {
    /// Number of workers still running.
    pub fn running(&self) -> usize {
        self.workers.len()
    }

    /// Waits for every worker loop to exit.
    ///
    /// Workers only exit when their delivery streams close, so this has no
    /// deadline: close the broker first.
    pub async fn wait(mut self) -> Vec<WorkerReport> {
        let mut reports = Vec::new();
        while let Some(joined) = self.workers.join_next().await {
            match joined {
                Ok(report) => reports.push(report),
                Err(e) => tracing::error!(error = %e, "worker task failed"),
            }
        }
        reports.sort_by_key(|r| r.worker_id);
        reports
    }
}

async fn run_worker(
    worker_id: usize,
    mut deliveries: DeliveryStream,
    counters: Arc<AggregateCounters>,
) -> WorkerReport {
    let mut report = WorkerReport {
        worker_id,
        ..Default::default()
    };
    tracing::info!(worker_id, "worker started");

    while let Some(next) = deliveries.next().await {
        let delivery = match next {
            Ok(delivery) => delivery,
            Err(e) => {
                tracing::warn!(worker_id, error = %e, "delivery stream error");
                continue;
            }
        };

        let order = match OrderMessage::from_json_slice(delivery.payload()) {
            Ok(order) => order,
            Err(e) => {
                // No dead-letter queue: the message is acknowledged and lost.
                tracing::warn!(worker_id, error = %e, "invalid order payload, acking and discarding");
                metrics::counter!("warehouse_messages_discarded_total").increment(1);
                report.discarded += 1;
                if let Err(e) = delivery.ack().await {
                    tracing::warn!(worker_id, error = %e, "ack failed");
                }
                continue;
            }
        };

        match counters.record(&order).await {
            RecordOutcome::Recorded => {
                report.processed += 1;
                metrics::counter!("warehouse_orders_processed_total").increment(1);
            }
            RecordOutcome::Duplicate => {
                report.duplicates += 1;
                tracing::debug!(worker_id, order_id = %order.order_id, "duplicate order skipped");
            }
        }

        if let Err(e) = delivery.ack().await {
            tracing::warn!(worker_id, order_id = %order.order_id, error = %e, "ack failed");
        }
    }

    tracing::info!(
        worker_id,
        processed = report.processed,
        "worker stopped (delivery stream closed)"
    );
    report
}
