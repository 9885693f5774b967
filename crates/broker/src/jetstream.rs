//! NATS JetStream backed broker.
//!
//! Each queue maps onto a file-backed JetStream stream of the same name with
//! work-queue retention, capturing a single subject equal to the queue name.
//! Subscribers share one durable pull consumer, so every message goes to one
//! subscriber and unacknowledged messages are redelivered after the ack wait
//! expires or the consumer reconnects.

use std::sync::Arc;

use async_nats::jetstream::{self, AckKind, consumer, stream};
use async_trait::async_trait;
use futures_core::Stream;
use futures_util::StreamExt;
use tokio::sync::{OwnedSemaphorePermit, Semaphore, watch};

use crate::{Acknowledger, BrokerError, Delivery, DeliveryStream, MessageBroker, Result};

/// Default durable consumer name shared by all warehouse workers.
pub const DEFAULT_DURABLE_NAME: &str = "warehouse";

/// Broker backed by a NATS JetStream context.
pub struct JetStreamBroker {
    context: jetstream::Context,
    durable_name: String,
    closed: watch::Sender<bool>,
}

impl JetStreamBroker {
    /// Connects to a NATS server, e.g. `nats://localhost:4222`.
    pub async fn connect(url: &str) -> Result<Self> {
        let client = async_nats::connect(url)
            .await
            .map_err(|e| BrokerError::Connection(e.to_string()))?;
        tracing::info!(url, "connected to NATS");
        Ok(Self::new(client))
    }

    /// Wraps an existing client.
    pub fn new(client: async_nats::Client) -> Self {
        let (closed, _) = watch::channel(false);
        Self {
            context: jetstream::new(client),
            durable_name: DEFAULT_DURABLE_NAME.to_string(),
            closed,
        }
    }

    /// Overrides the durable consumer name used by [`subscribe`](MessageBroker::subscribe).
    pub fn with_durable_name(mut self, name: impl Into<String>) -> Self {
        self.durable_name = name.into();
        self
    }

    fn ensure_open(&self) -> Result<()> {
        if *self.closed.borrow() {
            return Err(BrokerError::Closed);
        }
        Ok(())
    }
}

#[async_trait]
impl MessageBroker for JetStreamBroker {
    async fn declare_queue(&self, queue: &str) -> Result<()> {
        self.ensure_open()?;

        let config = stream::Config {
            name: queue.to_string(),
            subjects: vec![queue.to_string()],
            retention: stream::RetentionPolicy::WorkQueue,
            storage: stream::StorageType::File,
            ..Default::default()
        };
        self.context
            .get_or_create_stream(config)
            .await
            .map_err(|e| BrokerError::Declare {
                queue: queue.to_string(),
                reason: e.to_string(),
            })?;

        tracing::info!(queue, "queue declared");
        Ok(())
    }

    async fn publish(&self, queue: &str, payload: Vec<u8>) -> Result<()> {
        self.ensure_open()?;

        let publish_error = |reason: String| BrokerError::Publish {
            queue: queue.to_string(),
            reason,
        };

        // The first await hands the message to the client, the second waits
        // for the server's publish acknowledgement.
        self.context
            .publish(queue.to_string(), payload.into())
            .await
            .map_err(|e| publish_error(e.to_string()))?
            .await
            .map_err(|e| publish_error(e.to_string()))?;

        metrics::counter!("broker_messages_published_total", "queue" => queue.to_string())
            .increment(1);
        Ok(())
    }

    async fn subscribe(&self, queue: &str, prefetch: usize) -> Result<DeliveryStream> {
        self.ensure_open()?;

        let subscribe_error = |reason: String| BrokerError::Subscribe {
            queue: queue.to_string(),
            reason,
        };

        let stream = self
            .context
            .get_stream(queue)
            .await
            .map_err(|e| subscribe_error(e.to_string()))?;

        let consumer: consumer::PullConsumer = stream
            .get_or_create_consumer(
                &self.durable_name,
                consumer::pull::Config {
                    durable_name: Some(self.durable_name.clone()),
                    ack_policy: consumer::AckPolicy::Explicit,
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| subscribe_error(e.to_string()))?;

        let messages = consumer
            .stream()
            .max_messages_per_batch(prefetch.max(1))
            .messages()
            .await
            .map_err(|e| subscribe_error(e.to_string()))?;

        tracing::debug!(queue, prefetch, durable = %self.durable_name, "subscriber attached");

        let mut closed = self.closed.subscribe();
        let shutdown = async move {
            let _ = closed.wait_for(|closed| *closed).await;
        };

        let queue_name = queue.to_string();
        let deliveries = windowed(messages, prefetch)
            .take_until(shutdown)
            .map(move |(item, permit)| {
                item.map(|message| into_delivery(message, permit))
                    .map_err(|e| BrokerError::Subscribe {
                        queue: queue_name.clone(),
                        reason: e.to_string(),
                    })
            });

        Ok(Box::pin(deliveries))
    }

    async fn close(&self) -> Result<()> {
        self.closed.send_replace(true);
        tracing::info!("JetStream broker closed");
        Ok(())
    }
}

/// Pairs each item with a permit from a window of `prefetch` permits
/// (unbounded for 0). The next item is not pulled until a permit is free,
/// so at most `prefetch` items are outstanding at once.
fn windowed<S>(
    items: S,
    prefetch: usize,
) -> impl Stream<Item = (S::Item, OwnedSemaphorePermit)> + Send
where
    S: Stream + Send + 'static,
    S::Item: Send,
{
    let permits = if prefetch == 0 {
        Semaphore::MAX_PERMITS
    } else {
        prefetch
    };
    let window = Arc::new(Semaphore::new(permits));

    futures_util::stream::unfold(Box::pin(items), move |mut items| {
        let window = Arc::clone(&window);
        async move {
            let permit = window.acquire_owned().await.ok()?;
            let item = items.next().await?;
            Some(((item, permit), items))
        }
    })
}

fn into_delivery(message: jetstream::Message, permit: OwnedSemaphorePermit) -> Delivery {
    let payload = message.payload.to_vec();
    let redelivered = message
        .info()
        .map(|info| info.delivered > 1)
        .unwrap_or(false);
    Delivery::new(
        payload,
        redelivered,
        Box::new(JetStreamAcker {
            message,
            _permit: permit,
        }),
    )
}

/// Settles a JetStream message. The window permit is released when the
/// acker is dropped, i.e. once the delivery has been settled or abandoned.
struct JetStreamAcker {
    message: jetstream::Message,
    _permit: OwnedSemaphorePermit,
}

#[async_trait]
impl Acknowledger for JetStreamAcker {
    async fn ack(&mut self) -> Result<()> {
        self.message
            .ack()
            .await
            .map_err(|e| BrokerError::Acknowledge(e.to_string()))
    }

    async fn nack(&mut self, requeue: bool) -> Result<()> {
        let kind = if requeue {
            AckKind::Nak(None)
        } else {
            AckKind::Term
        };
        self.message
            .ack_with(kind)
            .await
            .map_err(|e| BrokerError::Acknowledge(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_window_holds_back_items_until_a_permit_is_released() {
        let mut items = Box::pin(windowed(futures_util::stream::iter(1..=5), 2));

        let (first, first_permit) = items.next().await.unwrap();
        let (second, _second_permit) = items.next().await.unwrap();
        assert_eq!((first, second), (1, 2));

        let blocked = tokio::time::timeout(Duration::from_millis(50), items.next()).await;
        assert!(blocked.is_err(), "a third item was handed out with no free permit");

        drop(first_permit);
        let (third, _third_permit) = items.next().await.unwrap();
        assert_eq!(third, 3);
    }

    #[tokio::test]
    async fn test_zero_prefetch_is_unbounded() {
        let items = windowed(futures_util::stream::iter(0..100), 0);
        let collected: Vec<_> = items.collect().await;
        assert_eq!(collected.len(), 100);
    }
}
