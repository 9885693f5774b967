use std::pin::Pin;

use async_trait::async_trait;
use futures_core::Stream;

use crate::Result;

/// Name of the queue carrying orders from the cart service to the warehouse.
pub const ORDERS_QUEUE: &str = "orders";

/// Default number of unacknowledged deliveries a single subscriber may hold.
pub const DEFAULT_PREFETCH: usize = 10;

/// A stream of deliveries for one subscriber.
pub type DeliveryStream = Pin<Box<dyn Stream<Item = Result<Delivery>> + Send>>;

/// Settles a delivery with the broker it came from.
#[async_trait]
pub trait Acknowledger: Send {
    /// Marks the delivery as processed.
    async fn ack(&mut self) -> Result<()>;

    /// Rejects the delivery. With `requeue` the broker delivers it again,
    /// otherwise it is dropped.
    async fn nack(&mut self, requeue: bool) -> Result<()>;
}

/// A message handed to a subscriber.
///
/// Until [`ack`](Delivery::ack) or [`nack`](Delivery::nack) is called the
/// delivery counts against the subscriber's prefetch window and the broker
/// may redeliver it.
pub struct Delivery {
    payload: Vec<u8>,
    redelivered: bool,
    acker: Box<dyn Acknowledger>,
}

impl Delivery {
    pub fn new(payload: Vec<u8>, redelivered: bool, acker: Box<dyn Acknowledger>) -> Self {
        Self {
            payload,
            redelivered,
            acker,
        }
    }

    /// The opaque message body.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// True if the broker has delivered this message before.
    pub fn is_redelivered(&self) -> bool {
        self.redelivered
    }

    pub async fn ack(mut self) -> Result<()> {
        self.acker.ack().await
    }

    pub async fn nack(mut self, requeue: bool) -> Result<()> {
        self.acker.nack(requeue).await
    }
}

impl std::fmt::Debug for Delivery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Delivery")
            .field("payload_len", &self.payload.len())
            .field("redelivered", &self.redelivered)
            .finish()
    }
}

/// Core trait for message broker implementations.
///
/// Publishing is point-to-point: each message on a queue is delivered to
/// exactly one of the queue's subscribers at a time.
#[async_trait]
pub trait MessageBroker: Send + Sync {
    /// Ensures a durable queue with the given name exists.
    async fn declare_queue(&self, queue: &str) -> Result<()>;

    /// Publishes a payload to a queue.
    ///
    /// Returns once the broker has accepted the message.
    async fn publish(&self, queue: &str, payload: Vec<u8>) -> Result<()>;

    /// Subscribes to a queue with manual acknowledgment.
    ///
    /// At most `prefetch` deliveries are outstanding (delivered but not yet
    /// settled) for the returned stream at any time.
    async fn subscribe(&self, queue: &str, prefetch: usize) -> Result<DeliveryStream>;

    /// Closes the broker connection. Every open delivery stream ends after
    /// its current item; further publishes fail with `Closed`.
    async fn close(&self) -> Result<()>;
}
