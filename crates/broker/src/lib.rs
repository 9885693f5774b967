//! Message broker abstraction for the `orders` queue.
//!
//! - [`MessageBroker`] publishes payloads to durable named queues and hands
//!   out [`DeliveryStream`]s whose [`Delivery`] items must be acknowledged
//!   manually.
//! - [`InMemoryBroker`] keeps queues in process memory.
//! - [`JetStreamBroker`] maps each queue onto a NATS JetStream work-queue
//!   stream with a shared durable pull consumer.

pub mod broker;
pub mod error;
pub mod jetstream;
pub mod memory;

pub use broker::{
    Acknowledger, DEFAULT_PREFETCH, Delivery, DeliveryStream, MessageBroker, ORDERS_QUEUE,
};
pub use error::{BrokerError, Result};
pub use jetstream::JetStreamBroker;
pub use memory::InMemoryBroker;
