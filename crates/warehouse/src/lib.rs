//! Warehouse side of the fulfillment chain.
//!
//! - [`AggregateCounters`] accumulates ordered quantities per product
//! - [`OrderConsumerPool`] runs a fixed set of workers, each subscribed to
//!   the `orders` queue with its own prefetch window
//! - [`WarehouseConfig`] reads the worker settings from the environment
//! - [`run`] ties them together for the lifetime of the process

pub mod config;
pub mod counters;
pub mod error;
pub mod pool;
pub mod service;

pub use config::{PoolConfig, WarehouseConfig};
pub use counters::{AggregateCounters, CountersSnapshot, RecordOutcome};
pub use error::{Result, WarehouseError};
pub use pool::{OrderConsumerPool, PoolHandle, WorkerReport};
pub use service::run;
