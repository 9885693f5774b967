//! Warehouse configuration loaded from environment variables.

use broker::{DEFAULT_PREFETCH, ORDERS_QUEUE};

/// Default number of consumer workers.
pub const DEFAULT_WORKERS: usize = 4;

/// Settings of the consumer pool itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    pub queue: String,
    pub workers: usize,
    /// Unacknowledged deliveries each worker may hold.
    pub prefetch: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            queue: ORDERS_QUEUE.to_string(),
            workers: DEFAULT_WORKERS,
            prefetch: DEFAULT_PREFETCH,
        }
    }
}

/// Warehouse process configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `BROKER_URL` — NATS server URL (default: `"nats://localhost:4222"`)
/// - `ORDERS_QUEUE` — queue to consume (default: `"orders"`)
/// - `WAREHOUSE_WORKERS` — worker count; non-positive or unparsable values keep the default of 4
/// - `WAREHOUSE_PREFETCH` — per-worker prefetch window (default: 10)
/// - `WAREHOUSE_DEDUPLICATE` — `true`/`1` to skip repeated order ids (default: off)
/// - `RUST_LOG` — tracing filter directive (default: `"info"`)
#[derive(Debug, Clone)]
pub struct WarehouseConfig {
    pub broker_url: String,
    pub pool: PoolConfig,
    pub deduplicate: bool,
    pub log_level: String,
}

impl WarehouseConfig {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            broker_url: lookup("BROKER_URL").unwrap_or(defaults.broker_url),
            pool: PoolConfig {
                queue: lookup("ORDERS_QUEUE").unwrap_or(defaults.pool.queue),
                workers: positive(lookup("WAREHOUSE_WORKERS")).unwrap_or(defaults.pool.workers),
                prefetch: positive(lookup("WAREHOUSE_PREFETCH")).unwrap_or(defaults.pool.prefetch),
            },
            deduplicate: lookup("WAREHOUSE_DEDUPLICATE")
                .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "true" | "1"))
                .unwrap_or(defaults.deduplicate),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
        }
    }
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            broker_url: "nats://localhost:4222".to_string(),
            pool: PoolConfig::default(),
            deduplicate: false,
            log_level: "info".to_string(),
        }
    }
}

fn positive(value: Option<String>) -> Option<usize> {
    value?.trim().parse::<usize>().ok().filter(|n| *n > 0)
}
