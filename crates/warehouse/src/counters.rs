//! Aggregate counters: ordered quantity per product plus a total order count.

use std::collections::{BTreeMap, HashSet};

use common::{OrderId, OrderMessage, ProductId};
use tokio::sync::Mutex;

/// What [`AggregateCounters::record`] did with an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// The order was added to the totals.
    Recorded,
    /// The order id was already counted and deduplication is on.
    Duplicate,
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CountersSnapshot {
    pub total_orders: u64,
    pub by_product: BTreeMap<ProductId, u64>,
}

struct CountersState {
    total_orders: u64,
    by_product: BTreeMap<ProductId, u64>,
    /// Order ids already counted, when deduplication is enabled.
    processed: Option<HashSet<OrderId>>,
}

/// Running totals shared by every worker of the pool.
///
/// One lock covers the whole state and is held only while a single order is
/// applied. Counters are never reset.
pub struct AggregateCounters {
    state: Mutex<CountersState>,
}

impl AggregateCounters {
    /// Counters with at-least-once accounting: a redelivered order is
    /// counted again.
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Counters that remember every order id and skip repeats.
    ///
    /// Order ids restart at 1 when the cart service restarts, so this mode
    /// would drop genuine orders across a cart service restart.
    pub fn with_deduplication() -> Self {
        Self::build(Some(HashSet::new()))
    }

    fn build(processed: Option<HashSet<OrderId>>) -> Self {
        Self {
            state: Mutex::new(CountersState {
                total_orders: 0,
                by_product: BTreeMap::new(),
                processed,
            }),
        }
    }

    /// Adds one order to the totals.
    pub async fn record(&self, order: &OrderMessage) -> RecordOutcome {
        let mut state = self.state.lock().await;

        if let Some(processed) = state.processed.as_mut()
            && !processed.insert(order.order_id)
        {
            return RecordOutcome::Duplicate;
        }

        state.total_orders += 1;
        for item in &order.items {
            *state.by_product.entry(item.product_id).or_insert(0) += u64::from(item.quantity);
        }
        RecordOutcome::Recorded
    }

    pub async fn total_orders(&self) -> u64 {
        self.state.lock().await.total_orders
    }

    /// Cumulative ordered quantity for a product (0 if never ordered).
    pub async fn product_total(&self, product_id: ProductId) -> u64 {
        self.state
            .lock()
            .await
            .by_product
            .get(&product_id)
            .copied()
            .unwrap_or(0)
    }

    pub async fn snapshot(&self) -> CountersSnapshot {
        let state = self.state.lock().await;
        CountersSnapshot {
            total_orders: state.total_orders,
            by_product: state.by_product.clone(),
        }
    }

    pub async fn is_deduplicating(&self) -> bool {
        self.state.lock().await.processed.is_some()
    }
}

impl Default for AggregateCounters {
    fn default() -> Self {
        Self::new()
    }
}
