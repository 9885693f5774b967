//! Checkout coordinator for turning carts into published orders.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use broker::{MessageBroker, ORDERS_QUEUE};
use cart_store::CartStore;
use common::{CartId, CartItem, OrderId, OrderMessage};
use serde::Serialize;
use tokio::sync::OwnedMutexGuard;

use crate::error::CheckoutError;
use crate::services::payment::{AuthorizationOutcome, PaymentAuthorizer};
use crate::state::CheckoutState;

type CartLocks = Mutex<HashMap<CartId, Arc<tokio::sync::Mutex<()>>>>;

/// Result of a successful checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutReceipt {
    pub order_id: OrderId,
    pub cart_id: CartId,
    /// The items that were published with the order.
    pub items: Vec<CartItem>,
}

/// Orchestrates checkout: cart read → payment authorization → order
/// publish → removal of the ordered items from the cart.
///
/// Checkouts of the same cart are serialized by a per-cart lock held across
/// the whole sequence, so one cart can never be fulfilled twice. Locks are
/// forgotten once no checkout of that cart is running. Checkouts
/// of different carts run fully in parallel, and the cart store lock is
/// never held while waiting on the authorizer or the broker.
pub struct CheckoutCoordinator {
    carts: Arc<dyn CartStore>,
    payments: Arc<dyn PaymentAuthorizer>,
    broker: Arc<dyn MessageBroker>,
    queue: String,
    next_order_id: AtomicU64,
    cart_locks: CartLocks,
}

impl CheckoutCoordinator {
    /// Creates a coordinator publishing to the `orders` queue.
    pub fn new(
        carts: Arc<dyn CartStore>,
        payments: Arc<dyn PaymentAuthorizer>,
        broker: Arc<dyn MessageBroker>,
    ) -> Self {
        Self {
            carts,
            payments,
            broker,
            queue: ORDERS_QUEUE.to_string(),
            next_order_id: AtomicU64::new(1),
            cart_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Publishes to a different queue.
    pub fn with_queue(mut self, queue: impl Into<String>) -> Self {
        self.queue = queue.into();
        self
    }

    /// The queue orders are published to.
    pub fn queue(&self) -> &str {
        &self.queue
    }

    /// Runs a checkout for a cart, paying with the given card.
    #[tracing::instrument(skip(self, card_number), fields(cart_id = %cart_id))]
    pub async fn checkout(
        &self,
        cart_id: CartId,
        card_number: &str,
    ) -> Result<CheckoutReceipt, CheckoutError> {
        metrics::counter!("checkout_attempts_total").increment(1);
        let started = std::time::Instant::now();

        let result = self.run(cart_id, card_number).await;

        let final_state = match &result {
            Ok(_) => CheckoutState::Cleared,
            Err(err) => {
                tracing::info!(state = %err.terminal_state(), code = err.code(), error = %err, "checkout stopped");
                err.terminal_state()
            }
        };
        metrics::counter!("checkout_outcomes_total", "outcome" => final_state.as_str())
            .increment(1);
        metrics::histogram!("checkout_duration_seconds").record(started.elapsed().as_secs_f64());

        result
    }

    async fn run(
        &self,
        cart_id: CartId,
        card_number: &str,
    ) -> Result<CheckoutReceipt, CheckoutError> {
        let mut state = CheckoutState::Created;
        advance(&mut state, CheckoutState::Validating);

        let _guard = self.lock_cart(cart_id).await;

        // 1. Read the cart; the snapshot is what gets ordered.
        let cart = self.carts.get_cart(cart_id).await?;
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart(cart_id));
        }

        // 2. Authorize the payment
        advance(&mut state, CheckoutState::Authorizing);
        match self.payments.authorize(card_number).await {
            Ok(AuthorizationOutcome::Authorized) => {}
            Ok(AuthorizationOutcome::Declined) => return Err(CheckoutError::PaymentDeclined),
            Ok(AuthorizationOutcome::InvalidFormat) => return Err(CheckoutError::InvalidCard),
            Ok(AuthorizationOutcome::Unexpected(status)) => {
                tracing::warn!(status, "unexpected response from payment authorizer");
                return Err(CheckoutError::UnexpectedPaymentResponse(status));
            }
            Err(err) => {
                tracing::warn!(error = %err, "payment authorizer unreachable");
                return Err(CheckoutError::PaymentServiceUnavailable(err));
            }
        }
        advance(&mut state, CheckoutState::Authorized);

        // 3. Publish the order. The id is spent even if the publish fails.
        let order_id = self.allocate_order_id();
        let order = OrderMessage::new(order_id, cart_id, cart.items().to_vec());
        let payload = order.to_json_bytes()?;
        self.broker
            .publish(&self.queue, payload)
            .await
            .map_err(|source| {
                tracing::error!(%order_id, error = %source, "failed to publish order");
                CheckoutError::Publish { order_id, source }
            })?;
        metrics::counter!("orders_published_total").increment(1);
        advance(&mut state, CheckoutState::Published);

        // 4. Remove what was ordered, only once the order is safely handed off.
        // Items added while the payment was in flight stay in the cart.
        self.carts.remove_items(cart_id, &order.items).await?;
        advance(&mut state, CheckoutState::Cleared);

        tracing::info!(%order_id, %cart_id, items = order.items.len(), "order created");

        Ok(CheckoutReceipt {
            order_id,
            cart_id,
            items: order.items,
        })
    }

    fn allocate_order_id(&self) -> OrderId {
        OrderId::new(self.next_order_id.fetch_add(1, Ordering::SeqCst))
    }

    async fn lock_cart(&self, cart_id: CartId) -> CartLockGuard<'_> {
        let lock = {
            let mut locks = self
                .cart_locks
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(cart_id).or_default())
        };
        let guard = Arc::clone(&lock).lock_owned().await;
        CartLockGuard {
            locks: &self.cart_locks,
            cart_id,
            lock,
            guard: Some(guard),
        }
    }
}

/// Holds a cart's checkout lock; on drop, forgets the lock if no other
/// checkout is holding or waiting on it.
struct CartLockGuard<'a> {
    locks: &'a CartLocks,
    cart_id: CartId,
    lock: Arc<tokio::sync::Mutex<()>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for CartLockGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // One reference in the map, one here.
        if Arc::strong_count(&self.lock) == 2
            && locks
                .get(&self.cart_id)
                .is_some_and(|entry| Arc::ptr_eq(entry, &self.lock))
        {
            locks.remove(&self.cart_id);
        }
    }
}

fn advance(state: &mut CheckoutState, next: CheckoutState) {
    tracing::debug!(from = %state, to = %next, "checkout state transition");
    *state = next;
}
