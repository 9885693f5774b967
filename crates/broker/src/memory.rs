use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use futures_util::stream;
use tokio::sync::{Notify, OwnedSemaphorePermit, Semaphore, watch};

use crate::{Acknowledger, BrokerError, Delivery, DeliveryStream, MessageBroker, Result};

struct Message {
    payload: Vec<u8>,
    redelivered: bool,
}

#[derive(Default)]
struct QueueState {
    ready: VecDeque<Message>,
    unacked: usize,
}

#[derive(Default)]
struct Queue {
    state: Mutex<QueueState>,
    notify: Notify,
}

impl Queue {
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push_back(&self, message: Message) {
        self.lock().ready.push_back(message);
        self.notify.notify_waiters();
    }

    fn take(&self) -> Option<Message> {
        let mut state = self.lock();
        let message = state.ready.pop_front()?;
        state.unacked += 1;
        Some(message)
    }

    /// Settles an outstanding delivery, putting it back at the head of the
    /// queue when requeued.
    fn settle(&self, payload: Vec<u8>, requeue: bool) {
        let mut state = self.lock();
        state.unacked = state.unacked.saturating_sub(1);
        if requeue {
            state.ready.push_front(Message {
                payload,
                redelivered: true,
            });
            drop(state);
            self.notify.notify_waiters();
        }
    }
}

struct Shared {
    queues: Mutex<HashMap<String, Arc<Queue>>>,
    closed: watch::Sender<bool>,
    fail_on_publish: AtomicBool,
}

impl Shared {
    fn queue(&self, name: &str) -> Arc<Queue> {
        let mut queues = self.queues.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(queues.entry(name.to_string()).or_default())
    }

    fn existing(&self, name: &str) -> Option<Arc<Queue>> {
        self.queues
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }
}

/// In-process broker with durable-for-the-process-lifetime queues.
///
/// Mirrors the broker semantics the system relies on: point-to-point
/// delivery, a per-subscriber prefetch window, manual acknowledgment, and
/// redelivery of any delivery that is requeued or dropped without being
/// settled.
#[derive(Clone)]
pub struct InMemoryBroker {
    shared: Arc<Shared>,
}

impl InMemoryBroker {
    pub fn new() -> Self {
        let (closed, _) = watch::channel(false);
        Self {
            shared: Arc::new(Shared {
                queues: Mutex::new(HashMap::new()),
                closed,
                fail_on_publish: AtomicBool::new(false),
            }),
        }
    }

    /// Configures publishes to fail until reset.
    pub fn set_fail_on_publish(&self, fail: bool) {
        self.shared.fail_on_publish.store(fail, Ordering::SeqCst);
    }

    /// Number of messages waiting to be delivered.
    pub fn ready_count(&self, queue: &str) -> usize {
        self.shared
            .existing(queue)
            .map_or(0, |q| q.lock().ready.len())
    }

    /// Number of messages delivered but not yet settled.
    pub fn unacked_count(&self, queue: &str) -> usize {
        self.shared
            .existing(queue)
            .map_or(0, |q| q.lock().unacked)
    }

    /// Removes and returns the payloads waiting in a queue.
    pub fn drain(&self, queue: &str) -> Vec<Vec<u8>> {
        self.shared.existing(queue).map_or_else(Vec::new, |q| {
            q.lock().ready.drain(..).map(|m| m.payload).collect()
        })
    }
}

impl Default for InMemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageBroker for InMemoryBroker {
    async fn declare_queue(&self, queue: &str) -> Result<()> {
        if self.shared.is_closed() {
            return Err(BrokerError::Closed);
        }
        self.shared.queue(queue);
        Ok(())
    }

    async fn publish(&self, queue: &str, payload: Vec<u8>) -> Result<()> {
        if self.shared.is_closed() {
            return Err(BrokerError::Closed);
        }
        if self.shared.fail_on_publish.load(Ordering::SeqCst) {
            return Err(BrokerError::Publish {
                queue: queue.to_string(),
                reason: "broker unavailable".to_string(),
            });
        }

        self.shared.queue(queue).push_back(Message {
            payload,
            redelivered: false,
        });
        metrics::counter!("broker_messages_published_total", "queue" => queue.to_string())
            .increment(1);
        Ok(())
    }

    async fn subscribe(&self, queue: &str, prefetch: usize) -> Result<DeliveryStream> {
        if self.shared.is_closed() {
            return Err(BrokerError::Closed);
        }

        let permits = if prefetch == 0 {
            Semaphore::MAX_PERMITS
        } else {
            prefetch
        };
        let subscriber = Subscriber {
            queue: self.shared.queue(queue),
            window: Arc::new(Semaphore::new(permits)),
            closed: self.shared.closed.subscribe(),
            _shared: Arc::clone(&self.shared),
        };
        tracing::debug!(queue, prefetch, "subscriber attached");

        let deliveries = stream::unfold(subscriber, |mut subscriber| async move {
            let delivery = subscriber.next_delivery().await?;
            Some((Ok(delivery), subscriber))
        });
        Ok(Box::pin(deliveries))
    }

    async fn close(&self) -> Result<()> {
        self.shared.closed.send_replace(true);
        tracing::debug!("in-memory broker closed");
        Ok(())
    }
}

struct Subscriber {
    queue: Arc<Queue>,
    window: Arc<Semaphore>,
    closed: watch::Receiver<bool>,
    // Keeps the close signal sender alive for as long as the stream exists.
    _shared: Arc<Shared>,
}

impl Subscriber {
    /// Waits for prefetch capacity, then for a message. Returns `None` once
    /// the broker is closed.
    async fn next_delivery(&mut self) -> Option<Delivery> {
        if *self.closed.borrow() {
            return None;
        }

        let permit = tokio::select! {
            permit = Arc::clone(&self.window).acquire_owned() => permit.ok()?,
            () = wait_closed(&mut self.closed) => return None,
        };

        loop {
            let notified = self.queue.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if *self.closed.borrow() {
                return None;
            }
            if let Some(message) = self.queue.take() {
                let acker = MemoryAcker {
                    queue: Arc::clone(&self.queue),
                    payload: Some(message.payload.clone()),
                    _permit: permit,
                };
                return Some(Delivery::new(
                    message.payload,
                    message.redelivered,
                    Box::new(acker),
                ));
            }

            tokio::select! {
                () = &mut notified => {}
                () = wait_closed(&mut self.closed) => return None,
            }
        }
    }
}

async fn wait_closed(closed: &mut watch::Receiver<bool>) {
    let _ = closed.wait_for(|closed| *closed).await;
}

/// Holds one slot of the subscriber's prefetch window until settled.
struct MemoryAcker {
    queue: Arc<Queue>,
    payload: Option<Vec<u8>>,
    _permit: OwnedSemaphorePermit,
}

#[async_trait]
impl Acknowledger for MemoryAcker {
    async fn ack(&mut self) -> Result<()> {
        let payload = self
            .payload
            .take()
            .ok_or_else(|| BrokerError::Acknowledge("delivery already settled".to_string()))?;
        self.queue.settle(payload, false);
        Ok(())
    }

    async fn nack(&mut self, requeue: bool) -> Result<()> {
        let payload = self
            .payload
            .take()
            .ok_or_else(|| BrokerError::Acknowledge("delivery already settled".to_string()))?;
        self.queue.settle(payload, requeue);
        Ok(())
    }
}

impl Drop for MemoryAcker {
    fn drop(&mut self) {
        // An unsettled delivery goes back to the queue, as when a consumer's
        // channel dies mid-processing.
        if let Some(payload) = self.payload.take() {
            self.queue.settle(payload, true);
        }
    }
}
