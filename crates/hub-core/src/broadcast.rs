//! Subscriber registry and fan-out.
//!
//! Each subscriber owns a bounded queue. Publishing is a non-blocking
//! `try_send` to every registered queue while the registry lock is held, so
//! every subscriber sees publishes in the same order and a publish never
//! observes a half-updated subscriber set. A subscriber whose queue is
//! closed or full is dropped from the registry on the spot; nothing is
//! retried.

use hub_protocol::Notification;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

/// Default per-subscriber queue capacity.
pub const DEFAULT_SUBSCRIBER_BUFFER: usize = 1024;

/// Default maximum number of subscribers.
pub const DEFAULT_MAX_SUBSCRIBERS: usize = 10_000;

/// Identifies one subscription.
pub type SubscriptionId = u64;

/// Broadcast errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BroadcastError {
    /// The registry is full.
    #[error("Maximum subscribers reached ({0})")]
    MaxSubscribersReached(usize),
}

/// Outcome of one publish.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReport {
    /// Subscribers the notification was queued for.
    pub delivered: usize,
    /// Subscribers removed because they could not take it.
    pub dropped: usize,
}

impl PublishReport {
    pub(crate) fn merge(&mut self, other: PublishReport) {
        self.delivered += other.delivered;
        self.dropped += other.dropped;
    }
}

/// The receiving end of a subscription.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriptionId,
    receiver: mpsc::Receiver<Arc<Notification>>,
}

impl Subscription {
    /// The subscription id, for [`Broadcaster::unsubscribe`].
    #[must_use]
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Wait for the next notification.
    ///
    /// Returns `None` once the subscription has been removed and its queue
    /// drained.
    pub async fn recv(&mut self) -> Option<Arc<Notification>> {
        self.receiver.recv().await
    }

    /// Take a queued notification without waiting.
    pub fn try_recv(&mut self) -> Option<Arc<Notification>> {
        self.receiver.try_recv().ok()
    }
}

/// Multi-subscriber fan-out.
#[derive(Debug)]
pub struct Broadcaster {
    subscribers: Mutex<HashMap<SubscriptionId, mpsc::Sender<Arc<Notification>>>>,
    next_id: AtomicU64,
    buffer: usize,
    max_subscribers: usize,
}

impl Broadcaster {
    /// Create a broadcaster with default limits.
    #[must_use]
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_SUBSCRIBER_BUFFER, DEFAULT_MAX_SUBSCRIBERS)
    }

    /// Create a broadcaster with a per-subscriber buffer and a subscriber cap.
    #[must_use]
    pub fn with_limits(buffer: usize, max_subscribers: usize) -> Self {
        Self {
            subscribers: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            buffer: buffer.max(1),
            max_subscribers,
        }
    }

    fn registry(&self) -> MutexGuard<'_, HashMap<SubscriptionId, mpsc::Sender<Arc<Notification>>>> {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a new subscriber.
    ///
    /// # Errors
    ///
    /// Returns an error if the subscriber cap is reached.
    pub fn subscribe(&self) -> Result<Subscription, BroadcastError> {
        let mut registry = self.registry();
        if registry.len() >= self.max_subscribers {
            return Err(BroadcastError::MaxSubscribersReached(self.max_subscribers));
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = mpsc::channel(self.buffer);
        registry.insert(id, sender);

        debug!(subscription = id, subscribers = registry.len(), "Subscribed");
        Ok(Subscription { id, receiver })
    }

    /// Remove a subscriber. Returns `true` if it was registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut registry = self.registry();
        let removed = registry.remove(&id).is_some();
        if removed {
            debug!(subscription = id, subscribers = registry.len(), "Unsubscribed");
        }
        removed
    }

    /// Queue a notification for every registered subscriber.
    pub fn publish(&self, notification: Arc<Notification>) -> PublishReport {
        let mut registry = self.registry();
        let mut report = PublishReport::default();

        registry.retain(|id, sender| match sender.try_send(Arc::clone(&notification)) {
            Ok(()) => {
                report.delivered += 1;
                true
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(subscription = *id, "Subscriber queue full, dropping subscriber");
                report.dropped += 1;
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!(subscription = *id, "Subscriber gone, dropping subscriber");
                report.dropped += 1;
                false
            }
        });

        trace!(
            category = notification.category(),
            delivered = report.delivered,
            dropped = report.dropped,
            "Published notification"
        );
        report
    }

    /// Number of registered subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.registry().len()
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new()
    }
}
