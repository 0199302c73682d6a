//! The hub: one mutation stream from inbound event to broadcast.
//!
//! The hub owns the session store behind a single mutex. Ingesting an event
//! holds that mutex across dispatch, logging and publish, and subscribing
//! holds it across snapshot capture and registration. Publishing only
//! queues notifications, so the critical section never waits on a client.
//!
//! Lock order is always store, then subscriber registry.

use crate::broadcast::{
    BroadcastError, Broadcaster, PublishReport, Subscription, SubscriptionId,
    DEFAULT_MAX_SUBSCRIBERS, DEFAULT_SUBSCRIBER_BUFFER,
};
use crate::command::{CommandTable, DEFAULT_PREFIX};
use crate::dispatcher::Dispatcher;
use crate::lookup::GameConfig;
use crate::state::{SessionStore, DEFAULT_LOG_CAPACITY};
use hub_protocol::{InboundEvent, Notification, NotificationBody, Snapshot};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use tracing::{debug, info};

/// Hub configuration.
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Prefix that turns chat into a command.
    pub command_prefix: char,
    /// Event log capacity.
    pub log_capacity: usize,
    /// Per-subscriber queue capacity.
    pub subscriber_buffer: usize,
    /// Maximum concurrent subscribers.
    pub max_subscribers: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            command_prefix: DEFAULT_PREFIX,
            log_capacity: DEFAULT_LOG_CAPACITY,
            subscriber_buffer: DEFAULT_SUBSCRIBER_BUFFER,
            max_subscribers: DEFAULT_MAX_SUBSCRIBERS,
        }
    }
}

/// Result of ingesting one event.
#[derive(Debug, Clone, Default)]
pub struct IngestReport {
    /// Notifications produced, in publish order.
    pub notifications: Vec<Arc<Notification>>,
    /// Combined delivery outcome across all notifications.
    pub publish: PublishReport,
    /// Time spent inside the critical section.
    pub elapsed: std::time::Duration,
}

/// Hub statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HubStats {
    pub players: usize,
    pub queue_len: usize,
    pub log_len: usize,
    pub subscribers: usize,
}

/// The live event hub.
#[derive(Debug)]
pub struct Hub {
    store: Mutex<SessionStore>,
    dispatcher: Dispatcher,
    broadcaster: Broadcaster,
}

impl Hub {
    /// Create a hub with default configuration.
    #[must_use]
    pub fn new(lookup: Arc<GameConfig>) -> Self {
        Self::with_config(lookup, HubConfig::default())
    }

    /// Create a hub with custom configuration.
    #[must_use]
    pub fn with_config(lookup: Arc<GameConfig>, config: HubConfig) -> Self {
        info!("Creating hub with config: {:?}", config);
        Self {
            store: Mutex::new(SessionStore::with_log_capacity(config.log_capacity)),
            dispatcher: Dispatcher::new(lookup, CommandTable::new(config.command_prefix)),
            broadcaster: Broadcaster::with_limits(config.subscriber_buffer, config.max_subscribers),
        }
    }

    fn store(&self) -> MutexGuard<'_, SessionStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The game tables.
    #[must_use]
    pub fn lookup(&self) -> &Arc<GameConfig> {
        self.dispatcher.lookup()
    }

    /// Dispatch an event and publish its notifications.
    ///
    /// The event must already have passed boundary validation.
    pub fn ingest(&self, event: &InboundEvent) -> IngestReport {
        let mut store = self.store();
        let start = Instant::now();

        let notifications: Vec<Arc<Notification>> = self
            .dispatcher
            .dispatch(&mut store, event)
            .into_iter()
            .map(Arc::new)
            .collect();

        let mut publish = PublishReport::default();
        for notification in &notifications {
            publish.merge(self.broadcaster.publish(Arc::clone(notification)));
        }

        let elapsed = start.elapsed();
        drop(store);

        IngestReport {
            notifications,
            publish,
            elapsed,
        }
    }

    /// Register a subscriber and capture the state it starts from.
    ///
    /// Every notification published after this returns reaches the
    /// subscription; none published before it does.
    ///
    /// # Errors
    ///
    /// Returns an error if the subscriber cap is reached.
    pub fn subscribe(&self) -> Result<(Subscription, Snapshot), BroadcastError> {
        let store = self.store();
        let snapshot = store.snapshot();
        let subscription = self.broadcaster.subscribe()?;
        drop(store);

        debug!(
            subscription = subscription.id(),
            queue = snapshot.queue.len(),
            log = snapshot.recent_log.len(),
            "Subscriber registered with snapshot"
        );
        Ok((subscription, snapshot))
    }

    /// Remove a subscriber. Idempotent.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.broadcaster.unsubscribe(id)
    }

    /// Publish the fixed diagnostic gift notification.
    ///
    /// State is not touched.
    pub fn inject_test_event(&self) -> PublishReport {
        let notification = Arc::new(test_notification());
        let store = self.store();
        let report = self.broadcaster.publish(notification);
        drop(store);
        info!(delivered = report.delivered, "Injected test event");
        report
    }

    /// Current state copy, outside any subscription.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        self.store().snapshot()
    }

    /// Hub statistics.
    #[must_use]
    pub fn stats(&self) -> HubStats {
        let store = self.store();
        HubStats {
            players: store.player_count(),
            queue_len: store.queue_len(),
            log_len: store.log_len(),
            subscribers: self.broadcaster.subscriber_count(),
        }
    }
}

/// The hardcoded test gift.
fn test_notification() -> Notification {
    Notification::new(
        NotificationBody::Gift {
            gift: "rose".to_string(),
            effect: "Test explosion".to_string(),
            tag: "test".to_string(),
            points_added: 0,
            new_total: 0,
        },
        "TestUser sent rose: Test explosion",
    )
    .with_user("TestUser")
}
