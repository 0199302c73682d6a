//! Notifications fanned out to overlay clients.
//!
//! A notification is built once by the dispatcher and shared by every
//! subscriber. On the wire the category-specific fields sit next to the
//! common ones:
//!
//! ```json
//! {"category":"gift","gift":"rose","effect":"Small explosion",
//!  "tag":"small","pointsAdded":5,"newTotal":5,
//!  "user":"Bob","message":"Bob sent rose: Small explosion (+5)","timestamp":0}
//! ```

use serde::{Deserialize, Serialize};

use crate::payload::{
    now_millis, Ability, CommandSyntax, EventLogEntry, GiftListing, LeaderboardEntry, MapInfo,
    PlayerRecord,
};

/// Category-specific part of a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "category", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum NotificationBody {
    /// Join attempt; `already_queued` is set when nothing changed.
    QueueJoin { position: usize, already_queued: bool },
    /// Leave attempt.
    QueueLeave { removed: bool, queue_size: usize },
    Points { points: u64 },
    Ability { ability: Ability, uses: u64 },
    Class { class: Option<String> },
    /// Result of a class selection. `reason` is set on failure.
    ClassSet {
        success: bool,
        class: Option<String>,
        reason: Option<String>,
        available: Vec<String>,
    },
    Help { commands: Vec<CommandSyntax> },
    GiftInfo { gifts: Vec<GiftListing> },
    Maps { maps: Vec<MapInfo> },
    Stats { player: PlayerRecord },
    Leaderboard { entries: Vec<LeaderboardEntry> },
    Events { events: Vec<EventLogEntry> },
    Unknown { raw: String },
    Gift {
        gift: String,
        effect: String,
        tag: String,
        points_added: u64,
        new_total: u64,
    },
    Chat { text: String },
}

impl NotificationBody {
    /// Wire name of the category.
    #[must_use]
    pub fn category(&self) -> &'static str {
        match self {
            NotificationBody::QueueJoin { .. } => "queue_join",
            NotificationBody::QueueLeave { .. } => "queue_leave",
            NotificationBody::Points { .. } => "points",
            NotificationBody::Ability { .. } => "ability",
            NotificationBody::Class { .. } => "class",
            NotificationBody::ClassSet { .. } => "class_set",
            NotificationBody::Help { .. } => "help",
            NotificationBody::GiftInfo { .. } => "gift_info",
            NotificationBody::Maps { .. } => "maps",
            NotificationBody::Stats { .. } => "stats",
            NotificationBody::Leaderboard { .. } => "leaderboard",
            NotificationBody::Events { .. } => "events",
            NotificationBody::Unknown { .. } => "unknown",
            NotificationBody::Gift { .. } => "gift",
            NotificationBody::Chat { .. } => "chat",
        }
    }
}

/// An immutable state-change message for subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    #[serde(flatten)]
    pub body: NotificationBody,
    /// The user the notification is about, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    /// Human-readable summary.
    pub message: String,
    /// Creation time in epoch milliseconds.
    pub timestamp: u64,
}

impl Notification {
    /// Create a notification stamped with the current time.
    #[must_use]
    pub fn new(body: NotificationBody, message: impl Into<String>) -> Self {
        Self {
            body,
            user: None,
            message: message.into(),
            timestamp: now_millis(),
        }
    }

    /// Attach the target user.
    #[must_use]
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    /// Wire name of the category.
    #[must_use]
    pub fn category(&self) -> &'static str {
        self.body.category()
    }

    /// Chat notifications are low priority; overlays may skip them.
    #[must_use]
    pub fn is_low_priority(&self) -> bool {
        matches!(self.body, NotificationBody::Chat { .. })
    }
}
