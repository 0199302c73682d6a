//! Plain data carried inside notifications and snapshots.
//!
//! These are owned copies of hub state. Nothing here references the live
//! session records, so a value can be shared with any number of subscribers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch.
#[must_use]
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

/// Longest chat or log message kept, in characters. Longer text is clipped.
pub const MAX_MESSAGE_CHARS: usize = 500;

/// Longest user handle accepted at the boundary, in characters.
pub const MAX_HANDLE_CHARS: usize = 64;

/// Clip `text` to at most [`MAX_MESSAGE_CHARS`] characters.
#[must_use]
pub fn clip_message(text: &str) -> &str {
    match text.char_indices().nth(MAX_MESSAGE_CHARS) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

/// A single place in the join queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueEntry {
    /// Display handle of the queued player.
    pub user: String,
    /// When the player joined, in epoch milliseconds.
    pub joined_at: u64,
}

/// Event log categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogCategory {
    Chat,
    Gift,
    Command,
    Ability,
    System,
}

impl LogCategory {
    /// Lowercase name, as it appears on the wire.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            LogCategory::Chat => "chat",
            LogCategory::Gift => "gift",
            LogCategory::Command => "command",
            LogCategory::Ability => "ability",
            LogCategory::System => "system",
        }
    }
}

impl fmt::Display for LogCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One line of the rolling event log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventLogEntry {
    pub timestamp: u64,
    pub category: LogCategory,
    pub user: String,
    pub message: String,
}

impl EventLogEntry {
    /// Create a log entry stamped with the current time.
    ///
    /// The message is clipped to [`MAX_MESSAGE_CHARS`].
    #[must_use]
    pub fn new(category: LogCategory, user: impl Into<String>, message: impl Into<String>) -> Self {
        let mut message = message.into();
        let clipped = clip_message(&message).len();
        message.truncate(clipped);
        Self {
            timestamp: now_millis(),
            category,
            user: user.into(),
            message,
        }
    }
}

/// Point-in-time copy of the session state handed to a new subscriber.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Queue in join order.
    pub queue: Vec<QueueEntry>,
    /// Point totals keyed by display handle.
    pub points: BTreeMap<String, u64>,
    /// Log entries, oldest first.
    pub recent_log: Vec<EventLogEntry>,
}

/// Ability usage counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilityCounts {
    pub boost: u64,
    pub explode: u64,
}

/// Abilities a player can trigger from chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ability {
    Boost,
    Explode,
}

impl Ability {
    /// Past-tense phrase used in notification text.
    #[must_use]
    pub fn verb(&self) -> &'static str {
        match self {
            Ability::Boost => "used boost",
            Ability::Explode => "used explosion",
        }
    }
}

/// Full copy of a player record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerRecord {
    pub user: String,
    pub points: u64,
    pub games_played: u64,
    pub wins: u64,
    pub losses: u64,
    pub class: Option<String>,
    pub abilities: AbilityCounts,
}

/// One leaderboard row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    /// 1-indexed rank.
    pub rank: usize,
    pub user: String,
    pub points: u64,
}

/// A map in the rotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapInfo {
    pub id: String,
    pub name: String,
}

/// A selectable character class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassInfo {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// Syntax line for one chat command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSyntax {
    pub syntax: String,
    #[serde(default)]
    pub description: String,
}

/// One row of the gift table as shown to viewers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GiftListing {
    pub gift: String,
    pub effect: String,
    pub points: u64,
    pub tag: String,
}
