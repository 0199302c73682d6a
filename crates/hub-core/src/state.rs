//! Session state store.
//!
//! The store is the single source of truth for players, the join queue and
//! the rolling event log. Every operation takes `&mut self` and completes
//! without I/O; the [`Hub`](crate::hub::Hub) serializes access behind one
//! mutex, so each operation is atomic with respect to every other.
//!
//! Nothing here hands out references into the live records. Reads return
//! owned copies.

use hub_protocol::{
    now_millis, Ability, AbilityCounts, EventLogEntry, LeaderboardEntry, PlayerRecord, QueueEntry,
    Snapshot,
};
use std::collections::{HashMap, VecDeque};
use tracing::{debug, trace};

/// Default event log capacity.
pub const DEFAULT_LOG_CAPACITY: usize = 50;

/// Largest event log capacity. Together with the clipped message length this
/// keeps the snapshot's log well inside one stream frame.
pub const MAX_LOG_CAPACITY: usize = 200;

/// Normalize a handle into its map key.
fn handle_key(handle: &str) -> String {
    handle.trim().to_lowercase()
}

/// A viewer known to the hub.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    /// Handle as first seen.
    pub handle: String,
    pub points: u64,
    pub games_played: u64,
    pub wins: u64,
    pub losses: u64,
    /// Selected class id, if any.
    pub class: Option<String>,
    pub abilities: AbilityCounts,
    /// Creation order, used to break leaderboard ties.
    created_seq: u64,
}

impl Player {
    fn new(handle: &str, created_seq: u64) -> Self {
        Self {
            handle: handle.trim().to_string(),
            points: 0,
            games_played: 0,
            wins: 0,
            losses: 0,
            class: None,
            abilities: AbilityCounts::default(),
            created_seq,
        }
    }

    /// Position in creation order (0 for the first player ever seen).
    #[must_use]
    pub fn created_seq(&self) -> u64 {
        self.created_seq
    }

    /// Wire copy of this player.
    #[must_use]
    pub fn record(&self) -> PlayerRecord {
        PlayerRecord {
            user: self.handle.clone(),
            points: self.points,
            games_played: self.games_played,
            wins: self.wins,
            losses: self.losses,
            class: self.class.clone(),
            abilities: self.abilities,
        }
    }
}

/// Result of [`SessionStore::enqueue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnqueueOutcome {
    /// 1-indexed queue position.
    pub position: usize,
    /// The handle was already queued; nothing changed.
    pub already_queued: bool,
}

/// Result of [`SessionStore::dequeue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DequeueOutcome {
    pub removed: bool,
    pub new_size: usize,
}

/// The authoritative session state.
#[derive(Debug)]
pub struct SessionStore {
    players: HashMap<String, Player>,
    next_seq: u64,
    queue: Vec<QueueEntry>,
    log: VecDeque<EventLogEntry>,
    log_capacity: usize,
}

impl SessionStore {
    /// Create an empty store with the default log capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_log_capacity(DEFAULT_LOG_CAPACITY)
    }

    /// Create an empty store with a specific log capacity, clamped to
    /// `1..=MAX_LOG_CAPACITY`.
    #[must_use]
    pub fn with_log_capacity(log_capacity: usize) -> Self {
        let log_capacity = log_capacity.clamp(1, MAX_LOG_CAPACITY);
        Self {
            players: HashMap::new(),
            next_seq: 0,
            queue: Vec::new(),
            log: VecDeque::with_capacity(log_capacity),
            log_capacity,
        }
    }

    fn player_mut(&mut self, handle: &str) -> &mut Player {
        let key = handle_key(handle);
        let next_seq = &mut self.next_seq;
        self.players.entry(key).or_insert_with(|| {
            let player = Player::new(handle, *next_seq);
            *next_seq += 1;
            debug!(user = %player.handle, "Created player");
            player
        })
    }

    /// Get a copy of the player, creating it on first sight.
    pub fn get_or_create_player(&mut self, handle: &str) -> Player {
        self.player_mut(handle).clone()
    }

    /// Get a copy of an existing player.
    #[must_use]
    pub fn player(&self, handle: &str) -> Option<Player> {
        self.players.get(&handle_key(handle)).cloned()
    }

    /// Add `delta` to a player's points, clamping at zero.
    ///
    /// Returns the new total.
    pub fn adjust_points(&mut self, handle: &str, delta: i64) -> u64 {
        let player = self.player_mut(handle);
        player.points = if delta >= 0 {
            player.points.saturating_add(delta.unsigned_abs())
        } else {
            player.points.saturating_sub(delta.unsigned_abs())
        };
        trace!(user = %player.handle, delta, total = player.points, "Adjusted points");
        player.points
    }

    /// Add a handle to the tail of the queue unless it is already there.
    pub fn enqueue(&mut self, handle: &str) -> EnqueueOutcome {
        if let Some(index) = self.queue_index(handle) {
            return EnqueueOutcome {
                position: index + 1,
                already_queued: true,
            };
        }

        let user = self.player_mut(handle).handle.clone();
        self.queue.push(QueueEntry {
            user,
            joined_at: now_millis(),
        });
        EnqueueOutcome {
            position: self.queue.len(),
            already_queued: false,
        }
    }

    /// Remove a handle from the queue if present.
    pub fn dequeue(&mut self, handle: &str) -> DequeueOutcome {
        let removed = match self.queue_index(handle) {
            Some(index) => {
                self.queue.remove(index);
                true
            }
            None => false,
        };
        DequeueOutcome {
            removed,
            new_size: self.queue.len(),
        }
    }

    fn queue_index(&self, handle: &str) -> Option<usize> {
        let handle = handle.trim();
        self.queue
            .iter()
            .position(|entry| entry.user.to_lowercase() == handle.to_lowercase())
    }

    /// Current queue length.
    #[must_use]
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Append a log entry, evicting the oldest entries beyond capacity.
    pub fn append_log(&mut self, entry: EventLogEntry) {
        self.log.push_back(entry);
        while self.log.len() > self.log_capacity {
            self.log.pop_front();
        }
    }

    /// The last `n` log entries, oldest first.
    #[must_use]
    pub fn recent_log(&self, n: usize) -> Vec<EventLogEntry> {
        let skip = self.log.len().saturating_sub(n);
        self.log.iter().skip(skip).cloned().collect()
    }

    /// Number of entries currently in the log.
    #[must_use]
    pub fn log_len(&self) -> usize {
        self.log.len()
    }

    /// Configured log capacity.
    #[must_use]
    pub fn log_capacity(&self) -> usize {
        self.log_capacity
    }

    /// Set a player's class. The caller validates the id.
    pub fn set_class(&mut self, handle: &str, class_id: &str) -> PlayerRecord {
        let player = self.player_mut(handle);
        player.class = Some(class_id.to_string());
        player.record()
    }

    /// Count one use of an ability. Returns the player's new use count.
    pub fn record_ability(&mut self, handle: &str, ability: Ability) -> u64 {
        let abilities = &mut self.player_mut(handle).abilities;
        let counter = match ability {
            Ability::Boost => &mut abilities.boost,
            Ability::Explode => &mut abilities.explode,
        };
        *counter += 1;
        *counter
    }

    /// Top `n` players by points, ties broken by creation order.
    #[must_use]
    pub fn leaderboard(&self, n: usize) -> Vec<LeaderboardEntry> {
        let mut players: Vec<&Player> = self.players.values().collect();
        players.sort_by(|a, b| {
            b.points
                .cmp(&a.points)
                .then(a.created_seq.cmp(&b.created_seq))
        });
        players
            .into_iter()
            .take(n)
            .enumerate()
            .map(|(i, p)| LeaderboardEntry {
                rank: i + 1,
                user: p.handle.clone(),
                points: p.points,
            })
            .collect()
    }

    /// Number of known players.
    #[must_use]
    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// Consistent copy of queue, points and log.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            queue: self.queue.clone(),
            points: self
                .players
                .values()
                .map(|p| (p.handle.clone(), p.points))
                .collect(),
            recent_log: self.log.iter().cloned().collect(),
        }
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hub_protocol::LogCategory;

    #[test]
    fn test_get_or_create_is_idempotent() {
        let mut store = SessionStore::new();
        let first = store.get_or_create_player("Alice");
        let again = store.get_or_create_player("ALICE");
        assert_eq!(first, again);
        assert_eq!(again.handle, "Alice");
        assert_eq!(store.player_count(), 1);
    }

    #[test]
    fn test_adjust_points_clamps_at_zero() {
        let mut store = SessionStore::new();
        assert_eq!(store.adjust_points("bob", 5), 5);
        assert_eq!(store.adjust_points("bob", -3), 2);
        assert_eq!(store.adjust_points("bob", -100), 0);
        assert_eq!(store.adjust_points("bob", i64::MIN), 0);
        assert_eq!(store.adjust_points("bob", 7), 7);
    }

    #[test]
    fn test_enqueue_exactly_once() {
        let mut store = SessionStore::new();
        assert_eq!(
            store.enqueue("alice"),
            EnqueueOutcome {
                position: 1,
                already_queued: false
            }
        );
        assert_eq!(store.enqueue("bob").position, 2);

        for _ in 0..5 {
            let outcome = store.enqueue("Alice");
            assert!(outcome.already_queued);
            assert_eq!(outcome.position, 1);
        }

        assert_eq!(store.queue_len(), 2);
        assert_eq!(store.enqueue("carol").position, 3);
    }

    #[test]
    fn test_dequeue_case_insensitive() {
        let mut store = SessionStore::new();
        store.enqueue("Alice");
        store.enqueue("Bob");

        let outcome = store.dequeue("alice");
        assert!(outcome.removed);
        assert_eq!(outcome.new_size, 1);

        let outcome = store.dequeue("alice");
        assert!(!outcome.removed);
        assert_eq!(outcome.new_size, 1);

        assert_eq!(store.enqueue("bob").position, 1);
    }

    #[test]
    fn test_log_is_bounded() {
        let mut store = SessionStore::with_log_capacity(3);
        for i in 0..10 {
            store.append_log(EventLogEntry::new(LogCategory::Chat, "u", format!("m{i}")));
            assert!(store.log_len() <= 3);
        }

        let recent = store.recent_log(10);
        let messages: Vec<_> = recent.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, vec!["m7", "m8", "m9"]);
        assert_eq!(store.recent_log(1)[0].message, "m9");
    }

    #[test]
    fn test_log_capacity_clamped() {
        assert_eq!(SessionStore::with_log_capacity(0).log_capacity(), 1);
        assert_eq!(
            SessionStore::with_log_capacity(100_000).log_capacity(),
            MAX_LOG_CAPACITY
        );
        assert_eq!(SessionStore::with_log_capacity(20).log_capacity(), 20);
    }

    #[test]
    fn test_leaderboard_order_and_ties() {
        let mut store = SessionStore::new();
        store.adjust_points("Alice", 10);
        store.adjust_points("Bob", 30);
        store.adjust_points("Carol", 20);
        store.adjust_points("Dave", 30);

        let board = store.leaderboard(5);
        let names: Vec<_> = board.iter().map(|e| e.user.as_str()).collect();
        assert_eq!(names, vec!["Bob", "Dave", "Carol", "Alice"]);
        assert_eq!(board[0].rank, 1);
        assert_eq!(store.leaderboard(2).len(), 2);
    }

    #[test]
    fn test_abilities_and_class() {
        let mut store = SessionStore::new();
        assert_eq!(store.record_ability("eve", Ability::Boost), 1);
        assert_eq!(store.record_ability("eve", Ability::Boost), 2);
        assert_eq!(store.record_ability("eve", Ability::Explode), 1);

        let record = store.set_class("eve", "scout");
        assert_eq!(record.class.as_deref(), Some("scout"));
        assert_eq!(record.abilities.boost, 2);
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let mut store = SessionStore::new();
        store.enqueue("Alice");
        store.adjust_points("Alice", 4);
        store.append_log(EventLogEntry::new(LogCategory::Command, "Alice", "joined"));

        let snapshot = store.snapshot();
        store.dequeue("Alice");
        store.adjust_points("Alice", 10);

        assert_eq!(snapshot.queue.len(), 1);
        assert_eq!(snapshot.points["Alice"], 4);
        assert_eq!(snapshot.recent_log.len(), 1);
    }
}
