//! Command dispatcher.
//!
//! Classifies inbound events, runs the matching handler against the session
//! store and produces the notifications to broadcast. Every handled event
//! also leaves exactly one entry in the event log, written after the handler
//! has built its notification.

use crate::command::{CommandKind, CommandTable, ParsedCommand};
use crate::lookup::{gift_award, GameConfig};
use crate::state::SessionStore;
use hub_protocol::{
    clip_message, Ability, EventLogEntry, InboundEvent, LogCategory, Notification,
    NotificationBody,
};
use std::sync::Arc;
use tracing::{debug, trace};

/// Rows in the leaderboard reply.
pub const LEADERBOARD_SIZE: usize = 5;

/// Log entries in the `events` reply.
pub const EVENTS_REPLY_SIZE: usize = 10;

/// Turns inbound events into state changes and notifications.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    lookup: Arc<GameConfig>,
    commands: CommandTable,
}

impl Dispatcher {
    /// Create a dispatcher over the given tables.
    #[must_use]
    pub fn new(lookup: Arc<GameConfig>, commands: CommandTable) -> Self {
        Self { lookup, commands }
    }

    /// The game tables.
    #[must_use]
    pub fn lookup(&self) -> &Arc<GameConfig> {
        &self.lookup
    }

    /// The command alias table.
    #[must_use]
    pub fn commands(&self) -> &CommandTable {
        &self.commands
    }

    /// Handle one event.
    ///
    /// Mutates `store`, appends the event's log entry and returns the
    /// notifications in publish order.
    pub fn dispatch(&self, store: &mut SessionStore, event: &InboundEvent) -> Vec<Notification> {
        let (notification, category) = match event {
            InboundEvent::Chat { user, text } => match self.commands.parse_chat(text) {
                Some(command) => self.handle_command(store, user, &command),
                None => (chat(user, text), LogCategory::Chat),
            },
            InboundEvent::Command {
                user,
                command,
                args,
            } => {
                let command = self.commands.parse_split(command, args);
                self.handle_command(store, user, &command)
            }
            InboundEvent::Gift {
                user,
                gift,
                diamonds,
            } => (self.handle_gift(store, user, gift, *diamonds), LogCategory::Gift),
        };

        let log_user = notification
            .user
            .clone()
            .unwrap_or_else(|| event.user().trim().to_string());
        store.append_log(EventLogEntry::new(
            category,
            log_user,
            notification.message.clone(),
        ));

        debug!(
            kind = event.kind(),
            category = notification.category(),
            user = %event.user(),
            "Dispatched event"
        );
        vec![notification]
    }

    fn handle_gift(
        &self,
        store: &mut SessionStore,
        user: &str,
        gift: &str,
        diamonds: Option<u32>,
    ) -> Notification {
        let (gift_id, effect) = self.lookup.resolve_gift(gift);
        let points_added = gift_award(effect.points, diamonds);
        let handle = store.get_or_create_player(user).handle;
        let delta = i64::try_from(points_added).unwrap_or(i64::MAX);
        let new_total = store.adjust_points(&handle, delta);

        trace!(user = %handle, gift = %gift_id, points_added, new_total, "Gift awarded");

        let message = format!(
            "{handle} sent {gift_id}: {} (+{points_added} points, total {new_total})",
            effect.effect
        );
        Notification::new(
            NotificationBody::Gift {
                gift: gift_id,
                effect: effect.effect.clone(),
                tag: effect.tag.clone(),
                points_added,
                new_total,
            },
            message,
        )
        .with_user(handle)
    }

    fn handle_command(
        &self,
        store: &mut SessionStore,
        user: &str,
        command: &ParsedCommand,
    ) -> (Notification, LogCategory) {
        let handle = store.get_or_create_player(user).handle;

        let Some(kind) = command.kind else {
            debug!(user = %handle, command = %command.word, "Unknown command");
            let notification = Notification::new(
                NotificationBody::Unknown {
                    raw: command.raw.clone(),
                },
                format!("Unknown command: {}", command.raw),
            )
            .with_user(handle);
            return (notification, LogCategory::Command);
        };

        let (body, message, category) = match kind {
            CommandKind::Join => {
                let outcome = store.enqueue(&handle);
                let message = if outcome.already_queued {
                    format!("{handle} is already queued at position {}", outcome.position)
                } else {
                    format!("{handle} joined the queue at position {}", outcome.position)
                };
                let body = NotificationBody::QueueJoin {
                    position: outcome.position,
                    already_queued: outcome.already_queued,
                };
                (body, message, LogCategory::Command)
            }

            CommandKind::Leave => {
                let outcome = store.dequeue(&handle);
                let message = if outcome.removed {
                    format!("{handle} left the queue, {} waiting", outcome.new_size)
                } else {
                    format!("{handle} was not in the queue, {} waiting", outcome.new_size)
                };
                let body = NotificationBody::QueueLeave {
                    removed: outcome.removed,
                    queue_size: outcome.new_size,
                };
                (body, message, LogCategory::Command)
            }

            CommandKind::Points => {
                let points = store.get_or_create_player(&handle).points;
                (
                    NotificationBody::Points { points },
                    format!("{handle} has {points} Hog Points"),
                    LogCategory::Command,
                )
            }

            CommandKind::Boost | CommandKind::Explode => {
                let ability = if kind == CommandKind::Boost {
                    Ability::Boost
                } else {
                    Ability::Explode
                };
                let uses = store.record_ability(&handle, ability);
                (
                    NotificationBody::Ability { ability, uses },
                    format!("{handle} {}", ability.verb()),
                    LogCategory::Ability,
                )
            }

            CommandKind::Class => {
                let class = store.get_or_create_player(&handle).class;
                let message = match &class {
                    Some(id) => format!("{handle}'s hog is {}", self.class_name(id)),
                    None => format!("{handle}'s hog is none"),
                };
                (NotificationBody::Class { class }, message, LogCategory::Command)
            }

            CommandKind::SetClass => {
                let (body, message) = self.set_class(store, &handle, command.args.first());
                (body, message, LogCategory::Command)
            }

            CommandKind::Help => {
                let commands = self.lookup.commands.clone();
                let syntax: Vec<&str> = commands.iter().map(|c| c.syntax.as_str()).collect();
                let message = format!("Commands: {}", syntax.join(", "));
                (
                    NotificationBody::Help { commands },
                    message,
                    LogCategory::Command,
                )
            }

            CommandKind::GiftInfo => {
                let gifts = self.lookup.gift_listings();
                let rows: Vec<String> = gifts
                    .iter()
                    .map(|g| format!("{} -> {} (+{})", g.gift, g.effect, g.points))
                    .collect();
                let message = format!("Gifts: {}", rows.join(", "));
                (
                    NotificationBody::GiftInfo { gifts },
                    message,
                    LogCategory::Command,
                )
            }

            CommandKind::Maps => {
                let maps = self.lookup.maps.clone();
                let names: Vec<&str> = maps.iter().map(|m| m.name.as_str()).collect();
                let message = if names.is_empty() {
                    "No maps configured".to_string()
                } else {
                    format!("Rotation: {} maps - {}", names.len(), names.join(" / "))
                };
                (NotificationBody::Maps { maps }, message, LogCategory::Command)
            }

            CommandKind::Stats => {
                let player = store.get_or_create_player(&handle).record();
                let message = format!(
                    "{handle}: {} points, {} games, {} wins, {} losses, hog {}",
                    player.points,
                    player.games_played,
                    player.wins,
                    player.losses,
                    player.class.as_deref().unwrap_or("none")
                );
                (
                    NotificationBody::Stats { player },
                    message,
                    LogCategory::Command,
                )
            }

            CommandKind::Leaderboard => {
                let entries = store.leaderboard(LEADERBOARD_SIZE);
                let rows: Vec<String> = entries
                    .iter()
                    .map(|e| format!("{}. {} ({})", e.rank, e.user, e.points))
                    .collect();
                let message = format!("Leaderboard: {}", rows.join(", "));
                (
                    NotificationBody::Leaderboard { entries },
                    message,
                    LogCategory::Command,
                )
            }

            CommandKind::Events => {
                let events = store.recent_log(EVENTS_REPLY_SIZE);
                let message = format!("Last {} events", events.len());
                (
                    NotificationBody::Events { events },
                    message,
                    LogCategory::Command,
                )
            }
        };

        trace!(user = %handle, command = kind.name(), "Handled command");
        (Notification::new(body, message).with_user(handle), category)
    }

    fn set_class(
        &self,
        store: &mut SessionStore,
        handle: &str,
        requested: Option<&String>,
    ) -> (NotificationBody, String) {
        let available = self.lookup.class_ids();
        let failure = |reason: String| {
            let message = format!("{handle}: {reason}. Available: {}", available.join(", "));
            (
                NotificationBody::ClassSet {
                    success: false,
                    class: None,
                    reason: Some(reason),
                    available: available.clone(),
                },
                message,
            )
        };

        let Some(requested) = requested else {
            return failure("missing class id, usage: sethog <class>".to_string());
        };

        match self.lookup.find_class(requested) {
            Some(class) => {
                let record = store.set_class(handle, &class.id);
                let message = format!("{handle} picked {}", class.name);
                (
                    NotificationBody::ClassSet {
                        success: true,
                        class: record.class,
                        reason: None,
                        available: available.clone(),
                    },
                    message,
                )
            }
            None => {
                debug!(user = %handle, class = %requested, "Rejected class");
                failure(format!("'{requested}' is not a valid class"))
            }
        }
    }

    fn class_name<'a>(&'a self, id: &'a str) -> &'a str {
        self.lookup
            .find_class(id)
            .map(|c| c.name.as_str())
            .unwrap_or(id)
    }
}

fn chat(user: &str, text: &str) -> Notification {
    let text = clip_message(text);
    Notification::new(
        NotificationBody::Chat {
            text: text.to_string(),
        },
        text,
    )
    .with_user(user.trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::GiftEffect;

    fn dispatcher() -> Dispatcher {
        let mut lookup = GameConfig::default();
        lookup.gifts.insert(
            "rose".to_string(),
            GiftEffect {
                effect: "Small explosion".to_string(),
                points: 5,
                tag: "small".to_string(),
            },
        );
        Dispatcher::new(Arc::new(lookup), CommandTable::default())
    }

    fn one(notifications: Vec<Notification>) -> Notification {
        assert_eq!(notifications.len(), 1);
        notifications.into_iter().next().unwrap()
    }

    #[test]
    fn test_play_twice() {
        let dispatcher = dispatcher();
        let mut store = SessionStore::new();

        let first = one(dispatcher.dispatch(&mut store, &InboundEvent::chat("Alice", "!play")));
        assert_eq!(
            first.body,
            NotificationBody::QueueJoin {
                position: 1,
                already_queued: false
            }
        );
        assert_eq!(first.user.as_deref(), Some("Alice"));
        assert!(first.message.contains("position 1"));

        let second = one(dispatcher.dispatch(&mut store, &InboundEvent::chat("Alice", "!play")));
        assert_eq!(
            second.body,
            NotificationBody::QueueJoin {
                position: 1,
                already_queued: true
            }
        );
        assert!(second.message.contains("already queued at position 1"));
        assert_eq!(store.queue_len(), 1);
    }

    #[test]
    fn test_command_event_and_chat_share_a_path() {
        let dispatcher = dispatcher();
        let mut store = SessionStore::new();

        dispatcher.dispatch(&mut store, &InboundEvent::command("bob", "join", vec![]));
        let n = one(dispatcher.dispatch(&mut store, &InboundEvent::chat("BOB", "!queue")));
        assert!(matches!(
            n.body,
            NotificationBody::QueueJoin {
                already_queued: true,
                ..
            }
        ));
    }

    #[test]
    fn test_leave() {
        let dispatcher = dispatcher();
        let mut store = SessionStore::new();
        dispatcher.dispatch(&mut store, &InboundEvent::chat("a", "!play"));
        dispatcher.dispatch(&mut store, &InboundEvent::chat("b", "!play"));

        let n = one(dispatcher.dispatch(&mut store, &InboundEvent::chat("A", "!l")));
        assert_eq!(
            n.body,
            NotificationBody::QueueLeave {
                removed: true,
                queue_size: 1
            }
        );
    }

    #[test]
    fn test_gift_awards_points() {
        let dispatcher = dispatcher();
        let mut store = SessionStore::new();

        let n = one(dispatcher.dispatch(&mut store, &InboundEvent::gift("Bob", "Rose", Some(1))));
        assert_eq!(n.user.as_deref(), Some("Bob"));
        assert_eq!(
            n.body,
            NotificationBody::Gift {
                gift: "rose".to_string(),
                effect: "Small explosion".to_string(),
                tag: "small".to_string(),
                points_added: 5,
                new_total: 5,
            }
        );
        assert_eq!(store.player("bob").unwrap().points, 5);
    }

    #[test]
    fn test_gift_scales_with_diamonds_and_falls_back() {
        let dispatcher = dispatcher();
        let mut store = SessionStore::new();

        dispatcher.dispatch(&mut store, &InboundEvent::gift("bob", "rose", Some(3)));
        assert_eq!(store.player("bob").unwrap().points, 15);

        let n = one(dispatcher.dispatch(&mut store, &InboundEvent::gift("bob", "Mystery", None)));
        match n.body {
            NotificationBody::Gift {
                gift, points_added, ..
            } => {
                assert_eq!(gift, "mystery");
                assert_eq!(points_added, dispatcher.lookup().gifts["default"].points);
            }
            other => panic!("Expected gift, got {:?}", other),
        }
    }

    #[test]
    fn test_sethog_invalid_class() {
        let dispatcher = dispatcher();
        let mut store = SessionStore::new();

        let n = one(dispatcher.dispatch(&mut store, &InboundEvent::chat("carol", "!sethog tank")));
        match &n.body {
            NotificationBody::ClassSet {
                success,
                reason,
                available,
                ..
            } => {
                assert!(!success);
                assert!(reason.as_deref().unwrap().contains("tank"));
                assert_eq!(available, &dispatcher.lookup().class_ids());
            }
            other => panic!("Expected class_set, got {:?}", other),
        }
        assert!(n.message.contains("bruiser"));
        assert_eq!(store.player("carol").unwrap().class, None);
    }

    #[test]
    fn test_sethog_missing_and_valid() {
        let dispatcher = dispatcher();
        let mut store = SessionStore::new();

        let n = one(dispatcher.dispatch(&mut store, &InboundEvent::chat("dan", "!pickhog")));
        assert!(matches!(
            n.body,
            NotificationBody::ClassSet { success: false, .. }
        ));

        let n = one(dispatcher.dispatch(&mut store, &InboundEvent::chat("dan", "!sethog SCOUT")));
        assert!(matches!(
            n.body,
            NotificationBody::ClassSet { success: true, .. }
        ));
        assert_eq!(store.player("dan").unwrap().class.as_deref(), Some("scout"));

        let n = one(dispatcher.dispatch(&mut store, &InboundEvent::chat("dan", "!hog")));
        assert_eq!(
            n.body,
            NotificationBody::Class {
                class: Some("scout".to_string())
            }
        );
    }

    #[test]
    fn test_leaderboard_order() {
        let dispatcher = dispatcher();
        let mut store = SessionStore::new();
        store.adjust_points("Bob", 10);
        store.adjust_points("Alice", 30);
        store.adjust_points("Carol", 20);

        let n = one(dispatcher.dispatch(&mut store, &InboundEvent::chat("Bob", "!leaderboard")));
        match n.body {
            NotificationBody::Leaderboard { entries } => {
                let rows: Vec<_> = entries.iter().map(|e| (e.user.as_str(), e.points)).collect();
                assert_eq!(rows, vec![("Alice", 30), ("Carol", 20), ("Bob", 10)]);
            }
            other => panic!("Expected leaderboard, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_command() {
        let dispatcher = dispatcher();
        let mut store = SessionStore::new();

        let n = one(dispatcher.dispatch(&mut store, &InboundEvent::chat("eve", "!dance now")));
        assert_eq!(
            n.body,
            NotificationBody::Unknown {
                raw: "!dance now".to_string()
            }
        );
    }

    #[test]
    fn test_chat_logs_without_mutation() {
        let dispatcher = dispatcher();
        let mut store = SessionStore::new();

        let n = one(dispatcher.dispatch(&mut store, &InboundEvent::chat("frank", "gg")));
        assert!(n.is_low_priority());
        assert_eq!(store.player_count(), 0);
        assert_eq!(store.recent_log(1)[0].category, LogCategory::Chat);
    }

    #[test]
    fn test_every_event_is_logged() {
        let dispatcher = dispatcher();
        let mut store = SessionStore::new();

        dispatcher.dispatch(&mut store, &InboundEvent::chat("a", "hi"));
        dispatcher.dispatch(&mut store, &InboundEvent::chat("a", "!boost"));
        dispatcher.dispatch(&mut store, &InboundEvent::gift("a", "rose", None));
        dispatcher.dispatch(&mut store, &InboundEvent::chat("a", "!nope"));
        assert_eq!(store.log_len(), 4);

        let categories: Vec<_> = store.recent_log(4).iter().map(|e| e.category).collect();
        assert_eq!(
            categories,
            vec![
                LogCategory::Chat,
                LogCategory::Ability,
                LogCategory::Gift,
                LogCategory::Command
            ]
        );
    }

    #[test]
    fn test_events_reply_excludes_itself() {
        let dispatcher = dispatcher();
        let mut store = SessionStore::new();
        for i in 0..12 {
            dispatcher.dispatch(&mut store, &InboundEvent::chat("a", format!("line {i}")));
        }

        let n = one(dispatcher.dispatch(&mut store, &InboundEvent::chat("a", "!events")));
        match n.body {
            NotificationBody::Events { events } => {
                assert_eq!(events.len(), EVENTS_REPLY_SIZE);
                assert_eq!(events.last().unwrap().message, "line 11");
            }
            other => panic!("Expected events, got {:?}", other),
        }
        assert_eq!(store.recent_log(1)[0].message, "Last 10 events");
    }

    #[test]
    fn test_abilities_and_info_commands() {
        let dispatcher = dispatcher();
        let mut store = SessionStore::new();

        let n = one(dispatcher.dispatch(&mut store, &InboundEvent::chat("g", "!boom")));
        assert_eq!(
            n.body,
            NotificationBody::Ability {
                ability: Ability::Explode,
                uses: 1
            }
        );
        assert_eq!(n.message, "g used explosion");

        let n = one(dispatcher.dispatch(&mut store, &InboundEvent::chat("g", "!help")));
        assert!(matches!(n.body, NotificationBody::Help { ref commands } if !commands.is_empty()));

        let n = one(dispatcher.dispatch(&mut store, &InboundEvent::chat("g", "!gifts")));
        assert!(matches!(n.body, NotificationBody::GiftInfo { .. }));
        assert!(n.message.contains("rose -> Small explosion"));

        let n = one(dispatcher.dispatch(&mut store, &InboundEvent::chat("g", "!maps")));
        assert!(matches!(n.body, NotificationBody::Maps { ref maps } if maps.len() == 4));

        let n = one(dispatcher.dispatch(&mut store, &InboundEvent::chat("g", "!profile")));
        match n.body {
            NotificationBody::Stats { player } => {
                assert_eq!(player.user, "g");
                assert_eq!(player.abilities.explode, 1);
            }
            other => panic!("Expected stats, got {:?}", other),
        }

        let n = one(dispatcher.dispatch(&mut store, &InboundEvent::chat("g", "!score")));
        assert_eq!(n.body, NotificationBody::Points { points: 0 });
    }
}
