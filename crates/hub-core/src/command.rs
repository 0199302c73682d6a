//! Chat command parsing.
//!
//! Commands reach the hub two ways: as chat text starting with the command
//! prefix, or as pre-split `command` events from the connector. Both are
//! turned into a [`ParsedCommand`] here and handled by one code path.

use std::collections::HashMap;

/// Default command prefix.
pub const DEFAULT_PREFIX: char = '!';

/// The closed set of commands the dispatcher understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Join,
    Leave,
    Points,
    Boost,
    Explode,
    Class,
    SetClass,
    Help,
    GiftInfo,
    Maps,
    Stats,
    Leaderboard,
    Events,
}

impl CommandKind {
    /// Every command with its aliases.
    pub const ALIASES: &'static [(CommandKind, &'static [&'static str])] = &[
        (CommandKind::Join, &["play", "join", "queue"]),
        (CommandKind::Leave, &["leave", "quit", "l"]),
        (CommandKind::Points, &["points", "score", "p"]),
        (CommandKind::Boost, &["boost"]),
        (CommandKind::Explode, &["explode", "boom"]),
        (CommandKind::Class, &["hog", "class"]),
        (CommandKind::SetClass, &["sethog", "pickhog"]),
        (CommandKind::Help, &["help", "commands"]),
        (CommandKind::GiftInfo, &["giftinfo", "gifts"]),
        (CommandKind::Maps, &["maps", "map"]),
        (CommandKind::Stats, &["stats", "profile"]),
        (CommandKind::Leaderboard, &["top", "leaderboard"]),
        (CommandKind::Events, &["events"]),
    ];

    /// Canonical name, used in logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            CommandKind::Join => "join",
            CommandKind::Leave => "leave",
            CommandKind::Points => "points",
            CommandKind::Boost => "boost",
            CommandKind::Explode => "explode",
            CommandKind::Class => "class",
            CommandKind::SetClass => "sethog",
            CommandKind::Help => "help",
            CommandKind::GiftInfo => "giftinfo",
            CommandKind::Maps => "maps",
            CommandKind::Stats => "stats",
            CommandKind::Leaderboard => "leaderboard",
            CommandKind::Events => "events",
        }
    }
}

/// A command split into its word and arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    /// Resolved command, or `None` if the word matched no alias.
    pub kind: Option<CommandKind>,
    /// Lowercased command word without the prefix.
    pub word: String,
    pub args: Vec<String>,
    /// The text as received, for echoing back.
    pub raw: String,
}

/// Alias table, built once.
#[derive(Debug, Clone)]
pub struct CommandTable {
    prefix: char,
    aliases: HashMap<&'static str, CommandKind>,
}

impl CommandTable {
    /// Build the table with the given prefix.
    #[must_use]
    pub fn new(prefix: char) -> Self {
        let aliases = CommandKind::ALIASES
            .iter()
            .flat_map(|(kind, words)| words.iter().map(move |w| (*w, *kind)))
            .collect();
        Self { prefix, aliases }
    }

    /// The command prefix.
    #[must_use]
    pub fn prefix(&self) -> char {
        self.prefix
    }

    /// Look up a command word, ignoring case and a leading prefix.
    #[must_use]
    pub fn resolve(&self, word: &str) -> Option<CommandKind> {
        let word = word.trim().trim_start_matches(self.prefix).to_lowercase();
        self.aliases.get(word.as_str()).copied()
    }

    /// Parse chat text. Returns `None` if the text is not a command.
    #[must_use]
    pub fn parse_chat(&self, text: &str) -> Option<ParsedCommand> {
        let trimmed = text.trim();
        let body = trimmed.strip_prefix(self.prefix)?;
        let mut parts = body.split_whitespace();
        let word = parts.next()?.to_string();
        let args = parts.map(str::to_string).collect();
        Some(self.build(word, args, trimmed.to_string()))
    }

    /// Parse a pre-split command event.
    ///
    /// The connector may send the whole line in `command`; anything after
    /// the first word is treated as leading arguments.
    #[must_use]
    pub fn parse_split(&self, command: &str, args: &[String]) -> ParsedCommand {
        let trimmed = command.trim();
        let body = trimmed.strip_prefix(self.prefix).unwrap_or(trimmed);
        let mut parts = body.split_whitespace();
        let word = parts.next().unwrap_or_default().to_string();
        let all_args: Vec<String> = parts
            .map(str::to_string)
            .chain(args.iter().cloned())
            .collect();

        let mut raw = format!("{}{}", self.prefix, body);
        for arg in args {
            raw.push(' ');
            raw.push_str(arg);
        }
        self.build(word, all_args, raw)
    }

    fn build(&self, word: String, args: Vec<String>, raw: String) -> ParsedCommand {
        let word = word.to_lowercase();
        ParsedCommand {
            kind: self.aliases.get(word.as_str()).copied(),
            word,
            args,
            raw,
        }
    }
}

impl Default for CommandTable {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_alias_resolves() {
        let table = CommandTable::default();
        for (kind, words) in CommandKind::ALIASES {
            for word in *words {
                assert_eq!(table.resolve(word), Some(*kind), "alias {word}");
            }
        }
    }

    #[test]
    fn test_resolve_ignores_case_and_prefix() {
        let table = CommandTable::default();
        assert_eq!(table.resolve("!PLAY"), Some(CommandKind::Join));
        assert_eq!(table.resolve("Leaderboard"), Some(CommandKind::Leaderboard));
        assert_eq!(table.resolve("dance"), None);
    }

    #[test]
    fn test_parse_chat() {
        let table = CommandTable::default();
        let parsed = table.parse_chat("  !SetHog  Scout extra ").unwrap();
        assert_eq!(parsed.kind, Some(CommandKind::SetClass));
        assert_eq!(parsed.word, "sethog");
        assert_eq!(parsed.args, vec!["Scout", "extra"]);
        assert_eq!(parsed.raw, "!SetHog  Scout extra");

        assert!(table.parse_chat("hello there").is_none());
        assert!(table.parse_chat("!").is_none());
    }

    #[test]
    fn test_parse_split_matches_chat() {
        let table = CommandTable::default();
        let from_chat = table.parse_chat("!sethog scout").unwrap();
        let from_event = table.parse_split("sethog", &["scout".to_string()]);
        assert_eq!(from_chat, from_event);

        let whole_line = table.parse_split("!sethog scout", &[]);
        assert_eq!(whole_line.kind, Some(CommandKind::SetClass));
        assert_eq!(whole_line.args, vec!["scout"]);
    }

    #[test]
    fn test_custom_prefix() {
        let table = CommandTable::new('/');
        assert!(table.parse_chat("!play").is_none());
        assert_eq!(
            table.parse_chat("/play").unwrap().kind,
            Some(CommandKind::Join)
        );
    }
}
