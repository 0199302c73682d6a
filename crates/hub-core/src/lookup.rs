//! Read-only game tables.
//!
//! Maps, classes, command syntax and the gift table are loaded once at
//! startup and shared behind an `Arc`. Nothing in the hub mutates them.

use hub_protocol::{ClassInfo, CommandSyntax, GiftListing, MapInfo};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

/// Key of the mandatory fallback gift.
pub const DEFAULT_GIFT: &str = "default";

/// Lookup table errors.
#[derive(Debug, Error)]
pub enum LookupError {
    /// The gift table has no `default` entry.
    #[error("Gift table is missing the mandatory '{DEFAULT_GIFT}' entry")]
    MissingDefaultGift,

    /// Two classes share an id (case-insensitive).
    #[error("Duplicate class id: {0}")]
    DuplicateClass(String),

    /// Two gift keys differ only in case.
    #[error("Duplicate gift key: {0}")]
    DuplicateGift(String),

    /// The tables file could not be read.
    #[error("Failed to read game config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The tables file could not be parsed.
    #[error("Failed to parse game config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// What a gift does and what it is worth.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GiftEffect {
    /// Effect text shown on the overlay.
    #[serde(alias = "effectText")]
    pub effect: String,
    /// Base points awarded per gift.
    pub points: u64,
    /// Short tag the overlay uses to pick an animation.
    #[serde(default)]
    pub tag: String,
}

/// Points awarded for a gift.
///
/// Linear in the diamond count; a missing or zero count counts as one gift.
#[must_use]
pub fn gift_award(base_points: u64, diamonds: Option<u32>) -> u64 {
    let multiplier = u64::from(diamonds.unwrap_or(1).max(1));
    base_points.saturating_mul(multiplier)
}

/// The game tables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    /// Map rotation, in order.
    #[serde(default)]
    pub maps: Vec<MapInfo>,
    /// Selectable classes.
    #[serde(default)]
    pub classes: Vec<ClassInfo>,
    /// Command syntax lines for `help`.
    #[serde(default)]
    pub commands: Vec<CommandSyntax>,
    /// Gift table keyed by lowercase gift name.
    pub gifts: BTreeMap<String, GiftEffect>,
}

impl GameConfig {
    /// Parse tables from TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid, the `default` gift is
    /// missing, or class ids collide.
    pub fn from_toml_str(contents: &str) -> Result<Self, LookupError> {
        let config: GameConfig = toml::from_str(contents)?;
        config.normalized()
    }

    /// Load tables from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or fails validation.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, LookupError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| LookupError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_toml_str(&contents)?;
        info!(
            path = %path.display(),
            maps = config.maps.len(),
            classes = config.classes.len(),
            gifts = config.gifts.len(),
            "Loaded game config"
        );
        Ok(config)
    }

    /// Lowercase gift keys and check invariants.
    fn normalized(mut self) -> Result<Self, LookupError> {
        let mut gifts = BTreeMap::new();
        for (key, effect) in std::mem::take(&mut self.gifts) {
            let normalized = key.trim().to_lowercase();
            if gifts.insert(normalized, effect).is_some() {
                return Err(LookupError::DuplicateGift(key));
            }
        }
        self.gifts = gifts;

        if !self.gifts.contains_key(DEFAULT_GIFT) {
            return Err(LookupError::MissingDefaultGift);
        }

        let mut seen = std::collections::HashSet::new();
        for class in &mut self.classes {
            if !seen.insert(class.id.to_lowercase()) {
                return Err(LookupError::DuplicateClass(class.id.clone()));
            }
            if class.name.is_empty() {
                class.name = class.id.clone();
            }
        }

        Ok(self)
    }

    /// Resolve a gift by name, falling back to the `default` entry.
    ///
    /// Returns the lowercase gift id together with its effect.
    #[must_use]
    pub fn resolve_gift(&self, name: &str) -> (String, &GiftEffect) {
        let key = name.trim().to_lowercase();
        match self.gifts.get(&key) {
            Some(effect) => (key, effect),
            None => {
                debug!(gift = %key, "Unknown gift, using default");
                // `normalized` guarantees the default entry; the builtin
                // table carries one too.
                let effect = self
                    .gifts
                    .get(DEFAULT_GIFT)
                    .unwrap_or_else(|| builtin_default_gift());
                (key, effect)
            }
        }
    }

    /// Find a class by id, ignoring case.
    #[must_use]
    pub fn find_class(&self, id: &str) -> Option<&ClassInfo> {
        let id = id.trim().to_lowercase();
        self.classes.iter().find(|c| c.id.to_lowercase() == id)
    }

    /// All class ids, in table order.
    #[must_use]
    pub fn class_ids(&self) -> Vec<String> {
        self.classes.iter().map(|c| c.id.clone()).collect()
    }

    /// Gift table rows for display, sorted by gift id.
    #[must_use]
    pub fn gift_listings(&self) -> Vec<GiftListing> {
        self.gifts
            .iter()
            .map(|(gift, effect)| GiftListing {
                gift: gift.clone(),
                effect: effect.effect.clone(),
                points: effect.points,
                tag: effect.tag.clone(),
            })
            .collect()
    }
}

fn builtin_default_gift() -> &'static GiftEffect {
    static DEFAULT: std::sync::OnceLock<GiftEffect> = std::sync::OnceLock::new();
    DEFAULT.get_or_init(|| GiftEffect {
        effect: "Hog cheer".to_string(),
        points: 1,
        tag: "cheer".to_string(),
    })
}

fn map(id: &str, name: &str) -> MapInfo {
    MapInfo {
        id: id.to_string(),
        name: name.to_string(),
    }
}

fn class(id: &str, name: &str, description: &str) -> ClassInfo {
    ClassInfo {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
    }
}

fn syntax(syntax: &str, description: &str) -> CommandSyntax {
    CommandSyntax {
        syntax: syntax.to_string(),
        description: description.to_string(),
    }
}

fn gift(effect: &str, points: u64, tag: &str) -> GiftEffect {
    GiftEffect {
        effect: effect.to_string(),
        points,
        tag: tag.to_string(),
    }
}

impl Default for GameConfig {
    /// The stock Hog Royale tables.
    fn default() -> Self {
        let gifts = [
            ("default", builtin_default_gift().clone()),
            ("rose", gift("Small explosion", 5, "small")),
            ("heart", gift("Heal the squad", 10, "heal")),
            ("tiktok", gift("Speed boost for everyone", 15, "speed")),
            ("perfume", gift("Stink bomb", 25, "medium")),
            ("lion", gift("Hog stampede", 100, "epic")),
            ("universe", gift("Meteor shower", 500, "legendary")),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        Self {
            maps: vec![
                map("mudpit", "Mud Pit"),
                map("barnyard", "Barnyard Brawl"),
                map("slaughterhouse", "Slaughterhouse Escape"),
                map("truffle", "Truffle Forest"),
            ],
            classes: vec![
                class("bruiser", "Bruiser", "Heavy hitter, slow on its trotters"),
                class("scout", "Scout", "Fast and fragile"),
                class("bomber", "Bomber", "Bigger explosions, longer cooldown"),
                class("medic", "Medic", "Heals nearby hogs"),
            ],
            commands: vec![
                syntax("!play", "Join the match queue"),
                syntax("!leave", "Leave the match queue"),
                syntax("!points", "Show your Hog Points"),
                syntax("!boost", "Use a speed boost"),
                syntax("!explode", "Trigger an explosion"),
                syntax("!hog", "Show your selected hog class"),
                syntax("!sethog <class>", "Pick your hog class"),
                syntax("!stats", "Show your profile"),
                syntax("!top", "Show the leaderboard"),
                syntax("!gifts", "Show what each gift does"),
                syntax("!maps", "Show the map rotation"),
                syntax("!events", "Show recent events"),
                syntax("!help", "Show this list"),
            ],
            gifts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLES: &str = r#"
        [[maps]]
        id = "mudpit"
        name = "Mud Pit"

        [[classes]]
        id = "Bruiser"

        [[commands]]
        syntax = "!play"
        description = "Join the queue"

        [gifts.default]
        effect = "Cheer"
        points = 1

        [gifts.Rose]
        effectText = "Small explosion"
        points = 5
        tag = "small"
    "#;

    #[test]
    fn test_parse_tables() {
        let config = GameConfig::from_toml_str(TABLES).unwrap();
        assert_eq!(config.maps.len(), 1);
        assert_eq!(config.classes[0].name, "Bruiser");
        assert!(config.gifts.contains_key("rose"));
    }

    #[test]
    fn test_missing_default_gift() {
        let tables = r#"
            [gifts.rose]
            effect = "Small explosion"
            points = 5
        "#;
        assert!(matches!(
            GameConfig::from_toml_str(tables),
            Err(LookupError::MissingDefaultGift)
        ));
    }

    #[test]
    fn test_duplicate_class() {
        let tables = r#"
            [[classes]]
            id = "scout"
            [[classes]]
            id = "SCOUT"
            [gifts.default]
            effect = "Cheer"
            points = 1
        "#;
        assert!(matches!(
            GameConfig::from_toml_str(tables),
            Err(LookupError::DuplicateClass(_))
        ));
    }

    #[test]
    fn test_duplicate_gift_key() {
        let tables = r#"
            [gifts.default]
            effect = "Cheer"
            points = 1
            [gifts.rose]
            effect = "Small explosion"
            points = 5
            [gifts.Rose]
            effect = "Big explosion"
            points = 50
        "#;
        assert!(matches!(
            GameConfig::from_toml_str(tables),
            Err(LookupError::DuplicateGift(_))
        ));
    }

    #[test]
    fn test_tables_json_shape() {
        let config = GameConfig::from_toml_str(TABLES).unwrap();
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["maps"][0]["id"], "mudpit");
        assert_eq!(json["gifts"]["rose"]["effect"], "Small explosion");
        assert_eq!(json["gifts"]["rose"]["points"], 5);

        let back: GameConfig = serde_json::from_value(json).unwrap();
        assert_eq!(back.gifts, config.gifts);
        assert_eq!(back.classes, config.classes);
    }

    #[test]
    fn test_resolve_gift_fallback() {
        let config = GameConfig::from_toml_str(TABLES).unwrap();

        let (id, effect) = config.resolve_gift("ROSE");
        assert_eq!(id, "rose");
        assert_eq!(effect.points, 5);

        let (id, effect) = config.resolve_gift("Galaxy");
        assert_eq!(id, "galaxy");
        assert_eq!(effect.effect, "Cheer");
    }

    #[test]
    fn test_find_class_case_insensitive() {
        let config = GameConfig::default();
        assert_eq!(config.find_class("SCOUT").unwrap().id, "scout");
        assert_eq!(config.find_class(" Medic ").unwrap().id, "medic");
        assert!(config.find_class("tank").is_none());
    }

    #[test]
    fn test_gift_award() {
        assert_eq!(gift_award(5, None), 5);
        assert_eq!(gift_award(5, Some(0)), 5);
        assert_eq!(gift_award(5, Some(1)), 5);
        assert_eq!(gift_award(5, Some(3)), 15);
        assert_eq!(gift_award(u64::MAX, Some(2)), u64::MAX);
    }

    #[test]
    fn test_builtin_tables_are_valid() {
        let config = GameConfig::default().normalized().unwrap();
        assert!(config.gifts.contains_key(DEFAULT_GIFT));
        assert_eq!(config.gift_listings().len(), config.gifts.len());
    }
}
