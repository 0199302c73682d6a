//! Inbound events from the livestream connector.

use serde::{Deserialize, Serialize};

use crate::codec::ProtocolError;
use crate::payload::MAX_HANDLE_CHARS;

/// An event posted by the ingestion collaborator.
///
/// The `type` field selects the variant:
///
/// ```json
/// {"type": "chat", "user": "alice", "text": "hello"}
/// {"type": "gift", "user": "bob", "gift": "Rose", "diamonds": 1}
/// {"type": "command", "user": "carol", "command": "play", "args": []}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum InboundEvent {
    /// A chat line. May still turn out to be a command.
    Chat {
        #[serde(alias = "username", alias = "nickname", alias = "uniqueId")]
        user: String,
        #[serde(alias = "message", alias = "comment")]
        text: String,
    },

    /// A gift sent to the streamer.
    Gift {
        #[serde(alias = "username", alias = "nickname", alias = "uniqueId")]
        user: String,
        #[serde(alias = "giftName", alias = "giftId", alias = "giftType")]
        gift: String,
        #[serde(
            default,
            alias = "diamondCount",
            skip_serializing_if = "Option::is_none"
        )]
        diamonds: Option<u32>,
    },

    /// A command already split out by the connector.
    Command {
        #[serde(alias = "username", alias = "nickname", alias = "uniqueId")]
        user: String,
        command: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        args: Vec<String>,
    },
}

impl InboundEvent {
    /// Create a chat event.
    #[must_use]
    pub fn chat(user: impl Into<String>, text: impl Into<String>) -> Self {
        InboundEvent::Chat {
            user: user.into(),
            text: text.into(),
        }
    }

    /// Create a gift event.
    #[must_use]
    pub fn gift(user: impl Into<String>, gift: impl Into<String>, diamonds: Option<u32>) -> Self {
        InboundEvent::Gift {
            user: user.into(),
            gift: gift.into(),
            diamonds,
        }
    }

    /// Create a command event.
    #[must_use]
    pub fn command(user: impl Into<String>, command: impl Into<String>, args: Vec<String>) -> Self {
        InboundEvent::Command {
            user: user.into(),
            command: command.into(),
            args,
        }
    }

    /// The handle that produced this event.
    #[must_use]
    pub fn user(&self) -> &str {
        match self {
            InboundEvent::Chat { user, .. }
            | InboundEvent::Gift { user, .. }
            | InboundEvent::Command { user, .. } => user,
        }
    }

    /// Lowercase event kind, matching the `type` tag.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            InboundEvent::Chat { .. } => "chat",
            InboundEvent::Gift { .. } => "gift",
            InboundEvent::Command { .. } => "command",
        }
    }

    /// Check the fields serde cannot: required strings must not be blank
    /// and handles are at most [`MAX_HANDLE_CHARS`] long.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidEvent`] naming the offending field.
    pub fn validate(&self) -> Result<(), ProtocolError> {
        let user = self.user().trim();
        if user.is_empty() {
            return Err(ProtocolError::InvalidEvent("user must not be empty"));
        }
        if user.chars().count() > MAX_HANDLE_CHARS {
            return Err(ProtocolError::InvalidEvent("user handle too long"));
        }
        match self {
            InboundEvent::Gift { gift, .. } if gift.trim().is_empty() => {
                Err(ProtocolError::InvalidEvent("gift must not be empty"))
            }
            InboundEvent::Command { command, .. } if command.trim().is_empty() => {
                Err(ProtocolError::InvalidEvent("command must not be empty"))
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_variants() {
        let chat: InboundEvent =
            serde_json::from_str(r#"{"type":"chat","user":"alice","text":"hi"}"#).unwrap();
        assert_eq!(chat, InboundEvent::chat("alice", "hi"));

        let gift: InboundEvent =
            serde_json::from_str(r#"{"type":"gift","user":"bob","gift":"Rose"}"#).unwrap();
        assert_eq!(gift, InboundEvent::gift("bob", "Rose", None));

        let command: InboundEvent = serde_json::from_str(
            r#"{"type":"command","user":"carol","command":"sethog","args":["tank"]}"#,
        )
        .unwrap();
        assert_eq!(
            command,
            InboundEvent::command("carol", "sethog", vec!["tank".to_string()])
        );
    }

    #[test]
    fn test_connector_aliases() {
        let gift: InboundEvent = serde_json::from_str(
            r#"{"type":"gift","user":"bob","giftName":"Lion","diamondCount":3}"#,
        )
        .unwrap();
        assert_eq!(gift, InboundEvent::gift("bob", "Lion", Some(3)));

        let chat: InboundEvent =
            serde_json::from_str(r#"{"type":"chat","username":"x","message":"!play"}"#).unwrap();
        assert_eq!(chat, InboundEvent::chat("x", "!play"));

        let chat: InboundEvent =
            serde_json::from_str(r#"{"type":"chat","nickname":"Nick","comment":"hey"}"#).unwrap();
        assert_eq!(chat, InboundEvent::chat("Nick", "hey"));

        let gift: InboundEvent =
            serde_json::from_str(r#"{"type":"gift","uniqueId":"u1","giftId":"rose"}"#).unwrap();
        assert_eq!(gift, InboundEvent::gift("u1", "rose", None));

        let gift: InboundEvent =
            serde_json::from_str(r#"{"type":"gift","username":"u2","giftType":"Heart"}"#).unwrap();
        assert_eq!(gift, InboundEvent::gift("u2", "Heart", None));

        let command: InboundEvent =
            serde_json::from_str(r#"{"type":"command","uniqueId":"u3","command":"play"}"#)
                .unwrap();
        assert_eq!(command, InboundEvent::command("u3", "play", vec![]));
    }

    #[test]
    fn test_missing_field_rejected() {
        assert!(serde_json::from_str::<InboundEvent>(r#"{"type":"chat","user":"a"}"#).is_err());
        assert!(serde_json::from_str::<InboundEvent>(r#"{"type":"wave","user":"a"}"#).is_err());
    }

    #[test]
    fn test_validate_blank_fields() {
        assert!(InboundEvent::chat("  ", "hi").validate().is_err());
        assert!(InboundEvent::gift("bob", "", None).validate().is_err());
        assert!(InboundEvent::command("bob", " ", vec![]).validate().is_err());
        assert!(InboundEvent::chat("alice", "").validate().is_ok());
    }

    #[test]
    fn test_validate_handle_length() {
        let longest = "a".repeat(MAX_HANDLE_CHARS);
        assert!(InboundEvent::chat(longest.as_str(), "hi").validate().is_ok());

        let too_long = "a".repeat(MAX_HANDLE_CHARS + 1);
        assert!(InboundEvent::chat(too_long, "hi").validate().is_err());
    }
}
