//! # hub-protocol
//!
//! Wire types for the Royale live event hub.
//!
//! This crate defines everything that crosses the hub's boundary: the
//! inbound events posted by the livestream connector, the notifications
//! fanned out to overlays, the snapshot a late joiner receives, and the
//! frames and codec used on the stream.
//!
//! ## Example
//!
//! ```rust
//! use hub_protocol::{codec, Encoding, Frame, Snapshot};
//!
//! let event = codec::decode_event(
//!     br#"{"type":"gift","user":"bob","gift":"Rose","diamonds":1}"#,
//!     codec::MAX_EVENT_SIZE,
//! )
//! .unwrap();
//! assert_eq!(event.user(), "bob");
//!
//! let hello = Frame::hello("conn-1", 30_000, Snapshot::default());
//! let encoded = codec::encode(&hello, Encoding::Json).unwrap();
//! assert!(!encoded.is_empty());
//! ```

pub mod codec;
pub mod event;
pub mod frames;
pub mod notification;
pub mod payload;

pub use codec::{decode_event, encode, Encoded, Encoding, ProtocolError};
pub use event::InboundEvent;
pub use frames::{Frame, FrameType, PROTOCOL_VERSION};
pub use notification::{Notification, NotificationBody};
pub use payload::{
    clip_message, now_millis, Ability, AbilityCounts, ClassInfo, CommandSyntax, EventLogEntry,
    GiftListing, LeaderboardEntry, LogCategory, MapInfo, PlayerRecord, QueueEntry, Snapshot,
    MAX_HANDLE_CHARS, MAX_MESSAGE_CHARS,
};
