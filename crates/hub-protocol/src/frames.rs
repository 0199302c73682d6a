//! Outbound frame types for the hub stream.
//!
//! Every message a subscriber receives over the stream is a [`Frame`]. The
//! first one is always `hello`, carrying the snapshot; every later one is an
//! `event` or a keepalive.

use serde::{Deserialize, Serialize};

use crate::notification::Notification;
use crate::payload::Snapshot;

/// Current protocol version.
pub const PROTOCOL_VERSION: u8 = 1;

/// Frame type identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameType {
    Hello,
    Event,
    Ping,
    Pong,
    Error,
}

/// A stream frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Frame {
    /// Sent once when a subscriber connects.
    #[serde(rename = "hello")]
    Hello {
        /// Unique connection identifier.
        connection_id: String,
        /// Protocol version.
        version: u8,
        /// Server keepalive interval in milliseconds.
        heartbeat: u32,
        /// State at the moment of registration.
        snapshot: Snapshot,
    },

    /// A notification published after registration.
    #[serde(rename = "event")]
    Event { notification: Notification },

    /// Keepalive ping.
    #[serde(rename = "ping")]
    Ping {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<u64>,
    },

    /// Keepalive pong.
    #[serde(rename = "pong")]
    Pong {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<u64>,
    },

    /// Error report. The connection stays open.
    #[serde(rename = "error")]
    Error { code: u16, message: String },
}

impl Frame {
    /// Get the frame type.
    #[must_use]
    pub fn frame_type(&self) -> FrameType {
        match self {
            Frame::Hello { .. } => FrameType::Hello,
            Frame::Event { .. } => FrameType::Event,
            Frame::Ping { .. } => FrameType::Ping,
            Frame::Pong { .. } => FrameType::Pong,
            Frame::Error { .. } => FrameType::Error,
        }
    }

    /// Create a hello frame.
    #[must_use]
    pub fn hello(connection_id: impl Into<String>, heartbeat: u32, snapshot: Snapshot) -> Self {
        Frame::Hello {
            connection_id: connection_id.into(),
            version: PROTOCOL_VERSION,
            heartbeat,
            snapshot,
        }
    }

    /// Wrap a notification.
    #[must_use]
    pub fn event(notification: Notification) -> Self {
        Frame::Event { notification }
    }

    /// Create a ping frame with a timestamp.
    #[must_use]
    pub fn ping(timestamp: u64) -> Self {
        Frame::Ping {
            timestamp: Some(timestamp),
        }
    }

    /// Create a pong frame.
    #[must_use]
    pub fn pong(timestamp: Option<u64>) -> Self {
        Frame::Pong { timestamp }
    }

    /// Create an error frame.
    #[must_use]
    pub fn error(code: u16, message: impl Into<String>) -> Self {
        Frame::Error {
            code,
            message: message.into(),
        }
    }
}
