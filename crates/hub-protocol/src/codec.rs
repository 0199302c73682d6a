//! Codec for hub frames and inbound events.
//!
//! Outbound frames are JSON text by default. Clients that ask for it get
//! MessagePack instead. Inbound events are always JSON.

use bytes::Bytes;
use thiserror::Error;

use crate::event::InboundEvent;
use crate::frames::Frame;

/// Maximum encoded frame size (1 MiB).
pub const MAX_FRAME_SIZE: usize = 1024 * 1024;

/// Default maximum inbound event size (64 KiB).
pub const MAX_EVENT_SIZE: usize = 64 * 1024;

/// Protocol errors that can occur during encoding/decoding.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Frame exceeds maximum size.
    #[error("Frame size {0} exceeds maximum {MAX_FRAME_SIZE}")]
    FrameTooLarge(usize),

    /// Inbound event exceeds the configured limit.
    #[error("Event size {size} exceeds maximum {max}")]
    EventTooLarge { size: usize, max: usize },

    /// Inbound event is structurally valid JSON but unusable.
    #[error("Invalid event: {0}")]
    InvalidEvent(&'static str),

    /// JSON encoding or decoding error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// MessagePack encoding error.
    #[error("Encoding error: {0}")]
    Encode(#[from] rmp_serde::encode::Error),
}

/// Outbound encoding selected per subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Encoding {
    #[default]
    Json,
    MsgPack,
}

impl Encoding {
    /// Parse the `format` query value. Unknown values fall back to JSON.
    #[must_use]
    pub fn from_query(value: Option<&str>) -> Self {
        match value.map(str::to_ascii_lowercase).as_deref() {
            Some("msgpack") | Some("messagepack") => Encoding::MsgPack,
            _ => Encoding::Json,
        }
    }
}

/// An encoded frame, ready for a text or binary transport message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Encoded {
    Text(String),
    Binary(Bytes),
}

impl Encoded {
    /// Encoded size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Encoded::Text(s) => s.len(),
            Encoded::Binary(b) => b.len(),
        }
    }

    /// Whether the encoding is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Encode a frame.
///
/// # Errors
///
/// Returns an error if the frame is too large or encoding fails.
pub fn encode(frame: &Frame, encoding: Encoding) -> Result<Encoded, ProtocolError> {
    let encoded = match encoding {
        Encoding::Json => Encoded::Text(serde_json::to_string(frame)?),
        Encoding::MsgPack => Encoded::Binary(Bytes::from(rmp_serde::to_vec_named(frame)?)),
    };

    if encoded.len() > MAX_FRAME_SIZE {
        return Err(ProtocolError::FrameTooLarge(encoded.len()));
    }

    Ok(encoded)
}

/// Decode a JSON text frame sent by a client.
///
/// # Errors
///
/// Returns an error if the text is not a valid frame.
pub fn decode_text(text: &str) -> Result<Frame, ProtocolError> {
    Ok(serde_json::from_str(text)?)
}

/// Decode and validate an inbound event.
///
/// This is the boundary check: anything that fails here never reaches the
/// dispatcher.
///
/// # Errors
///
/// Returns an error if the body is too large, is not a known event shape,
/// or has blank required fields.
pub fn decode_event(data: &[u8], max_size: usize) -> Result<InboundEvent, ProtocolError> {
    if data.len() > max_size {
        return Err(ProtocolError::EventTooLarge {
            size: data.len(),
            max: max_size,
        });
    }

    let event: InboundEvent = serde_json::from_slice(data)?;
    event.validate()?;
    Ok(event)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::Snapshot;

    #[test]
    fn test_encode_json_is_text() {
        let frame = Frame::pong(Some(5));
        match encode(&frame, Encoding::Json).unwrap() {
            Encoded::Text(text) => assert_eq!(text, r#"{"type":"pong","timestamp":5}"#),
            other => panic!("Expected text, got {:?}", other),
        }
    }

    #[test]
    fn test_encode_msgpack_is_binary() {
        let frame = Frame::hello("conn-1", 1000, Snapshot::default());
        let encoded = encode(&frame, Encoding::MsgPack).unwrap();
        assert!(matches!(encoded, Encoded::Binary(_)));
        assert!(!encoded.is_empty());
    }

    #[test]
    fn test_decode_client_ping() {
        let frame = decode_text(r#"{"type":"ping","timestamp":42}"#).unwrap();
        assert_eq!(frame, Frame::ping(42));
    }

    #[test]
    fn test_decode_event_boundary() {
        let ok = decode_event(br#"{"type":"chat","user":"a","text":"hi"}"#, MAX_EVENT_SIZE);
        assert!(ok.is_ok());

        match decode_event(br#"{"type":"gift","user":"a"}"#, MAX_EVENT_SIZE) {
            Err(ProtocolError::Json(_)) => {}
            other => panic!("Expected JSON error, got {:?}", other),
        }

        match decode_event(br#"{"type":"chat","user":"","text":"hi"}"#, MAX_EVENT_SIZE) {
            Err(ProtocolError::InvalidEvent(_)) => {}
            other => panic!("Expected InvalidEvent, got {:?}", other),
        }

        match decode_event(&[b' '; 32], 16) {
            Err(ProtocolError::EventTooLarge { size: 32, max: 16 }) => {}
            other => panic!("Expected EventTooLarge, got {:?}", other),
        }
    }

    #[test]
    fn test_encoding_from_query() {
        assert_eq!(Encoding::from_query(Some("MsgPack")), Encoding::MsgPack);
        assert_eq!(Encoding::from_query(Some("json")), Encoding::Json);
        assert_eq!(Encoding::from_query(None), Encoding::Json);
    }
}
