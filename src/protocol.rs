//! Presence wire protocol.
//!
//! Every message that crosses the relay is a single JSON object tagged by
//! `type`. The relay is naive: it rebroadcasts whatever a client sends and
//! echoes zeroed fields on every message, so decoding ignores unknown fields.
//!
//! | `type`  | Fields                         | Meaning                      |
//! |---------|--------------------------------|------------------------------|
//! | `join`  | id (x, z, ry optional)         | presence announced           |
//! | `leave` | id                             | presence withdrawn           |
//! | `move`  | id, x?, z?, ry?, action?       | transform / animation update |
//! | `chat`  | id, text                       | ephemeral text annotation    |
//!
//! ## Design rules
//!
//! 1. Every message carries the sender `id`; an empty or missing id is malformed.
//! 2. Absent optionals are omitted when encoding.
//! 3. `action` is carried as a string so unknown clip names survive the wire
//!    and resolve to a no-op at the receiver.

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why an inbound frame was rejected.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("unparseable frame: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("message has an empty id")]
    EmptyId,

    #[error("field `{0}` is not a finite number")]
    NonFinite(&'static str),
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// Transform / animation snapshot payload shared by `join` and `move`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MoveUpdate {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ry: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
}

impl MoveUpdate {
    /// Ground-plane position, when both coordinates were sent.
    pub fn position(&self) -> Option<(f32, f32)> {
        match (self.x, self.z) {
            (Some(x), Some(z)) => Some((x, z)),
            _ => None,
        }
    }

    /// Requested action name; the relay sends `""` for "none".
    pub fn action(&self) -> Option<&str> {
        self.action.as_deref().filter(|a| !a.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    Join(MoveUpdate),
    Leave {
        id: String,
    },
    Move(MoveUpdate),
    Chat {
        id: String,
        #[serde(default)]
        text: String,
    },
}

impl Message {
    pub fn join(id: impl Into<String>) -> Self {
        Message::Join(MoveUpdate {
            id: id.into(),
            ..Default::default()
        })
    }

    pub fn leave(id: impl Into<String>) -> Self {
        Message::Leave { id: id.into() }
    }

    pub fn chat(id: impl Into<String>, text: impl Into<String>) -> Self {
        Message::Chat {
            id: id.into(),
            text: text.into(),
        }
    }

    /// A full `move` snapshot.
    pub fn movement(id: impl Into<String>, x: f32, z: f32, ry: f32, action: &str) -> Self {
        Message::Move(MoveUpdate {
            id: id.into(),
            x: Some(x),
            z: Some(z),
            ry: Some(ry),
            action: Some(action.to_string()),
        })
    }

    /// Sender id.
    pub fn id(&self) -> &str {
        match self {
            Message::Join(m) | Message::Move(m) => &m.id,
            Message::Leave { id } | Message::Chat { id, .. } => id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Message::Join(_) => "join",
            Message::Leave { .. } => "leave",
            Message::Move(_) => "move",
            Message::Chat { .. } => "chat",
        }
    }

    /// Parse one text frame.
    pub fn decode(frame: &str) -> Result<Self, ProtocolError> {
        let msg: Message = serde_json::from_str(frame)?;
        if msg.id().is_empty() {
            return Err(ProtocolError::EmptyId);
        }
        if let Message::Join(m) | Message::Move(m) = &msg {
            // Out-of-range literals such as 1e39 parse to infinity.
            for (field, value) in [("x", m.x), ("z", m.z), ("ry", m.ry)] {
                if value.is_some_and(|v| !v.is_finite()) {
                    return Err(ProtocolError::NonFinite(field));
                }
            }
        }
        Ok(msg)
    }

    pub fn encode(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_relay_echo_with_zeroed_fields() {
        let frame = r#"{"type":"chat","id":"user_7","x":0,"z":0,"ry":0,"action":"","text":"hi"}"#;
        let msg = Message::decode(frame).unwrap();
        assert_eq!(msg, Message::chat("user_7", "hi"));
    }

    #[test]
    fn empty_action_reads_as_absent() {
        let frame = r#"{"type":"move","id":"a","x":1,"z":2,"ry":0,"action":""}"#;
        let Message::Move(m) = Message::decode(frame).unwrap() else {
            panic!("expected move");
        };
        assert_eq!(m.action(), None);
        assert_eq!(m.position(), Some((1.0, 2.0)));
    }

    #[test]
    fn missing_id_is_malformed() {
        let err = Message::decode(r#"{"type":"leave"}"#).unwrap_err();
        assert!(matches!(err, ProtocolError::Parse(_)));
    }

    #[test]
    fn empty_id_is_malformed() {
        let err = Message::decode(r#"{"type":"leave","id":""}"#).unwrap_err();
        assert!(matches!(err, ProtocolError::EmptyId));
    }

    #[test]
    fn overflowing_coordinate_is_malformed() {
        let err = Message::decode(r#"{"type":"move","id":"a","x":1e39,"z":1}"#).unwrap_err();
        assert!(matches!(err, ProtocolError::NonFinite("x")));
        let err = Message::decode(r#"{"type":"join","id":"a","ry":-1e40}"#).unwrap_err();
        assert!(matches!(err, ProtocolError::NonFinite("ry")));
    }

    #[test]
    fn unknown_type_is_malformed() {
        assert!(Message::decode(r#"{"type":"teleport","id":"a"}"#).is_err());
    }

    #[test]
    fn join_encodes_without_optionals() {
        let json = Message::join("me").encode().unwrap();
        assert_eq!(json, r#"{"type":"join","id":"me"}"#);
    }
}
