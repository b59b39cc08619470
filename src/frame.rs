//! Frame — the universal message type of the relay protocol.
//!
//! ARCHITECTURE
//! ============
//! Every message on the wire is a Frame. Clients send request frames over
//! WebSocket, the relay parses them into an [`Event`] and replies with done
//! frames; peer notifications arrive as fresh request frames. This module is
//! the whole protocol a client adapter needs to speak.
//!
//! DESIGN
//! ======
//! - Flat data: payload is always `Map<String, Value>`, never nested.
//! - Responses correlate to requests via `parent_id`.
//! - The relay routes on `event` and never inspects `data` beyond the chat
//!   message passthrough.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::state::ChatMessage;

/// Frame data key for error messages.
pub const FRAME_MESSAGE: &str = "message";

/// Frame data key for history replies.
pub const FRAME_MESSAGES: &str = "messages";

// =============================================================================
// TYPES
// =============================================================================

/// Flat key-value payload. Alias to reduce noise in signatures.
pub type Data = HashMap<String, serde_json::Value>;

/// Lifecycle position of a frame in a request/response exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Request,
    Done,
    Error,
}

impl Status {
    /// Terminal statuses end an exchange.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Status::Done | Status::Error)
    }
}

/// The universal message type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Frame {
    pub id: Uuid,
    pub parent_id: Option<Uuid>,
    /// Milliseconds since Unix epoch. Set automatically at construction.
    pub ts: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_id: Option<String>,
    pub from: Option<String>,
    pub event: String,
    pub status: Status,
    pub data: Data,
}

// =============================================================================
// CONSTRUCTORS
// =============================================================================

/// Current time as milliseconds since Unix epoch.
fn now_ms() -> i64 {
    let Ok(dur) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    i64::try_from(dur.as_millis()).unwrap_or(0)
}

impl Frame {
    /// Create a request frame. Entry point for every client event and for
    /// peer notifications originated by the relay.
    pub fn request(event: impl Into<String>, data: Data) -> Self {
        Self {
            id: Uuid::new_v4(),
            parent_id: None,
            ts: now_ms(),
            room_id: None,
            from: None,
            event: event.into(),
            status: Status::Request,
            data,
        }
    }

    /// Create a done response. Terminal, carries no data.
    #[must_use]
    pub fn done(&self) -> Self {
        self.reply(Status::Done, Data::new())
    }

    /// Create a done response carrying a payload.
    #[must_use]
    pub fn done_with(&self, data: Data) -> Self {
        self.reply(Status::Done, data)
    }

    /// Create an error response from a plain string. Terminal.
    #[must_use]
    pub fn error(&self, message: impl Into<String>) -> Self {
        let mut data = Data::new();
        data.insert(FRAME_MESSAGE.into(), serde_json::Value::String(message.into()));
        self.reply(Status::Error, data)
    }

    /// Build a reply frame. Inherits `parent_id`, `room_id`, and `event`.
    fn reply(&self, status: Status, data: Data) -> Self {
        Self {
            id: Uuid::new_v4(),
            parent_id: Some(self.id),
            ts: now_ms(),
            room_id: self.room_id.clone(),
            from: None,
            event: self.event.clone(),
            status,
            data,
        }
    }
}

// =============================================================================
// BUILDERS
// =============================================================================

impl Frame {
    #[must_use]
    pub fn with_room_id(mut self, room_id: impl Into<String>) -> Self {
        self.room_id = Some(room_id.into());
        self
    }

    #[must_use]
    pub fn with_from(mut self, from: impl Into<String>) -> Self {
        self.from = Some(from.into());
        self
    }

    #[must_use]
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }
}

// =============================================================================
// EVENTS
// =============================================================================

/// Inbound client events, parsed from request frames.
///
/// `Disconnect` has no wire form; the connection loop feeds it to the
/// dispatcher when the transport closes, so every state transition flows
/// through one handler.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Join { room_id: String },
    Leave { room_id: String },
    Chat { room_id: String, message: ChatMessage },
    Disconnect,
}

impl Event {
    /// Parse a request frame into an event.
    ///
    /// Returns `None` for unknown event names and frames missing a room id;
    /// the relay treats those as no-ops rather than closing the connection.
    /// The chat payload itself is never validated: any JSON object in `data`
    /// deserializes via defaults and field passthrough.
    #[must_use]
    pub fn from_frame(frame: &Frame) -> Option<Self> {
        let room_id = frame.room_id.clone()?;

        match frame.event.as_str() {
            "room:join" => Some(Event::Join { room_id }),
            "room:leave" => Some(Event::Leave { room_id }),
            "chat:message" => {
                let value = serde_json::Value::Object(frame.data.clone().into_iter().collect());
                let message: ChatMessage = serde_json::from_value(value).ok()?;
                Some(Event::Chat { room_id, message })
            }
            _ => None,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_sets_fields() {
        let frame = Frame::request("room:join", Data::new());
        assert_eq!(frame.event, "room:join");
        assert_eq!(frame.status, Status::Request);
        assert!(frame.parent_id.is_none());
        assert!(frame.room_id.is_none());
        assert!(frame.ts > 0);
    }

    #[test]
    fn reply_inherits_context() {
        let req = Frame::request("chat:message", Data::new()).with_room_id("general");
        let done = req.done_with(Data::new());

        assert_eq!(done.parent_id, Some(req.id));
        assert_eq!(done.room_id.as_deref(), Some("general"));
        assert_eq!(done.event, "chat:message");
        assert_eq!(done.status, Status::Done);
    }

    #[test]
    fn done_is_terminal() {
        assert!(Status::Done.is_terminal());
        assert!(Status::Error.is_terminal());
        assert!(!Status::Request.is_terminal());
    }

    #[test]
    fn error_carries_message() {
        let req = Frame::request("room:join", Data::new());
        let err = req.error("invalid json");

        assert_eq!(err.status, Status::Error);
        assert_eq!(err.data.get("message").and_then(|v| v.as_str()), Some("invalid json"));
    }

    #[test]
    fn json_round_trip() {
        let original = Frame::request("room:join", Data::new())
            .with_room_id("tomato")
            .with_from("client-7")
            .with_data("key", "value");

        let json = serde_json::to_string(&original).expect("serialize");
        let restored: Frame = serde_json::from_str(&json).expect("deserialize");

        assert_eq!(restored.id, original.id);
        assert_eq!(restored.room_id.as_deref(), Some("tomato"));
        assert_eq!(restored.event, "room:join");
        assert_eq!(restored.from.as_deref(), Some("client-7"));
        assert_eq!(restored.data.get("key").and_then(|v| v.as_str()), Some("value"));
    }

    #[test]
    fn event_parses_join_and_leave() {
        let join = Frame::request("room:join", Data::new()).with_room_id("general");
        assert_eq!(Event::from_frame(&join), Some(Event::Join { room_id: "general".into() }));

        let leave = Frame::request("room:leave", Data::new()).with_room_id("general");
        assert_eq!(Event::from_frame(&leave), Some(Event::Leave { room_id: "general".into() }));
    }

    #[test]
    fn event_parses_chat_with_passthrough_fields() {
        let mut data = Data::new();
        data.insert("user".into(), json!("Ramesh"));
        data.insert("text".into(), json!("hi"));
        data.insert("isSelf".into(), json!(true));
        data.insert("avatar".into(), json!("https://placehold.co/40x40.png"));
        let frame = Frame::request("chat:message", data).with_room_id("general");

        let Some(Event::Chat { room_id, message }) = Event::from_frame(&frame) else {
            panic!("expected chat event");
        };
        assert_eq!(room_id, "general");
        assert_eq!(message.user, "Ramesh");
        assert_eq!(message.text, "hi");
        assert!(message.is_self);
        assert_eq!(
            message.extra.get("avatar").and_then(|v| v.as_str()),
            Some("https://placehold.co/40x40.png")
        );
    }

    #[test]
    fn event_requires_room_id() {
        let frame = Frame::request("room:join", Data::new());
        assert_eq!(Event::from_frame(&frame), None);
    }

    #[test]
    fn event_rejects_unknown_names() {
        let frame = Frame::request("room:rename", Data::new()).with_room_id("general");
        assert_eq!(Event::from_frame(&frame), None);
    }
}
