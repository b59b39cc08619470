//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor. It
//! holds the room registry: a map of room id to `RoomState`, seeded once at
//! startup from the configured room set and never grown or destroyed for the
//! process lifetime. Each room owns its append-only message log and the set
//! of connected members. Unknown room ids are simply absent from the map.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;

use crate::frame::Frame;

// =============================================================================
// CHAT MESSAGE
// =============================================================================

/// A chat message as stored in a room's log and carried on the wire.
///
/// The relay performs no payload validation: every field defaults when
/// absent, so any JSON object is accepted, and fields the relay does not
/// interpret (`avatar`, `hint`, ...) pass through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Author display name.
    #[serde(default)]
    pub user: String,
    /// Message body.
    #[serde(default)]
    pub text: String,
    /// Opaque attachment reference, e.g. a data URI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment: Option<String>,
    /// Whether the receiving client authored the message. Set per-recipient
    /// on delivery; stored as received on append.
    #[serde(rename = "isSelf", default)]
    pub is_self: bool,
    /// Uninterpreted passthrough fields.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

// =============================================================================
// ROOM STATE
// =============================================================================

/// Per-room live state: the message log plus the broadcast membership set.
pub struct RoomState {
    /// Append-only log; insertion order is delivery order.
    pub messages: Vec<ChatMessage>,
    /// Members receiving broadcasts: `client_id` -> sender for outgoing frames.
    pub members: HashMap<Uuid, mpsc::Sender<Frame>>,
}

impl RoomState {
    #[must_use]
    pub fn new() -> Self {
        Self { messages: Vec::new(), members: HashMap::new() }
    }
}

impl Default for RoomState {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// APP STATE
// =============================================================================

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum; the registry itself is Arc-wrapped.
#[derive(Clone)]
pub struct AppState {
    pub rooms: Arc<RwLock<HashMap<String, RoomState>>>,
}

impl AppState {
    /// Seed the registry with the configured room set.
    #[must_use]
    pub fn new(room_ids: &[String]) -> Self {
        let rooms = room_ids
            .iter()
            .map(|id| (id.clone(), RoomState::new()))
            .collect();
        Self { rooms: Arc::new(RwLock::new(rooms)) }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================
