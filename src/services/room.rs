//! Room service — history, append, membership, and broadcast.
//!
//! DESIGN
//! ======
//! Rooms are a fixed set created at startup. Every mutating operation runs
//! inside one registry write-lock critical section, so log appends,
//! membership changes, and broadcast fan-out are serialized: all members of
//! a room observe messages in a single total order.
//!
//! ERROR HANDLING
//! ==============
//! Operations naming an unknown room are silent no-ops: history is empty,
//! append drops the message, broadcast reaches nobody. Nothing is surfaced
//! to any client; a debug event is traced for observability.

use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::frame::Frame;
use crate::state::{AppState, ChatMessage};

// =============================================================================
// HISTORY
// =============================================================================

/// Current contents of a room's log. Empty for an unknown room. Never fails.
pub async fn history(state: &AppState, room_id: &str) -> Vec<ChatMessage> {
    let rooms = state.rooms.read().await;
    rooms.get(room_id).map_or_else(Vec::new, |room| room.messages.clone())
}

// =============================================================================
// JOIN / LEAVE
// =============================================================================

/// Join a room: register the client for broadcasts and return the room's
/// full current history. An unknown room registers nothing and yields an
/// empty history. Joining does not leave any previously joined room.
pub async fn join(
    state: &AppState,
    room_id: &str,
    client_id: Uuid,
    tx: mpsc::Sender<Frame>,
) -> Vec<ChatMessage> {
    let mut rooms = state.rooms.write().await;
    let Some(room) = rooms.get_mut(room_id) else {
        debug!(%client_id, room_id, "join for unknown room ignored");
        return Vec::new();
    };

    room.members.insert(client_id, tx);
    info!(%client_id, room_id, members = room.members.len(), "client joined room");
    room.messages.clone()
}

/// Leave a room. A leave for an unknown room, or for a room the client is
/// not a member of, is a no-op.
pub async fn leave(state: &AppState, room_id: &str, client_id: Uuid) {
    let mut rooms = state.rooms.write().await;
    let Some(room) = rooms.get_mut(room_id) else {
        debug!(%client_id, room_id, "leave for unknown room ignored");
        return;
    };

    if room.members.remove(&client_id).is_some() {
        info!(%client_id, room_id, remaining = room.members.len(), "client left room");
    }
}

// =============================================================================
// CHAT
// =============================================================================

/// Append a message to a room's log and fan a frame out to every member
/// except `exclude`. Append and fan-out share one critical section, so the
/// log is always a prefix of what has been broadcast and every member sees
/// the same order. Sends are best-effort: a member with a full channel is
/// skipped. Unknown room: the message is dropped and reaches nobody.
pub async fn append_and_broadcast(
    state: &AppState,
    room_id: &str,
    message: ChatMessage,
    frame: &Frame,
    exclude: Option<Uuid>,
) {
    let mut rooms = state.rooms.write().await;
    let Some(room) = rooms.get_mut(room_id) else {
        debug!(room_id, "chat message for unknown room dropped");
        return;
    };

    room.messages.push(message);

    for (client_id, tx) in &room.members {
        if exclude == Some(*client_id) {
            continue;
        }
        let _ = tx.try_send(frame.clone());
    }
}

// =============================================================================
// DISCONNECT
// =============================================================================

/// Remove a client from every room's membership set.
pub async fn disconnect(state: &AppState, client_id: Uuid) {
    let mut rooms = state.rooms.write().await;
    let mut swept = 0_usize;
    for room in rooms.values_mut() {
        if room.members.remove(&client_id).is_some() {
            swept += 1;
        }
    }
    if swept > 0 {
        info!(%client_id, rooms = swept, "client removed from rooms on disconnect");
    }
}

// =============================================================================
// LISTING
// =============================================================================

/// Configured room ids, sorted for stable output.
pub async fn list(state: &AppState) -> Vec<String> {
    let rooms = state.rooms.read().await;
    let mut ids: Vec<String> = rooms.keys().cloned().collect();
    ids.sort();
    ids
}

#[cfg(test)]
#[path = "room_test.rs"]
mod tests;
