//! WebSocket handler — the relay's event-driven core.
//!
//! DESIGN
//! ======
//! On upgrade, generates a client ID and enters a `select!` loop:
//! - Incoming client frames → parse into an `Event` + dispatch
//! - Broadcast frames from room peers → forward to client
//!
//! The event handler validates nothing beyond event shape: unknown rooms,
//! missing fields, and unknown event names degrade to no-ops, and a single
//! session's misbehavior never ends another session or the process.
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade → send `session:connected` with `client_id`
//! 2. Client sends frames → dispatch → handler returns Outcome
//! 3. Dispatch applies Outcome (reply to sender; peer fan-out happens inside
//!    the room service critical section)
//! 4. Close → membership swept from every room

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::frame::{Data, Event, FRAME_MESSAGES, Frame};
use crate::services;
use crate::state::{AppState, ChatMessage};

// =============================================================================
// OUTCOME
// =============================================================================

/// Result returned by the event handler. The dispatch layer uses this to
/// decide what the sender receives; peer broadcasts are already on their way
/// by the time an outcome is reported.
enum Outcome {
    /// Send a done reply with payload to the sender only.
    Reply(Data),
    /// Send an empty done to the sender only.
    Done,
    /// Nothing for the sender.
    Silent,
}

// =============================================================================
// UPGRADE
// =============================================================================

pub async fn handle_ws(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| run_ws(socket, state))
}

// =============================================================================
// CONNECTION
// =============================================================================

async fn run_ws(mut socket: WebSocket, state: AppState) {
    let client_id = Uuid::new_v4();

    // Per-connection channel for receiving broadcast frames from peers.
    let (client_tx, mut client_rx) = mpsc::channel::<Frame>(256);

    let welcome =
        Frame::request("session:connected", Data::new()).with_data("client_id", client_id.to_string());
    if send_frame(&mut socket, &welcome).await.is_err() {
        return;
    }

    info!(%client_id, "ws: client connected");

    // The latest joined room. Broadcast membership lives in the registry and
    // may span several rooms at once; this field only feeds the leave path.
    let mut current_room: Option<String> = None;

    loop {
        tokio::select! {
            msg = socket.recv() => {
                let Some(msg) = msg else { break };
                let Ok(msg) = msg else { break };
                match msg {
                    Message::Text(text) => {
                        dispatch_frame(&state, &mut socket, &mut current_room, client_id, &client_tx, &text).await;
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            Some(frame) = client_rx.recv() => {
                if send_frame(&mut socket, &frame).await.is_err() {
                    break;
                }
            }
        }
    }

    // Abrupt transport loss and explicit close run the same cleanup; peers
    // learn nothing beyond their own transport's disconnect detection.
    handle_event(&state, &mut current_room, client_id, &client_tx, Event::Disconnect).await;
    info!(%client_id, "ws: client disconnected");
}

// =============================================================================
// FRAME DISPATCH
// =============================================================================

/// Parse an incoming JSON frame, dispatch to the handler, apply the outcome.
async fn dispatch_frame(
    state: &AppState,
    socket: &mut WebSocket,
    current_room: &mut Option<String>,
    client_id: Uuid,
    client_tx: &mpsc::Sender<Frame>,
    text: &str,
) {
    let sender_frames = process_inbound_text(state, current_room, client_id, client_tx, text).await;
    for frame in sender_frames {
        let _ = send_frame(socket, &frame).await;
    }
}

/// Parse and process one inbound text frame and return frames for the sender.
///
/// This keeps websocket transport concerns separate from event handling, so
/// tests can exercise dispatch and broadcast behavior end-to-end.
async fn process_inbound_text(
    state: &AppState,
    current_room: &mut Option<String>,
    client_id: Uuid,
    client_tx: &mpsc::Sender<Frame>,
    text: &str,
) -> Vec<Frame> {
    let mut req: Frame = match serde_json::from_str(text) {
        Ok(r) => r,
        Err(e) => {
            warn!(%client_id, error = %e, "ws: invalid inbound frame");
            let err = Frame::request("gateway:error", Data::new())
                .with_data("message", format!("invalid json: {e}"));
            return vec![err];
        }
    };

    // Stamp the connection id as `from`.
    req.from = Some(client_id.to_string());

    info!(%client_id, id = %req.id, event = %req.event, status = ?req.status, "ws: recv frame");

    let Some(event) = Event::from_frame(&req) else {
        warn!(%client_id, event = %req.event, "ws: unhandled frame ignored");
        return vec![];
    };

    match handle_event(state, current_room, client_id, client_tx, event).await {
        Outcome::Reply(data) => vec![req.done_with(data)],
        Outcome::Done => vec![req.done()],
        Outcome::Silent => vec![],
    }
}

// =============================================================================
// EVENT HANDLER
// =============================================================================

/// Apply one event to the registry and report what the sender receives.
async fn handle_event(
    state: &AppState,
    current_room: &mut Option<String>,
    client_id: Uuid,
    client_tx: &mpsc::Sender<Frame>,
    event: Event,
) -> Outcome {
    match event {
        Event::Join { room_id } => {
            let messages = services::room::join(state, &room_id, client_id, client_tx.clone()).await;
            // Track the latest join only; earlier memberships stay live
            // until the client leaves them explicitly.
            *current_room = Some(room_id);

            let mut reply = Data::new();
            reply.insert(FRAME_MESSAGES.into(), serde_json::to_value(&messages).unwrap_or_default());
            Outcome::Reply(reply)
        }
        Event::Leave { room_id } => {
            services::room::leave(state, &room_id, client_id).await;
            if current_room.as_deref() == Some(room_id.as_str()) {
                *current_room = None;
            }
            Outcome::Done
        }
        Event::Chat { room_id, message } => {
            // The log stores the payload exactly as received; the ack and the
            // peer copies differ only in `isSelf`.
            let mut ack = message.clone();
            ack.is_self = true;
            let mut peer_copy = message.clone();
            peer_copy.is_self = false;

            let peer_frame = Frame::request("chat:message", message_to_data(&peer_copy))
                .with_room_id(room_id.clone())
                .with_from(client_id.to_string());

            services::room::append_and_broadcast(state, &room_id, message, &peer_frame, Some(client_id))
                .await;

            Outcome::Reply(message_to_data(&ack))
        }
        Event::Disconnect => {
            services::room::disconnect(state, client_id).await;
            Outcome::Silent
        }
    }
}

// =============================================================================
// HELPERS
// =============================================================================

async fn send_frame(socket: &mut WebSocket, frame: &Frame) -> Result<(), ()> {
    let json = match serde_json::to_string(frame) {
        Ok(j) => j,
        Err(e) => {
            warn!(error = %e, "ws: failed to serialize frame");
            return Err(());
        }
    };
    info!(id = %frame.id, event = %frame.event, status = ?frame.status, "ws: send frame");
    socket.send(Message::Text(json.into())).await.map_err(|_| ())
}

fn message_to_data(message: &ChatMessage) -> Data {
    match serde_json::to_value(message) {
        Ok(serde_json::Value::Object(map)) => map.into_iter().collect(),
        _ => Data::new(),
    }
}

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;
