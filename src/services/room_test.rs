use super::*;
use crate::frame::Data;
use crate::state::test_helpers;
use tokio::time::{Duration, timeout};

async fn recv_frame(rx: &mut mpsc::Receiver<Frame>) -> Frame {
    timeout(Duration::from_millis(500), rx.recv())
        .await
        .expect("broadcast receive timed out")
        .expect("broadcast channel closed unexpectedly")
}

async fn assert_no_frame(rx: &mut mpsc::Receiver<Frame>) {
    assert!(
        timeout(Duration::from_millis(80), rx.recv()).await.is_err(),
        "expected no broadcast frame"
    );
}

#[tokio::test]
async fn history_is_empty_for_fresh_and_unknown_rooms() {
    let state = test_helpers::test_app_state();
    assert!(history(&state, "general").await.is_empty());
    assert!(history(&state, "unknown-room").await.is_empty());
}

#[tokio::test]
async fn join_registers_member_and_returns_history() {
    let state = test_helpers::test_app_state();
    let client_id = Uuid::new_v4();
    let (tx, _rx) = mpsc::channel(8);

    let history = join(&state, "general", client_id, tx).await;
    assert!(history.is_empty());

    let rooms = state.rooms.read().await;
    assert!(rooms["general"].members.contains_key(&client_id));
}

#[tokio::test]
async fn join_unknown_room_registers_nothing() {
    let state = test_helpers::test_app_state();
    let (tx, _rx) = mpsc::channel(8);

    let history = join(&state, "unknown-room", Uuid::new_v4(), tx).await;
    assert!(history.is_empty());

    let rooms = state.rooms.read().await;
    assert!(!rooms.contains_key("unknown-room"));
}

#[tokio::test]
async fn leave_is_idempotent() {
    let state = test_helpers::test_app_state();
    let client_id = Uuid::new_v4();
    let _rx = test_helpers::register_member(&state, "general", client_id).await;

    leave(&state, "general", client_id).await;
    leave(&state, "general", client_id).await;
    leave(&state, "unknown-room", client_id).await;

    let rooms = state.rooms.read().await;
    assert!(rooms["general"].members.is_empty());
}

#[tokio::test]
async fn append_and_broadcast_appends_then_excludes_sender() {
    let state = test_helpers::test_app_state();
    let sender_id = Uuid::new_v4();
    let peer_id = Uuid::new_v4();
    let mut sender_rx = test_helpers::register_member(&state, "general", sender_id).await;
    let mut peer_rx = test_helpers::register_member(&state, "general", peer_id).await;

    let frame = Frame::request("chat:message", Data::new()).with_room_id("general");
    append_and_broadcast(
        &state,
        "general",
        test_helpers::dummy_message("hi"),
        &frame,
        Some(sender_id),
    )
    .await;

    let seen = recv_frame(&mut peer_rx).await;
    assert_eq!(seen.event, "chat:message");
    assert_no_frame(&mut sender_rx).await;

    let rooms = state.rooms.read().await;
    assert_eq!(rooms["general"].messages.len(), 1);
    assert_eq!(rooms["general"].messages[0].text, "hi");
}

#[tokio::test]
async fn append_and_broadcast_unknown_room_drops_message() {
    let state = test_helpers::test_app_state();
    let mut rx = test_helpers::register_member(&state, "general", Uuid::new_v4()).await;

    let frame = Frame::request("chat:message", Data::new()).with_room_id("unknown-room");
    append_and_broadcast(&state, "unknown-room", test_helpers::dummy_message("lost"), &frame, None)
        .await;

    // Members of real rooms see nothing and nothing is retained anywhere.
    assert_no_frame(&mut rx).await;
    let rooms = state.rooms.read().await;
    assert!(rooms.values().all(|room| room.messages.is_empty()));
}

#[tokio::test]
async fn broadcast_stays_inside_the_room() {
    let state = test_helpers::test_app_state();
    let mut market_rx = test_helpers::register_member(&state, "market", Uuid::new_v4()).await;
    let mut pest_rx = test_helpers::register_member(&state, "pest", Uuid::new_v4()).await;

    let frame = Frame::request("chat:message", Data::new()).with_room_id("market");
    append_and_broadcast(&state, "market", test_helpers::dummy_message("rates up"), &frame, None)
        .await;

    let seen = recv_frame(&mut market_rx).await;
    assert_eq!(seen.room_id.as_deref(), Some("market"));
    assert_no_frame(&mut pest_rx).await;
}

#[tokio::test]
async fn disconnect_sweeps_every_room() {
    let state = test_helpers::test_app_state();
    let client_id = Uuid::new_v4();
    let _rx_a = test_helpers::register_member(&state, "pest", client_id).await;
    let _rx_b = test_helpers::register_member(&state, "market", client_id).await;

    disconnect(&state, client_id).await;

    let rooms = state.rooms.read().await;
    assert!(rooms.values().all(|room| room.members.is_empty()));
}

#[tokio::test]
async fn list_returns_sorted_room_ids() {
    let state = test_helpers::test_app_state();
    let ids = list(&state).await;
    assert_eq!(ids, vec!["general", "market", "organic", "pest", "tomato"]);
}
