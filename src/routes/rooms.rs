//! Room listing route.

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use crate::services;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct RoomList {
    pub rooms: Vec<String>,
}

/// Configured room ids. Display names live in the chat UI; the relay only
/// owns the id set.
pub async fn list_rooms(State(state): State<AppState>) -> Json<RoomList> {
    Json(RoomList { rooms: services::room::list(&state).await })
}

#[cfg(test)]
#[path = "rooms_test.rs"]
mod tests;
