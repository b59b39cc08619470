//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! Binds the websocket endpoint and the small HTTP surface (room listing,
//! health) under a single Axum router, with CORS pinned to the configured
//! browser origin.

pub mod rooms;
pub mod ws;

use axum::Router;
use axum::http::{HeaderValue, Method, StatusCode};
use axum::routing::get;
use tower_http::cors::{Any, CorsLayer};

use crate::config::ServerConfig;
use crate::state::AppState;

/// Assemble the application router.
pub fn app(state: AppState, config: &ServerConfig) -> Router {
    // Origin validity is checked by `ServerConfig::from_env`.
    let origin = config
        .allowed_origin
        .parse::<HeaderValue>()
        .expect("allowed origin validated at startup");
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/rooms", get(rooms::list_rooms))
        .route("/api/ws", get(ws::handle_ws))
        .layer(cors)
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}
