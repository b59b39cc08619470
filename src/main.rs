mod config;
mod frame;
mod routes;
mod services;
mod state;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let config = config::ServerConfig::from_env().expect("invalid configuration");
    let state = state::AppState::new(&config.rooms);

    let app = routes::app(state, &config);
    let listener = tokio::net::TcpListener::bind(config.bind_addr())
        .await
        .expect("failed to bind");

    tracing::info!(
        host = %config.host,
        port = config.port,
        rooms = config.rooms.len(),
        "agrichat relay listening"
    );
    axum::serve(listener, app).await.expect("server failed");
}
