// Public API for integration tests and the server binary

pub mod api;
pub mod auth;
pub mod broadcast;
pub mod config;
pub mod error;
pub mod judge;
pub mod llm;
pub mod protocol;
pub mod puzzles;
pub mod state;
pub mod types;
pub mod ws;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use state::AppState;

/// Assemble the full HTTP + WebSocket application
pub fn router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        .route("/api/login", post(api::login))
        .route("/api/puzzles", get(api::list_puzzles))
        .route("/api/puzzle/{id}", get(api::start_puzzle))
        .route("/api/guess", post(api::guess))
        .route("/api/reveal", get(api::reveal));

    Router::new()
        .route("/ws", get(ws::ws_handler))
        .merge(api_routes)
        .fallback_service(ServeDir::new("static"))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
