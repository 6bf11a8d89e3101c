//! Axum router construction for the Observer API.
//!
//! Assembles all routes (REST + `WebSocket`) into a single [`Router`]
//! with CORS middleware enabled for cross-origin dashboard access.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the complete Axum router for the Observer server.
///
/// See [`handlers`] for the REST endpoints and [`ws`] for the
/// `WebSocket` streams.
///
/// CORS is configured to allow any origin for development. In
/// production this should be restricted.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health))
        // WebSocket
        .route("/ws/world", get(ws::ws_world))
        .route("/ws/conversations/{id}", get(ws::ws_conversation))
        // World control
        .route("/api/world/start", post(handlers::start_world))
        .route("/api/world/stop", post(handlers::stop_world))
        .route("/api/world/state", get(handlers::world_state))
        .route("/api/world/spawn", post(handlers::spawn_agent))
        .route("/api/world/remove", post(handlers::remove_agent))
        // Profiles
        .route(
            "/api/agents",
            get(handlers::list_agents)
                .post(handlers::create_agent)
                .delete(handlers::delete_all_agents),
        )
        .route(
            "/api/agents/{id}",
            get(handlers::get_agent)
                .put(handlers::update_agent)
                .delete(handlers::delete_agent),
        )
        // Conversations and matches
        .route(
            "/api/conversations",
            get(handlers::list_conversations).post(handlers::start_conversation),
        )
        .route("/api/conversations/{id}", get(handlers::get_conversation))
        .route("/api/matches", get(handlers::list_matches))
        .route("/api/stats", get(handlers::stats))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
