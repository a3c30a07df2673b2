//! Axum router construction for the relay server.
//!
//! Assembles all routes (REST + `WebSocket`) into a single [`Router`]
//! with CORS middleware enabled for cross-origin dashboard access.

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::RelayState;
use crate::ws;

/// Build the complete Axum router for the relay server.
///
/// The router includes:
/// - `GET /` -- minimal HTML status page
/// - `GET /ws/positions` -- `WebSocket` position stream
/// - `GET /api/entities` -- snapshot of all entities
/// - `GET /api/entities/{id}/trail` -- one entity's trail
///
/// CORS is configured to allow any origin for development. In
/// production this should be restricted.
pub fn build_router(state: Arc<RelayState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Status page
        .route("/", get(handlers::index))
        // WebSocket
        .route("/ws/positions", get(ws::ws_positions))
        // REST API
        .route("/api/entities", get(handlers::list_entities))
        .route("/api/entities/{id}/trail", get(handlers::get_trail))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
