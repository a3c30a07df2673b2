//! REST endpoint handlers for the relay server.
//!
//! The REST surface is a read-only view beside the `WebSocket` stream,
//! served from the same [`RelayState`].
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/` | Minimal HTML status page |
//! | `GET` | `/api/entities` | Snapshot of all entities |
//! | `GET` | `/api/entities/{id}/trail` | One entity's trail |

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::response::{Html, IntoResponse};

use geotrace_types::{EntityId, EntityState, TrackPoint};

use crate::error::ApiError;
use crate::state::RelayState;

/// Serve a minimal HTML page showing relay status and ingest counters.
pub async fn index(State(state): State<Arc<RelayState>>) -> impl IntoResponse {
    let entity_count = state.entity_count().await;
    let connection_count = state.connection_count().await;
    let counters = state.metrics().counters();

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <title>Geotrace Relay</title>
    <style>
        body {{
            background: #0d1117;
            color: #c9d1d9;
            font-family: 'Cascadia Code', 'Fira Code', 'Consolas', monospace;
            padding: 2rem;
            max-width: 800px;
            margin: 0 auto;
        }}
        h1 {{ color: #58a6ff; margin-bottom: 0.25rem; }}
        .subtitle {{ color: #8b949e; margin-top: 0; }}
        .metric {{
            display: inline-block;
            background: #161b22;
            border: 1px solid #30363d;
            border-radius: 6px;
            padding: 1rem 1.5rem;
            margin: 0.5rem 0.5rem 0.5rem 0;
            min-width: 120px;
        }}
        .metric .label {{ color: #8b949e; font-size: 0.85rem; }}
        .metric .value {{ color: #58a6ff; font-size: 1.5rem; font-weight: bold; }}
        a {{ color: #58a6ff; text-decoration: none; }}
        a:hover {{ text-decoration: underline; }}
        ul {{ list-style: none; padding: 0; }}
        li {{ padding: 0.3rem 0; }}
        li::before {{ content: "GET "; color: #7ee787; font-weight: bold; }}
        .status {{ color: #3fb950; font-weight: bold; }}
        hr {{ border: none; border-top: 1px solid #30363d; margin: 1.5rem 0; }}
    </style>
</head>
<body>
    <h1>Geotrace Relay</h1>
    <p class="subtitle">Vehicle position fan-out server</p>

    <p>Status: <span class="status">RUNNING</span></p>

    <div>
        <div class="metric">
            <div class="label">Entities</div>
            <div class="value">{entity_count}</div>
        </div>
        <div class="metric">
            <div class="label">Observers</div>
            <div class="value">{connection_count}</div>
        </div>
        <div class="metric">
            <div class="label">Received</div>
            <div class="value">{received}</div>
        </div>
        <div class="metric">
            <div class="label">Binary</div>
            <div class="value">{binary}</div>
        </div>
        <div class="metric">
            <div class="label">Fallback</div>
            <div class="value">{text}</div>
        </div>
        <div class="metric">
            <div class="label">Dropped</div>
            <div class="value">{dropped}</div>
        </div>
    </div>

    <hr>

    <h2>API Endpoints</h2>
    <ul>
        <li><a href="/api/entities">/api/entities</a> -- Snapshot of all entities</li>
        <li>/api/entities/:id/trail -- One entity's trail</li>
    </ul>

    <h2>WebSocket</h2>
    <ul>
        <li style="list-style:none;"><code>ws://host:port/ws/positions</code> -- Live position stream</li>
    </ul>
</body>
</html>"#,
        received = counters.received,
        binary = counters.decoded_binary,
        text = counters.decoded_text,
        dropped = counters.dropped,
    ))
}

/// `GET /api/entities` -- snapshot of every known entity.
pub async fn list_entities(
    State(state): State<Arc<RelayState>>,
) -> Result<Json<Vec<EntityState>>, ApiError> {
    Ok(Json(state.snapshot().await))
}

/// `GET /api/entities/{id}/trail` -- one entity's trail, oldest first.
///
/// # Errors
///
/// Returns [`ApiError::NotFound`] for an unknown entity id.
pub async fn get_trail(
    State(state): State<Arc<RelayState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<TrackPoint>>, ApiError> {
    let entity_id = EntityId::new(id);
    state
        .trail(&entity_id)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("unknown entity: {entity_id}")))
}
