// health.rs — liveness/readiness probes. Both public, per §6.

use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::state::AppState;

pub async fn healthz() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// Ready once every store has successfully opened — `list()` on the
/// lightest one (orgs) doubles as a liveness probe of the backing directory.
pub async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.orgs.list() {
        Ok(_) => Json(json!({ "status": "ready" })).into_response(),
        Err(e) => (axum::http::StatusCode::SERVICE_UNAVAILABLE, Json(json!({ "status": "not_ready", "error": e.to_string() }))).into_response(),
    }
}
