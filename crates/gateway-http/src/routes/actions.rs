// actions.rs — POST /actions, the gateway's central endpoint (§4.K). Bearer
// authentication only: a capability token in `Authorization`, and an
// optional single-use override token in `X-Override-Token` for actions a
// human has already approved. No session/role check here — admission is
// entirely the capability token's business, delegated to `ActionGateway::admit`.

use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;

use crate::error::ApiError;
use crate::state::AppState;

fn bearer_from(headers: &HeaderMap, header_name: axum::http::HeaderName) -> Option<String> {
    headers
        .get(header_name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string)
}

pub async fn admit_action(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<gateway_core::ActionRequest>,
) -> Result<Json<gateway_core::ActionResponse>, ApiError> {
    gateway_core::validate_action_request(&req)?;

    let capability_bearer = bearer_from(&headers, axum::http::header::AUTHORIZATION)
        .ok_or_else(|| ApiError::unauthorized("missing bearer credential"))?;
    let override_bearer = bearer_from(&headers, axum::http::HeaderName::from_static("x-override-token"));

    let response = state
        .gateway()
        .admit(&capability_bearer, override_bearer.as_deref(), req)
        .await?;
    Ok(Json(response))
}
