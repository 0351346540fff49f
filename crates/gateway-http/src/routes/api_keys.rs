// api_keys.rs — POST /api-keys, GET /api-keys, POST /api-keys/{id}/revoke.
// No org segment in the path (§6); the org is named in the request body (for
// creation) or a query parameter (for listing), and ADMIN+ is required in
// whichever org the key belongs to.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::{require_org_role, SessionUser};
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateApiKeyRequest {
    pub org_id: Uuid,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct ApiKeyView {
    pub id: Uuid,
    pub org_id: Uuid,
    pub name: String,
    pub key_prefix: String,
    pub status: gateway_core::ApiKeyStatus,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<DateTime<Utc>>,
}

impl From<gateway_core::ApiKey> for ApiKeyView {
    fn from(k: gateway_core::ApiKey) -> Self {
        Self {
            id: k.id,
            org_id: k.org_id,
            name: k.name,
            key_prefix: k.key_prefix,
            status: k.status,
            created_at: k.created_at,
            last_used_at: k.last_used_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CreateApiKeyResponse {
    #[serde(flatten)]
    pub key: ApiKeyView,
    /// The plaintext key — visible exactly once, here.
    pub plaintext: String,
}

pub async fn create_api_key(
    State(state): State<Arc<AppState>>,
    caller: SessionUser,
    Json(req): Json<CreateApiKeyRequest>,
) -> Result<Json<CreateApiKeyResponse>, ApiError> {
    require_org_role(&state, caller.user.id, req.org_id, gateway_core::Role::Admin).await?;
    let (key, plaintext) = state.api_keys.issue(req.org_id, &req.name)?;
    Ok(Json(CreateApiKeyResponse { key: key.into(), plaintext }))
}

#[derive(Debug, Deserialize)]
pub struct ListApiKeysQuery {
    pub org_id: Uuid,
}

pub async fn list_api_keys(
    State(state): State<Arc<AppState>>,
    caller: SessionUser,
    Query(query): Query<ListApiKeysQuery>,
) -> Result<Json<Vec<ApiKeyView>>, ApiError> {
    require_org_role(&state, caller.user.id, query.org_id, gateway_core::Role::Admin).await?;
    let keys = state.api_keys.list_for_org(query.org_id)?.into_iter().map(ApiKeyView::from).collect();
    Ok(Json(keys))
}

pub async fn revoke_api_key(
    State(state): State<Arc<AppState>>,
    caller: SessionUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiKeyView>, ApiError> {
    let key = state.api_keys.get(id)?.ok_or_else(|| ApiError::not_found("api key not found"))?;
    require_org_role(&state, caller.user.id, key.org_id, gateway_core::Role::Admin).await?;
    let revoked = state.api_keys.revoke(id)?;
    Ok(Json(revoked.into()))
}
