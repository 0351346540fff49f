// manifests.rs — manifest lifecycle under /orgs/{id}/manifests (§4.H).
// OPERATOR+ for every operation, including the lifecycle transitions and
// pending-only delete; `ManifestStore` itself enforces the state machine.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::auth::{require_org_role, SessionUser};
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateManifestRequest {
    pub uapk_id: String,
    pub version: String,
    pub manifest_json: Value,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateManifestRequest {
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ManifestView {
    pub id: Uuid,
    pub org_id: Uuid,
    pub uapk_id: String,
    pub version: String,
    pub manifest_json: Value,
    pub manifest_hash: String,
    pub status: gateway_core::ManifestStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<gateway_core::Manifest> for ManifestView {
    fn from(m: gateway_core::Manifest) -> Self {
        Self {
            id: m.id,
            org_id: m.org_id,
            uapk_id: m.uapk_id,
            version: m.version,
            manifest_json: m.manifest_json,
            manifest_hash: m.manifest_hash,
            status: m.status,
            description: m.description,
            created_at: m.created_at,
        }
    }
}

pub async fn create_manifest(
    State(state): State<Arc<AppState>>,
    caller: SessionUser,
    Path(org_id): Path<Uuid>,
    Json(req): Json<CreateManifestRequest>,
) -> Result<Json<ManifestView>, ApiError> {
    require_org_role(&state, caller.user.id, org_id, gateway_core::Role::Operator).await?;
    let manifest = state.manifests.create(org_id, &req.uapk_id, &req.version, req.manifest_json, req.description)?;
    Ok(Json(manifest.into()))
}

pub async fn list_manifests(
    State(state): State<Arc<AppState>>,
    caller: SessionUser,
    Path(org_id): Path<Uuid>,
) -> Result<Json<Vec<ManifestView>>, ApiError> {
    require_org_role(&state, caller.user.id, org_id, gateway_core::Role::Operator).await?;
    let manifests = state.manifests.list_for_org(org_id)?.into_iter().map(ManifestView::from).collect();
    Ok(Json(manifests))
}

pub async fn get_manifest(
    State(state): State<Arc<AppState>>,
    caller: SessionUser,
    Path((org_id, manifest_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ManifestView>, ApiError> {
    require_org_role(&state, caller.user.id, org_id, gateway_core::Role::Operator).await?;
    let manifest = state.manifests.get(manifest_id)?.ok_or_else(|| ApiError::not_found("manifest not found"))?;
    Ok(Json(manifest.into()))
}

pub async fn update_manifest(
    State(state): State<Arc<AppState>>,
    caller: SessionUser,
    Path((org_id, manifest_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<UpdateManifestRequest>,
) -> Result<Json<ManifestView>, ApiError> {
    require_org_role(&state, caller.user.id, org_id, gateway_core::Role::Operator).await?;
    let manifest = state.manifests.update_description(manifest_id, req.description)?;
    Ok(Json(manifest.into()))
}

pub async fn activate_manifest(
    State(state): State<Arc<AppState>>,
    caller: SessionUser,
    Path((org_id, manifest_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ManifestView>, ApiError> {
    require_org_role(&state, caller.user.id, org_id, gateway_core::Role::Operator).await?;
    Ok(Json(state.manifests.activate(manifest_id)?.into()))
}

pub async fn suspend_manifest(
    State(state): State<Arc<AppState>>,
    caller: SessionUser,
    Path((org_id, manifest_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ManifestView>, ApiError> {
    require_org_role(&state, caller.user.id, org_id, gateway_core::Role::Operator).await?;
    Ok(Json(state.manifests.suspend(manifest_id)?.into()))
}

pub async fn revoke_manifest(
    State(state): State<Arc<AppState>>,
    caller: SessionUser,
    Path((org_id, manifest_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ManifestView>, ApiError> {
    require_org_role(&state, caller.user.id, org_id, gateway_core::Role::Operator).await?;
    Ok(Json(state.manifests.revoke(manifest_id)?.into()))
}

pub async fn delete_manifest(
    State(state): State<Arc<AppState>>,
    caller: SessionUser,
    Path((org_id, manifest_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<serde_json::Value>, ApiError> {
    require_org_role(&state, caller.user.id, org_id, gateway_core::Role::Operator).await?;
    state.manifests.delete(manifest_id)?;
    Ok(Json(serde_json::json!({ "deleted": true })))
}
