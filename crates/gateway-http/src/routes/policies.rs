// policies.rs — POST/GET/PATCH/DELETE /orgs/{id}/policies (§4.G). ADMIN+
// throughout. `PolicyStore` exposes no field-level update beyond the
// `enabled` flag, so PATCH here is an enable/disable toggle rather than a
// general rule edit — replacing a policy's rules means deleting and
// recreating it.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use gateway_policy::{PolicyRules, PolicyScope, PolicyType};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::{require_org_role, SessionUser};
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreatePolicyRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub policy_type: PolicyType,
    pub scope: PolicyScope,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub rules: PolicyRules,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePolicyRequest {
    pub enabled: bool,
}

#[derive(Debug, Serialize)]
pub struct PolicyView {
    pub id: Uuid,
    pub org_id: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub policy_type: PolicyType,
    pub scope: PolicyScope,
    pub priority: i32,
    pub rules: PolicyRules,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<gateway_policy::Policy> for PolicyView {
    fn from(p: gateway_policy::Policy) -> Self {
        Self {
            id: p.id,
            org_id: p.org_id,
            name: p.name,
            description: p.description,
            policy_type: p.policy_type,
            scope: p.scope,
            priority: p.priority,
            rules: p.rules,
            enabled: p.enabled,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

pub async fn create_policy(
    State(state): State<Arc<AppState>>,
    caller: SessionUser,
    Path(org_id): Path<Uuid>,
    Json(req): Json<CreatePolicyRequest>,
) -> Result<Json<PolicyView>, ApiError> {
    require_org_role(&state, caller.user.id, org_id, gateway_core::Role::Admin).await?;
    let policy = state.policies.create(gateway_core::CreatePolicyRequest {
        org_id,
        name: req.name,
        description: req.description,
        policy_type: req.policy_type,
        scope: req.scope,
        priority: req.priority,
        rules: req.rules,
    })?;
    Ok(Json(policy.into()))
}

pub async fn list_policies(
    State(state): State<Arc<AppState>>,
    caller: SessionUser,
    Path(org_id): Path<Uuid>,
) -> Result<Json<Vec<PolicyView>>, ApiError> {
    require_org_role(&state, caller.user.id, org_id, gateway_core::Role::Admin).await?;
    let policies = state.policies.list_for_org(org_id)?.into_iter().map(PolicyView::from).collect();
    Ok(Json(policies))
}

pub async fn update_policy(
    State(state): State<Arc<AppState>>,
    caller: SessionUser,
    Path((org_id, policy_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<UpdatePolicyRequest>,
) -> Result<Json<PolicyView>, ApiError> {
    require_org_role(&state, caller.user.id, org_id, gateway_core::Role::Admin).await?;
    let policy = state.policies.set_enabled(policy_id, req.enabled)?;
    Ok(Json(policy.into()))
}

pub async fn delete_policy(
    State(state): State<Arc<AppState>>,
    caller: SessionUser,
    Path((org_id, policy_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<serde_json::Value>, ApiError> {
    require_org_role(&state, caller.user.id, org_id, gateway_core::Role::Admin).await?;
    state.policies.delete(policy_id)?;
    Ok(Json(serde_json::json!({ "deleted": true })))
}
