// memberships.rs — POST/GET/DELETE /orgs/{id}/memberships. All three require
// ADMIN+ in the target org; removing a membership additionally refuses the
// organization's last OWNER (enforced by `MembershipStore::remove` itself).

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::{require_org_role, SessionUser};
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateMembershipRequest {
    pub user_id: Uuid,
    pub role: gateway_core::Role,
}

#[derive(Debug, Serialize)]
pub struct MembershipView {
    pub id: Uuid,
    pub org_id: Uuid,
    pub user_id: Uuid,
    pub role: gateway_core::Role,
    pub created_at: DateTime<Utc>,
}

impl From<gateway_core::Membership> for MembershipView {
    fn from(m: gateway_core::Membership) -> Self {
        Self { id: m.id, org_id: m.org_id, user_id: m.user_id, role: m.role, created_at: m.created_at }
    }
}

pub async fn create_membership(
    State(state): State<Arc<AppState>>,
    caller: SessionUser,
    Path(org_id): Path<Uuid>,
    Json(req): Json<CreateMembershipRequest>,
) -> Result<Json<MembershipView>, ApiError> {
    require_org_role(&state, caller.user.id, org_id, gateway_core::Role::Admin).await?;
    let membership = state.memberships.create(org_id, req.user_id, req.role)?;
    Ok(Json(membership.into()))
}

pub async fn list_memberships(
    State(state): State<Arc<AppState>>,
    caller: SessionUser,
    Path(org_id): Path<Uuid>,
) -> Result<Json<Vec<MembershipView>>, ApiError> {
    require_org_role(&state, caller.user.id, org_id, gateway_core::Role::Admin).await?;
    let memberships = state.memberships.list_for_org(org_id)?.into_iter().map(MembershipView::from).collect();
    Ok(Json(memberships))
}

pub async fn delete_membership(
    State(state): State<Arc<AppState>>,
    caller: SessionUser,
    Path((org_id, membership_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<serde_json::Value>, ApiError> {
    require_org_role(&state, caller.user.id, org_id, gateway_core::Role::Admin).await?;
    state.memberships.remove(membership_id)?;
    Ok(Json(serde_json::json!({ "deleted": true })))
}
