// orgs.rs — POST /orgs, GET /orgs, GET /orgs/{id}. Creating an org makes the
// caller its first membership at Role::Owner; listing and fetching are
// scoped to orgs the caller actually belongs to.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::SessionUser;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateOrgRequest {
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Serialize)]
pub struct OrgView {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub created_at: DateTime<Utc>,
}

impl From<gateway_core::Organization> for OrgView {
    fn from(o: gateway_core::Organization) -> Self {
        Self { id: o.id, name: o.name, slug: o.slug, created_at: o.created_at }
    }
}

pub async fn create_org(State(state): State<Arc<AppState>>, caller: SessionUser, Json(req): Json<CreateOrgRequest>) -> Result<Json<OrgView>, ApiError> {
    let org = state.orgs.create(&req.name, &req.slug)?;
    state.memberships.create(org.id, caller.user.id, gateway_core::Role::Owner)?;
    Ok(Json(org.into()))
}

pub async fn list_orgs(State(state): State<Arc<AppState>>, caller: SessionUser) -> Result<Json<Vec<OrgView>>, ApiError> {
    let memberships = state.memberships.list_for_user(caller.user.id)?;
    let mut orgs = Vec::with_capacity(memberships.len());
    for m in memberships {
        if let Some(org) = state.orgs.get(m.org_id)? {
            orgs.push(org.into());
        }
    }
    Ok(Json(orgs))
}

pub async fn get_org(State(state): State<Arc<AppState>>, caller: SessionUser, Path(org_id): Path<Uuid>) -> Result<Json<OrgView>, ApiError> {
    crate::auth::require_org_role(&state, caller.user.id, org_id, gateway_core::Role::Viewer).await?;
    let org = state.orgs.get(org_id)?.ok_or_else(|| ApiError::not_found("organization not found"))?;
    Ok(Json(org.into()))
}
