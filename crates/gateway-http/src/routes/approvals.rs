// approvals.rs — GET /approvals{,/pending,/stats,/{id}}, POST /approvals/{id}/{approve,deny}
// (§4.J). Viewing requires OPERATOR+ in the approval's org; deciding
// (approve/deny) requires ADMIN+ — only an admin mints an override token.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::auth::{require_org_role, SessionUser};
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ApprovalView {
    pub approval_id: String,
    pub org_id: Uuid,
    pub interaction_id: String,
    pub uapk_id: String,
    pub agent_id: String,
    pub action: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counterparty: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
    pub reason_codes: Vec<String>,
    pub status: gateway_core::ApprovalStatus,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decided_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decided_by: Option<String>,
}

impl From<gateway_core::Approval> for ApprovalView {
    fn from(a: gateway_core::Approval) -> Self {
        Self {
            approval_id: a.approval_id,
            org_id: a.org_id,
            interaction_id: a.interaction_id,
            uapk_id: a.uapk_id,
            agent_id: a.agent_id,
            action: a.action,
            counterparty: a.counterparty,
            context: a.context,
            reason_codes: a.reason_codes,
            status: a.status,
            created_at: a.created_at,
            expires_at: a.expires_at,
            decided_at: a.decided_at,
            decided_by: a.decided_by,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct OrgScopedQuery {
    pub org_id: Uuid,
}

pub async fn list_approvals(
    State(state): State<Arc<AppState>>,
    caller: SessionUser,
    Query(query): Query<OrgScopedQuery>,
) -> Result<Json<Vec<ApprovalView>>, ApiError> {
    require_org_role(&state, caller.user.id, query.org_id, gateway_core::Role::Operator).await?;
    let approvals = state.approvals.list_for_org(query.org_id)?.into_iter().map(ApprovalView::from).collect();
    Ok(Json(approvals))
}

pub async fn list_pending_approvals(
    State(state): State<Arc<AppState>>,
    caller: SessionUser,
    Query(query): Query<OrgScopedQuery>,
) -> Result<Json<Vec<ApprovalView>>, ApiError> {
    require_org_role(&state, caller.user.id, query.org_id, gateway_core::Role::Operator).await?;
    let approvals = state.approvals.list_pending_for_org(query.org_id)?.into_iter().map(ApprovalView::from).collect();
    Ok(Json(approvals))
}

#[derive(Debug, Serialize)]
pub struct ApprovalStats {
    pub total: usize,
    pub pending: usize,
    pub approved: usize,
    pub denied: usize,
    pub expired: usize,
}

pub async fn approval_stats(
    State(state): State<Arc<AppState>>,
    caller: SessionUser,
    Query(query): Query<OrgScopedQuery>,
) -> Result<Json<ApprovalStats>, ApiError> {
    require_org_role(&state, caller.user.id, query.org_id, gateway_core::Role::Operator).await?;
    let all = state.approvals.list_for_org(query.org_id)?;
    let mut stats = ApprovalStats { total: all.len(), pending: 0, approved: 0, denied: 0, expired: 0 };
    for a in &all {
        match a.status {
            gateway_core::ApprovalStatus::Pending => stats.pending += 1,
            gateway_core::ApprovalStatus::Approved => stats.approved += 1,
            gateway_core::ApprovalStatus::Denied => stats.denied += 1,
            gateway_core::ApprovalStatus::Expired => stats.expired += 1,
        }
    }
    Ok(Json(stats))
}

fn load_approval(state: &AppState, approval_id: &str) -> Result<gateway_core::Approval, ApiError> {
    state.approvals.get(approval_id)?.ok_or_else(|| ApiError::not_found("approval not found"))
}

pub async fn get_approval(
    State(state): State<Arc<AppState>>,
    caller: SessionUser,
    Path(approval_id): Path<String>,
) -> Result<Json<ApprovalView>, ApiError> {
    let approval = load_approval(&state, &approval_id)?;
    require_org_role(&state, caller.user.id, approval.org_id, gateway_core::Role::Operator).await?;
    Ok(Json(approval.into()))
}

/// 60-3600s bound on `override_token_expires_in_seconds` (§4.J step 2).
const OVERRIDE_TOKEN_EXPIRY_MIN_SECONDS: i64 = 60;
const OVERRIDE_TOKEN_EXPIRY_MAX_SECONDS: i64 = 3600;

#[derive(Debug, Deserialize, Default)]
pub struct DecideApprovalRequest {
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub override_token_expires_in_seconds: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ApproveResponse {
    #[serde(flatten)]
    pub approval: ApprovalView,
    /// The single-use override token — visible exactly once.
    pub override_token: String,
    pub override_token_expires_at: DateTime<Utc>,
}

pub async fn approve_approval(
    State(state): State<Arc<AppState>>,
    caller: SessionUser,
    Path(approval_id): Path<String>,
    Json(req): Json<DecideApprovalRequest>,
) -> Result<Json<ApproveResponse>, ApiError> {
    let approval = load_approval(&state, &approval_id)?;
    require_org_role(&state, caller.user.id, approval.org_id, gateway_core::Role::Admin).await?;

    let override_expiry_seconds = req.override_token_expires_in_seconds.unwrap_or(state.auth_config.override_token_expiry_seconds);
    if !(OVERRIDE_TOKEN_EXPIRY_MIN_SECONDS..=OVERRIDE_TOKEN_EXPIRY_MAX_SECONDS).contains(&override_expiry_seconds) {
        return Err(ApiError::validation(format!(
            "override_token_expires_in_seconds must be between {OVERRIDE_TOKEN_EXPIRY_MIN_SECONDS} and {OVERRIDE_TOKEN_EXPIRY_MAX_SECONDS}"
        )));
    }

    let (updated, override_token) = state.approvals.approve(
        &approval_id,
        &caller.user.email,
        req.notes,
        override_expiry_seconds,
        &state.keypair,
    )?;
    let expires_at = updated
        .override_token_expires_at
        .ok_or_else(|| ApiError::not_found("override token was not issued"))?;
    Ok(Json(ApproveResponse {
        approval: updated.into(),
        override_token,
        override_token_expires_at: expires_at,
    }))
}

pub async fn deny_approval(
    State(state): State<Arc<AppState>>,
    caller: SessionUser,
    Path(approval_id): Path<String>,
    Json(req): Json<DecideApprovalRequest>,
) -> Result<Json<ApprovalView>, ApiError> {
    let approval = load_approval(&state, &approval_id)?;
    require_org_role(&state, caller.user.id, approval.org_id, gateway_core::Role::Admin).await?;
    let updated = state.approvals.deny(&approval_id, &caller.user.email, req.notes)?;
    Ok(Json(updated.into()))
}
