// tokens.rs — capability token issuance/lifecycle under /orgs/{id}/tokens
// (§4.I). Issuing requires OPERATOR+; the compact signed token string is
// returned exactly once, in the issuance response body.

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
pub struct IssueTokenRequestBody {
    pub agent_id: String,
    #[serde(default)]
    pub manifest_id: Option<Uuid>,
    #[serde(default)]
    pub uapk_id: Option<String>,
    pub capabilities: Vec<String>,
    pub expires_in_seconds: i64,
    #[serde(default)]
    pub constraints: gateway_core::TokenConstraints,
    #[serde(default)]
    pub max_actions: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct TokenView {
    pub token_id: String,
    pub org_id: Uuid,
    pub agent_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manifest_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uapk_id: Option<String>,
    pub capabilities: Vec<String>,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub issued_by: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_actions: Option<u64>,
    pub actions_used: u64,
    pub revoked: bool,
}

impl From<gateway_core::CapabilityToken> for TokenView {
    fn from(t: gateway_core::CapabilityToken) -> Self {
        Self {
            token_id: t.token_id,
            org_id: t.org_id,
            agent_id: t.agent_id,
            manifest_id: t.manifest_id,
            uapk_id: t.uapk_id,
            capabilities: t.capabilities,
            issued_at: t.issued_at,
            expires_at: t.expires_at,
            issued_by: t.issued_by,
            max_actions: t.max_actions,
            actions_used: t.actions_used,
            revoked: t.revoked,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct IssueTokenResponse {
    #[serde(flatten)]
    pub token: TokenView,
    /// The compact `header.payload.signature` bearer string — visible exactly once.
    pub access_token: String,
}

pub async fn issue_token(
    State(state): State<Arc<AppState>>,
    caller: SessionUser,
    Path(org_id): Path<Uuid>,
    Json(req): Json<IssueTokenRequestBody>,
) -> Result<Json<IssueTokenResponse>, ApiError> {
    require_org_role(&state, caller.user.id, org_id, gateway_core::Role::Operator).await?;

    let token = state.tokens.issue(
        &state.manifests,
        gateway_core::IssueTokenRequest {
            org_id,
            agent_id: req.agent_id,
            manifest_id: req.manifest_id,
            uapk_id: req.uapk_id,
            capabilities: req.capabilities,
            expires_in_seconds: req.expires_in_seconds,
            issued_by: caller.user.email.clone(),
            constraints: req.constraints,
            max_actions: req.max_actions,
        },
    )?;

    let claims = gateway_capability::CapabilityClaims {
        iss: "gateway".to_string(),
        sub: token.token_id.clone(),
        agent_id: token.agent_id.clone(),
        org_id: token.org_id.to_string(),
        capabilities: token.capabilities.clone(),
        iat: token.issued_at.timestamp(),
        exp: token.expires_at.timestamp(),
        token_type: gateway_capability::CAPABILITY_TOKEN_TYPE.to_string(),
        constraints: serde_json::to_value(&token.constraints).ok(),
        uapk_id: token.uapk_id.clone(),
        allowed_action_types: None,
        allowed_tools: None,
    };
    let access_token = gateway_capability::issue_capability_token(&claims, &state.keypair)?;

    Ok(Json(IssueTokenResponse { token: token.into(), access_token }))
}

pub async fn list_tokens(
    State(state): State<Arc<AppState>>,
    caller: SessionUser,
    Path(org_id): Path<Uuid>,
) -> Result<Json<Vec<TokenView>>, ApiError> {
    require_org_role(&state, caller.user.id, org_id, gateway_core::Role::Operator).await?;
    let tokens = state.tokens.list_for_org(org_id)?.into_iter().map(TokenView::from).collect();
    Ok(Json(tokens))
}

pub async fn get_token(
    State(state): State<Arc<AppState>>,
    caller: SessionUser,
    Path((org_id, token_id)): Path<(Uuid, String)>,
) -> Result<Json<TokenView>, ApiError> {
    require_org_role(&state, caller.user.id, org_id, gateway_core::Role::Operator).await?;
    let token = state.tokens.get(&token_id)?.ok_or_else(|| ApiError::not_found("token not found"))?;
    Ok(Json(token.into()))
}

#[derive(Debug, Deserialize, Default)]
pub struct RevokeTokenRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

pub async fn revoke_token(
    State(state): State<Arc<AppState>>,
    caller: SessionUser,
    Path((org_id, token_id)): Path<(Uuid, String)>,
    Json(req): Json<RevokeTokenRequest>,
) -> Result<Json<TokenView>, ApiError> {
    require_org_role(&state, caller.user.id, org_id, gateway_core::Role::Admin).await?;
    let token = state.tokens.revoke(&token_id, req.reason)?;
    Ok(Json(token.into()))
}

#[derive(Debug, Serialize)]
pub struct RevokeAllResponse {
    pub revoked_count: u64,
}

pub async fn revoke_all_for_agent(
    State(state): State<Arc<AppState>>,
    caller: SessionUser,
    Path((org_id, agent_id)): Path<(Uuid, String)>,
) -> Result<Json<RevokeAllResponse>, ApiError> {
    require_org_role(&state, caller.user.id, org_id, gateway_core::Role::Admin).await?;
    let revoked_count = state.tokens.revoke_all_for_agent(org_id, &agent_id)?;
    Ok(Json(RevokeAllResponse { revoked_count }))
}
