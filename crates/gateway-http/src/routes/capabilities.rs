// capabilities.rs — GET /capabilities/gateway-key (public key discovery, no
// auth), the external-issuer registry under /capabilities/issuers, and
// POST /capabilities/issue — an org-scoped token issuance convenience that
// takes `org_id` in the body rather than the path. Every issuer always
// verifies against its own registered public key; the gateway never holds
// an external issuer's private key, so it only ever signs with its own.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::{require_org_role, SessionUser};
use crate::error::ApiError;
use crate::routes::tokens::{IssueTokenRequestBody, IssueTokenResponse, TokenView};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct GatewayKeyView {
    pub public_key: String,
    pub algorithm: &'static str,
}

pub async fn gateway_key(State(state): State<Arc<AppState>>) -> Json<GatewayKeyView> {
    Json(GatewayKeyView { public_key: state.keypair.public_key_base64(), algorithm: "EdDSA" })
}

#[derive(Debug, Deserialize)]
pub struct RegisterIssuerRequest {
    pub org_id: Uuid,
    pub issuer_id: String,
    pub name: String,
    pub public_key: String,
}

#[derive(Debug, Serialize)]
pub struct IssuerView {
    pub id: Uuid,
    pub org_id: Uuid,
    pub issuer_id: String,
    pub name: String,
    pub status: gateway_core::IssuerStatus,
    pub created_at: DateTime<Utc>,
}

impl From<gateway_core::CapabilityIssuer> for IssuerView {
    fn from(i: gateway_core::CapabilityIssuer) -> Self {
        Self { id: i.id, org_id: i.org_id, issuer_id: i.issuer_id, name: i.name, status: i.status, created_at: i.created_at }
    }
}

pub async fn register_issuer(
    State(state): State<Arc<AppState>>,
    caller: SessionUser,
    Json(req): Json<RegisterIssuerRequest>,
) -> Result<Json<IssuerView>, ApiError> {
    require_org_role(&state, caller.user.id, req.org_id, gateway_core::Role::Admin).await?;
    let issuer = state.issuers.register(req.org_id, &req.issuer_id, &req.name, &req.public_key)?;
    Ok(Json(issuer.into()))
}

fn load_issuer(state: &AppState, id: Uuid) -> Result<gateway_core::CapabilityIssuer, ApiError> {
    state.issuers.get(id)?.ok_or_else(|| ApiError::not_found("issuer not found"))
}

pub async fn get_issuer(
    State(state): State<Arc<AppState>>,
    caller: SessionUser,
    Path(issuer_id): Path<Uuid>,
) -> Result<Json<IssuerView>, ApiError> {
    let issuer = load_issuer(&state, issuer_id)?;
    require_org_role(&state, caller.user.id, issuer.org_id, gateway_core::Role::Operator).await?;
    Ok(Json(issuer.into()))
}

pub async fn revoke_issuer(
    State(state): State<Arc<AppState>>,
    caller: SessionUser,
    Path(issuer_id): Path<Uuid>,
) -> Result<Json<IssuerView>, ApiError> {
    let issuer = load_issuer(&state, issuer_id)?;
    require_org_role(&state, caller.user.id, issuer.org_id, gateway_core::Role::Admin).await?;
    let revoked = state.issuers.revoke(issuer_id)?;
    Ok(Json(revoked.into()))
}

#[derive(Debug, Serialize)]
pub struct IssuerPublicKeyView {
    pub issuer_id: String,
    pub public_key: String,
}

pub async fn issuer_public_key(
    State(state): State<Arc<AppState>>,
    caller: SessionUser,
    Path(issuer_id): Path<Uuid>,
) -> Result<Json<IssuerPublicKeyView>, ApiError> {
    let issuer = load_issuer(&state, issuer_id)?;
    require_org_role(&state, caller.user.id, issuer.org_id, gateway_core::Role::Admin).await?;
    Ok(Json(IssuerPublicKeyView { issuer_id: issuer.issuer_id, public_key: issuer.public_key }))
}

#[derive(Debug, Deserialize)]
pub struct IssueCapabilityRequest {
    pub org_id: Uuid,
    #[serde(flatten)]
    pub token: IssueTokenRequestBody,
}

pub async fn issue_capability(
    State(state): State<Arc<AppState>>,
    caller: SessionUser,
    Json(req): Json<IssueCapabilityRequest>,
) -> Result<Json<IssueTokenResponse>, ApiError> {
    require_org_role(&state, caller.user.id, req.org_id, gateway_core::Role::Admin).await?;

    let token = state.tokens.issue(
        &state.manifests,
        gateway_core::IssueTokenRequest {
            org_id: req.org_id,
            agent_id: req.token.agent_id,
            manifest_id: req.token.manifest_id,
            uapk_id: req.token.uapk_id,
            capabilities: req.token.capabilities,
            expires_in_seconds: req.token.expires_in_seconds,
            issued_by: caller.user.email.clone(),
            constraints: req.token.constraints,
            max_actions: req.token.max_actions,
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

    Ok(Json(IssueTokenResponse { token: TokenView::from(token), access_token }))
}
