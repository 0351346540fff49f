// auth.rs — session-bearer authentication and role authorization helpers.
//
// A session token is the same three-segment Ed25519-signed envelope every
// other gateway token uses (`gateway_capability::{issue,verify}_session_token`),
// just carrying a bare `sub`/`iat`/`exp` claim set. `SessionUser` extracts and
// verifies it from the `Authorization: Bearer …` header; `require_role` loads
// the caller's membership in a path-scoped org and checks it meets a floor.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use chrono::Utc;
use gateway_core::{Membership, Role, User};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

pub struct SessionUser {
    pub user: User,
}

fn bearer_token(parts: &Parts) -> Result<&str, ApiError> {
    let header = parts
        .headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::unauthorized("missing bearer credential"))?;
    header
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::unauthorized("authorization header must be a bearer token"))
}

impl FromRequestParts<Arc<AppState>> for SessionUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let claims = gateway_capability::verify_session_token(token, &state.keypair.public_key_bytes(), Utc::now())
            .map_err(|_| ApiError::unauthorized("invalid or expired session token"))?;
        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| ApiError::unauthorized("invalid session token"))?;
        let user = state
            .users
            .get(user_id)?
            .ok_or_else(|| ApiError::unauthorized("invalid session token"))?;
        if !user.is_active {
            return Err(ApiError::unauthorized("user account is inactive"));
        }
        Ok(SessionUser { user })
    }
}

/// Load the caller's membership in the org named by the `{id}` (or `{org_id}`)
/// path segment and require it meet `required`. A session user who is not a
/// member at all gets `403` distinct from one whose role is too low only in
/// the message text — both collapse to the same status per §7.
pub async fn require_org_role(state: &AppState, user_id: Uuid, org_id: Uuid, required: Role) -> Result<Membership, ApiError> {
    let membership = state
        .memberships
        .find(org_id, user_id)?
        .ok_or_else(|| ApiError::forbidden("not a member of this organization"))?;
    if !membership.role.at_least(required) {
        return Err(ApiError::forbidden(format!("requires at least {:?} role", required)));
    }
    Ok(membership)
}
