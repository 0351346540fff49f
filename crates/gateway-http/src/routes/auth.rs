// auth.rs (routes) — POST /auth/login, GET /auth/me.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use gateway_capability::SessionClaims;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::auth::SessionUser;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub session_token: String,
    pub user_id: uuid::Uuid,
    pub email: String,
}

pub async fn login(State(state): State<Arc<AppState>>, Json(req): Json<LoginRequest>) -> Result<Json<LoginResponse>, ApiError> {
    let user = state
        .users
        .find_by_email(&req.email)?
        .filter(|u| u.is_active)
        .ok_or_else(|| ApiError::unauthorized("invalid email or password"))?;

    gateway_crypto::verify_password(&req.password, &user.password_hash).map_err(|_| ApiError::unauthorized("invalid email or password"))?;

    state.users.record_login(user.id)?;

    let now = Utc::now();
    let claims = SessionClaims {
        sub: user.id.to_string(),
        iat: now.timestamp(),
        exp: (now + chrono::Duration::minutes(state.auth_config.session_token_expiry_minutes)).timestamp(),
    };
    let session_token = gateway_capability::issue_session_token(&claims, &state.keypair)?;

    Ok(Json(LoginResponse {
        session_token,
        user_id: user.id,
        email: user.email,
    }))
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub id: uuid::Uuid,
    pub email: String,
    pub memberships: Vec<Value>,
}

pub async fn me(State(state): State<Arc<AppState>>, user: SessionUser) -> Result<Json<MeResponse>, ApiError> {
    let memberships = state
        .memberships
        .list_for_user(user.user.id)?
        .into_iter()
        .map(|m| serde_json::json!({ "org_id": m.org_id, "role": m.role }))
        .collect();

    Ok(Json(MeResponse {
        id: user.user.id,
        email: user.user.email,
        memberships,
    }))
}
