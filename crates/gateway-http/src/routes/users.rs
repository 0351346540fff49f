// users.rs — POST /users, GET /users. Human-user registration and listing;
// both require only a valid session (no specific org role).

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::SessionUser;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct UserView {
    pub id: Uuid,
    pub email: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<gateway_core::User> for UserView {
    fn from(u: gateway_core::User) -> Self {
        Self {
            id: u.id,
            email: u.email,
            is_active: u.is_active,
            created_at: u.created_at,
        }
    }
}

pub async fn create_user(State(state): State<Arc<AppState>>, Json(req): Json<CreateUserRequest>) -> Result<Json<UserView>, ApiError> {
    if req.password.len() < 8 {
        return Err(ApiError::validation("password must be at least 8 characters"));
    }
    let password_hash = gateway_crypto::hash_password(&req.password)?;
    let user = state.users.create(&req.email, &password_hash)?;
    Ok(Json(user.into()))
}

pub async fn list_users(State(state): State<Arc<AppState>>, _caller: SessionUser) -> Result<Json<Vec<UserView>>, ApiError> {
    let users = state.users.list()?.into_iter().map(UserView::from).collect();
    Ok(Json(users))
}
