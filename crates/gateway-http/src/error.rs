// error.rs — HTTP-layer error type. Every handler returns `Result<_, ApiError>`;
// `IntoResponse` maps it to a JSON body and a status code per §7's taxonomy
// (AUTHENTICATION -> 401, AUTHORIZATION -> 403, VALIDATION -> 422,
// STATE -> 400, CONFLICT -> 409, not-found -> 404).
//
// `401` never distinguishes "no credential" from "bad credential" in the
// body text — both collapse to the same generic message.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use gateway_core::GatewayError;
use serde_json::json;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "AUTHENTICATION", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, "AUTHORIZATION", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION", message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "STATE", message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "error": { "code": self.code, "message": self.message } }));
        (self.status, body).into_response()
    }
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        match &err {
            GatewayError::NotFound(_) => ApiError::new(StatusCode::NOT_FOUND, "NOT_FOUND", err.to_string()),
            GatewayError::Conflict(_) => ApiError::new(StatusCode::CONFLICT, "CONFLICT", err.to_string()),
            GatewayError::InvalidTransition { .. } => ApiError::new(StatusCode::BAD_REQUEST, "STATE", err.to_string()),
            GatewayError::Validation(_) => ApiError::new(StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION", err.to_string()),
            GatewayError::Authentication(_) => ApiError::new(StatusCode::UNAUTHORIZED, "AUTHENTICATION", "invalid credentials".to_string()),
            GatewayError::Token(_) => ApiError::new(StatusCode::UNAUTHORIZED, "AUTHENTICATION", "invalid credentials".to_string()),
            GatewayError::Crypto(_) => ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "CRYPTO", "cryptographic operation failed".to_string()),
            GatewayError::Connector(_) => ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "CONNECTOR", err.to_string()),
            GatewayError::Audit(_) | GatewayError::Canon(_) | GatewayError::Serialization(_) | GatewayError::OpenFailed { .. } | GatewayError::Io { .. } => {
                ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL", "internal error".to_string())
            }
        }
    }
}

impl From<gateway_capability::TokenError> for ApiError {
    fn from(err: gateway_capability::TokenError) -> Self {
        ApiError::unauthorized(err.to_string())
    }
}

impl From<gateway_audit::AuditError> for ApiError {
    fn from(err: gateway_audit::AuditError) -> Self {
        GatewayError::from(err).into()
    }
}
