// claims.rs — Payload shapes for the three token kinds the gateway issues.
//
// All three kinds share the same envelope (header.payload.signature, §
// codec.rs) but carry different claim sets. `iat`/`exp` are Unix seconds,
// matching the JWT convention the header's `typ=JWT` advertises.

use serde::{Deserialize, Serialize};

/// Fixed header every gateway token carries. Verification rejects any
/// other `alg` value outright — this is what defeats algorithm-confusion
/// attacks (e.g. a forged `alg=none` or `alg=HS256` token).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenHeader {
    pub alg: String,
    pub typ: String,
}

impl Default for TokenHeader {
    fn default() -> Self {
        Self {
            alg: "EdDSA".to_string(),
            typ: "JWT".to_string(),
        }
    }
}

/// Claims for a **capability** token — the day-to-day bearer credential an
/// agent presents to `POST /actions`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilityClaims {
    pub iss: String,
    /// The capability token's own id (`cap-` + hex), doubling as `sub`.
    pub sub: String,
    pub agent_id: String,
    pub org_id: String,
    pub capabilities: Vec<String>,
    pub iat: i64,
    pub exp: i64,
    #[serde(rename = "type")]
    pub token_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraints: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uapk_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_action_types: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_tools: Option<Vec<String>>,
}

pub const CAPABILITY_TOKEN_TYPE: &str = "capability_token";

/// Claims for a single-use **override** token, minted when a human
/// approves a previously pending action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverrideClaims {
    pub iss: String,
    pub sub: String,
    pub org_id: String,
    pub uapk_id: String,
    pub agent_id: String,
    pub action_hash: String,
    pub approval_id: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

/// Claims for a human-operator **session** token (out of the core's scope
/// to issue — produced by the authentication collaborator — but the
/// gateway still verifies the shape when a session bearer reaches it).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}
