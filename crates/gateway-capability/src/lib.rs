//! # gateway-capability
//!
//! Compact signed token codec for the agent interaction gateway: capability
//! tokens (the everyday bearer credential agents present), override tokens
//! (single-use, minted on human approval), and session tokens (human
//! operators). Every token shares a JWT-shaped `header.payload.signature`
//! envelope signed with the gateway's Ed25519 keypair (`EdDSA`); see
//! [`gateway_crypto::GatewayKeypair`].
//!
//! Also home to `domain:operation` capability-string matching, shared by
//! the capability gate and by manifest-subset checks.

pub mod claims;
pub mod codec;
pub mod error;
pub mod grants;

pub use claims::{CapabilityClaims, OverrideClaims, SessionClaims, TokenHeader, CAPABILITY_TOKEN_TYPE};
pub use codec::{
    issue_capability_token, issue_override_token, issue_session_token, peek_capability_claims,
    verify_capability_token, verify_override_token, verify_session_token,
};
pub use error::TokenError;
pub use grants::{capabilities_allow, is_subset_of};
