// codec.rs — Compact three-segment token envelope: header.payload.signature,
// each segment base64url-without-padding, signature computed over
// `header "." payload` with the gateway's Ed25519 private key.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use gateway_crypto::GatewayKeypair;
use serde::{de::DeserializeOwned, Serialize};

use crate::claims::{CapabilityClaims, OverrideClaims, SessionClaims, TokenHeader, CAPABILITY_TOKEN_TYPE};
use crate::error::TokenError;

fn encode_segment<T: Serialize>(value: &T) -> Result<String, TokenError> {
    let json = serde_json::to_vec(value)?;
    Ok(URL_SAFE_NO_PAD.encode(json))
}

fn decode_segment<T: DeserializeOwned>(segment: &str) -> Result<T, TokenError> {
    let bytes = URL_SAFE_NO_PAD.decode(segment)?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Build a token of any kind: `header.payload.signature`.
fn build<T: Serialize>(payload: &T, keypair: &GatewayKeypair) -> Result<String, TokenError> {
    let header = TokenHeader::default();
    let header_seg = encode_segment(&header)?;
    let payload_seg = encode_segment(payload)?;
    let signing_input = format!("{}.{}", header_seg, payload_seg);
    let signature = keypair.sign(signing_input.as_bytes());
    let sig_seg = URL_SAFE_NO_PAD.encode(signature);
    Ok(format!("{}.{}", signing_input, sig_seg))
}

/// Split a token into its three segments and verify the header + signature,
/// returning the still-encoded payload segment for kind-specific decoding.
///
/// Rejects any `alg` other than `EdDSA` — this is the algorithm-confusion
/// defense the header format exists for.
fn verify_envelope<'a>(
    token: &'a str,
    public_key: &[u8],
) -> Result<&'a str, TokenError> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err(TokenError::InvalidFormat(parts.len()));
    }
    let (header_seg, payload_seg, sig_seg) = (parts[0], parts[1], parts[2]);

    let header: TokenHeader = decode_segment(header_seg)?;
    if header.alg != "EdDSA" {
        return Err(TokenError::UnsupportedAlgorithm(header.alg));
    }

    let signature = URL_SAFE_NO_PAD.decode(sig_seg)?;
    let signing_input = format!("{}.{}", header_seg, payload_seg);
    gateway_crypto::verify_signature(public_key, signing_input.as_bytes(), &signature)
        .map_err(|_| TokenError::InvalidSignature)?;

    Ok(payload_seg)
}

/// Read a capability token's claims without checking the signature — used
/// only to discover which public key (`iss`) to verify against before
/// calling [`verify_capability_token`] for real. Never trust the returned
/// claims for an authorization decision.
pub fn peek_capability_claims(token: &str) -> Result<CapabilityClaims, TokenError> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err(TokenError::InvalidFormat(parts.len()));
    }
    decode_segment(parts[1])
}

/// Issue a capability token.
pub fn issue_capability_token(
    claims: &CapabilityClaims,
    keypair: &GatewayKeypair,
) -> Result<String, TokenError> {
    build(claims, keypair)
}

/// Verify a capability token. Rejects an invalid signature, an unsupported
/// algorithm, a wrong `type` claim, or `exp <= now` (no clock-skew grace —
/// an expired-by-one-millisecond token must be rejected).
pub fn verify_capability_token(
    token: &str,
    public_key: &[u8],
    now: DateTime<Utc>,
) -> Result<CapabilityClaims, TokenError> {
    let payload_seg = verify_envelope(token, public_key)?;
    let claims: CapabilityClaims = decode_segment(payload_seg)?;
    if claims.token_type != CAPABILITY_TOKEN_TYPE {
        return Err(TokenError::WrongType {
            expected: CAPABILITY_TOKEN_TYPE.to_string(),
            found: claims.token_type,
        });
    }
    if claims.exp <= now.timestamp() {
        return Err(TokenError::Expired);
    }
    Ok(claims)
}

/// Issue an override token.
pub fn issue_override_token(
    claims: &OverrideClaims,
    keypair: &GatewayKeypair,
) -> Result<String, TokenError> {
    build(claims, keypair)
}

/// Verify an override token. The `jti` claim must contain the substring
/// `"override"`, matching the format §4.C requires.
pub fn verify_override_token(
    token: &str,
    public_key: &[u8],
    now: DateTime<Utc>,
) -> Result<OverrideClaims, TokenError> {
    let payload_seg = verify_envelope(token, public_key)?;
    let claims: OverrideClaims = decode_segment(payload_seg)?;
    if !claims.jti.contains("override") {
        return Err(TokenError::WrongType {
            expected: "override".to_string(),
            found: claims.jti.clone(),
        });
    }
    if claims.exp <= now.timestamp() {
        return Err(TokenError::Expired);
    }
    Ok(claims)
}

/// Issue a session token for a human operator.
pub fn issue_session_token(
    claims: &SessionClaims,
    keypair: &GatewayKeypair,
) -> Result<String, TokenError> {
    build(claims, keypair)
}

/// Verify a session token.
pub fn verify_session_token(
    token: &str,
    public_key: &[u8],
    now: DateTime<Utc>,
) -> Result<SessionClaims, TokenError> {
    let payload_seg = verify_envelope(token, public_key)?;
    let claims: SessionClaims = decode_segment(payload_seg)?;
    if claims.exp <= now.timestamp() {
        return Err(TokenError::Expired);
    }
    Ok(claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use gateway_crypto::GatewayKeypair;

    fn capability_claims(exp_offset: Duration) -> CapabilityClaims {
        let now = Utc::now();
        CapabilityClaims {
            iss: "gateway".to_string(),
            sub: "cap-abc123".to_string(),
            agent_id: "billing-bot".to_string(),
            org_id: "org-1".to_string(),
            capabilities: vec!["email:send".to_string()],
            iat: now.timestamp(),
            exp: (now + exp_offset).timestamp(),
            token_type: CAPABILITY_TOKEN_TYPE.to_string(),
            constraints: None,
            uapk_id: Some("billing-bot".to_string()),
            allowed_action_types: None,
            allowed_tools: None,
        }
    }

    #[test]
    fn issue_then_verify_round_trips() {
        let (keypair, _) = GatewayKeypair::generate().unwrap();
        let claims = capability_claims(Duration::hours(1));
        let token = issue_capability_token(&claims, &keypair).unwrap();
        let verified =
            verify_capability_token(&token, &keypair.public_key_bytes(), Utc::now()).unwrap();
        assert_eq!(verified.sub, "cap-abc123");
        assert_eq!(verified.capabilities, vec!["email:send".to_string()]);
    }

    #[test]
    fn token_has_three_segments() {
        let (keypair, _) = GatewayKeypair::generate().unwrap();
        let claims = capability_claims(Duration::hours(1));
        let token = issue_capability_token(&claims, &keypair).unwrap();
        assert_eq!(token.split('.').count(), 3);
    }

    #[test]
    fn expired_by_one_millisecond_is_rejected() {
        let (keypair, _) = GatewayKeypair::generate().unwrap();
        let claims = capability_claims(Duration::milliseconds(-1));
        let token = issue_capability_token(&claims, &keypair).unwrap();
        let result = verify_capability_token(&token, &keypair.public_key_bytes(), Utc::now());
        assert!(matches!(result, Err(TokenError::Expired)));
    }

    #[test]
    fn tampered_signature_is_rejected() {
        let (keypair, _) = GatewayKeypair::generate().unwrap();
        let claims = capability_claims(Duration::hours(1));
        let mut token = issue_capability_token(&claims, &keypair).unwrap();
        token.push('x');
        let result = verify_capability_token(&token, &keypair.public_key_bytes(), Utc::now());
        assert!(result.is_err());
    }

    #[test]
    fn wrong_public_key_is_rejected() {
        let (keypair_a, _) = GatewayKeypair::generate().unwrap();
        let (keypair_b, _) = GatewayKeypair::generate().unwrap();
        let claims = capability_claims(Duration::hours(1));
        let token = issue_capability_token(&claims, &keypair_a).unwrap();
        let result = verify_capability_token(&token, &keypair_b.public_key_bytes(), Utc::now());
        assert!(matches!(result, Err(TokenError::InvalidSignature)));
    }

    #[test]
    fn forged_alg_none_header_is_rejected() {
        let (keypair, _) = GatewayKeypair::generate().unwrap();
        let claims = capability_claims(Duration::hours(1));
        let header = serde_json::json!({"alg": "none", "typ": "JWT"});
        let header_seg = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&header).unwrap());
        let payload_seg = encode_segment(&claims).unwrap();
        let forged = format!("{}.{}.", header_seg, payload_seg);
        let result = verify_capability_token(&forged, &keypair.public_key_bytes(), Utc::now());
        assert!(matches!(result, Err(TokenError::UnsupportedAlgorithm(_))));
    }

    #[test]
    fn override_token_round_trips() {
        let (keypair, _) = GatewayKeypair::generate().unwrap();
        let now = Utc::now();
        let claims = OverrideClaims {
            iss: "gateway".to_string(),
            sub: "appr-1".to_string(),
            org_id: "org-1".to_string(),
            uapk_id: "billing-bot".to_string(),
            agent_id: "billing-bot".to_string(),
            action_hash: "deadbeef".to_string(),
            approval_id: "appr-1".to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::minutes(5)).timestamp(),
            jti: "override-abc".to_string(),
        };
        let token = issue_override_token(&claims, &keypair).unwrap();
        let verified =
            verify_override_token(&token, &keypair.public_key_bytes(), Utc::now()).unwrap();
        assert_eq!(verified.action_hash, "deadbeef");
    }

    #[test]
    fn session_token_round_trips() {
        let (keypair, _) = GatewayKeypair::generate().unwrap();
        let now = Utc::now();
        let claims = SessionClaims {
            sub: "user-1".to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::hours(8)).timestamp(),
        };
        let token = issue_session_token(&claims, &keypair).unwrap();
        let verified =
            verify_session_token(&token, &keypair.public_key_bytes(), Utc::now()).unwrap();
        assert_eq!(verified.sub, "user-1");
    }

    #[test]
    fn malformed_token_missing_segments_is_rejected() {
        let (keypair, _) = GatewayKeypair::generate().unwrap();
        let result = verify_capability_token("only.two", &keypair.public_key_bytes(), Utc::now());
        assert!(matches!(result, Err(TokenError::InvalidFormat(2))));
    }
}
