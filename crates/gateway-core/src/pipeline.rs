// pipeline.rs — The Action Gateway Pipeline (§4.K): the one codepath every
// `POST /actions` call runs through, from bearer parsing to sealed record.
//
// Ten steps, in order:
//   1. Parse the capability bearer's claims without verifying them yet, to
//      learn which public key (`iss`) to verify the signature against.
//   2. Verify the signature, then re-validate the token id against the
//      authoritative store row (not the claims) — revoked/expired/over its
//      action limit all fail here.
//   3. If an override bearer is also present, verify + redeem it and skip
//      straight to dispatch (step 8): the human already decided.
//   4. Capability gate: is `action_type:tool` covered by the token's own
//      granted capabilities?
//   5. Policy evaluation, accumulating a `PolicyTrace` of named checks
//      (`manifest_check`, `capability_gate`, `amount_cap`, `jurisdiction`,
//      `counterparty`, one per matched policy name).
//   6. Budget check against the org/uapk's daily counter.
//   7. Decision fusion: deny > require_approval > allow.
//   8. On `approved`, dispatch through the resolved connector.
//   9. Seal the decision into a signed, hash-chained interaction record.
//  10. Return `{record_id, decision, decision_reason?, policy_evaluations?,
//      result?, timestamp, duration_ms}`.
//
// Every terminal outcome seals exactly one record, including a bad-token
// denial, provided the token's claims named an attributable `org_id` — a
// token too malformed to even decode produces no record at all (there is
// nothing to attribute it to).

use std::sync::OnceLock;

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use gateway_audit::{
    AuditStore, CheckOutcome, Decision, PendingRecord, PolicyCheckStep as AuditCheckStep, PolicyTrace,
    Reason as AuditReason, RecordSealer,
};
use gateway_connectors::Connector;
use gateway_crypto::GatewayKeypair;
use gateway_policy::{Policy, PolicyOutcome, PolicyRequest};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::approval::{ApprovalStore, CreateApprovalRequest, UsedOverrideTokenStore};
use crate::budget::{BudgetCheck, BudgetStore};
use crate::error::GatewayError;
use crate::issuer::CapabilityIssuerStore;
use crate::manifest::ManifestStore;
use crate::model::{CapabilityToken, Manifest, ManifestStatus, TokenConstraints};
use crate::policy_store::PolicyStore;
use crate::secret_store::SecretStore;
use crate::token_store::CapabilityTokenStore;

/// Tunables with no home of their own in the data model — how generous the
/// gateway is by default, absent a manifest or policy saying otherwise.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub default_daily_budget: u64,
    pub budget_threshold_fraction: Option<f64>,
    pub default_allowed_domains: Vec<String>,
    pub approval_expiry_hours: i64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            default_daily_budget: 1000,
            budget_threshold_fraction: Some(0.9),
            default_allowed_domains: Vec::new(),
            approval_expiry_hours: 24,
        }
    }
}

/// One inbound action request, already stripped of HTTP plumbing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionRequest {
    /// `"<action_type>:<tool>"`.
    pub action: String,
    pub parameters: Value,
    #[serde(default)]
    pub context: Option<Value>,
    #[serde(default)]
    pub idempotency_key: Option<String>,
}

const ACTION_PATTERN_SOURCE: &str = r"^[a-z][a-z0-9-]*:[a-z][a-z0-9-]*$";
const CONTEXT_REASON_MAX_LEN: usize = 1000;
const IDEMPOTENCY_KEY_MAX_LEN: usize = 64;

fn action_pattern() -> &'static regex::Regex {
    static PATTERN: OnceLock<regex::Regex> = OnceLock::new();
    PATTERN.get_or_init(|| regex::Regex::new(ACTION_PATTERN_SOURCE).expect("static action pattern is valid"))
}

/// Validate an inbound action request against §6's schema before touching
/// any store: the `action` string must match `[a-z][a-z0-9-]*:[a-z][a-z0-9-]*`,
/// `context.reason` (if present) must be at most 1000 characters, and
/// `idempotency_key` (if present) at most 64. A violation is a `VALIDATION`
/// error — no record is sealed for a malformed request.
pub fn validate_action_request(request: &ActionRequest) -> Result<(), GatewayError> {
    if !action_pattern().is_match(&request.action) {
        return Err(GatewayError::Validation(format!(
            "action '{}' must match \"type:tool\" with lowercase alphanumeric-and-hyphen segments",
            request.action
        )));
    }

    if let Some(key) = &request.idempotency_key {
        if key.chars().count() > IDEMPOTENCY_KEY_MAX_LEN {
            return Err(GatewayError::Validation(format!(
                "idempotency_key must be at most {IDEMPOTENCY_KEY_MAX_LEN} characters"
            )));
        }
    }

    if let Some(reason) = request.context.as_ref().and_then(|c| c.get("reason")).and_then(Value::as_str) {
        if reason.chars().count() > CONTEXT_REASON_MAX_LEN {
            return Err(GatewayError::Validation(format!(
                "context.reason must be at most {CONTEXT_REASON_MAX_LEN} characters"
            )));
        }
    }

    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResponse {
    pub record_id: String,
    pub decision: String,
    pub decision_reason: Option<String>,
    pub policy_evaluations: Vec<AuditCheckStep>,
    pub result: Option<Value>,
    pub timestamp: DateTime<Utc>,
    pub duration_ms: i64,
}

/// Every store and collaborator one action admission touches. Holding
/// borrowed references (rather than owning) lets the HTTP layer hand out a
/// short-lived gateway per request without cloning any store.
pub struct ActionGateway<'a> {
    pub tokens: &'a CapabilityTokenStore,
    pub manifests: &'a ManifestStore,
    pub issuers: &'a CapabilityIssuerStore,
    pub policies: &'a PolicyStore,
    pub budgets: &'a BudgetStore,
    pub approvals: &'a ApprovalStore,
    pub used_override_tokens: &'a UsedOverrideTokenStore,
    pub secrets: &'a SecretStore,
    pub audit: &'a AuditStore,
    pub keypair: &'a GatewayKeypair,
    pub config: &'a PipelineConfig,
}

fn action_value(action: &str, parameters: &Value) -> Value {
    json!({ "action": action, "parameters": parameters })
}

fn split_action(action: &str) -> Result<(&str, &str), GatewayError> {
    action
        .split_once(':')
        .ok_or_else(|| GatewayError::Validation(format!("action '{action}' must be \"type:tool\"")))
}

impl<'a> ActionGateway<'a> {
    /// Admit one action. `capability_bearer` is required; `override_bearer`
    /// is the optional second bearer carried alongside it after a human has
    /// approved a previously pending decision for the identical action.
    pub async fn admit(
        &self,
        capability_bearer: &str,
        override_bearer: Option<&str>,
        request: ActionRequest,
    ) -> Result<ActionResponse, GatewayError> {
        let start_time = Utc::now();
        validate_action_request(&request)?;
        let (action_type, tool) = split_action(&request.action)?;

        let peeked = gateway_capability::peek_capability_claims(capability_bearer)
            .map_err(|e| GatewayError::Authentication(format!("malformed capability token: {e}")))?;
        let org_id = Uuid::parse_str(&peeked.org_id)
            .map_err(|_| GatewayError::Authentication("capability token carries an invalid org_id".to_string()))?;
        let fallback_uapk_id = peeked.uapk_id.clone().unwrap_or_else(|| peeked.agent_id.clone());

        let verified = self.verify_and_load_token(capability_bearer, &peeked, org_id, start_time);
        let (token, _claims) = match verified {
            Ok(pair) => pair,
            Err(reason) => {
                return self
                    .seal_unattributed_denial(
                        org_id,
                        &fallback_uapk_id,
                        &peeked.agent_id,
                        action_type,
                        tool,
                        &request,
                        reason,
                        start_time,
                        None,
                    )
                    .map(|record| self.to_response(&record));
            }
        };

        let uapk_id = token.uapk_id.clone().unwrap_or_else(|| token.agent_id.clone());

        if let Some(override_bearer) = override_bearer {
            return self
                .admit_with_override(&token, &uapk_id, org_id, action_type, tool, override_bearer, &request, start_time)
                .await;
        }

        self.admit_through_policy(&token, &uapk_id, org_id, action_type, tool, &request, start_time)
            .await
    }

    /// Step 1–2: pick the right verification key (the gateway's own, or a
    /// registered external issuer's) and validate the token id against the
    /// authoritative store row.
    fn verify_and_load_token(
        &self,
        capability_bearer: &str,
        peeked: &gateway_capability::CapabilityClaims,
        org_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<(CapabilityToken, gateway_capability::CapabilityClaims), AuditReason> {
        let public_key = if peeked.iss == "gateway" {
            self.keypair.public_key_bytes()
        } else {
            let issuer = self
                .issuers
                .find_by_issuer_id(org_id, &peeked.iss)
                .map_err(|e| AuditReason::new("AUTHENTICATION_FAILED", e.to_string()))?
                .ok_or_else(|| AuditReason::new("AUTHENTICATION_FAILED", format!("unknown capability issuer '{}'", peeked.iss)))?;
            if issuer.status != crate::model::IssuerStatus::Active {
                return Err(AuditReason::new("AUTHENTICATION_FAILED", format!("issuer '{}' is revoked", peeked.iss)));
            }
            BASE64_STANDARD
                .decode(&issuer.public_key)
                .map_err(|_| AuditReason::new("AUTHENTICATION_FAILED", "issuer public key is not valid base64".to_string()))?
        };

        let claims = gateway_capability::verify_capability_token(capability_bearer, &public_key, now)
            .map_err(|e| AuditReason::new("AUTHENTICATION_FAILED", format!("capability token verification failed: {e}")))?;

        let token = self
            .tokens
            .validate(&claims.sub, now)
            .map_err(|e| AuditReason::new("AUTHENTICATION_FAILED", e.to_string()))?;

        Ok((token, claims))
    }

    /// Step 3: the override path. Already past steps 1–2 (the capability
    /// token is verified and in good standing); this verifies the override
    /// bearer itself, checks it against the action actually being submitted,
    /// and redeems it exactly once before dispatching unconditionally.
    #[allow(clippy::too_many_arguments)]
    async fn admit_with_override(
        &self,
        token: &CapabilityToken,
        uapk_id: &str,
        org_id: Uuid,
        action_type: &str,
        tool: &str,
        override_bearer: &str,
        request: &ActionRequest,
        start_time: DateTime<Utc>,
    ) -> Result<ActionResponse, GatewayError> {
        let now = Utc::now();
        let override_claims = match gateway_capability::verify_override_token(override_bearer, &self.keypair.public_key_bytes(), now) {
            Ok(claims) => claims,
            Err(e) => {
                return self
                    .seal_unattributed_denial(
                        org_id,
                        uapk_id,
                        &token.agent_id,
                        action_type,
                        tool,
                        request,
                        AuditReason::new("AUTHENTICATION_FAILED", format!("override token verification failed: {e}")),
                        start_time,
                        Some(token.token_id.clone()),
                    )
                    .map(|record| self.to_response(&record));
            }
        };

        let computed_hash = gateway_canon::canonical_hash(&action_value(&request.action, &request.parameters))?;
        if computed_hash != override_claims.action_hash {
            let reason = AuditReason::new("OVERRIDE_TOKEN_ACTION_MISMATCH", "the override token was approved for a different action");
            let record = self.seal(
                org_id,
                uapk_id,
                &token.agent_id,
                action_type,
                tool,
                request,
                Decision::Denied,
                vec![reason],
                PolicyTrace::new(start_time, Utc::now()),
                None,
                Some(token.token_id.clone()),
                start_time,
            )?;
            return Ok(self.to_response(&record));
        }

        let token_hash = gateway_crypto::sha256_hex(override_bearer.as_bytes());
        let expires_at = DateTime::from_timestamp(override_claims.exp, 0).unwrap_or(now);
        match self.used_override_tokens.redeem(&token_hash, org_id, &override_claims.approval_id, &override_claims.action_hash, expires_at) {
            Ok(()) => {}
            Err(GatewayError::Conflict(_)) => {
                let reason = AuditReason::new("OVERRIDE_TOKEN_REUSED", "this override token has already been redeemed");
                let record = self.seal(
                    org_id,
                    uapk_id,
                    &token.agent_id,
                    action_type,
                    tool,
                    request,
                    Decision::Denied,
                    vec![reason],
                    PolicyTrace::new(start_time, Utc::now()),
                    None,
                    Some(token.token_id.clone()),
                    start_time,
                )?;
                return Ok(self.to_response(&record));
            }
            Err(e) => return Err(e),
        }
        self.approvals.mark_override_used(&override_claims.approval_id)?;

        let mut trace = PolicyTrace::new(start_time, Utc::now());
        trace.checks.push(AuditCheckStep::new("override_redemption", CheckOutcome::Pass));

        let result_value = self.dispatch(token, tool, &request.parameters, org_id).await?;

        let record = self.seal(
            org_id,
            uapk_id,
            &token.agent_id,
            action_type,
            tool,
            request,
            Decision::Approved,
            vec![AuditReason::new("OVERRIDE_REDEEMED", "dispatched under a human-approved override")],
            trace,
            result_value,
            Some(token.token_id.clone()),
            start_time,
        )?;
        Ok(self.to_response(&record))
    }

    /// Steps 4–10 for the non-override path.
    #[allow(clippy::too_many_arguments)]
    async fn admit_through_policy(
        &self,
        token: &CapabilityToken,
        uapk_id: &str,
        org_id: Uuid,
        action_type: &str,
        tool: &str,
        request: &ActionRequest,
        start_time: DateTime<Utc>,
    ) -> Result<ActionResponse, GatewayError> {
        let mut trace_checks: Vec<AuditCheckStep> = Vec::new();

        let manifest = match token.manifest_id {
            Some(manifest_id) => self.manifests.get(manifest_id)?,
            None => None,
        };

        if token.manifest_id.is_some() {
            let active = manifest.as_ref().is_some_and(|m| m.status == ManifestStatus::Active);
            if !active {
                trace_checks.push(AuditCheckStep::new("manifest_check", CheckOutcome::Fail));
                let reason = if manifest.is_some() {
                    AuditReason::new("MANIFEST_NOT_ACTIVE", "the token's manifest is not active")
                } else {
                    AuditReason::new("MANIFEST_NOT_FOUND", "the token's manifest no longer exists")
                };
                return self.finish_denied(org_id, uapk_id, token, action_type, tool, request, vec![reason], trace_checks, start_time);
            }
            trace_checks.push(AuditCheckStep::new("manifest_check", CheckOutcome::Pass));
        } else {
            trace_checks.push(AuditCheckStep::new("manifest_check", CheckOutcome::Skip));
        }

        let constraint_violations = self.check_token_constraints(&token.constraints, &request.parameters, &mut trace_checks);
        if let Some(reason) = constraint_violations {
            return self.finish_denied(org_id, uapk_id, token, action_type, tool, request, vec![reason], trace_checks, start_time);
        }

        let policies: Vec<Policy> = self.policies.list_enabled_for_org(org_id)?;
        let policy_request = PolicyRequest {
            action_type: action_type.to_string(),
            tool: tool.to_string(),
            agent_id: token.agent_id.clone(),
            parameters: request.parameters.clone(),
            amount: request.parameters.get("amount").and_then(Value::as_f64),
            jurisdiction: request.parameters.get("jurisdiction").and_then(Value::as_str).map(str::to_string),
            counterparty: request.parameters.get("counterparty").and_then(Value::as_str).map(str::to_string),
        };
        let policy_eval = gateway_policy::evaluate(&token.capabilities, &policies, &policy_request);
        for step in policy_eval.steps {
            trace_checks.push(AuditCheckStep::new(step.check, outcome_of(&step.outcome)).with_details(json!({ "message": step.outcome })));
        }

        let (decision, reasons) = match policy_eval.decision {
            PolicyOutcome::Deny(reason) => (Decision::Denied, vec![AuditReason::new(reason.code, reason.message)]),
            PolicyOutcome::Allow => self.fuse_with_budget(org_id, uapk_id, manifest.as_ref(), start_time, Vec::new(), &mut trace_checks)?,
            PolicyOutcome::RequireApproval(policy_reasons) => {
                let policy_reasons = policy_reasons.into_iter().map(|r| AuditReason::new(r.code, r.message)).collect();
                self.fuse_with_budget(org_id, uapk_id, manifest.as_ref(), start_time, policy_reasons, &mut trace_checks)?
            }
        };

        let result_value = if decision == Decision::Approved {
            self.dispatch(token, tool, &request.parameters, org_id).await?
        } else {
            None
        };

        let trace = {
            let mut t = PolicyTrace::new(start_time, Utc::now());
            t.checks = trace_checks;
            t
        };

        if decision == Decision::Pending {
            self.approvals.create(CreateApprovalRequest {
                org_id,
                interaction_id: gateway_audit::generate_record_id(),
                uapk_id: uapk_id.to_string(),
                agent_id: token.agent_id.clone(),
                action: action_value(&request.action, &request.parameters),
                counterparty: request.parameters.get("counterparty").and_then(Value::as_str).map(str::to_string),
                context: request.context.clone(),
                reason_codes: reasons.iter().map(|r| r.code.clone()).collect(),
                expiry_hours: self.config.approval_expiry_hours,
            })?;
        }

        if decision == Decision::Approved {
            self.tokens.increment_actions_used(&token.token_id)?;
            self.budgets.increment(&org_id.to_string(), uapk_id, start_time.date_naive())?;
        }

        let record = self.seal(
            org_id,
            uapk_id,
            &token.agent_id,
            action_type,
            tool,
            request,
            decision,
            reasons,
            trace,
            result_value,
            Some(token.token_id.clone()),
            start_time,
        )?;
        Ok(self.to_response(&record))
    }

    /// Layer the daily budget check on top of a policy decision that was
    /// itself `allow` or `require_approval`. A budget breach vetoes outright
    /// (`deny > require_approval > allow`); reaching the warning threshold
    /// escalates an otherwise-allowed action to `pending` alongside it.
    #[allow(clippy::too_many_arguments)]
    fn fuse_with_budget(
        &self,
        org_id: Uuid,
        uapk_id: &str,
        manifest: Option<&Manifest>,
        start_time: DateTime<Utc>,
        mut pending_reasons: Vec<AuditReason>,
        trace_checks: &mut Vec<AuditCheckStep>,
    ) -> Result<(Decision, Vec<AuditReason>), GatewayError> {
        let limit = manifest.and_then(Manifest::max_actions_per_day).unwrap_or(self.config.default_daily_budget);
        let today = start_time.date_naive();
        let budget_result = self.budgets.check(&org_id.to_string(), uapk_id, today, limit, self.config.budget_threshold_fraction)?;
        let budget_outcome = match budget_result {
            BudgetCheck::Exceeded { .. } => CheckOutcome::Fail,
            BudgetCheck::ThresholdReached { .. } => CheckOutcome::Escalate,
            BudgetCheck::Ok { .. } => CheckOutcome::Pass,
        };
        trace_checks.push(AuditCheckStep::new("budget_check", budget_outcome));

        if let BudgetCheck::Exceeded { count, limit } = budget_result {
            return Ok((
                Decision::Denied,
                vec![AuditReason::new("BUDGET_EXCEEDED", format!("{count} actions used of a {limit} daily budget"))],
            ));
        }
        if let BudgetCheck::ThresholdReached { count, limit } = budget_result {
            pending_reasons.push(AuditReason::new("BUDGET_THRESHOLD_REACHED", format!("{count} of {limit} daily actions used")));
        }

        if pending_reasons.is_empty() {
            Ok((Decision::Approved, vec![AuditReason::new("ALL_CHECKS_PASSED", "all policy and budget checks passed")]))
        } else {
            Ok((Decision::Pending, pending_reasons))
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn check_token_constraints(
        &self,
        constraints: &TokenConstraints,
        parameters: &Value,
        trace_checks: &mut Vec<AuditCheckStep>,
    ) -> Option<AuditReason> {
        let mut first_violation = None;

        match (constraints.amount_max, parameters.get("amount").and_then(Value::as_f64)) {
            (Some(max), Some(amount)) if amount > max => {
                trace_checks.push(AuditCheckStep::new("amount_cap", CheckOutcome::Fail));
                first_violation.get_or_insert(AuditReason::new(
                    "AMOUNT_EXCEEDS_CAP",
                    format!("amount {amount} exceeds the token's cap of {max}"),
                ));
            }
            (Some(_), Some(_)) => trace_checks.push(AuditCheckStep::new("amount_cap", CheckOutcome::Pass)),
            _ => trace_checks.push(AuditCheckStep::new("amount_cap", CheckOutcome::Skip)),
        }

        match (&constraints.jurisdictions, parameters.get("jurisdiction").and_then(Value::as_str)) {
            (Some(allowed), Some(jurisdiction)) if !allowed.iter().any(|j| j == jurisdiction) => {
                trace_checks.push(AuditCheckStep::new("jurisdiction", CheckOutcome::Fail));
                first_violation.get_or_insert(AuditReason::new(
                    "JURISDICTION_NOT_ALLOWED",
                    format!("jurisdiction '{jurisdiction}' is not permitted by the token"),
                ));
            }
            (Some(_), Some(_)) => trace_checks.push(AuditCheckStep::new("jurisdiction", CheckOutcome::Pass)),
            _ => trace_checks.push(AuditCheckStep::new("jurisdiction", CheckOutcome::Skip)),
        }

        let counterparty = parameters.get("counterparty").and_then(Value::as_str);
        let denied = counterparty.is_some_and(|c| {
            constraints.counterparty_denylist.as_ref().is_some_and(|deny| deny.iter().any(|d| d == c))
                || constraints
                    .counterparty_allowlist
                    .as_ref()
                    .is_some_and(|allow| !allow.iter().any(|a| a == c))
        });
        if counterparty.is_some() && (constraints.counterparty_allowlist.is_some() || constraints.counterparty_denylist.is_some()) {
            if denied {
                trace_checks.push(AuditCheckStep::new("counterparty", CheckOutcome::Fail));
                first_violation.get_or_insert(AuditReason::new(
                    "COUNTERPARTY_DENIED",
                    format!("counterparty '{}' is not permitted by the token", counterparty.unwrap_or_default()),
                ));
            } else {
                trace_checks.push(AuditCheckStep::new("counterparty", CheckOutcome::Pass));
            }
        } else {
            trace_checks.push(AuditCheckStep::new("counterparty", CheckOutcome::Skip));
        }

        first_violation
    }

    async fn dispatch(&self, token: &CapabilityToken, tool: &str, parameters: &Value, org_id: Uuid) -> Result<Option<Value>, GatewayError> {
        let manifest = match token.manifest_id {
            Some(manifest_id) => self.manifests.get(manifest_id)?,
            None => None,
        };
        let tool_config = manifest.and_then(|m| m.tool_config(tool)).unwrap_or_default();
        let secret_names: Vec<String> = tool_config.secret_refs.values().cloned().collect();
        let secrets = self.secrets.resolve(org_id, &secret_names)?;
        let connector = Connector::from_config(tool_config, &self.config.default_allowed_domains)?;
        let result = connector.execute(parameters, &secrets).await;
        Ok(Some(serde_json::to_value(&result)?))
    }

    #[allow(clippy::too_many_arguments)]
    fn finish_denied(
        &self,
        org_id: Uuid,
        uapk_id: &str,
        token: &CapabilityToken,
        action_type: &str,
        tool: &str,
        request: &ActionRequest,
        reasons: Vec<AuditReason>,
        trace_checks: Vec<AuditCheckStep>,
        start_time: DateTime<Utc>,
    ) -> Result<ActionResponse, GatewayError> {
        let mut trace = PolicyTrace::new(start_time, Utc::now());
        trace.checks = trace_checks;
        let record = self.seal(
            org_id,
            uapk_id,
            &token.agent_id,
            action_type,
            tool,
            request,
            Decision::Denied,
            reasons,
            trace,
            None,
            Some(token.token_id.clone()),
            start_time,
        )?;
        Ok(self.to_response(&record))
    }

    #[allow(clippy::too_many_arguments)]
    fn seal(
        &self,
        org_id: Uuid,
        uapk_id: &str,
        agent_id: &str,
        action_type: &str,
        tool: &str,
        request: &ActionRequest,
        decision: Decision,
        reasons: Vec<AuditReason>,
        trace: PolicyTrace,
        result: Option<Value>,
        capability_token_id: Option<String>,
        start_time: DateTime<Utc>,
    ) -> Result<gateway_audit::InteractionRecord, GatewayError> {
        let now = Utc::now();
        let decision_reason = if reasons.is_empty() {
            None
        } else {
            Some(reasons.iter().map(|r| r.message.clone()).collect::<Vec<_>>().join("; "))
        };
        let pending = PendingRecord {
            record_id: gateway_audit::generate_record_id(),
            org_id: org_id.to_string(),
            uapk_id: uapk_id.to_string(),
            agent_id: agent_id.to_string(),
            action_type: action_type.to_string(),
            tool: tool.to_string(),
            request: json!({
                "action": request.action,
                "parameters": request.parameters,
                "context": request.context,
            }),
            result,
            decision,
            reasons,
            policy_trace: trace,
            risk_snapshot: None,
            decision_reason,
            duration_ms: (now - start_time).num_milliseconds(),
            capability_token_id,
            created_at: now,
        };
        let sealer = RecordSealer::new(self.audit, self.keypair);
        Ok(sealer.seal(pending)?)
    }

    /// A denial that precedes ever loading a store-backed token. Best-effort
    /// attribution to whatever `org_id`/`uapk_id` the unverified claims named.
    #[allow(clippy::too_many_arguments)]
    fn seal_unattributed_denial(
        &self,
        org_id: Uuid,
        uapk_id: &str,
        agent_id: &str,
        action_type: &str,
        tool: &str,
        request: &ActionRequest,
        reason: AuditReason,
        start_time: DateTime<Utc>,
        capability_token_id: Option<String>,
    ) -> Result<gateway_audit::InteractionRecord, GatewayError> {
        let trace = PolicyTrace::new(start_time, Utc::now());
        self.seal(
            org_id,
            uapk_id,
            agent_id,
            action_type,
            tool,
            request,
            Decision::Denied,
            vec![reason],
            trace,
            None,
            capability_token_id,
            start_time,
        )
    }

    fn to_response(&self, record: &gateway_audit::InteractionRecord) -> ActionResponse {
        ActionResponse {
            record_id: record.record_id.clone(),
            decision: record.decision.to_string(),
            decision_reason: record.decision_reason.clone(),
            policy_evaluations: record.policy_trace_json.checks.clone(),
            result: record.result.clone(),
            timestamp: record.created_at,
            duration_ms: record.duration_ms,
        }
    }
}

fn outcome_of(message: &str) -> CheckOutcome {
    if message.starts_with("passed") || message.starts_with("allowed") {
        CheckOutcome::Pass
    } else if message.starts_with("require_approval") {
        CheckOutcome::Escalate
    } else if message.starts_with("failed") {
        CheckOutcome::Fail
    } else {
        CheckOutcome::Pass
    }
}

#[cfg(test)]
mod action_request_validation_tests {
    use super::*;

    fn request(action: &str) -> ActionRequest {
        ActionRequest {
            action: action.to_string(),
            parameters: json!({}),
            context: None,
            idempotency_key: None,
        }
    }

    #[test]
    fn well_formed_action_passes() {
        assert!(validate_action_request(&request("email:send")).is_ok());
        assert!(validate_action_request(&request("payment:transfer-now")).is_ok());
    }

    #[test]
    fn uppercase_action_type_is_rejected() {
        assert!(validate_action_request(&request("Payment:Transfer")).is_err());
    }

    #[test]
    fn empty_tool_is_rejected() {
        assert!(validate_action_request(&request("a::b")).is_err());
    }

    #[test]
    fn leading_digit_is_rejected() {
        assert!(validate_action_request(&request("1:2")).is_err());
    }

    #[test]
    fn missing_separator_is_rejected() {
        assert!(validate_action_request(&request("email-send")).is_err());
    }

    #[test]
    fn idempotency_key_over_64_chars_is_rejected() {
        let mut req = request("email:send");
        req.idempotency_key = Some("x".repeat(65));
        assert!(validate_action_request(&req).is_err());
    }

    #[test]
    fn idempotency_key_at_64_chars_passes() {
        let mut req = request("email:send");
        req.idempotency_key = Some("x".repeat(64));
        assert!(validate_action_request(&req).is_ok());
    }

    #[test]
    fn context_reason_over_1000_chars_is_rejected() {
        let mut req = request("email:send");
        req.context = Some(json!({ "reason": "x".repeat(1001) }));
        assert!(validate_action_request(&req).is_err());
    }

    #[test]
    fn context_reason_at_1000_chars_passes() {
        let mut req = request("email:send");
        req.context = Some(json!({ "reason": "x".repeat(1000) }));
        assert!(validate_action_request(&req).is_ok());
    }
}

