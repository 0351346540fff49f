// engine.rs — Capability gate, rule matching, and decision fusion.
//
// Evaluation order: capability gate first (outside the policy list
// entirely), then applicable policies in priority-descending order (ties
// broken by `created_at` ascending). First `deny`-type policy that violates
// its rules short-circuits the whole evaluation; otherwise any
// `require_approval`-type violation escalates, gathering every such reason
// before returning; absent either, the action is allowed.

use glob::Pattern;

use crate::types::{Policy, PolicyRequest, PolicyType};

/// One step of the evaluation trail, mirroring the check names spec.md
/// expects in an interaction record's policy trace (`capability_gate`,
/// `<policy_name>`, `decision_fusion`).
#[derive(Debug, Clone)]
pub struct PolicyCheckStep {
    pub check: String,
    pub outcome: String,
    pub terminal: bool,
}

#[derive(Debug, Clone)]
pub struct PolicyReason {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone)]
pub enum PolicyOutcome {
    Allow,
    Deny(PolicyReason),
    RequireApproval(Vec<PolicyReason>),
}

#[derive(Debug, Clone)]
pub struct PolicyEvaluation {
    pub decision: PolicyOutcome,
    pub steps: Vec<PolicyCheckStep>,
}

/// Evaluate `request` against `policies`, having already confirmed the
/// capability gate and the token's `capabilities` grant list.
pub fn evaluate(capabilities: &[String], policies: &[Policy], request: &PolicyRequest) -> PolicyEvaluation {
    let mut steps = Vec::new();
    let action_string = format!("{}:{}", request.action_type, request.tool);

    if !capability_allows_action(capabilities, &action_string) {
        steps.push(PolicyCheckStep {
            check: "capability_gate".to_string(),
            outcome: format!("failed: '{action_string}' not covered by any granted capability"),
            terminal: true,
        });
        tracing::debug!(action = %action_string, "capability gate denied action");
        return PolicyEvaluation {
            decision: PolicyOutcome::Deny(PolicyReason {
                code: "ACTION_NOT_IN_CAPABILITIES".to_string(),
                message: format!("action '{action_string}' is not permitted by the token's capabilities"),
            }),
            steps,
        };
    }
    steps.push(PolicyCheckStep {
        check: "capability_gate".to_string(),
        outcome: "passed".to_string(),
        terminal: false,
    });

    let mut applicable: Vec<&Policy> = policies
        .iter()
        .filter(|p| p.enabled && policy_matches(p, request, &action_string))
        .collect();
    applicable.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.created_at.cmp(&b.created_at)));

    let mut pending_reasons = Vec::new();

    for policy in applicable {
        match policy_violation(policy, request) {
            Some(reason) => {
                let is_deny = matches!(policy.policy_type, PolicyType::Deny);
                steps.push(PolicyCheckStep {
                    check: policy.name.clone(),
                    outcome: format!("failed: {}", reason.message),
                    terminal: is_deny,
                });
                match policy.policy_type {
                    PolicyType::Deny => {
                        tracing::debug!(policy = %policy.name, "policy denied action");
                        return PolicyEvaluation {
                            decision: PolicyOutcome::Deny(reason),
                            steps,
                        };
                    }
                    PolicyType::RequireApproval => pending_reasons.push(reason),
                    PolicyType::Allow => {}
                }
            }
            None => {
                steps.push(PolicyCheckStep {
                    check: policy.name.clone(),
                    outcome: "passed".to_string(),
                    terminal: false,
                });
            }
        }
    }

    if !pending_reasons.is_empty() {
        steps.push(PolicyCheckStep {
            check: "decision_fusion".to_string(),
            outcome: format!("require_approval: {} reason(s) pending", pending_reasons.len()),
            terminal: true,
        });
        return PolicyEvaluation {
            decision: PolicyOutcome::RequireApproval(pending_reasons),
            steps,
        };
    }

    steps.push(PolicyCheckStep {
        check: "decision_fusion".to_string(),
        outcome: "allowed: all checks passed".to_string(),
        terminal: true,
    });
    PolicyEvaluation {
        decision: PolicyOutcome::Allow,
        steps,
    }
}

fn policy_matches(policy: &Policy, request: &PolicyRequest, action_string: &str) -> bool {
    match policy.scope {
        crate::types::PolicyScope::Global => true,
        crate::types::PolicyScope::Action => match &policy.rules.action_pattern {
            Some(pattern) => matches_glob(pattern, action_string),
            None => false,
        },
        crate::types::PolicyScope::Agent => policy
            .rules
            .agent_ids
            .as_ref()
            .is_some_and(|ids| ids.iter().any(|id| id == &request.agent_id)),
    }
}

/// Returns the violated constraint's reason, or `None` if the policy's
/// rules are satisfied. A policy with no sub-checks never violates.
fn policy_violation(policy: &Policy, request: &PolicyRequest) -> Option<PolicyReason> {
    if let Some(constraints) = &policy.rules.parameters {
        for (name, constraint) in constraints {
            let value = request.parameters.get(name);
            if constraint.required.unwrap_or(false) && value.is_none() {
                return Some(PolicyReason {
                    code: policy.name.clone(),
                    message: format!("required parameter '{name}' is missing"),
                });
            }
            if let (Some(max_length), Some(value)) = (constraint.max_length, value) {
                if let Some(s) = value.as_str() {
                    if s.len() > max_length {
                        return Some(PolicyReason {
                            code: policy.name.clone(),
                            message: format!("parameter '{name}' exceeds max_length {max_length}"),
                        });
                    }
                }
            }
            if let (Some(allowed), Some(value)) = (&constraint.allowed_values, value) {
                if !allowed.contains(value) {
                    return Some(PolicyReason {
                        code: policy.name.clone(),
                        message: format!("parameter '{name}' is not one of the allowed values"),
                    });
                }
            }
        }
    }

    if let (Some(caps), Some(amount)) = (&policy.rules.amount_caps, request.amount) {
        if amount > caps.max_amount {
            return Some(PolicyReason {
                code: "AMOUNT_EXCEEDS_CAP".to_string(),
                message: format!("amount {amount} exceeds cap {}", caps.max_amount),
            });
        }
        if let Some(threshold) = caps.require_approval_above {
            if amount > threshold && matches!(policy.policy_type, PolicyType::RequireApproval) {
                return Some(PolicyReason {
                    code: "AMOUNT_REQUIRES_APPROVAL".to_string(),
                    message: format!("amount {amount} exceeds the approval threshold {threshold}"),
                });
            }
        }
    }

    if let (Some(rule), Some(jurisdiction)) = (&policy.rules.jurisdictions, &request.jurisdiction) {
        if !rule.allowed.iter().any(|j| j == jurisdiction) {
            return Some(PolicyReason {
                code: "JURISDICTION_NOT_ALLOWED".to_string(),
                message: format!("jurisdiction '{jurisdiction}' is not allowed"),
            });
        }
    }

    if let (Some(rule), Some(counterparty)) = (&policy.rules.counterparty, &request.counterparty) {
        if rule.denylist.as_ref().is_some_and(|list| list.iter().any(|c| c == counterparty)) {
            return Some(PolicyReason {
                code: "COUNTERPARTY_DENIED".to_string(),
                message: format!("counterparty '{counterparty}' is denylisted"),
            });
        }
        if let Some(allowlist) = &rule.allowlist {
            if !allowlist.iter().any(|c| c == counterparty) {
                return Some(PolicyReason {
                    code: "COUNTERPARTY_DENIED".to_string(),
                    message: format!("counterparty '{counterparty}' is not allowlisted"),
                });
            }
        }
    }

    None
}

/// Capability gate: at least one granted `domain:operation` string must
/// cover `action`, with `*` glob support on either half.
pub fn capability_allows_action(capabilities: &[String], action: &str) -> bool {
    capabilities.iter().any(|grant| matches_capability(grant, action))
}

fn matches_capability(grant: &str, action: &str) -> bool {
    let (grant_domain, grant_op) = split_capability(grant);
    let (action_domain, action_op) = split_capability(action);
    segment_matches(grant_domain, action_domain) && segment_matches(grant_op, action_op)
}

fn split_capability(value: &str) -> (&str, &str) {
    value.split_once(':').unwrap_or((value, ""))
}

fn segment_matches(pattern: &str, value: &str) -> bool {
    if pattern == "*" {
        return true;
    }
    matches_glob(pattern, value)
}

fn matches_glob(pattern: &str, value: &str) -> bool {
    match Pattern::new(pattern) {
        Ok(p) => p.matches(value),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AmountCapRule, CounterpartyRule, JurisdictionRule, ParameterConstraint, PolicyRules, PolicyScope};
    use chrono::{Duration, Utc};
    use serde_json::json;
    use uuid::Uuid;

    fn policy(name: &str, policy_type: PolicyType, scope: PolicyScope, priority: i32, rules: PolicyRules) -> Policy {
        Policy {
            id: Uuid::new_v4(),
            org_id: Uuid::new_v4(),
            name: name.to_string(),
            description: None,
            policy_type,
            scope,
            priority,
            rules,
            enabled: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn request(action_type: &str, tool: &str, agent_id: &str, parameters: serde_json::Value) -> PolicyRequest {
        PolicyRequest {
            action_type: action_type.to_string(),
            tool: tool.to_string(),
            agent_id: agent_id.to_string(),
            parameters,
            amount: None,
            jurisdiction: None,
            counterparty: None,
        }
    }

    #[test]
    fn capability_gate_denies_ungranted_action() {
        let evaluation = evaluate(&["email:send".to_string()], &[], &request("payment", "transfer", "agent-1", json!({})));
        match evaluation.decision {
            PolicyOutcome::Deny(reason) => assert_eq!(reason.code, "ACTION_NOT_IN_CAPABILITIES"),
            other => panic!("expected Deny, got {other:?}"),
        }
    }

    #[test]
    fn wildcard_capability_allows_anything_in_domain() {
        let evaluation = evaluate(&["email:*".to_string()], &[], &request("email", "send", "agent-1", json!({})));
        assert!(matches!(evaluation.decision, PolicyOutcome::Allow));
    }

    #[test]
    fn no_applicable_policies_allows() {
        let evaluation = evaluate(&["email:send".to_string()], &[], &request("email", "send", "agent-1", json!({})));
        assert!(matches!(evaluation.decision, PolicyOutcome::Allow));
    }

    #[test]
    fn deny_policy_short_circuits() {
        let deny = policy(
            "no-transfers",
            PolicyType::Deny,
            PolicyScope::Action,
            10,
            PolicyRules {
                action_pattern: Some("payment:*".to_string()),
                ..Default::default()
            },
        );
        let evaluation = evaluate(&["payment:transfer".to_string()], &[deny], &request("payment", "transfer", "agent-1", json!({})));
        match evaluation.decision {
            PolicyOutcome::Deny(reason) => assert_eq!(reason.code, "no-transfers"),
            other => panic!("expected Deny, got {other:?}"),
        }
    }

    #[test]
    fn require_approval_policy_escalates() {
        let approval = policy(
            "review-payments",
            PolicyType::RequireApproval,
            PolicyScope::Action,
            0,
            PolicyRules {
                action_pattern: Some("payment:*".to_string()),
                ..Default::default()
            },
        );
        let evaluation = evaluate(&["payment:transfer".to_string()], &[approval], &request("payment", "transfer", "agent-1", json!({})));
        match evaluation.decision {
            PolicyOutcome::RequireApproval(reasons) => assert_eq!(reasons.len(), 1),
            other => panic!("expected RequireApproval, got {other:?}"),
        }
    }

    #[test]
    fn priority_descending_with_created_at_tiebreak() {
        let now = Utc::now();
        let mut low = policy(
            "low-priority-deny",
            PolicyType::Deny,
            PolicyScope::Global,
            -5,
            PolicyRules::default(),
        );
        low.created_at = now;
        let mut high = policy(
            "high-priority-allow",
            PolicyType::Allow,
            PolicyScope::Global,
            50,
            PolicyRules::default(),
        );
        high.created_at = now + Duration::seconds(1);

        // Both match (global scope); neither violates (no sub-rules), so the
        // ordering only matters for the trace, not the final decision here.
        let evaluation = evaluate(&["*:*".to_string()], &[low, high], &request("email", "send", "agent-1", json!({})));
        assert_eq!(evaluation.steps[1].check, "high-priority-allow");
        assert_eq!(evaluation.steps[2].check, "low-priority-deny");
    }

    #[test]
    fn missing_required_parameter_violates() {
        let mut params = std::collections::HashMap::new();
        params.insert(
            "to".to_string(),
            ParameterConstraint {
                required: Some(true),
                max_length: None,
                allowed_values: None,
            },
        );
        let deny = policy(
            "require-recipient",
            PolicyType::Deny,
            PolicyScope::Global,
            0,
            PolicyRules {
                parameters: Some(params),
                ..Default::default()
            },
        );
        let evaluation = evaluate(&["email:send".to_string()], &[deny], &request("email", "send", "agent-1", json!({})));
        assert!(matches!(evaluation.decision, PolicyOutcome::Deny(_)));
    }

    #[test]
    fn amount_cap_violation_denies() {
        let deny = policy(
            "cap-amount",
            PolicyType::Deny,
            PolicyScope::Global,
            0,
            PolicyRules {
                amount_caps: Some(AmountCapRule {
                    max_amount: 100.0,
                    require_approval_above: None,
                }),
                ..Default::default()
            },
        );
        let mut req = request("payment", "transfer", "agent-1", json!({}));
        req.amount = Some(150.0);
        let evaluation = evaluate(&["payment:transfer".to_string()], &[deny], &req);
        match evaluation.decision {
            PolicyOutcome::Deny(reason) => assert_eq!(reason.code, "AMOUNT_EXCEEDS_CAP"),
            other => panic!("expected Deny, got {other:?}"),
        }
    }

    #[test]
    fn jurisdiction_and_counterparty_rules_are_scope_unrestricted() {
        let deny = policy(
            "jurisdiction-gate",
            PolicyType::Deny,
            PolicyScope::Agent,
            0,
            PolicyRules {
                agent_ids: Some(vec!["agent-1".to_string()]),
                jurisdictions: Some(JurisdictionRule {
                    allowed: vec!["US".to_string()],
                }),
                counterparty: Some(CounterpartyRule {
                    denylist: Some(vec!["sanctioned-corp".to_string()]),
                    ..Default::default()
                }),
                ..Default::default()
            },
        );
        let mut req = request("payment", "transfer", "agent-1", json!({}));
        req.jurisdiction = Some("EU".to_string());
        let evaluation = evaluate(&["payment:transfer".to_string()], &[deny], &req);
        match evaluation.decision {
            PolicyOutcome::Deny(reason) => assert_eq!(reason.code, "JURISDICTION_NOT_ALLOWED"),
            other => panic!("expected Deny, got {other:?}"),
        }
    }

    #[test]
    fn invalid_glob_pattern_fails_closed() {
        assert!(!matches_glob("[", "anything"));
    }
}
