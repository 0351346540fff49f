// grants.rs — `domain:operation` capability matching.
//
// Both a manifest's `capabilities.requested` and a capability token's
// `capabilities` are lists of `domain:operation` strings (e.g. `email:send`,
// `file:*`, `*:*`). This is the single place that decides whether a
// requested `action_type:tool` string is permitted by such a list.

/// Does `capabilities` permit `action` (an `"type:tool"` string)? Each half
/// of both the grant and the action is matched independently with `*`
/// glob support, mirroring the engine's own resource-pattern matching.
pub fn capabilities_allow(capabilities: &[String], action: &str) -> bool {
    let Some((action_domain, action_op)) = action.split_once(':') else {
        return false;
    };
    capabilities
        .iter()
        .any(|grant| grant_matches(grant, action_domain, action_op))
}

fn grant_matches(grant: &str, action_domain: &str, action_op: &str) -> bool {
    let Some((grant_domain, grant_op)) = grant.split_once(':') else {
        return false;
    };
    segment_matches(grant_domain, action_domain) && segment_matches(grant_op, action_op)
}

fn segment_matches(pattern: &str, value: &str) -> bool {
    if pattern == "*" {
        return true;
    }
    match glob::Pattern::new(pattern) {
        Ok(p) => p.matches(value),
        Err(_) => false,
    }
}

/// Is `subset` entirely covered by `superset`? Used to check that a
/// capability token's requested capabilities are within the manifest's
/// declared `capabilities.requested` (glob-expanded).
pub fn is_subset_of(subset: &[String], superset: &[String]) -> bool {
    subset
        .iter()
        .all(|grant| superset.iter().any(|allowed| grant_covered_by(allowed, grant)))
}

/// Is the exact grant `candidate` covered by the (possibly glob) grant
/// `allowed`? An exact string match always covers; otherwise each half of
/// `candidate` must literally satisfy the corresponding glob half of
/// `allowed`.
fn grant_covered_by(allowed: &str, candidate: &str) -> bool {
    if allowed == candidate {
        return true;
    }
    let (Some((allowed_domain, allowed_op)), Some((cand_domain, cand_op))) =
        (allowed.split_once(':'), candidate.split_once(':'))
    else {
        return false;
    };
    segment_matches(allowed_domain, cand_domain) && segment_matches(allowed_op, cand_op)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_match_allows() {
        assert!(capabilities_allow(&["email:send".to_string()], "email:send"));
    }

    #[test]
    fn no_match_denies() {
        assert!(!capabilities_allow(
            &["email:send".to_string()],
            "payment:transfer"
        ));
    }

    #[test]
    fn wildcard_operation_allows_any_operation_in_domain() {
        assert!(capabilities_allow(&["file:*".to_string()], "file:read"));
        assert!(capabilities_allow(&["file:*".to_string()], "file:write"));
    }

    #[test]
    fn wildcard_domain_allows_any_domain_for_operation() {
        assert!(capabilities_allow(&["*:send".to_string()], "email:send"));
        assert!(!capabilities_allow(&["*:send".to_string()], "email:read"));
    }

    #[test]
    fn full_wildcard_allows_everything() {
        assert!(capabilities_allow(&["*:*".to_string()], "anything:goes"));
    }

    #[test]
    fn malformed_action_string_denies() {
        assert!(!capabilities_allow(&["*:*".to_string()], "no-colon-here"));
    }

    #[test]
    fn subset_check_passes_for_exact_subset() {
        let requested = vec!["email:send".to_string()];
        let manifest = vec!["email:send".to_string(), "payment:transfer".to_string()];
        assert!(is_subset_of(&requested, &manifest));
    }

    #[test]
    fn subset_check_fails_when_not_covered() {
        let requested = vec!["payment:transfer".to_string()];
        let manifest = vec!["email:send".to_string()];
        assert!(!is_subset_of(&requested, &manifest));
    }

    #[test]
    fn subset_check_respects_manifest_wildcard() {
        let requested = vec!["file:read".to_string(), "file:write".to_string()];
        let manifest = vec!["file:*".to_string()];
        assert!(is_subset_of(&requested, &manifest));
    }
}
