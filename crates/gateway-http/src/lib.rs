//! # gateway-http
//!
//! The axum HTTP adapter for the agent interaction gateway (§6). This crate
//! owns no domain logic of its own: every handler in [`routes`] borrows from
//! [`state::AppState`] and delegates straight into `gateway-core`,
//! `gateway-capability`, `gateway-audit`, and `gateway-policy`. What lives
//! here is routing, auth extraction, request/response shaping, and the
//! error-to-status mapping in [`error::ApiError`].

mod auth;
mod error;
mod middleware;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::routing::{get, patch, post};
use axum::Router;

pub use auth::SessionUser;
pub use error::ApiError;
pub use middleware::CorsConfig;
pub use state::{AppState, AuthConfig};

/// Build the full router for one [`AppState`], with CORS, request-id
/// stamping, and structured request logging layered over every route.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = state.cors.to_cors_layer();

    let health = Router::new()
        .route("/healthz", get(routes::health::healthz))
        .route("/readyz", get(routes::health::readyz));

    let auth_routes = Router::new()
        .route("/auth/login", post(routes::auth::login))
        .route("/auth/me", get(routes::auth::me));

    let users = Router::new()
        .route("/users", post(routes::users::create_user).get(routes::users::list_users));

    let orgs = Router::new()
        .route("/orgs", post(routes::orgs::create_org).get(routes::orgs::list_orgs))
        .route("/orgs/:org_id", get(routes::orgs::get_org))
        .route(
            "/orgs/:org_id/memberships",
            post(routes::memberships::create_membership).get(routes::memberships::list_memberships),
        )
        .route("/orgs/:org_id/memberships/:membership_id", axum::routing::delete(routes::memberships::delete_membership))
        .route(
            "/orgs/:org_id/manifests",
            post(routes::manifests::create_manifest).get(routes::manifests::list_manifests),
        )
        .route(
            "/orgs/:org_id/manifests/:manifest_id",
            get(routes::manifests::get_manifest)
                .patch(routes::manifests::update_manifest)
                .delete(routes::manifests::delete_manifest),
        )
        .route("/orgs/:org_id/manifests/:manifest_id/activate", post(routes::manifests::activate_manifest))
        .route("/orgs/:org_id/manifests/:manifest_id/suspend", post(routes::manifests::suspend_manifest))
        .route("/orgs/:org_id/manifests/:manifest_id/revoke", post(routes::manifests::revoke_manifest))
        .route(
            "/orgs/:org_id/tokens",
            post(routes::tokens::issue_token).get(routes::tokens::list_tokens),
        )
        .route("/orgs/:org_id/tokens/:token_id", get(routes::tokens::get_token))
        .route("/orgs/:org_id/tokens/:token_id/revoke", post(routes::tokens::revoke_token))
        .route("/orgs/:org_id/tokens/revoke-all/:agent_id", post(routes::tokens::revoke_all_for_agent))
        .route(
            "/orgs/:org_id/policies",
            post(routes::policies::create_policy).get(routes::policies::list_policies),
        )
        .route(
            "/orgs/:org_id/policies/:policy_id",
            patch(routes::policies::update_policy).delete(routes::policies::delete_policy),
        )
        .route("/orgs/:org_id/records", get(routes::records::list_records))
        .route("/orgs/:org_id/records/:record_id", get(routes::records::get_record))
        .route("/orgs/:org_id/logs/:record_id", get(routes::records::get_record))
        .route("/orgs/:org_id/logs/verify/:uapk_id", get(routes::records::verify_uapk_chain))
        .route("/orgs/:org_id/logs/export", post(routes::records::export_records))
        .route("/orgs/:org_id/logs/export/download", post(routes::records::export_records_download))
        .route("/orgs/:org_id/logs/export/jsonl", post(routes::records::export_records_jsonl));

    let api_keys = Router::new()
        .route("/api-keys", post(routes::api_keys::create_api_key).get(routes::api_keys::list_api_keys))
        .route("/api-keys/:id/revoke", post(routes::api_keys::revoke_api_key));

    let approvals = Router::new()
        .route("/approvals", get(routes::approvals::list_approvals))
        .route("/approvals/pending", get(routes::approvals::list_pending_approvals))
        .route("/approvals/stats", get(routes::approvals::approval_stats))
        .route("/approvals/:approval_id", get(routes::approvals::get_approval))
        .route("/approvals/:approval_id/approve", post(routes::approvals::approve_approval))
        .route("/approvals/:approval_id/deny", post(routes::approvals::deny_approval));

    let capabilities = Router::new()
        .route("/capabilities/gateway-key", get(routes::capabilities::gateway_key))
        .route("/capabilities/issuers", post(routes::capabilities::register_issuer))
        .route("/capabilities/issuers/:issuer_id", get(routes::capabilities::get_issuer))
        .route("/capabilities/issuers/:issuer_id/revoke", post(routes::capabilities::revoke_issuer))
        .route("/capabilities/issuers/:issuer_id/public-key", get(routes::capabilities::issuer_public_key))
        .route("/capabilities/issue", post(routes::capabilities::issue_capability));

    let actions = Router::new().route("/actions", post(routes::actions::admit_action));

    Router::new()
        .merge(health)
        .merge(auth_routes)
        .merge(users)
        .merge(orgs)
        .merge(api_keys)
        .merge(approvals)
        .merge(capabilities)
        .merge(actions)
        .layer(axum::middleware::from_fn(middleware::request_logger))
        .layer(axum::middleware::from_fn(middleware::request_id_middleware))
        .layer(cors)
        .with_state(state)
}
