// records.rs — GET /orgs/{id}/records, /orgs/{id}/logs, .../verify/{uapk_id},
// and the three export variants (§6, §4.D). VIEWER+ throughout; this
// surface only reads the hash-chained audit log, never mutates it.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::auth::{require_org_role, SessionUser};
use crate::error::ApiError;
use crate::state::AppState;

pub async fn list_records(
    State(state): State<Arc<AppState>>,
    caller: SessionUser,
    Path(org_id): Path<Uuid>,
) -> Result<Json<Vec<gateway_audit::InteractionRecord>>, ApiError> {
    require_org_role(&state, caller.user.id, org_id, gateway_core::Role::Viewer).await?;
    let records = state.audit.list_org(&org_id.to_string())?;
    Ok(Json(records))
}

fn load_record(state: &AppState, org_id: Uuid, record_id: &str) -> Result<gateway_audit::InteractionRecord, ApiError> {
    let record = state.audit.get(record_id)?.ok_or_else(|| ApiError::not_found("record not found"))?;
    if record.org_id != org_id.to_string() {
        return Err(ApiError::not_found("record not found"));
    }
    Ok(record)
}

pub async fn get_record(
    State(state): State<Arc<AppState>>,
    caller: SessionUser,
    Path((org_id, record_id)): Path<(Uuid, String)>,
) -> Result<Json<gateway_audit::InteractionRecord>, ApiError> {
    require_org_role(&state, caller.user.id, org_id, gateway_core::Role::Viewer).await?;
    Ok(Json(load_record(&state, org_id, &record_id)?))
}

pub async fn verify_uapk_chain(
    State(state): State<Arc<AppState>>,
    caller: SessionUser,
    Path((org_id, uapk_id)): Path<(Uuid, String)>,
) -> Result<Json<gateway_audit::VerificationReport>, ApiError> {
    require_org_role(&state, caller.user.id, org_id, gateway_core::Role::Viewer).await?;
    let report = gateway_audit::verify_chain(&state.audit, &state.keypair.public_key_bytes(), &org_id.to_string(), &uapk_id)?;
    Ok(Json(report))
}

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    pub uapk_id: String,
}

struct ExportBundle {
    metadata: Value,
    manifests: Vec<gateway_core::Manifest>,
    records: Vec<gateway_audit::InteractionRecord>,
}

fn build_export(state: &AppState, org_id: Uuid, uapk_id: &str) -> Result<ExportBundle, ApiError> {
    let report = gateway_audit::verify_chain(&state.audit, &state.keypair.public_key_bytes(), &org_id.to_string(), uapk_id)?;
    let records = state.audit.list_chain(&org_id.to_string(), uapk_id)?;
    let manifests = state
        .manifests
        .list_for_org(org_id)?
        .into_iter()
        .filter(|m| m.uapk_id == uapk_id)
        .collect::<Vec<_>>();

    let metadata = json!({
        "type": "metadata",
        "export_id": format!("exp-{}", Uuid::new_v4().simple()),
        "exported_at": Utc::now(),
        "uapk_id": uapk_id,
        "org_id": org_id,
        "record_count": report.record_count,
        "chain_valid": report.is_valid,
        "verification_errors": report.errors,
    });

    Ok(ExportBundle { metadata, manifests, records })
}

#[derive(Debug, Serialize)]
pub struct ExportResponse {
    pub metadata: Value,
    pub manifests: Vec<gateway_core::Manifest>,
    pub records: Vec<gateway_audit::InteractionRecord>,
}

pub async fn export_records(
    State(state): State<Arc<AppState>>,
    caller: SessionUser,
    Path(org_id): Path<Uuid>,
    Query(query): Query<ExportQuery>,
) -> Result<Json<ExportResponse>, ApiError> {
    require_org_role(&state, caller.user.id, org_id, gateway_core::Role::Viewer).await?;
    let bundle = build_export(&state, org_id, &query.uapk_id)?;
    Ok(Json(ExportResponse { metadata: bundle.metadata, manifests: bundle.manifests, records: bundle.records }))
}

pub async fn export_records_download(
    State(state): State<Arc<AppState>>,
    caller: SessionUser,
    Path(org_id): Path<Uuid>,
    Query(query): Query<ExportQuery>,
) -> Result<Response, ApiError> {
    require_org_role(&state, caller.user.id, org_id, gateway_core::Role::Viewer).await?;
    let bundle = build_export(&state, org_id, &query.uapk_id)?;
    let body = serde_json::to_string_pretty(&ExportResponse { metadata: bundle.metadata, manifests: bundle.manifests, records: bundle.records })
        .map_err(gateway_core::GatewayError::from)?;
    let mut response = body.into_response();
    response.headers_mut().insert(header::CONTENT_TYPE, "application/json".parse().unwrap());
    response.headers_mut().insert(
        header::CONTENT_DISPOSITION,
        format!("attachment; filename=\"{}-{}.json\"", org_id, query.uapk_id).parse().unwrap(),
    );
    Ok(response)
}

pub async fn export_records_jsonl(
    State(state): State<Arc<AppState>>,
    caller: SessionUser,
    Path(org_id): Path<Uuid>,
    Query(query): Query<ExportQuery>,
) -> Result<Response, ApiError> {
    require_org_role(&state, caller.user.id, org_id, gateway_core::Role::Viewer).await?;
    let bundle = build_export(&state, org_id, &query.uapk_id)?;

    let mut lines = Vec::with_capacity(1 + bundle.manifests.len() + bundle.records.len());
    lines.push(serde_json::to_string(&bundle.metadata).map_err(gateway_core::GatewayError::from)?);
    for manifest in &bundle.manifests {
        let line = json!({
            "type": "manifest",
            "uapk_id": manifest.uapk_id,
            "version": manifest.version,
            "manifest_hash": manifest.manifest_hash,
            "status": manifest.status,
            "manifest_json": manifest.manifest_json,
            "created_at": manifest.created_at,
        });
        lines.push(serde_json::to_string(&line).map_err(gateway_core::GatewayError::from)?);
    }
    for record in &bundle.records {
        let mut line = serde_json::to_value(record).map_err(gateway_core::GatewayError::from)?;
        line["type"] = json!("record");
        lines.push(serde_json::to_string(&line).map_err(gateway_core::GatewayError::from)?);
    }
    let body = lines.join("\n") + "\n";

    Ok((
        [
            (header::CONTENT_TYPE, "application/x-ndjson"),
            (header::CONTENT_DISPOSITION, &format!("attachment; filename=\"{}-{}.jsonl\"", org_id, query.uapk_id)),
        ],
        body,
    )
        .into_response())
}
