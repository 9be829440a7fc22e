//! Investigation listing, lookup, kickoff, and evidence download.
//!
//! Grounded on `crates/api/src/main.rs`'s `analyze_logs` handler shape
//! (extract input, call into a subsystem, return `Json`) — generalised
//! from a single synchronous analysis call into a mix of synchronous
//! store reads and an asynchronously-kicked-off investigation run.

use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Json, Redirect};
use serde::Deserialize;
use serde_json::json;

use ssi_common::ScanMode;

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub domain: Option<String>,
    pub status: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}

pub async fn list_investigations(State(state): State<AppState>, Query(query): Query<ListQuery>) -> impl IntoResponse {
    match state.store.list_scans(query.domain.as_deref(), query.status.as_deref(), query.limit, query.offset).await {
        Ok(scans) => Json(json!({ "investigations": scans })).into_response(),
        Err(e) => (axum::http::StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": e.to_string() }))).into_response(),
    }
}

pub async fn get_investigation(State(state): State<AppState>, Path(scan_id): Path<String>) -> impl IntoResponse {
    match state.store.get_scan(&scan_id).await {
        Ok(Some(scan)) => Json(json!({ "investigation": scan })).into_response(),
        Ok(None) => (axum::http::StatusCode::NOT_FOUND, Json(json!({ "error": "no such investigation" }))).into_response(),
        Err(e) => (axum::http::StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": e.to_string() }))).into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub struct StartInvestigationRequest {
    pub url: String,
    #[serde(default = "default_mode")]
    pub mode: String,
    pub case_id: Option<String>,
}

fn default_mode() -> String {
    "full".to_string()
}

fn parse_mode(mode: &str) -> Option<ScanMode> {
    match mode.to_lowercase().as_str() {
        "passive" => Some(ScanMode::Passive),
        "active" => Some(ScanMode::Active),
        "full" => Some(ScanMode::Full),
        _ => None,
    }
}

/// Kicks off an investigation in the background and returns immediately
/// with a tracking id; the investigation's own scan record (with its own
/// store-assigned id) only exists once `ssi_orchestrator::run_investigation`
/// reaches its persistence phase, so this tracking id — not the eventual
/// scan id — is what the "currently running" listing keys on.
pub async fn start_investigation(State(state): State<AppState>, Json(request): Json<StartInvestigationRequest>) -> impl IntoResponse {
    let Some(mode) = parse_mode(&request.mode) else {
        return (axum::http::StatusCode::BAD_REQUEST, Json(json!({ "error": format!("unknown mode: {}", request.mode) }))).into_response();
    };

    let tracking_id = uuid::Uuid::new_v4().to_string();
    let cancel = state.register_running(&tracking_id, &request.url);

    let deps = state.pipeline_deps(request.case_id);
    let url = request.url.clone();
    let state_for_task = state.clone();
    let tracking_id_for_task = tracking_id.clone();

    tokio::spawn(async move {
        let result = ssi_orchestrator::run_investigation(&deps, &url, mode, cancel).await;
        if let Err(e) = result {
            tracing::error!(error = %e, url = %url, "investigation run failed");
        }
        state_for_task.finish_running(&tracking_id_for_task);
    });

    (axum::http::StatusCode::ACCEPTED, Json(json!({ "tracking_id": tracking_id, "url": request.url, "mode": request.mode }))).into_response()
}

pub async fn cancel_investigation(State(state): State<AppState>, Path(tracking_id): Path<String>) -> impl IntoResponse {
    if state.cancel(&tracking_id) {
        Json(json!({ "cancelled": true })).into_response()
    } else {
        (axum::http::StatusCode::NOT_FOUND, Json(json!({ "error": "no such running investigation" }))).into_response()
    }
}

pub async fn investigation_wallets(State(state): State<AppState>, Path(scan_id): Path<String>) -> impl IntoResponse {
    match state.store.get_wallets(&scan_id).await {
        Ok(wallets) => Json(json!({ "wallets": wallets })).into_response(),
        Err(e) => (axum::http::StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": e.to_string() }))).into_response(),
    }
}

/// Serves the evidence ZIP directly for the local storage backend, or
/// redirects to a GCS download link when object-store-backed — matching
/// the contract's "signed-URL redirect when object-store-backed".
pub async fn download_evidence(State(state): State<AppState>, Path(scan_id): Path<String>) -> impl IntoResponse {
    let scan = match state.store.get_scan(&scan_id).await {
        Ok(Some(scan)) => scan,
        Ok(None) => return (axum::http::StatusCode::NOT_FOUND, Json(json!({ "error": "no such investigation" }))).into_response(),
        Err(e) => return (axum::http::StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": e.to_string() }))).into_response(),
    };

    let output_dir = std::path::PathBuf::from(&state.settings.evidence.output_dir).join(&scan_id);

    if let Some(url) = state.evidence_storage.get_evidence_zip_url(&scan_id, &output_dir) {
        return Redirect::temporary(&url).into_response();
    }

    let zip_path = output_dir.join("evidence.zip");
    match tokio::fs::read(&zip_path).await {
        Ok(bytes) => (
            [(axum::http::header::CONTENT_TYPE, "application/zip")],
            bytes,
        )
            .into_response(),
        Err(_) => (axum::http::StatusCode::NOT_FOUND, Json(json!({ "error": "evidence package not found" }))).into_response(),
    }
}

/// Streams the law-enforcement bundle for a completed investigation,
/// assembling it on demand rather than keeping one around per scan.
pub async fn download_lea_package(State(state): State<AppState>, Path(scan_id): Path<String>) -> impl IntoResponse {
    let scan = match state.store.get_scan(&scan_id).await {
        Ok(Some(scan)) => scan,
        Ok(None) => return (axum::http::StatusCode::NOT_FOUND, Json(json!({ "error": "no such investigation" }))).into_response(),
        Err(e) => return (axum::http::StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": e.to_string() }))).into_response(),
    };

    let investigation_id = uuid::Uuid::parse_str(&scan.scan_id).unwrap_or_else(|_| uuid::Uuid::nil());
    let output_dir = std::path::PathBuf::from(&state.settings.evidence.output_dir).join(&scan_id);

    let bundle = tokio::task::spawn_blocking(move || ssi_evidence::package_lea_bundle(investigation_id, &output_dir))
        .await
        .map_err(|e| e.to_string())
        .and_then(|r| r.map_err(|e| e.to_string()));

    match bundle {
        Ok(bundle) => match tokio::fs::read(&bundle.zip_path).await {
            Ok(bytes) => ([(axum::http::header::CONTENT_TYPE, "application/zip")], bytes).into_response(),
            Err(_) => (axum::http::StatusCode::NOT_FOUND, Json(json!({ "error": "lea package not found" }))).into_response(),
        },
        Err(_) => (axum::http::StatusCode::NOT_FOUND, Json(json!({ "error": "no lea package source files found for this investigation" }))).into_response(),
    }
}
