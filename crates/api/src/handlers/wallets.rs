//! Cross-investigation wallet search and export.
//!
//! The CSV column order mirrors the Python original's `WalletExporter`
//! header row; XLSX is not offered here since nothing in the dependency
//! stack writes that format (see DESIGN.md).

use axum::extract::{Query, State};
use axum::response::{IntoResponse, Json};
use serde::Deserialize;
use serde_json::json;

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub address: Option<String>,
    pub token_symbol: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default = "default_true")]
    pub dedup: bool,
}

fn default_limit() -> i64 {
    100
}

fn default_true() -> bool {
    true
}

pub async fn search_wallets(State(state): State<AppState>, Query(query): Query<SearchQuery>) -> impl IntoResponse {
    match state.store.search_wallets(query.address.as_deref(), query.token_symbol.as_deref(), query.limit, query.dedup).await {
        Ok(wallets) => Json(json!({ "wallets": wallets })).into_response(),
        Err(e) => (axum::http::StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": e.to_string() }))).into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    #[serde(default = "default_format")]
    pub format: String,
    pub address: Option<String>,
    pub token_symbol: Option<String>,
    #[serde(default = "default_export_limit")]
    pub limit: i64,
    #[serde(default = "default_true")]
    pub dedup: bool,
}

fn default_format() -> String {
    "csv".to_string()
}

fn default_export_limit() -> i64 {
    10_000
}

const CSV_HEADERS: [&str; 10] = [
    "site_url",
    "token_label",
    "token_symbol",
    "network_label",
    "network_short",
    "wallet_address",
    "harvested_at",
    "run_id",
    "source",
    "confidence",
];

pub async fn export_wallets(State(state): State<AppState>, Query(query): Query<ExportQuery>) -> impl IntoResponse {
    let format = query.format.to_lowercase();
    if format == "xlsx" {
        return (
            axum::http::StatusCode::NOT_IMPLEMENTED,
            Json(json!({ "error": "xlsx export is not available; use format=csv or format=json" })),
        )
            .into_response();
    }
    if format != "csv" && format != "json" {
        return (axum::http::StatusCode::BAD_REQUEST, Json(json!({ "error": format!("unknown export format: {}", query.format) }))).into_response();
    }

    let wallets = match state.store.search_wallets(query.address.as_deref(), query.token_symbol.as_deref(), query.limit, query.dedup).await {
        Ok(wallets) => wallets,
        Err(e) => return (axum::http::StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": e.to_string() }))).into_response(),
    };

    if format == "json" {
        return Json(json!({ "wallets": wallets })).into_response();
    }

    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(vec![]);
    if writer.write_record(CSV_HEADERS).is_err() {
        return (axum::http::StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": "failed to write csv header" }))).into_response();
    }
    for wallet in &wallets {
        let record = [
            wallet.site_url.clone().unwrap_or_default(),
            wallet.token_label.clone().unwrap_or_default(),
            wallet.token_symbol.clone().unwrap_or_default(),
            wallet.network_label.clone().unwrap_or_default(),
            wallet.network_short.clone().unwrap_or_default(),
            wallet.wallet_address.clone(),
            wallet.harvested_at.clone().unwrap_or_default(),
            wallet.scan_id.clone().unwrap_or_default(),
            wallet.source.clone(),
            wallet.confidence.to_string(),
        ];
        if writer.write_record(record).is_err() {
            return (axum::http::StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": "failed to write csv row" }))).into_response();
        }
    }
    let body = match writer.into_inner() {
        Ok(bytes) => bytes,
        Err(_) => return (axum::http::StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": "failed to finalize csv" }))).into_response(),
    };

    (
        [
            (axum::http::header::CONTENT_TYPE, "text/csv"),
            (axum::http::header::CONTENT_DISPOSITION, "attachment; filename=\"wallets.csv\""),
        ],
        body,
    )
        .into_response()
}
