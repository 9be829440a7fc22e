mod handlers;
mod state;

use std::sync::Arc;

use axum::routing::{delete, get};
use axum::Router;

use ssi_common::config::Settings;
use ssi_evidence::EvidenceStorageClient;
use ssi_store::ScanStore;

use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();

    let settings = Arc::new(Settings::from_env());
    let store = Arc::new(ScanStore::connect(&settings.store).await?);
    let evidence_storage = Arc::new(EvidenceStorageClient::from_settings(&settings.evidence));
    let webdriver_url = std::env::var("SSI_WEBDRIVER_URL").unwrap_or_else(|_| "http://localhost:4444".to_string());

    let state = AppState::new(store, settings, evidence_storage, webdriver_url);

    let app = Router::new()
        .route("/investigations", get(handlers::investigations::list_investigations).post(handlers::investigations::start_investigation))
        .route("/investigations/running", get(handlers::running::list_running))
        .route("/investigations/running/:tracking_id", delete(handlers::investigations::cancel_investigation))
        .route("/investigations/:scan_id", get(handlers::investigations::get_investigation))
        .route("/investigations/:scan_id/wallets", get(handlers::investigations::investigation_wallets))
        .route("/investigations/:scan_id/evidence", get(handlers::investigations::download_evidence))
        .route("/investigations/:scan_id/lea-package", get(handlers::investigations::download_lea_package))
        .route("/wallets/search", get(handlers::wallets::search_wallets))
        .route("/wallets/export", get(handlers::wallets::export_wallets))
        .route("/healthz", get(|| async { "ok" }))
        .with_state(state);

    let listen_addr = std::env::var("SSI_API_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    tracing::info!(addr = %listen_addr, "starting ssi-api");
    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
