//! Shared application state threaded through every handler via `Extension`,
//! mirroring the teacher's `Extension<DbPool>` layering but widened to the
//! full set of subsystems a request might need.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use ssi_common::config::Settings;
use ssi_evidence::EvidenceStorageClient;
use ssi_store::ScanStore;
use tokio_util::sync::CancellationToken;

/// A snapshot of one in-flight investigation, enough for the "currently
/// running" listing endpoint without polling the store.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RunningInvestigation {
    pub scan_id: String,
    pub url: String,
    pub started_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<ScanStore>,
    pub settings: Arc<Settings>,
    pub evidence_storage: Arc<EvidenceStorageClient>,
    pub webdriver_url: String,
    pub http_client: reqwest::Client,
    running: Arc<RwLock<HashMap<String, (RunningInvestigation, CancellationToken)>>>,
}

impl AppState {
    pub fn new(
        store: Arc<ScanStore>,
        settings: Arc<Settings>,
        evidence_storage: Arc<EvidenceStorageClient>,
        webdriver_url: String,
    ) -> Self {
        AppState {
            store,
            settings,
            evidence_storage,
            webdriver_url,
            http_client: reqwest::Client::new(),
            running: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn pipeline_deps(&self, case_id: Option<String>) -> ssi_orchestrator::PipelineDeps {
        ssi_orchestrator::PipelineDeps {
            settings: self.settings.clone(),
            store: Some(self.store.clone()),
            webdriver_url: self.webdriver_url.clone(),
            http_client: self.http_client.clone(),
            case_id,
        }
    }

    pub fn register_running(&self, scan_id: &str, url: &str) -> CancellationToken {
        let token = CancellationToken::new();
        let entry = RunningInvestigation { scan_id: scan_id.to_string(), url: url.to_string(), started_at: chrono::Utc::now() };
        self.running.write().unwrap().insert(scan_id.to_string(), (entry, token.clone()));
        token
    }

    pub fn finish_running(&self, scan_id: &str) {
        self.running.write().unwrap().remove(scan_id);
    }

    pub fn cancel(&self, scan_id: &str) -> bool {
        match self.running.read().unwrap().get(scan_id) {
            Some((_, token)) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn list_running(&self) -> Vec<RunningInvestigation> {
        self.running.read().unwrap().values().map(|(entry, _)| entry.clone()).collect()
    }
}
