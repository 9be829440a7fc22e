//! VirusTotal adapter: URL report and file-hash report, VT API v3.

use crate::{with_deadline, OsintAdapter};
use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::Deserialize;
use ssi_common::{SsiError, VirusTotalResult};
use std::time::Duration;

const VT_BASE: &str = "https://www.virustotal.com/api/v3";

pub struct VirusTotalAdapter {
    client: Client,
    api_key: String,
}

impl VirusTotalAdapter {
    pub fn new(client: Client, api_key: String) -> Self {
        Self { client, api_key }
    }

    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }

    pub async fn url_report(&self, url: &str, deadline: Duration) -> Result<VirusTotalResult, SsiError> {
        let url_id = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(url.as_bytes());
        self.fetch_report(&format!("{VT_BASE}/urls/{url_id}"), deadline).await
    }

    pub async fn file_hash_report(&self, sha256: &str, deadline: Duration) -> Result<VirusTotalResult, SsiError> {
        self.fetch_report(&format!("{VT_BASE}/files/{sha256}"), deadline).await
    }

    async fn fetch_report(&self, endpoint: &str, deadline: Duration) -> Result<VirusTotalResult, SsiError> {
        if !self.is_configured() {
            return Err(SsiError::Configuration("VirusTotal API key not set".into()));
        }
        let client = self.client.clone();
        let api_key = self.api_key.clone();
        let endpoint = endpoint.to_string();

        with_deadline(deadline, async move {
            let response = client
                .get(&endpoint)
                .header("x-apikey", api_key)
                .send()
                .await
                .map_err(|e| SsiError::Osint(format!("virustotal request failed: {e}")))?;

            if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
                return Err(SsiError::Osint("virustotal quota exceeded".into()));
            }
            if !response.status().is_success() {
                return Err(SsiError::Osint(format!("virustotal returned {}", response.status())));
            }

            let body: VtResponse = response
                .json()
                .await
                .map_err(|e| SsiError::Osint(format!("virustotal parse failed: {e}")))?;

            Ok(body.into_result())
        })
        .await
    }
}

#[derive(Debug, Deserialize)]
struct VtResponse {
    data: VtData,
}

#[derive(Debug, Deserialize)]
struct VtData {
    attributes: VtAttributes,
}

#[derive(Debug, Deserialize)]
struct VtAttributes {
    last_analysis_stats: VtStats,
    #[serde(default)]
    categories: std::collections::HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct VtStats {
    malicious: u32,
    suspicious: u32,
    harmless: u32,
    undetected: u32,
}

impl VtResponse {
    fn into_result(self) -> VirusTotalResult {
        let stats = self.data.attributes.last_analysis_stats;
        VirusTotalResult {
            detections: stats.malicious + stats.suspicious,
            total_engines: stats.malicious + stats.suspicious + stats.harmless + stats.undetected,
            categories: self.data.attributes.categories.into_values().collect(),
        }
    }
}

#[async_trait]
impl OsintAdapter for VirusTotalAdapter {
    type Output = VirusTotalResult;

    async fn lookup(&self, domain_or_url: &str, deadline: Duration) -> Result<VirusTotalResult, SsiError> {
        self.url_report(domain_or_url, deadline).await
    }
}
