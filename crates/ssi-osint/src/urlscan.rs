//! urlscan.io adapter: searches for the most recent public scan of a domain
//! rather than submitting a new scan and polling for completion, keeping
//! the adapter call latency inside the per-phase OSINT deadline.

use crate::{with_deadline, OsintAdapter};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use ssi_common::{SsiError, UrlscanResult};
use std::time::Duration;

const URLSCAN_SEARCH: &str = "https://urlscan.io/api/v1/search/";

pub struct UrlscanAdapter {
    client: Client,
    api_key: String,
}

impl UrlscanAdapter {
    pub fn new(client: Client, api_key: String) -> Self {
        Self { client, api_key }
    }

    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    #[serde(rename = "_id")]
    id: String,
    page: Option<SearchPage>,
}

#[derive(Debug, Deserialize)]
struct SearchPage {
    #[serde(default)]
    screenshot: Option<String>,
}

#[async_trait]
impl OsintAdapter for UrlscanAdapter {
    type Output = UrlscanResult;

    async fn lookup(&self, domain_or_url: &str, deadline: Duration) -> Result<UrlscanResult, SsiError> {
        let host = super::geoip::strip_to_host(domain_or_url);
        let client = self.client.clone();
        let api_key = self.api_key.clone();
        let query = format!("domain:{host}");

        with_deadline(deadline, async move {
            let mut request = client.get(URLSCAN_SEARCH).query(&[("q", query.as_str())]);
            if !api_key.is_empty() {
                request = request.header("API-Key", api_key);
            }
            let response = request
                .send()
                .await
                .map_err(|e| SsiError::Osint(format!("urlscan request failed: {e}")))?;

            if !response.status().is_success() {
                return Err(SsiError::Osint(format!("urlscan returned {}", response.status())));
            }

            let body: SearchResponse = response
                .json()
                .await
                .map_err(|e| SsiError::Osint(format!("urlscan parse failed: {e}")))?;

            let latest = body
                .results
                .into_iter()
                .next()
                .ok_or_else(|| SsiError::Osint(format!("no urlscan results for {host}")))?;

            Ok(UrlscanResult {
                scan_id: Some(latest.id),
                verdict_malicious: false,
                screenshot_url: latest.page.and_then(|p| p.screenshot),
            })
        })
        .await
    }
}
