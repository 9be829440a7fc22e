//! Core data model shared across every SSI subsystem.
//!
//! Grounded on `crates/common/src/lib.rs`'s flat `#[derive(Serialize)]`
//! struct style; generalised from log-analysis records to investigation
//! records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Scan mode requested for an investigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanMode {
    Passive,
    Active,
    Full,
}

/// Terminal and in-flight status of an investigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvestigationStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Skipped,
    Cancelled,
}

/// The top-level record for a single investigated URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Investigation {
    pub id: Uuid,
    pub url: String,
    pub mode: ScanMode,
    pub status: InvestigationStatus,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub duration_seconds: Option<f64>,

    pub whois: Option<WhoisResult>,
    pub dns: Option<DnsResult>,
    pub tls: Option<TlsResult>,
    pub geoip: Option<GeoIpResult>,
    pub virustotal: Option<VirusTotalResult>,
    pub urlscan: Option<UrlscanResult>,

    pub wallets: Vec<WalletEntry>,
    pub pii_exposures: Vec<PiiExposure>,
    pub threat_indicators: Vec<ThreatIndicator>,
    pub downloads: Vec<DownloadArtifact>,
    pub agent_steps: Vec<AgentStep>,
    pub page_snapshot: Option<PageSnapshot>,
    pub taxonomy: Option<TaxonomyResult>,

    pub cost_summary: CostSummary,
    pub chain_of_custody: Option<ChainOfCustody>,
    pub output_dir: Option<String>,
    pub evidence_zip_path: Option<String>,
    pub warnings: Vec<String>,
}

impl Investigation {
    pub fn new(url: impl Into<String>, mode: ScanMode) -> Self {
        Investigation {
            id: Uuid::new_v4(),
            url: url.into(),
            mode,
            status: InvestigationStatus::Pending,
            started_at: Utc::now(),
            ended_at: None,
            duration_seconds: None,
            whois: None,
            dns: None,
            tls: None,
            geoip: None,
            virustotal: None,
            urlscan: None,
            wallets: Vec::new(),
            pii_exposures: Vec::new(),
            threat_indicators: Vec::new(),
            downloads: Vec::new(),
            agent_steps: Vec::new(),
            page_snapshot: None,
            taxonomy: None,
            cost_summary: CostSummary::default(),
            chain_of_custody: None,
            output_dir: None,
            evidence_zip_path: None,
            warnings: Vec::new(),
        }
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn finalize(&mut self, status: InvestigationStatus) {
        self.status = status;
        let end = Utc::now();
        self.duration_seconds = Some((end - self.started_at).num_milliseconds() as f64 / 1000.0);
        self.ended_at = Some(end);
    }
}

/// Capture source for a harvested wallet entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WalletSource {
    Js,
    Llm,
    Regex,
    Opportunistic,
}

/// A single harvested cryptocurrency address.
///
/// Invariant: address is never empty or
/// whitespace-only — enforced at construction via [`WalletEntry::new`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletEntry {
    pub source_url: String,
    pub token_name: String,
    pub token_symbol: String,
    pub network: String,
    pub network_short: String,
    pub wallet_address: String,
    pub source: WalletSource,
    pub confidence: f32,
    pub timestamp: DateTime<Utc>,
    pub run_id: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum WalletEntryError {
    #[error("wallet address must not be empty")]
    EmptyAddress,
}

impl WalletEntry {
    /// Construct a wallet entry, normalising `token_symbol` to uppercase and
    /// `network_short` to lowercase (testable property 2), rejecting an
    /// empty or whitespace-only address (testable property 1).
    pub fn new(
        source_url: impl Into<String>,
        token_name: impl Into<String>,
        token_symbol: impl Into<String>,
        network: impl Into<String>,
        network_short: impl Into<String>,
        wallet_address: impl Into<String>,
        source: WalletSource,
        confidence: f32,
    ) -> Result<Self, WalletEntryError> {
        let address = wallet_address.into().trim().to_string();
        if address.is_empty() {
            return Err(WalletEntryError::EmptyAddress);
        }
        Ok(WalletEntry {
            source_url: source_url.into(),
            token_name: token_name.into(),
            token_symbol: token_symbol.into().to_uppercase(),
            network: network.into(),
            network_short: network_short.into().to_lowercase(),
            wallet_address: address,
            source,
            confidence: confidence.clamp(0.0, 1.0),
            timestamp: Utc::now(),
            run_id: None,
        })
    }

    pub fn allowlist_key(&self) -> (String, String) {
        (self.token_symbol.clone(), self.network_short.clone())
    }
}

/// Typed indicator of compromise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndicatorType {
    Ip,
    Ipv4,
    Ipv6,
    Domain,
    Email,
    Url,
    CryptoWallet,
    Sha256,
    Md5,
    Phone,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreatIndicator {
    pub indicator_type: IndicatorType,
    pub value: String,
    pub context: String,
    pub source: String,
}

/// Semantic category of a PII-harvesting form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PiiCategory {
    Email,
    Password,
    Phone,
    Name,
    Address,
    Ssn,
    Financial,
    IdNumber,
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PiiExposure {
    pub category: PiiCategory,
    pub field_label: String,
    pub form_action_url: String,
    pub page_url: String,
    pub required: bool,
    pub submitted: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadArtifact {
    pub origin_url: String,
    pub filename: String,
    pub path: String,
    pub sha256: String,
    pub md5: String,
    pub size_bytes: u64,
    pub mime_type: String,
    pub vt_detections: u32,
    pub vt_total_engines: u32,
    pub is_malicious: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractiveElement {
    pub tag: String,
    pub element_type: String,
    pub name: String,
    pub label: String,
    pub placeholder: String,
    pub text: String,
    pub href: String,
    pub required: bool,
    pub selector: String,
    pub index: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PageSnapshot {
    pub url: String,
    pub title: String,
    pub visible_text: String,
    pub interactive_elements: Vec<InteractiveElement>,
    pub redirect_chain: Vec<String>,
    pub screenshot_path: Option<String>,
    pub dom_path: Option<String>,
    pub har_path: Option<String>,
    pub technologies: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionType {
    Click,
    Type,
    Select,
    Key,
    Navigate,
    Scroll,
    Wait,
    Done,
    Stuck,
}

impl ActionType {
    /// Terminal actions never execute against the browser.
    pub fn is_terminal(self) -> bool {
        matches!(self, ActionType::Done | ActionType::Stuck)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentAction {
    pub action: ActionType,
    pub selector: String,
    pub value: String,
    pub reasoning: String,
    pub confidence: f32,
}

impl AgentAction {
    pub fn done(reasoning: impl Into<String>, confidence: f32) -> Self {
        AgentAction {
            action: ActionType::Done,
            selector: String::new(),
            value: String::new(),
            reasoning: reasoning.into(),
            confidence,
        }
    }

    pub fn stuck(reasoning: impl Into<String>, confidence: f32) -> Self {
        AgentAction {
            action: ActionType::Stuck,
            selector: String::new(),
            value: String::new(),
            reasoning: reasoning.into(),
            confidence,
        }
    }

    pub fn click(selector: impl Into<String>, reasoning: impl Into<String>, confidence: f32) -> Self {
        AgentAction {
            action: ActionType::Click,
            selector: selector.into(),
            value: String::new(),
            reasoning: reasoning.into(),
            confidence,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentStep {
    pub step_number: u32,
    pub observation: String,
    pub action: AgentAction,
    pub pre_screenshot_path: Option<String>,
    pub post_screenshot_path: Option<String>,
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub duration_ms: u64,
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AgentMetrics {
    pub total_steps: u32,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub total_latency_ms: u64,
    pub termination_reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AgentSession {
    pub steps: Vec<AgentStep>,
    pub visited_urls: Vec<String>,
    pub submitted_pii_fields: std::collections::HashSet<String>,
    pub downloads: Vec<DownloadArtifact>,
    pub metrics: AgentMetrics,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CostSummary {
    pub budget_usd: f64,
    pub llm_usd: f64,
    pub api_usd: f64,
    pub compute_usd: f64,
    pub budget_exceeded: bool,
}

impl CostSummary {
    pub fn total(&self) -> f64 {
        self.llm_usd + self.api_usd + self.compute_usd
    }

    pub fn record_llm_cost(&mut self, usd: f64) {
        self.llm_usd += usd;
        if self.budget_usd > 0.0 && self.total() > self.budget_usd {
            self.budget_exceeded = true;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustodyArtifact {
    pub file_name: String,
    pub size_bytes: u64,
    pub sha256: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainOfCustody {
    pub investigation_id: Uuid,
    pub target_url: String,
    pub collected_at: DateTime<Utc>,
    pub collector: String,
    pub method: String,
    pub hash_algorithm: String,
    pub artifacts: Vec<CustodyArtifact>,
    pub package_sha256: Option<String>,
    pub artifact_count: usize,
    pub total_bytes: u64,
    pub legal_notice: String,
}

impl ChainOfCustody {
    pub fn new(investigation_id: Uuid, target_url: impl Into<String>) -> Self {
        ChainOfCustody {
            investigation_id,
            target_url: target_url.into(),
            collected_at: Utc::now(),
            collector: "SSI automated collector".to_string(),
            method: "automated".to_string(),
            hash_algorithm: "SHA-256".to_string(),
            artifacts: Vec::new(),
            package_sha256: None,
            artifact_count: 0,
            total_bytes: 0,
            legal_notice: "Collected by an automated tool; chain of custody documented herein. \
                           Verify hashes before relying on this evidence in proceedings."
                .to_string(),
        }
    }
}

// ---------------------------------------------------------------------
// OSINT result shapes (C4)
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WhoisResult {
    pub registrar: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub registrant_org: Option<String>,
    pub name_servers: Vec<String>,
    pub raw: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DnsResult {
    pub a: Vec<String>,
    pub aaaa: Vec<String>,
    pub mx: Vec<String>,
    pub txt: Vec<String>,
    pub ns: Vec<String>,
    pub cname: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TlsResult {
    pub subject: String,
    pub issuer: String,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_to: Option<DateTime<Utc>>,
    pub san: Vec<String>,
    pub self_signed: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeoIpResult {
    pub ip: String,
    pub country: Option<String>,
    pub city: Option<String>,
    pub asn: Option<u32>,
    pub org: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VirusTotalResult {
    pub detections: u32,
    pub total_engines: u32,
    pub categories: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UrlscanResult {
    pub scan_id: Option<String>,
    pub verdict_malicious: bool,
    pub screenshot_url: Option<String>,
}

// ---------------------------------------------------------------------
// Fraud taxonomy (C14 classification phase)
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxonomyLabel {
    pub label: String,
    pub confidence: f32,
    pub explanation: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaxonomyResult {
    pub intent: Vec<TaxonomyLabel>,
    pub channel: Vec<TaxonomyLabel>,
    pub technique: Vec<TaxonomyLabel>,
    pub action: Vec<TaxonomyLabel>,
    pub persona: Vec<TaxonomyLabel>,
    pub risk_score: f32,
}
