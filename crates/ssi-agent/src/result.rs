//! The outcome of driving a single site through the funnel.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ssi_common::{AgentMetrics, WalletEntry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SiteStatus {
    InProgress,
    Completed,
    Skipped,
    Error,
    NeedsManualReview,
    BrokenDepositPage,
    EmailVerificationRequired,
    ReferralCodeRequired,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteResult {
    pub site_url: String,
    pub site_id: String,
    pub run_id: String,
    pub status: SiteStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub actions_taken: u32,
    pub wallets: Vec<WalletEntry>,
    pub screenshots: Vec<String>,
    pub llm_calls: u32,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub metrics: AgentMetrics,
    pub error_message: Option<String>,
    pub notes: Option<String>,
    pub skip_reason: Option<String>,
}

impl SiteResult {
    pub fn new(site_url: impl Into<String>, site_id: impl Into<String>, run_id: impl Into<String>) -> Self {
        SiteResult {
            site_url: site_url.into(),
            site_id: site_id.into(),
            run_id: run_id.into(),
            status: SiteStatus::InProgress,
            started_at: Utc::now(),
            completed_at: None,
            actions_taken: 0,
            wallets: Vec::new(),
            screenshots: Vec::new(),
            llm_calls: 0,
            input_tokens: 0,
            output_tokens: 0,
            metrics: AgentMetrics::default(),
            error_message: None,
            notes: None,
            skip_reason: None,
        }
    }
}
