//! Playbook data model. A playbook is a deterministic step sequence matched
//! to a site pattern and agent state, grounded on
//! `examples/original_source/src/ssi/playbook/executor.py`'s
//! `Playbook`/`PlaybookStep`/`PlaybookResult` shapes (the filtered original
//! only carried `executor.py`, not its `models.py`, so these are
//! reconstructed from how the executor consumes them).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybookStepType {
    Click,
    Type,
    Select,
    Navigate,
    Wait,
    Scroll,
    Extract,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybookStep {
    pub action: PlaybookStepType,
    pub selector: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub retry_on_failure: u32,
    #[serde(default)]
    pub fallback_to_llm: bool,
}

/// A deterministic step sequence for a known site pattern. `site_pattern` is
/// matched against the investigated URL as a substring; `state` restricts
/// the playbook to a single agent state, mirroring how the cascade's
/// DOM-inspectable/text-only state lists are scoped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Playbook {
    pub playbook_id: String,
    pub site_pattern: String,
    pub state: String,
    pub steps: Vec<PlaybookStep>,
    pub max_duration_sec: u64,
    #[serde(default)]
    pub fallback_to_llm: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybookStepResult {
    pub step_index: usize,
    pub action: PlaybookStepType,
    pub selector: String,
    pub value: String,
    pub success: bool,
    pub attempts: u32,
    #[serde(default)]
    pub error: String,
    pub duration_sec: f64,
}

/// A wallet address observed during an `Extract` step, carried back so the
/// caller can fold it into the investigation's wallet list the same way
/// `AgentController::try_opportunistic_wallet_extraction` does.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedWallet {
    pub address: String,
    pub pattern_name: String,
    pub symbol: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybookResult {
    pub playbook_id: String,
    pub url: String,
    pub success: bool,
    pub total_steps: usize,
    pub completed_steps: usize,
    pub step_results: Vec<PlaybookStepResult>,
    pub fell_back_to_llm: bool,
    #[serde(default)]
    pub fallback_reason: String,
    #[serde(default)]
    pub error: String,
    pub duration_sec: f64,
    #[serde(default)]
    pub extracted_wallets: Vec<ExtractedWallet>,
}

impl PlaybookResult {
    pub fn new(playbook_id: impl Into<String>, url: impl Into<String>, total_steps: usize) -> Self {
        PlaybookResult {
            playbook_id: playbook_id.into(),
            url: url.into(),
            success: false,
            total_steps,
            completed_steps: 0,
            step_results: Vec::new(),
            fell_back_to_llm: false,
            fallback_reason: String::new(),
            error: String::new(),
            duration_sec: 0.0,
            extracted_wallets: Vec::new(),
        }
    }
}
