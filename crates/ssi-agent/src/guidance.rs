//! Human-in-the-loop guidance channel: requested when the agent gets stuck
//! or hits a state (referral code, CAPTCHA) it cannot resolve alone.
//! Grounded on the controller's `GuidanceHandler`/`EventCallback` protocols
//! and `AutoSkipGuidance` default.

use async_trait::async_trait;

/// The operator action chosen in response to a guidance request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HumanAction {
    Skip,
    Click,
    Type,
    Goto,
    Continue,
}

/// A suggestion surfaced to the operator alongside the screenshot — e.g.
/// "Skip site" or "I have a referral code".
#[derive(Debug, Clone)]
pub struct SuggestedAction {
    pub label: String,
    pub action: HumanAction,
    pub value: String,
    pub description: String,
}

/// The operator's decision, returned by a [`GuidanceHandler`].
#[derive(Debug, Clone)]
pub struct GuidanceResponse {
    pub action: HumanAction,
    pub value: String,
    pub reason: String,
}

/// Everything the controller can hand an operator to help them decide.
#[derive(Debug, Clone)]
pub struct GuidanceRequest {
    pub site_url: String,
    pub state: String,
    pub actions_taken: u32,
    pub threshold: u32,
    pub screenshot_b64: String,
    pub page_text_snippet: String,
    pub suggested_actions: Vec<SuggestedAction>,
    pub current_url: String,
}

#[async_trait]
pub trait GuidanceHandler: Send + Sync {
    async fn request_guidance(&self, request: GuidanceRequest) -> GuidanceResponse;
}

/// Progress/telemetry sink for a running investigation — state transitions,
/// actions taken, screenshots captured. Defined here rather than depending
/// on the event-bus crate directly, so that crate can provide a bridging
/// implementation without `ssi-agent` depending on it.
#[async_trait]
pub trait AgentEventSink: Send + Sync {
    async fn on_event(&self, event_type: &str, data: serde_json::Value);
}

/// Default sink for unattended runs or tests: discards every event.
#[derive(Debug, Default)]
pub struct NullEventSink;

#[async_trait]
impl AgentEventSink for NullEventSink {
    async fn on_event(&self, _event_type: &str, _data: serde_json::Value) {}
}

/// Default handler for unattended runs: always skips the site rather than
/// blocking indefinitely on an operator who isn't there.
#[derive(Debug, Default)]
pub struct AutoSkipGuidance;

#[async_trait]
impl GuidanceHandler for AutoSkipGuidance {
    async fn request_guidance(&self, request: GuidanceRequest) -> GuidanceResponse {
        GuidanceResponse {
            action: HumanAction::Skip,
            value: String::new(),
            reason: format!(
                "Auto-skip: stuck in {} after {} actions (threshold {})",
                request.state, request.actions_taken, request.threshold
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn auto_skip_always_skips() {
        let handler = AutoSkipGuidance;
        let response = handler
            .request_guidance(GuidanceRequest {
                site_url: "https://scam.example".to_string(),
                state: "FIND_REGISTER".to_string(),
                actions_taken: 15,
                threshold: 15,
                screenshot_b64: String::new(),
                page_text_snippet: String::new(),
                suggested_actions: vec![],
                current_url: "https://scam.example".to_string(),
            })
            .await;
        assert_eq!(response.action, HumanAction::Skip);
    }
}
