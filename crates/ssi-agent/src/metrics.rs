//! Per-site metrics collection: LLM token usage by state, screenshot bytes,
//! wasted-action counts, and click/type strategy outcomes. Rolled up into
//! [`ssi_common::AgentMetrics`] at the end of a run.

use std::collections::HashMap;

use ssi_common::AgentMetrics;

#[derive(Debug, Default)]
pub struct MetricsCollector {
    total_steps: u32,
    total_input_tokens: u64,
    total_output_tokens: u64,
    total_latency_ms: u64,
    wasted_actions: Vec<(String, String, String)>,
    click_outcomes: HashMap<&'static str, (u32, u32)>,
    overlay_dismissals: u32,
    termination_reason: String,
}

impl MetricsCollector {
    pub fn new() -> Self {
        MetricsCollector::default()
    }

    pub fn record_llm_call(&mut self, state: &str, input_tokens: u32, output_tokens: u32, action_type: &str) {
        self.total_steps += 1;
        self.total_input_tokens += input_tokens as u64;
        self.total_output_tokens += output_tokens as u64;
        tracing::debug!(state, input_tokens, output_tokens, action_type, "llm call recorded");
    }

    pub fn record_screenshot(&mut self, state: &str, size_bytes: usize) {
        tracing::trace!(state, size_bytes, "screenshot recorded");
    }

    pub fn record_wasted_action(&mut self, state: &str, kind: &str, detail: &str) {
        self.wasted_actions.push((state.to_string(), kind.to_string(), detail.to_string()));
    }

    pub fn record_click(&mut self, strategy: &'static str, success: bool) {
        let entry = self.click_outcomes.entry(strategy).or_insert((0, 0));
        if success {
            entry.0 += 1;
        } else {
            entry.1 += 1;
        }
    }

    pub fn record_overlay_dismissal(&mut self, count: u32) {
        self.overlay_dismissals += count;
    }

    pub fn record_latency(&mut self, ms: u64) {
        self.total_latency_ms += ms;
    }

    pub fn set_termination_reason(&mut self, reason: impl Into<String>) {
        self.termination_reason = reason.into();
    }

    pub fn wasted_action_count(&self) -> usize {
        self.wasted_actions.len()
    }

    pub fn summary(&self) -> AgentMetrics {
        AgentMetrics {
            total_steps: self.total_steps,
            total_input_tokens: self.total_input_tokens,
            total_output_tokens: self.total_output_tokens,
            total_latency_ms: self.total_latency_ms,
            termination_reason: self.termination_reason.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_rolls_up_llm_calls() {
        let mut metrics = MetricsCollector::new();
        metrics.record_llm_call("FIND_REGISTER", 100, 40, "click");
        metrics.record_llm_call("FILL_REGISTER", 200, 60, "type");
        let summary = metrics.summary();
        assert_eq!(summary.total_steps, 2);
        assert_eq!(summary.total_input_tokens, 300);
        assert_eq!(summary.total_output_tokens, 100);
    }

    #[test]
    fn wasted_actions_tracked_separately_from_steps() {
        let mut metrics = MetricsCollector::new();
        metrics.record_wasted_action("NAVIGATE_DEPOSIT", "blank_page", "text=0 img=100");
        assert_eq!(metrics.wasted_action_count(), 1);
        assert_eq!(metrics.summary().total_steps, 0);
    }
}
