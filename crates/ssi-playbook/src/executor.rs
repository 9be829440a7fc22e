//! Executes a playbook's steps sequentially against the browser. Grounded
//! on `executor.py::PlaybookExecutor` — per-step retry with progressive
//! backoff, a wall-clock time budget, and LLM fallback on step or
//! time-budget failure.

use std::time::{Duration, Instant};

use ssi_browser::BrowserSession;

use crate::models::{ExtractedWallet, Playbook, PlaybookResult, PlaybookStep, PlaybookStepResult, PlaybookStepType};
use crate::template::resolve_template;

pub struct PlaybookExecutor<'a> {
    session: &'a BrowserSession,
    identity: &'a serde_json::Value,
}

impl<'a> PlaybookExecutor<'a> {
    pub fn new(session: &'a BrowserSession, identity: &'a serde_json::Value) -> Self {
        PlaybookExecutor { session, identity }
    }

    pub async fn execute(&self, playbook: &Playbook, url: &str) -> PlaybookResult {
        let mut result = PlaybookResult::new(playbook.playbook_id.clone(), url.to_string(), playbook.steps.len());
        let start = Instant::now();
        let deadline = start + Duration::from_secs(playbook.max_duration_sec);

        let mut all_succeeded = true;
        for (idx, step) in playbook.steps.iter().enumerate() {
            if Instant::now() >= deadline {
                result.error = format!(
                    "time budget exceeded at step {}/{} after {:.1}s (budget: {}s)",
                    idx + 1,
                    playbook.steps.len(),
                    start.elapsed().as_secs_f64(),
                    playbook.max_duration_sec
                );
                tracing::warn!(playbook_id = %playbook.playbook_id, "{}", result.error);
                if playbook.fallback_to_llm {
                    result.fell_back_to_llm = true;
                    result.fallback_reason = "time budget exceeded".to_string();
                }
                all_succeeded = false;
                break;
            }

            let selector = resolve_template(&step.selector, self.identity);
            let value = resolve_template(&step.value, self.identity);

            let (step_result, extracted) = self.execute_step(idx, step, &selector, &value).await;
            let success = step_result.success;
            result.step_results.push(step_result);
            result.extracted_wallets.extend(extracted);

            if success {
                result.completed_steps += 1;
                continue;
            }

            all_succeeded = false;
            tracing::warn!(
                playbook_id = %playbook.playbook_id,
                step = idx + 1,
                total = playbook.steps.len(),
                action = ?step.action,
                "playbook step failed"
            );

            if step.fallback_to_llm {
                result.fell_back_to_llm = true;
                result.fallback_reason = format!("step {} ({:?} {}) failed", idx + 1, step.action, selector);
            } else {
                result.error = format!("step {} failed without fallback: {:?} {}", idx + 1, step.action, selector);
            }
            break;
        }

        result.success = all_succeeded;
        result.duration_sec = start.elapsed().as_secs_f64();
        tracing::info!(
            playbook_id = %playbook.playbook_id,
            success = result.success,
            completed = result.completed_steps,
            total = result.total_steps,
            fell_back_to_llm = result.fell_back_to_llm,
            "playbook finished"
        );
        result
    }

    async fn execute_step(&self, index: usize, step: &PlaybookStep, selector: &str, value: &str) -> (PlaybookStepResult, Vec<ExtractedWallet>) {
        let max_attempts = 1 + step.retry_on_failure;
        let step_start = Instant::now();
        let mut last_error = String::new();

        for attempt in 1..=max_attempts {
            match self.dispatch_action(step.action, selector, value).await {
                Ok((true, extracted)) => {
                    let step_result = PlaybookStepResult {
                        step_index: index,
                        action: step.action,
                        selector: selector.to_string(),
                        value: redact(value, step.action),
                        success: true,
                        attempts: attempt,
                        error: String::new(),
                        duration_sec: step_start.elapsed().as_secs_f64(),
                    };
                    return (step_result, extracted);
                }
                Ok((false, _)) => last_error = format!("{:?} returned false", step.action),
                Err(e) => last_error = e,
            }

            if attempt < max_attempts {
                tokio::time::sleep(Duration::from_secs(attempt.min(3) as u64)).await;
            }
        }

        let step_result = PlaybookStepResult {
            step_index: index,
            action: step.action,
            selector: selector.to_string(),
            value: redact(value, step.action),
            success: false,
            attempts: max_attempts,
            error: last_error,
            duration_sec: step_start.elapsed().as_secs_f64(),
        };
        (step_result, Vec::new())
    }

    async fn dispatch_action(&self, action: PlaybookStepType, selector: &str, value: &str) -> Result<(bool, Vec<ExtractedWallet>), String> {
        match action {
            PlaybookStepType::Click => Ok((self.session.click(selector, "").await.success, Vec::new())),
            PlaybookStepType::Type => Ok((self.session.type_text(selector, value).await.success, Vec::new())),
            PlaybookStepType::Select => Ok((self.session.select_option(selector, value).await, Vec::new())),
            PlaybookStepType::Navigate => Ok((self.session.navigate(value).await.is_ok(), Vec::new())),
            PlaybookStepType::Wait => {
                let seconds: f64 = value.parse().unwrap_or(2.0);
                self.session.wait(seconds.min(10.0)).await;
                Ok((true, Vec::new()))
            }
            PlaybookStepType::Scroll => {
                let pixels: i64 = value.parse().unwrap_or(500);
                self.session.scroll_down(pixels).await;
                Ok((true, Vec::new()))
            }
            PlaybookStepType::Extract => {
                let page_text = self.session.page_text().await.unwrap_or_default();
                let matches = ssi_wallet::scan_text(&page_text)
                    .into_iter()
                    .map(|m| ExtractedWallet { address: m.address, pattern_name: m.pattern_name.to_string(), symbol: m.symbol.to_string() })
                    .collect();
                Ok((true, matches))
            }
        }
    }
}

/// Masks typed values longer than 4 characters, matching the original's
/// heuristic for keeping passwords/PII out of step-result logs.
fn redact(value: &str, action: PlaybookStepType) -> String {
    if value.is_empty() {
        return value.to_string();
    }
    if action == PlaybookStepType::Type && value.len() > 4 {
        return format!("{}***{}", &value[..2], &value[value.len() - 2..]);
    }
    value.to_string()
}
