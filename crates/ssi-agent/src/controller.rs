//! Agent controller (C10): drives one site to completion as a state
//! machine. Generalizes the controller's 16-step main loop into the
//! enum + match idiom, composing the decision cascade, page analyzer, and
//! browser driver crates rather than owning their logic itself.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use serde_json::json;
use ssi_browser::dom_inspector::DomInspector;
use ssi_browser::stealth::BrowserProfile;
use ssi_browser::{scan, BrowserSession};
use ssi_cascade::{check_pre_filters, resolve_tier, CascadeTier, PreFilterInput, PreFilterOutcome, ResolveTierInput};
use ssi_common::config::Settings;
use ssi_common::{ActionType, AgentAction, WalletEntry, WalletSource};

use crate::guidance::{AgentEventSink, GuidanceHandler, GuidanceRequest, HumanAction, SuggestedAction};
use crate::identity::{IdentityProfile, IdentityVault};
use crate::metrics::MetricsCollector;
use crate::result::{SiteResult, SiteStatus};
use crate::screenshots::ScreenshotStore;
use crate::state::{AgentState, MILESTONE_SCREENSHOT_STATES};

/// Mutable per-site bookkeeping that doesn't belong on [`SiteResult`] itself.
/// Reset at the start of every [`AgentController::process_site`] call.
struct RunState {
    agent_state: AgentState,
    actions_in_state: u32,
    total_actions: u32,
    last_actions: Vec<String>,
    identity: Option<IdentityProfile>,
    consecutive_noop_scrolls: u32,
    type_mismatches: Vec<String>,
    blank_page_retries: u32,
    last_screenshot_hash: String,
    consecutive_dupes: u32,
    js_wallets_found: bool,
    last_password_used: String,
    skip_dom_direct: bool,
    human_instruction: String,
    state_entered_at: Instant,
}

impl RunState {
    fn new() -> Self {
        RunState {
            agent_state: AgentState::LoadSite,
            actions_in_state: 0,
            total_actions: 0,
            last_actions: Vec::new(),
            identity: None,
            consecutive_noop_scrolls: 0,
            type_mismatches: Vec::new(),
            blank_page_retries: 0,
            last_screenshot_hash: String::new(),
            consecutive_dupes: 0,
            js_wallets_found: false,
            last_password_used: String::new(),
            skip_dom_direct: false,
            human_instruction: String::new(),
            state_entered_at: Instant::now(),
        }
    }

    fn transition(&mut self, next: AgentState) {
        tracing::info!(from = self.agent_state.as_str(), to = next.as_str(), "state transition");
        self.agent_state = next;
        self.actions_in_state = 0;
        self.state_entered_at = Instant::now();
    }

    /// Records an action signature and reports whether the last N actions
    /// (the configured repeat window) are all identical.
    fn note_action_and_check_repeat(&mut self, signature: String, window: usize) -> bool {
        self.last_actions.push(signature);
        if self.last_actions.len() > window {
            let drop = self.last_actions.len() - window;
            self.last_actions.drain(0..drop);
        }
        self.last_actions.len() >= window && self.last_actions.iter().collect::<std::collections::HashSet<_>>().len() == 1
    }
}

pub struct AgentController {
    run_id: String,
    output_dir: PathBuf,
    webdriver_url: String,
    profile: BrowserProfile,
    settings: Arc<Settings>,
    guidance: Arc<dyn GuidanceHandler>,
    events: Arc<dyn AgentEventSink>,
    identity_vault: IdentityVault,
    playbooks: Vec<ssi_playbook::Playbook>,
}

impl AgentController {
    pub fn new(
        run_id: impl Into<String>,
        output_dir: PathBuf,
        webdriver_url: impl Into<String>,
        profile: BrowserProfile,
        settings: Arc<Settings>,
        guidance: Arc<dyn GuidanceHandler>,
        events: Arc<dyn AgentEventSink>,
    ) -> Self {
        AgentController {
            run_id: run_id.into(),
            output_dir,
            webdriver_url: webdriver_url.into(),
            profile,
            settings,
            guidance,
            events,
            identity_vault: IdentityVault::new(),
            playbooks: ssi_playbook::builtin_playbooks(),
        }
    }

    async fn emit(&self, event_type: &str, data: serde_json::Value) {
        self.events.on_event(event_type, data).await;
    }

    /// Processes a single scam site end-to-end: launches a browser session,
    /// drives the funnel state machine, and returns the outcome regardless
    /// of how it ended.
    pub async fn process_site(
        &self,
        url: &str,
        site_id: &str,
        analyzer: &mut ssi_analyzer::PageAnalyzer,
    ) -> SiteResult {
        let agent_cfg = &self.settings.agent;
        let mut result = SiteResult::new(url, site_id, self.run_id.clone());
        let mut screenshots = ScreenshotStore::new(&self.output_dir, site_id, &self.run_id);
        let mut metrics = MetricsCollector::new();
        let mut run = RunState::new();

        analyzer.reset_conversation();

        self.emit("site_started", json!({"url": url, "site_id": site_id, "run_id": self.run_id})).await;

        let session = match BrowserSession::launch(&self.webdriver_url, self.settings.browser.headless, &self.profile).await
        {
            Ok(s) => s,
            Err(e) => {
                result.status = SiteStatus::Error;
                result.error_message = Some(format!("browser session failed to start: {e}"));
                result.completed_at = Some(chrono::Utc::now());
                return result;
            }
        };

        while !run.agent_state.is_terminal() {
            if run.total_actions >= agent_cfg.max_actions_per_site {
                tracing::warn!(url, max = agent_cfg.max_actions_per_site, "max actions reached");
                result.status = SiteStatus::NeedsManualReview;
                result.error_message = Some(format!("Exceeded max actions ({})", agent_cfg.max_actions_per_site));
                break;
            }

            match self.step(url, &session, &mut run, &mut result, &mut screenshots, &mut metrics, analyzer).await {
                Ok(()) => {}
                Err(e) => {
                    tracing::error!(url, error = %e, "unhandled error processing site");
                    result.status = SiteStatus::Error;
                    result.error_message = Some(e);
                    if let Ok(ss) = session.screenshot_base64_full_res().await {
                        screenshots.capture_error(&ss).await;
                    }
                    break;
                }
            }
            run.total_actions += 1;
            result.actions_taken = run.total_actions;
        }

        let _ = session.close().await;
        result.screenshots = screenshots.paths;
        if matches!(result.status, SiteStatus::InProgress) {
            tracing::warn!(url, "site ended in_progress — marking needs_manual_review");
            result.status = SiteStatus::NeedsManualReview;
        } else if matches!(run.agent_state, AgentState::Complete) && matches!(result.status, SiteStatus::InProgress) {
            result.status = SiteStatus::Completed;
        }
        result.completed_at = Some(chrono::Utc::now());

        result.llm_calls = analyzer.usage.api_calls;
        result.input_tokens = analyzer.usage.input_tokens;
        result.output_tokens = analyzer.usage.output_tokens;
        result.metrics = metrics.summary();

        self.emit(
            "site_completed",
            json!({
                "url": url,
                "site_id": site_id,
                "status": format!("{:?}", result.status),
                "wallets": result.wallets.len(),
                "actions": result.actions_taken,
            }),
        )
        .await;

        result
    }

    /// One iteration of the main loop. Returns `Err` on an unrecoverable
    /// browser/LLM error; all expected control flow (stuck, blank page,
    /// transitions) is handled internally.
    #[allow(clippy::too_many_arguments)]
    async fn step(
        &self,
        url: &str,
        session: &BrowserSession,
        run: &mut RunState,
        result: &mut SiteResult,
        screenshots: &mut ScreenshotStore,
        metrics: &mut MetricsCollector,
        analyzer: &mut ssi_analyzer::PageAnalyzer,
    ) -> Result<(), String> {
        let agent_cfg = &self.settings.agent;

        if run.actions_in_state >= agent_cfg.stuck_threshold_for(run.agent_state.as_str()) {
            self.handle_stuck(url, session, run, result, screenshots).await;
            run.actions_in_state = 0;
            run.skip_dom_direct = true;
            return Ok(());
        }

        if run.agent_state == AgentState::LoadSite {
            session.navigate(url).await.map_err(|e| format!("failed to load site: {e}"))?;
            if agent_cfg.overlay_dismiss_enabled {
                let removed = session.dismiss_overlays().await;
                if removed > 0 {
                    metrics.record_overlay_dismissal(removed);
                }
            }
            if let Ok(ss) = session.screenshot_base64_full_res().await {
                screenshots.capture_milestone(&ss, "initial_load").await;
            }
            run.transition(AgentState::FindRegister);
            return Ok(());
        }

        let screenshot_b64 = session.screenshot_base64().await.map_err(|e| e.to_string())?;
        let page_text = session.page_text().await.unwrap_or_default();
        let page_url = session.current_url().await.unwrap_or_else(|_| url.to_string());
        let screenshot_bytes = screenshot_b64.len() * 3 / 4;
        let screenshot_hash = format!("{:x}", md5::compute(screenshot_b64.as_bytes()));

        match check_pre_filters(PreFilterInput {
            page_text: &page_text,
            screenshot_size_bytes: screenshot_bytes,
            screenshot_hash: &screenshot_hash,
            last_screenshot_hash: &run.last_screenshot_hash,
        }) {
            PreFilterOutcome::BlankPage => {
                run.blank_page_retries += 1;
                metrics.record_wasted_action(
                    run.agent_state.as_str(),
                    "blank_page",
                    &format!("text={} img={}", page_text.trim().len(), screenshot_bytes),
                );

                if run.agent_state == AgentState::NavigateDeposit && run.blank_page_retries >= 2 {
                    result.status = SiteStatus::BrokenDepositPage;
                    result.notes = Some("Deposit page blank/broken after multiple retries".to_string());
                    run.transition(AgentState::Skipped);
                    return Ok(());
                }

                if run.blank_page_retries <= agent_cfg.blank_page_max_retries_for(run.agent_state.as_str()) {
                    let wait_secs = (2.0 + run.blank_page_retries as f64).min(5.0);
                    session.wait(wait_secs).await;
                    run.actions_in_state += 1;
                }
                return Ok(());
            }
            PreFilterOutcome::DuplicateScreenshot => {
                run.consecutive_dupes += 1;
                metrics.record_wasted_action(run.agent_state.as_str(), "duplicate_screenshot", &screenshot_hash[..12.min(screenshot_hash.len())]);
                if run.consecutive_dupes >= 5 {
                    run.actions_in_state = agent_cfg.stuck_threshold_for(run.agent_state.as_str());
                } else {
                    session.wait(2.0).await;
                    run.actions_in_state += 1;
                }
                return Ok(());
            }
            PreFilterOutcome::Proceed => {
                run.blank_page_retries = 0;
                run.last_screenshot_hash = screenshot_hash;
                run.consecutive_dupes = 0;
            }
        }

        let mut extra_context = self.build_state_context(run);

        if run.consecutive_noop_scrolls >= 2 {
            extra_context.push_str(
                "\n\nIMPORTANT: The page cannot scroll further. Try a different approach \
                (click a link, navigate, or signal 'done' if you have all the info).",
            );
        }

        let dom_errors = session.get_visible_errors().await;
        if !dom_errors.is_empty() {
            let lines: String = dom_errors.iter().map(|e| format!("- \"{e}\"\n")).collect();
            extra_context.push_str(&format!(
                "\n\nFORM ERRORS DETECTED ON PAGE:\n{lines}Act on these errors before trying to submit again."
            ));
        }

        if !run.type_mismatches.is_empty() {
            let lines: String = run.type_mismatches.iter().map(|m| format!("- {m}\n")).collect();
            extra_context.push_str(&format!(
                "\n\nTYPE VERIFICATION WARNINGS:\n{lines}These fields may not have accepted the typed value."
            ));
        }

        if !run.human_instruction.is_empty() {
            extra_context.push_str(&format!(
                "\n\nHUMAN OPERATOR INSTRUCTION: {}\nFollow this instruction from the human operator.",
                run.human_instruction
            ));
            run.human_instruction.clear();
        }

        self.emit("screenshot_update", json!({"screenshot_b64_len": screenshot_b64.len()})).await;

        if run.actions_in_state == 0 && MILESTONE_SCREENSHOT_STATES.contains(&run.agent_state) {
            if let Ok(milestone_ss) = session.screenshot_base64_full_res().await {
                screenshots.capture_milestone(&milestone_ss, &run.agent_state.as_str().to_lowercase()).await;
            }
        }

        let matched_playbook = ssi_playbook::match_playbook(&self.playbooks, run.agent_state.as_str(), &page_url);

        // DOM inspection tier — skipped when a playbook already matches, since
        // the playbook preempts it anyway.
        let dom_inspection = if matched_playbook.is_some() || run.skip_dom_direct {
            run.skip_dom_direct = false;
            None
        } else if agent_cfg.dom_inspection_enabled {
            match scan::run_dom_scan(session.inner(), run.agent_state.as_str()).await {
                Ok(Some(scan_data)) => {
                    let inspector = DomInspector::new(agent_cfg.dom_direct_threshold, agent_cfg.dom_assisted_threshold);
                    Some(inspector.inspect(run.agent_state.as_str(), &scan_data, 0.0))
                }
                _ => None,
            }
        } else {
            None
        };

        let decision = resolve_tier(ResolveTierInput {
            state: run.agent_state.as_str(),
            dom_inspection: dom_inspection.as_ref(),
            dom_inspection_enabled: agent_cfg.dom_inspection_enabled,
            actions_in_state: run.actions_in_state,
            js_wallets_found: run.js_wallets_found,
            is_stuck: false,
            playbook_matched: matched_playbook.is_some(),
        });

        if decision.tier == CascadeTier::Playbook {
            if let Some(playbook) = matched_playbook {
                self.run_playbook(playbook, url, session, run, result).await;
                return Ok(());
            }
        }

        if decision.tier == CascadeTier::DomDirect {
            if let Some(inspection) = &dom_inspection {
                if let Some(action) = inspection.direct_action.clone() {
                    self.record_and_maybe_force_stuck(run, agent_cfg.last_actions_window as usize, agent_cfg.stuck_threshold_for(run.agent_state.as_str()), &action);
                    self.emit(
                        "action_executed",
                        json!({"action": format!("{:?}", action.action), "selector": action.selector, "value": action.value}),
                    )
                    .await;
                    self.execute_action(&action, url, session, run, result, screenshots, metrics).await;
                    return Ok(());
                }
            }
        }
        if !decision.extra_context.is_empty() {
            extra_context.push_str("\n\n");
            extra_context.push_str(&decision.extra_context);
        }

        // Opportunistic JS wallet extraction ahead of the first EXTRACT_WALLETS LLM call.
        if run.agent_state == AgentState::ExtractWallets && run.actions_in_state == 0 {
            let found = self.try_opportunistic_wallet_extraction(url, &page_text, result);
            if !found.is_empty() {
                run.js_wallets_found = true;
                let summary: Vec<String> =
                    found.iter().map(|w| format!("{} ({}...)", w.token_symbol, &w.wallet_address[..12.min(w.wallet_address.len())])).collect();
                extra_context.push_str(&format!(
                    "\n\nJS PRE-EXTRACTION found {} wallet addresses: {}. \
                    IMPORTANT: re-list ALL wallet addresses in your 'done' response with complete data.",
                    found.len(),
                    summary.join(", ")
                ));
            }
        }

        if run.agent_state == AgentState::FillRegister && run.actions_in_state == 0 {
            let actions = analyzer
                .analyze_page_batch(&screenshot_b64, run.agent_state.as_str(), &page_text, &page_url, &extra_context)
                .await;
            run.actions_in_state += 1;
            for action in actions {
                self.execute_action(&action, url, session, run, result, screenshots, metrics).await;
            }
            return Ok(());
        }

        let include_screenshot = decision.tier != CascadeTier::TextOnlyLlm;
        let action = analyzer
            .analyze_page(&screenshot_b64, run.agent_state.as_str(), &page_text, &page_url, &extra_context, include_screenshot)
            .await;

        if let Some(last) = &analyzer.last_call_result {
            metrics.record_llm_call(run.agent_state.as_str(), last.input_tokens, last.output_tokens, &format!("{:?}", action.action));
        }
        metrics.record_screenshot(run.agent_state.as_str(), screenshot_bytes);
        if matches!(action.action, ActionType::Wait | ActionType::Stuck) {
            metrics.record_wasted_action(run.agent_state.as_str(), &format!("{:?}", action.action), &action.reasoning);
        }

        run.actions_in_state += 1;
        self.emit(
            "action_executed",
            json!({"action": format!("{:?}", action.action), "selector": action.selector, "value": action.value, "reasoning": action.reasoning}),
        )
        .await;

        if self.record_and_maybe_force_stuck(run, agent_cfg.last_actions_window as usize, agent_cfg.stuck_threshold_for(run.agent_state.as_str()), &action) {
            return Ok(());
        }

        self.execute_action(&action, url, session, run, result, screenshots, metrics).await;
        Ok(())
    }

    fn record_and_maybe_force_stuck(&self, run: &mut RunState, window: usize, threshold: u32, action: &AgentAction) -> bool {
        let signature = format!("{:?}:{}:{}", action.action, action.selector, action.value);
        if run.note_action_and_check_repeat(signature, window) {
            tracing::warn!(state = run.agent_state.as_str(), "repeated actions detected — forcing stuck");
            run.actions_in_state = threshold;
            true
        } else {
            false
        }
    }

    fn build_state_context(&self, run: &mut RunState) -> String {
        let mut parts = String::new();

        if matches!(run.agent_state, AgentState::FillRegister | AgentState::SubmitRegister) {
            if run.identity.is_none() {
                run.identity = Some(self.identity_vault.generate());
            }
            if let Some(identity) = &run.identity {
                let include_variants = !(run.agent_state == AgentState::SubmitRegister && !run.last_password_used.is_empty());
                parts.push_str("Use this identity to fill the registration form:\n");
                parts.push_str(&identity.to_prompt_json(include_variants));
                parts.push_str(
                    "\n\nPASSWORD SELECTION — read each field's placeholder text:\n\
                    - Default: use 'default' variant when no specific format is indicated\n\
                    - Placeholder says digits only or N digits -> use digits_8 or digits_12\n\
                    - Placeholder says a max length -> use simple_10\n\
                    Use the SAME password for password + confirm password pairs.",
                );
            }

            if run.agent_state == AgentState::FillRegister {
                parts.push_str(
                    "\n\nWORKFLOW: Type directly into visible fields. Fill what you can see, then signal 'done'. \
                    If a referral/invitation code is REQUIRED, respond with action 'stuck' and mention 'referral code'.",
                );
            }

            if run.agent_state == AgentState::SubmitRegister && !run.last_password_used.is_empty() {
                parts.push_str(&format!(
                    "\n\nPASSWORD FOR THIS REGISTRATION: {}\nUse this EXACT password for login password and confirm field.",
                    run.last_password_used
                ));
            }
        }

        if run.agent_state == AgentState::ExtractWallets {
            parts.push_str(
                "Extract ALL cryptocurrency wallet addresses visible on this page. \
                If there are tabs/buttons for different cryptos, click each to reveal its address. \
                When done, use action 'done' with wallet data as JSON in 'value'.",
            );
        }

        parts
    }

    /// Runs a matched playbook to completion, folding any extracted wallets
    /// into `result` and advancing `run` the same way `handle_done` would for
    /// an LLM-driven pass through this state. Falls back to the normal
    /// cascade on the next `step()` call when the playbook doesn't fully
    /// succeed, by simply not transitioning state.
    async fn run_playbook(&self, playbook: &ssi_playbook::Playbook, url: &str, session: &BrowserSession, run: &mut RunState, result: &mut SiteResult) {
        if run.identity.is_none() {
            run.identity = Some(self.identity_vault.generate());
        }
        let identity_value = run.identity.as_ref().and_then(|id| serde_json::to_value(id).ok()).unwrap_or(serde_json::Value::Null);

        self.emit("playbook_matched", json!({"playbook_id": playbook.playbook_id, "state": run.agent_state.as_str()})).await;

        let executor = ssi_playbook::PlaybookExecutor::new(session, &identity_value);
        let pb_result = executor.execute(playbook, url).await;

        for wallet in &pb_result.extracted_wallets {
            if result.wallets.iter().any(|w| w.wallet_address == wallet.address) {
                continue;
            }
            if let Ok(entry) = WalletEntry::new(
                url,
                wallet.pattern_name.as_str(),
                wallet.symbol.as_str(),
                wallet.pattern_name.as_str(),
                wallet.symbol.as_str(),
                wallet.address.as_str(),
                WalletSource::Regex,
                0.9,
            ) {
                result.wallets.push(entry);
            }
        }

        self.emit(
            "playbook_completed",
            json!({
                "playbook_id": pb_result.playbook_id,
                "success": pb_result.success,
                "completed_steps": pb_result.completed_steps,
                "total_steps": pb_result.total_steps,
                "fell_back_to_llm": pb_result.fell_back_to_llm,
            }),
        )
        .await;

        run.actions_in_state += 1;

        if pb_result.success {
            let next = run.agent_state.next_on_done();
            run.transition(next);
        } else if pb_result.fell_back_to_llm {
            // Leave state/actions_in_state as-is so the next step() call
            // routes through DOM inspection and the LLM cascade normally —
            // match_playbook would only re-fire if the site/state still
            // matches, and a failed run already advanced actions_in_state
            // towards the stuck threshold.
            run.skip_dom_direct = true;
        }
    }

    fn try_opportunistic_wallet_extraction(&self, url: &str, page_text: &str, result: &mut SiteResult) -> Vec<WalletEntry> {
        let mut found = Vec::new();
        for m in ssi_wallet::scan_text(page_text) {
            if result.wallets.iter().any(|w| w.wallet_address == m.address) {
                continue;
            }
            if let Ok(entry) = WalletEntry::new(
                url,
                m.pattern_name,
                m.symbol,
                m.pattern_name,
                m.symbol,
                m.address,
                WalletSource::Opportunistic,
                0.5,
            ) {
                result.wallets.push(entry.clone());
                found.push(entry);
            }
        }
        found
    }

    #[allow(clippy::too_many_arguments)]
    async fn execute_action(
        &self,
        action: &AgentAction,
        url: &str,
        session: &BrowserSession,
        run: &mut RunState,
        result: &mut SiteResult,
        screenshots: &mut ScreenshotStore,
        metrics: &mut MetricsCollector,
    ) {
        match action.action {
            ActionType::Click => {
                let outcome = session.click(&action.selector, &action.reasoning).await;
                metrics.record_click(outcome.strategy, outcome.success);
                if !outcome.success {
                    metrics.record_wasted_action(run.agent_state.as_str(), "failed_click", &action.selector);
                    run.last_screenshot_hash.clear();
                } else {
                    session.wait(2.0).await;
                }
                if run.agent_state == AgentState::SubmitRegister {
                    session.scroll_to_top().await;
                }
            }
            ActionType::Type => {
                let outcome = session.type_text(&action.selector, &action.value).await;
                let selector_lower = action.selector.to_lowercase();
                if outcome.success && selector_lower.contains("password") && !selector_lower.contains("confirm") {
                    run.last_password_used = action.value.clone();
                }
                if !outcome.success {
                    run.last_screenshot_hash.clear();
                } else if outcome.actual != action.value {
                    run.type_mismatches.push(format!(
                        "Field \"{}\" was set to \"{}\" but contains \"{}\" — value may not have been accepted.",
                        action.selector, action.value, outcome.actual
                    ));
                } else {
                    run.type_mismatches.retain(|m| !m.contains(&format!("Field \"{}\"", action.selector)));
                }
            }
            ActionType::Select => {
                if !session.select_option(&action.selector, &action.value).await {
                    run.last_screenshot_hash.clear();
                }
            }
            ActionType::Key => {
                let key = if action.value.is_empty() { &action.selector } else { &action.value };
                if !session.press_key(key).await {
                    run.last_screenshot_hash.clear();
                }
            }
            ActionType::Navigate => {
                if session.navigate(&action.value).await.is_err() {
                    run.last_screenshot_hash.clear();
                }
            }
            ActionType::Scroll => {
                let pixels: i64 = action.value.parse().unwrap_or(500);
                let before = session.get_scroll_position().await;
                session.scroll_down(pixels).await;
                let after = session.get_scroll_position().await;
                if after == before {
                    run.consecutive_noop_scrolls += 1;
                } else {
                    run.consecutive_noop_scrolls = 0;
                }
            }
            ActionType::Wait => {
                let seconds: f64 = action.value.parse().unwrap_or(2.0);
                session.wait(seconds.min(10.0)).await;
            }
            ActionType::Done => {
                self.handle_done(action, url, run, result, screenshots).await;
            }
            ActionType::Stuck => {
                self.handle_stuck_action(action, url, session, run, result, screenshots).await;
            }
        }
    }

    async fn handle_done(
        &self,
        action: &AgentAction,
        url: &str,
        run: &mut RunState,
        result: &mut SiteResult,
        _screenshots: &mut ScreenshotStore,
    ) {
        match run.agent_state {
            AgentState::ExtractWallets => {
                let pre_llm_wallets = if !action.value.is_empty() && !result.wallets.is_empty() {
                    std::mem::take(&mut result.wallets)
                } else {
                    Vec::new()
                };

                if !action.value.is_empty() {
                    if let Ok(parsed) = serde_json::from_str::<serde_json::Value>(&action.value) {
                        let list = match parsed {
                            serde_json::Value::Array(items) => items,
                            serde_json::Value::Object(map) => ["wallets", "data", "addresses"]
                                .iter()
                                .find_map(|key| map.get(*key).and_then(|v| v.as_array()).cloned())
                                .unwrap_or_default(),
                            _ => Vec::new(),
                        };
                        for item in list {
                            let addr = item.get("wallet_address").and_then(|v| v.as_str()).unwrap_or("").trim();
                            if addr.is_empty() {
                                continue;
                            }
                            let token_name = item.get("token_label").and_then(|v| v.as_str()).unwrap_or("");
                            let token_symbol = item.get("token_symbol").and_then(|v| v.as_str()).unwrap_or("");
                            let network = item.get("network_label").and_then(|v| v.as_str()).unwrap_or("");
                            let network_short = item.get("network_short").and_then(|v| v.as_str()).unwrap_or("");
                            let confidence = if network_short.is_empty() { 0.7 } else { 1.0 };
                            if let Ok(entry) = WalletEntry::new(
                                url,
                                token_name,
                                token_symbol,
                                network,
                                network_short,
                                addr,
                                WalletSource::Llm,
                                confidence,
                            ) {
                                result.wallets.push(entry);
                            }
                        }
                    } else {
                        tracing::error!(raw = %action.value, "failed to parse wallet JSON");
                    }
                }

                let llm_addresses: std::collections::HashSet<_> = result.wallets.iter().map(|w| w.wallet_address.clone()).collect();
                for pw in pre_llm_wallets {
                    if !llm_addresses.contains(&pw.wallet_address) {
                        result.wallets.push(pw);
                    }
                }

                if result.wallets.is_empty() {
                    tracing::warn!(url, "EXTRACT_WALLETS completed with zero wallets");
                }
                run.transition(AgentState::Complete);
            }
            AgentState::FindRegister | AgentState::FillRegister => {
                let next = run.agent_state.next_on_done();
                run.transition(next);
            }
            AgentState::SubmitRegister | AgentState::CheckEmailVerification | AgentState::NavigateDeposit => {
                let next = run.agent_state.next_on_done();
                run.transition(next);
            }
            _ => {
                run.transition(AgentState::Complete);
            }
        }
    }

    async fn handle_stuck_action(
        &self,
        action: &AgentAction,
        url: &str,
        session: &BrowserSession,
        run: &mut RunState,
        result: &mut SiteResult,
        screenshots: &mut ScreenshotStore,
    ) {
        let reasoning_lower = action.reasoning.to_lowercase();

        if reasoning_lower.contains("email verification") {
            result.status = SiteStatus::EmailVerificationRequired;
            result.notes = Some(action.reasoning.clone());
            if let Ok(ss) = session.screenshot_base64_full_res().await {
                screenshots.capture_milestone(&ss, "email_verification").await;
            }
            run.transition(AgentState::Skipped);
        } else if reasoning_lower.contains("referral") || reasoning_lower.contains("invitation code") {
            result.notes = Some(action.reasoning.clone());
            let ss = session.screenshot_base64_full_res().await.unwrap_or_default();
            screenshots.capture_milestone(&ss, "referral_code_required").await;

            let suggested = vec![
                SuggestedAction {
                    label: "Skip site".to_string(),
                    action: HumanAction::Skip,
                    value: String::new(),
                    description: "Referral code required".to_string(),
                },
                SuggestedAction {
                    label: "I have a code".to_string(),
                    action: HumanAction::Type,
                    value: String::new(),
                    description: "Type: field_selector|code".to_string(),
                },
            ];
            let current_url = session.current_url().await.unwrap_or_else(|_| url.to_string());
            let guidance = self
                .guidance
                .request_guidance(GuidanceRequest {
                    site_url: url.to_string(),
                    state: run.agent_state.as_str().to_string(),
                    actions_taken: run.actions_in_state,
                    threshold: 0,
                    screenshot_b64: ss,
                    page_text_snippet: format!("REFERRAL CODE NEEDED: {}", action.reasoning),
                    suggested_actions: suggested,
                    current_url,
                })
                .await;

            match guidance.action {
                HumanAction::Skip => {
                    result.status = SiteStatus::ReferralCodeRequired;
                    result.skip_reason = Some(if guidance.reason.is_empty() {
                        "Referral code required".to_string()
                    } else {
                        guidance.reason
                    });
                    run.transition(AgentState::Skipped);
                }
                HumanAction::Type => {
                    if let Some((field, code)) = guidance.value.split_once('|') {
                        let _ = session.type_text(field, code).await;
                    }
                }
                _ => {
                    run.human_instruction = guidance.value;
                }
            }
        } else {
            self.handle_stuck(url, session, run, result, screenshots).await;
            run.actions_in_state = 0;
        }
    }

    async fn handle_stuck(
        &self,
        url: &str,
        session: &BrowserSession,
        run: &mut RunState,
        result: &mut SiteResult,
        screenshots: &mut ScreenshotStore,
    ) {
        let threshold = self.settings.agent.stuck_threshold_for(run.agent_state.as_str());
        let ss = session.screenshot_base64_full_res().await.unwrap_or_default();
        screenshots.capture_stuck(&ss).await;

        let page_text = session.page_text().await.unwrap_or_default();
        let current_url = session.current_url().await.unwrap_or_else(|_| url.to_string());
        let snippet: String = page_text.chars().take(500).collect();

        let guidance = self
            .guidance
            .request_guidance(GuidanceRequest {
                site_url: url.to_string(),
                state: run.agent_state.as_str().to_string(),
                actions_taken: run.actions_in_state,
                threshold,
                screenshot_b64: ss,
                page_text_snippet: snippet,
                suggested_actions: vec![],
                current_url,
            })
            .await;

        match guidance.action {
            HumanAction::Skip => {
                result.status = SiteStatus::Skipped;
                result.skip_reason = Some(guidance.reason);
                run.transition(AgentState::Skipped);
            }
            HumanAction::Goto => {
                let _ = session.navigate(&guidance.value).await;
            }
            HumanAction::Click => {
                let _ = session.click(&guidance.value, "").await;
            }
            HumanAction::Type => {
                if let Some((field, value)) = guidance.value.split_once('|') {
                    let _ = session.type_text(field, value).await;
                }
            }
            HumanAction::Continue => {
                run.human_instruction = guidance.value;
            }
        }
    }
}
