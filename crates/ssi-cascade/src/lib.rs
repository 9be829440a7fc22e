//! Decision cascade (C7): formalizes the agent controller's implicit tiers
//! as named constants and pure routing functions. Grounded verbatim on
//! `original_source/browser/decision_cascade.py` — tier ordering,
//! pre-filter thresholds, and the per-state routing rules are carried
//! unchanged.

use ssi_browser::{DomInspection, Outcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CascadeTier {
    Playbook,
    DomDirect,
    DomAssisted,
    TextOnlyLlm,
    VisionLlm,
    HumanGuidance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreFilterOutcome {
    BlankPage,
    DuplicateScreenshot,
    Proceed,
}

#[derive(Debug, Clone)]
pub struct CascadeDecision {
    pub tier: CascadeTier,
    pub include_screenshot: bool,
    pub extra_context: String,
    pub reason: String,
}

const DOM_INSPECTABLE_STATES: &[&str] = &["FIND_REGISTER", "NAVIGATE_DEPOSIT", "CHECK_EMAIL_VERIFICATION"];
const TEXT_ONLY_STATES: &[&str] = &["CHECK_EMAIL_VERIFICATION"];

const BLANK_PAGE_TEXT_CHARS: usize = 20;
const BLANK_PAGE_SCREENSHOT_BYTES: usize = 5_000;

pub struct PreFilterInput<'a> {
    pub page_text: &'a str,
    pub screenshot_size_bytes: usize,
    pub screenshot_hash: &'a str,
    pub last_screenshot_hash: &'a str,
}

/// Pre-LLM filters that bypass the cascade entirely.
pub fn check_pre_filters(input: PreFilterInput) -> PreFilterOutcome {
    if input.page_text.trim().len() < BLANK_PAGE_TEXT_CHARS && input.screenshot_size_bytes < BLANK_PAGE_SCREENSHOT_BYTES {
        return PreFilterOutcome::BlankPage;
    }

    if !input.screenshot_hash.is_empty() && input.screenshot_hash == input.last_screenshot_hash {
        return PreFilterOutcome::DuplicateScreenshot;
    }

    PreFilterOutcome::Proceed
}

pub struct ResolveTierInput<'a> {
    pub state: &'a str,
    pub dom_inspection: Option<&'a DomInspection>,
    pub dom_inspection_enabled: bool,
    pub actions_in_state: u32,
    pub js_wallets_found: bool,
    pub is_stuck: bool,
    /// Whether a deterministic playbook matches the current state/site. When
    /// `true` (and not stuck), it preempts DOM inspection and the LLM tiers —
    /// a scripted sequence is cheaper and more reliable than either.
    pub playbook_matched: bool,
}

/// Determines which cascade tier should handle the current step. Does not
/// execute any actions — only decides which tier is appropriate.
pub fn resolve_tier(input: ResolveTierInput) -> CascadeDecision {
    if input.is_stuck {
        return CascadeDecision {
            tier: CascadeTier::HumanGuidance,
            include_screenshot: true,
            extra_context: String::new(),
            reason: format!("Stuck threshold exceeded in {}", input.state),
        };
    }

    if input.playbook_matched {
        return CascadeDecision {
            tier: CascadeTier::Playbook,
            include_screenshot: false,
            extra_context: String::new(),
            reason: format!("Deterministic playbook matched for {}", input.state),
        };
    }

    if input.dom_inspection_enabled && DOM_INSPECTABLE_STATES.contains(&input.state) {
        if let Some(inspection) = input.dom_inspection {
            match inspection.outcome {
                Outcome::Direct if inspection.direct_action.is_some() => {
                    return CascadeDecision {
                        tier: CascadeTier::DomDirect,
                        include_screenshot: false,
                        extra_context: inspection.context_summary.clone(),
                        reason: format!("DOM direct action (confidence={})", inspection.confidence),
                    };
                }
                Outcome::Assisted => {
                    return CascadeDecision {
                        tier: CascadeTier::DomAssisted,
                        include_screenshot: true,
                        extra_context: inspection.context_summary.clone(),
                        reason: format!("DOM assisted (confidence={})", inspection.confidence),
                    };
                }
                _ => {} // fallback — proceed to LLM tier
            }
        }
    }

    if TEXT_ONLY_STATES.contains(&input.state) {
        return CascadeDecision {
            tier: CascadeTier::TextOnlyLlm,
            include_screenshot: false,
            extra_context: String::new(),
            reason: format!("Text-only state: {}", input.state),
        };
    }

    if input.state == "SUBMIT_REGISTER" && input.actions_in_state > 0 {
        return CascadeDecision {
            tier: CascadeTier::TextOnlyLlm,
            include_screenshot: false,
            extra_context: String::new(),
            reason: "SUBMIT_REGISTER re-check (text-only after first action)".to_string(),
        };
    }

    if input.state == "EXTRACT_WALLETS" && input.js_wallets_found {
        return CascadeDecision {
            tier: CascadeTier::TextOnlyLlm,
            include_screenshot: false,
            extra_context: String::new(),
            reason: "EXTRACT_WALLETS with JS pre-extraction results".to_string(),
        };
    }

    CascadeDecision {
        tier: CascadeTier::VisionLlm,
        include_screenshot: true,
        extra_context: String::new(),
        reason: format!("Full vision analysis for {}", input.state),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ssi_browser::DomInspector;

    #[test]
    fn blank_page_prefilter_short_circuits() {
        let outcome = check_pre_filters(PreFilterInput {
            page_text: "  ",
            screenshot_size_bytes: 100,
            screenshot_hash: "",
            last_screenshot_hash: "",
        });
        assert_eq!(outcome, PreFilterOutcome::BlankPage);
    }

    #[test]
    fn duplicate_screenshot_prefilter_fires_on_hash_match() {
        let outcome = check_pre_filters(PreFilterInput {
            page_text: "plenty of visible text on this page",
            screenshot_size_bytes: 20_000,
            screenshot_hash: "abc123",
            last_screenshot_hash: "abc123",
        });
        assert_eq!(outcome, PreFilterOutcome::DuplicateScreenshot);
    }

    #[test]
    fn is_stuck_always_wins_to_human_guidance() {
        let decision = resolve_tier(ResolveTierInput {
            state: "FIND_REGISTER",
            dom_inspection: None,
            dom_inspection_enabled: true,
            actions_in_state: 0,
            js_wallets_found: false,
            is_stuck: true,
            playbook_matched: false,
        });
        assert_eq!(decision.tier, CascadeTier::HumanGuidance);
    }

    #[test]
    fn dom_direct_routes_without_screenshot() {
        let inspector = DomInspector::new(75, 40);
        let scan = ssi_browser::DomScanData { has_registration_form: true, ..Default::default() };
        let inspection = inspector.inspect("FIND_REGISTER", &scan, 0.0);
        assert!(matches!(inspection.outcome, Outcome::Fallback)); // confidence 60 alone, below 75

        let scan_direct = ssi_browser::DomScanData {
            has_registration_form: true,
            register_links: vec![ssi_browser::dom_inspector::LinkCandidate { selector: "#s".into(), text: "Sign up".into() }],
            ..Default::default()
        };
        let inspection_direct = inspector.inspect("FIND_REGISTER", &scan_direct, 0.0);
        let decision = resolve_tier(ResolveTierInput {
            state: "FIND_REGISTER",
            dom_inspection: Some(&inspection_direct),
            dom_inspection_enabled: true,
            actions_in_state: 0,
            js_wallets_found: false,
            is_stuck: false,
            playbook_matched: false,
        });
        assert_eq!(decision.tier, CascadeTier::DomDirect);
        assert!(!decision.include_screenshot);
    }

    #[test]
    fn check_email_is_always_text_only_tier() {
        let decision = resolve_tier(ResolveTierInput {
            state: "CHECK_EMAIL_VERIFICATION",
            dom_inspection: None,
            dom_inspection_enabled: false,
            actions_in_state: 0,
            js_wallets_found: false,
            is_stuck: false,
            playbook_matched: false,
        });
        assert_eq!(decision.tier, CascadeTier::TextOnlyLlm);
        assert!(!decision.include_screenshot);
    }

    #[test]
    fn default_routes_to_vision_llm() {
        let decision = resolve_tier(ResolveTierInput {
            state: "LOAD_SITE",
            dom_inspection: None,
            dom_inspection_enabled: true,
            actions_in_state: 0,
            js_wallets_found: false,
            is_stuck: false,
            playbook_matched: false,
        });
        assert_eq!(decision.tier, CascadeTier::VisionLlm);
        assert!(decision.include_screenshot);
    }

    #[test]
    fn playbook_match_preempts_dom_and_llm_tiers() {
        let decision = resolve_tier(ResolveTierInput {
            state: "FILL_REGISTER",
            dom_inspection: None,
            dom_inspection_enabled: true,
            actions_in_state: 0,
            js_wallets_found: false,
            is_stuck: false,
            playbook_matched: true,
        });
        assert_eq!(decision.tier, CascadeTier::Playbook);
    }

    #[test]
    fn is_stuck_wins_over_playbook_match() {
        let decision = resolve_tier(ResolveTierInput {
            state: "FILL_REGISTER",
            dom_inspection: None,
            dom_inspection_enabled: true,
            actions_in_state: 0,
            js_wallets_found: false,
            is_stuck: true,
            playbook_matched: true,
        });
        assert_eq!(decision.tier, CascadeTier::HumanGuidance);
    }
}
