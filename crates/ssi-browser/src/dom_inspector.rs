//! DOM inspector (C6): pure weighted-signal confidence scoring over a raw
//! DOM scan. No I/O — takes the JSON produced by [`crate::scan`]'s JS
//! routines and returns a routing-ready [`DomInspection`].
//!
//! Grounded verbatim on `original_source/browser/dom_inspector.py`: the
//! signal weights, state detectors, and three-tier outcome thresholds are
//! carried unchanged.

use serde::Deserialize;
use ssi_common::{AgentAction, ActionType};

const MAX_CONFIDENCE: i32 = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Direct,
    Assisted,
    Fallback,
}

#[derive(Debug, Clone)]
pub struct DomSignal {
    pub source: &'static str,
    pub weight: i32,
    pub selector: String,
    pub value: String,
}

#[derive(Debug, Clone)]
pub struct DomInspection {
    pub state: String,
    pub confidence: i32,
    pub outcome: Outcome,
    pub signals: Vec<DomSignal>,
    pub direct_action: Option<AgentAction>,
    pub context_summary: String,
    pub scan_duration_ms: f64,
}

/// Raw field shape produced by the browser-side DOM scan JS. Every field is
/// optional/defaulted since different states populate different subsets.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DomScanData {
    #[serde(default)]
    pub has_registration_form: bool,
    #[serde(default)]
    pub form_selector: String,
    #[serde(default)]
    pub field_summary: String,
    #[serde(default)]
    pub register_links: Vec<LinkCandidate>,
    #[serde(default)]
    pub url_is_register_page: bool,
    #[serde(default)]
    pub current_url: String,
    #[serde(default)]
    pub modal_has_form: bool,
    #[serde(default)]
    pub modal_selector: String,

    #[serde(default)]
    pub deposit_links: Vec<LinkCandidate>,
    #[serde(default)]
    pub url_is_deposit_page: bool,
    #[serde(default)]
    pub deposit_class_match: bool,
    #[serde(default)]
    pub deposit_class_selector: String,

    #[serde(default)]
    pub email_verify_text_found: bool,
    #[serde(default)]
    pub email_verify_snippet: String,
    #[serde(default)]
    pub dashboard_text_found: bool,
    #[serde(default)]
    pub dashboard_snippet: String,
    #[serde(default)]
    pub url_is_verify_page: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LinkCandidate {
    #[serde(default)]
    pub selector: String,
    #[serde(default)]
    pub text: String,
}

trait StateDetector {
    fn detect(&self, scan: &DomScanData) -> Vec<DomSignal>;
    fn build_action(&self, signals: &[DomSignal]) -> Option<AgentAction>;
}

struct FindRegisterDetector;

impl StateDetector for FindRegisterDetector {
    fn detect(&self, scan: &DomScanData) -> Vec<DomSignal> {
        let mut signals = Vec::new();

        if scan.has_registration_form {
            signals.push(DomSignal {
                source: "registration_form_present",
                weight: 60,
                selector: if scan.form_selector.is_empty() {
                    "form".to_string()
                } else {
                    scan.form_selector.clone()
                },
                value: scan.field_summary.clone(),
            });
        }

        if let Some(best) = scan.register_links.first() {
            signals.push(DomSignal {
                source: "register_link_found",
                weight: 40,
                selector: best.selector.clone(),
                value: best.text.clone(),
            });
        }

        if scan.url_is_register_page {
            signals.push(DomSignal {
                source: "url_pattern_match",
                weight: 25,
                selector: String::new(),
                value: scan.current_url.clone(),
            });
        }

        if scan.modal_has_form {
            signals.push(DomSignal {
                source: "modal_form_detected",
                weight: 20,
                selector: scan.modal_selector.clone(),
                value: String::new(),
            });
        }

        signals
    }

    fn build_action(&self, signals: &[DomSignal]) -> Option<AgentAction> {
        if let Some(s) = signals.iter().find(|s| s.source == "registration_form_present") {
            return Some(AgentAction::done(
                format!("DOM: Registration form detected ({}). Proceeding to FILL_REGISTER.", s.value),
                0.9,
            ));
        }
        if let Some(s) = signals.iter().find(|s| s.source == "register_link_found" && !s.selector.is_empty()) {
            return Some(AgentAction::click(
                s.selector.clone(),
                format!("DOM: Register link found: '{}'", s.value),
                0.8,
            ));
        }
        if let Some(s) = signals.iter().find(|s| s.source == "register_link_found" && !s.value.is_empty()) {
            return Some(AgentAction::click(
                s.value.clone(),
                format!("DOM: Register link found (text match): '{}'", s.value),
                0.75,
            ));
        }
        None
    }
}

struct NavigateDepositDetector;

impl StateDetector for NavigateDepositDetector {
    fn detect(&self, scan: &DomScanData) -> Vec<DomSignal> {
        let mut signals = Vec::new();

        if let Some(best) = scan.deposit_links.first() {
            signals.push(DomSignal {
                source: "deposit_link_found",
                weight: 40,
                selector: best.selector.clone(),
                value: best.text.clone(),
            });
        }

        if scan.url_is_deposit_page {
            signals.push(DomSignal {
                source: "url_pattern_match",
                weight: 35,
                selector: String::new(),
                value: scan.current_url.clone(),
            });
        }

        if scan.deposit_class_match {
            signals.push(DomSignal {
                source: "css_class_match",
                weight: 20,
                selector: scan.deposit_class_selector.clone(),
                value: String::new(),
            });
        }

        signals
    }

    fn build_action(&self, signals: &[DomSignal]) -> Option<AgentAction> {
        // Already-on-deposit-page overrides a click (prevents navigation loops).
        if signals.iter().any(|s| s.source == "url_pattern_match") {
            return Some(AgentAction::done("DOM: Already on deposit page (URL pattern match).", 0.85));
        }
        if let Some(s) = signals.iter().find(|s| s.source == "deposit_link_found" && !s.selector.is_empty()) {
            return Some(AgentAction::click(
                s.selector.clone(),
                format!("DOM: Deposit link found: '{}'", s.value),
                0.8,
            ));
        }
        if let Some(s) = signals.iter().find(|s| s.source == "deposit_link_found" && !s.value.is_empty()) {
            return Some(AgentAction::click(
                s.value.clone(),
                format!("DOM: Deposit link found (text match): '{}'", s.value),
                0.75,
            ));
        }
        if let Some(s) = signals.iter().find(|s| s.source == "css_class_match" && !s.selector.is_empty()) {
            return Some(AgentAction::click(
                s.selector.clone(),
                "DOM: Deposit element found via CSS class match",
                0.6,
            ));
        }
        None
    }
}

struct CheckEmailDetector;

impl StateDetector for CheckEmailDetector {
    fn detect(&self, scan: &DomScanData) -> Vec<DomSignal> {
        let mut signals = Vec::new();

        if scan.email_verify_text_found {
            signals.push(DomSignal {
                source: "email_verify_text",
                weight: 80,
                selector: String::new(),
                value: scan.email_verify_snippet.clone(),
            });
        }
        if scan.dashboard_text_found {
            signals.push(DomSignal {
                source: "dashboard_text",
                weight: 60,
                selector: String::new(),
                value: scan.dashboard_snippet.clone(),
            });
        }
        if scan.url_is_verify_page {
            signals.push(DomSignal {
                source: "url_verify_pattern",
                weight: 40,
                selector: String::new(),
                value: String::new(),
            });
        }

        signals
    }

    /// Always returns an action — never `None` for CHECK_EMAIL_VERIFICATION.
    fn build_action(&self, signals: &[DomSignal]) -> Option<AgentAction> {
        if let Some(s) = signals.iter().find(|s| s.source == "email_verify_text") {
            return Some(AgentAction::stuck(
                format!("DOM: Email verification required. Text: '{}'", s.value),
                0.95,
            ));
        }
        if let Some(s) = signals.iter().find(|s| s.source == "dashboard_text") {
            return Some(AgentAction::done(
                format!("DOM: Dashboard detected ({}). No email verification.", s.value),
                0.90,
            ));
        }
        if signals.iter().any(|s| s.source == "url_verify_pattern") {
            return Some(AgentAction::stuck("DOM: URL matches email verification pattern.", 0.85));
        }
        Some(AgentAction::done("DOM: No email verification signals. Proceeding.", 0.75))
    }
}

pub struct DomInspector {
    direct_threshold: i32,
    assisted_threshold: i32,
}

impl DomInspector {
    pub fn new(direct_threshold: i32, assisted_threshold: i32) -> Self {
        Self { direct_threshold, assisted_threshold }
    }

    fn detector_for(state: &str) -> Option<Box<dyn StateDetector>> {
        match state {
            "FIND_REGISTER" => Some(Box::new(FindRegisterDetector)),
            "NAVIGATE_DEPOSIT" => Some(Box::new(NavigateDepositDetector)),
            "CHECK_EMAIL_VERIFICATION" => Some(Box::new(CheckEmailDetector)),
            _ => None,
        }
    }

    pub fn inspect(&self, state: &str, scan: &DomScanData, scan_duration_ms: f64) -> DomInspection {
        let Some(detector) = Self::detector_for(state) else {
            return DomInspection {
                state: state.to_string(),
                confidence: 0,
                outcome: Outcome::Fallback,
                signals: Vec::new(),
                direct_action: None,
                context_summary: String::new(),
                scan_duration_ms,
            };
        };

        let signals = detector.detect(scan);
        let mut confidence = signals.iter().map(|s| s.weight).sum::<i32>().min(MAX_CONFIDENCE);

        let (direct_action, outcome) = if state == "CHECK_EMAIL_VERIFICATION" {
            // Always direct — a deterministic answer, never defers to an LLM.
            confidence = confidence.max(self.direct_threshold);
            (detector.build_action(&signals), Outcome::Direct)
        } else if confidence >= self.direct_threshold {
            (detector.build_action(&signals), Outcome::Direct)
        } else if confidence >= self.assisted_threshold {
            (None, Outcome::Assisted)
        } else {
            (None, Outcome::Fallback)
        };

        let context_summary = format_context(state, confidence, &signals);

        tracing::info!(
            state,
            confidence,
            outcome = ?outcome,
            signal_count = signals.len(),
            scan_duration_ms,
            "DOM inspection"
        );

        DomInspection {
            state: state.to_string(),
            confidence,
            outcome,
            signals,
            direct_action,
            context_summary,
            scan_duration_ms,
        }
    }
}

fn format_context(state: &str, confidence: i32, signals: &[DomSignal]) -> String {
    if signals.is_empty() {
        return String::new();
    }
    let mut lines = vec![format!("DOM PRE-SCAN [{state}] confidence={confidence}/100:")];
    for s in signals {
        let detail = if !s.selector.is_empty() {
            format!("selector='{}'", s.selector)
        } else {
            format!("value='{}'", s.value)
        };
        lines.push(format!("  - {} (+{}pts): {}", s.source, s.weight, detail));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_form_present_is_direct_with_done_action() {
        let inspector = DomInspector::new(75, 40);
        let scan = DomScanData {
            has_registration_form: true,
            field_summary: "email+password".into(),
            ..Default::default()
        };
        let result = inspector.inspect("FIND_REGISTER", &scan, 12.0);
        assert_eq!(result.confidence, 60);
        assert_eq!(result.outcome, Outcome::Fallback);
        assert!(result.direct_action.is_none());
    }

    #[test]
    fn register_link_plus_url_pattern_crosses_direct_threshold() {
        let inspector = DomInspector::new(75, 40);
        let scan = DomScanData {
            has_registration_form: true,
            register_links: vec![LinkCandidate { selector: "#signup".into(), text: "Sign up".into() }],
            ..Default::default()
        };
        let result = inspector.inspect("FIND_REGISTER", &scan, 0.0);
        assert_eq!(result.confidence, 100);
        assert_eq!(result.outcome, Outcome::Direct);
        assert_eq!(result.direct_action.unwrap().action, ActionType::Done);
    }

    #[test]
    fn navigate_deposit_prefers_url_pattern_over_click() {
        let inspector = DomInspector::new(75, 40);
        let scan = DomScanData {
            deposit_links: vec![LinkCandidate { selector: "#deposit".into(), text: "Deposit".into() }],
            url_is_deposit_page: true,
            ..Default::default()
        };
        let result = inspector.inspect("NAVIGATE_DEPOSIT", &scan, 0.0);
        let action = result.direct_action.unwrap();
        assert_eq!(action.action, ActionType::Done);
    }

    #[test]
    fn check_email_is_always_direct_even_with_no_signals() {
        let inspector = DomInspector::new(75, 40);
        let scan = DomScanData::default();
        let result = inspector.inspect("CHECK_EMAIL_VERIFICATION", &scan, 0.0);
        assert_eq!(result.outcome, Outcome::Direct);
        assert_eq!(result.confidence, 75);
        assert_eq!(result.direct_action.unwrap().action, ActionType::Done);
    }

    #[test]
    fn check_email_verification_text_wins_over_dashboard() {
        let inspector = DomInspector::new(75, 40);
        let scan = DomScanData {
            email_verify_text_found: true,
            email_verify_snippet: "check your inbox".into(),
            dashboard_text_found: true,
            ..Default::default()
        };
        let result = inspector.inspect("CHECK_EMAIL_VERIFICATION", &scan, 0.0);
        assert_eq!(result.direct_action.unwrap().action, ActionType::Stuck);
    }

    #[test]
    fn unknown_state_falls_back_with_zero_confidence() {
        let inspector = DomInspector::new(75, 40);
        let result = inspector.inspect("SUBMIT_REGISTER", &DomScanData::default(), 0.0);
        assert_eq!(result.outcome, Outcome::Fallback);
        assert_eq!(result.confidence, 0);
    }
}
