//! DOM scan JS routines (C6 input side): browser-side JavaScript that
//! produces the raw [`DomScanData`] shape the pure [`crate::dom_inspector`]
//! scorer consumes. Grounded on `original_source/browser/dom_extractor.py`'s
//! page-observation extraction, generalized per-state.

use crate::dom_inspector::DomScanData;
use ssi_common::SsiError;
use thirtyfour::WebDriver;

const FIND_REGISTER_SCAN_JS: &str = r#"
(() => {
    const pwInput = document.querySelector("input[type='password']");
    const emailInput = document.querySelector("input[type='email'], input[name*='email' i]");
    const form = pwInput ? pwInput.closest("form") : null;

    const linkCandidates = Array.from(document.querySelectorAll("a, button"))
        .filter(el => /regist|sign\s*up|create\s*account|join\s*now/i.test(el.textContent || ""))
        .map(el => ({ selector: el.id ? `#${el.id}` : "", text: (el.textContent || "").trim() }));

    const modal = document.querySelector("[role='dialog'], .modal.show, .modal.in");

    return {
        has_registration_form: Boolean(pwInput && emailInput && form),
        form_selector: form && form.id ? `#${form.id}` : "form",
        field_summary: `password+${emailInput ? "email" : "none"}`,
        register_links: linkCandidates,
        url_is_register_page: /\/(register|signup|sign-up)/i.test(location.pathname),
        current_url: location.href,
        modal_has_form: Boolean(modal && modal.querySelector("form")),
        modal_selector: modal && modal.id ? `#${modal.id}` : "",
    };
})()
"#;

const NAVIGATE_DEPOSIT_SCAN_JS: &str = r#"
(() => {
    const depositCandidates = Array.from(document.querySelectorAll("a, button"))
        .filter(el => /deposit|recharge|top\s*up|fund(s|ing)?/i.test(el.textContent || ""))
        .map(el => ({ selector: el.id ? `#${el.id}` : "", text: (el.textContent || "").trim() }));

    const classMatch = document.querySelector("[class*='deposit' i]");

    return {
        deposit_links: depositCandidates,
        url_is_deposit_page: /\/(deposit|recharge)/i.test(location.pathname),
        current_url: location.href,
        deposit_class_match: Boolean(classMatch),
        deposit_class_selector: classMatch && classMatch.id ? `#${classMatch.id}` : "",
    };
})()
"#;

const CHECK_EMAIL_SCAN_JS: &str = r#"
(() => {
    const body = (document.body ? document.body.innerText : "").toLowerCase();
    const verifyPhrases = ["verify your email", "confirm your email", "check your inbox", "email verification"];
    const dashboardPhrases = ["dashboard", "my account", "welcome back", "account overview"];

    const verifyHit = verifyPhrases.find(p => body.includes(p));
    const dashboardHit = dashboardPhrases.find(p => body.includes(p));

    return {
        email_verify_text_found: Boolean(verifyHit),
        email_verify_snippet: verifyHit || "",
        dashboard_text_found: Boolean(dashboardHit),
        dashboard_snippet: dashboardHit || "",
        url_is_verify_page: /\/(verify|confirm)/i.test(location.pathname),
    };
})()
"#;

pub fn scan_script_for_state(state: &str) -> Option<&'static str> {
    match state {
        "FIND_REGISTER" => Some(FIND_REGISTER_SCAN_JS),
        "NAVIGATE_DEPOSIT" => Some(NAVIGATE_DEPOSIT_SCAN_JS),
        "CHECK_EMAIL_VERIFICATION" => Some(CHECK_EMAIL_SCAN_JS),
        _ => None,
    }
}

/// Runs the state's scan script and parses the result into [`DomScanData`].
/// Returns `Ok(None)` for states with no DOM-inspectable scan.
pub async fn run_dom_scan(driver: &WebDriver, state: &str) -> Result<Option<DomScanData>, SsiError> {
    let Some(script) = scan_script_for_state(state) else {
        return Ok(None);
    };

    let ret = driver
        .execute(script, Vec::new())
        .await
        .map_err(|e| SsiError::Browser(format!("dom scan script failed: {e}")))?;

    let value: serde_json::Value = ret
        .convert()
        .map_err(|e| SsiError::Browser(format!("dom scan result conversion failed: {e}")))?;

    let scan: DomScanData =
        serde_json::from_value(value).map_err(|e| SsiError::Browser(format!("dom scan result parse failed: {e}")))?;

    Ok(Some(scan))
}
