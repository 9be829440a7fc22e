//! Fraud taxonomy classification (C14, phase 4): assembles an evidence
//! prompt from a completed investigation, calls the LLM in JSON mode, and
//! scores risk from the returned labels. Grounded verbatim on
//! `original_source/ssi/classification/classifier.py` — the weight tables,
//! the `sum(confidence * weight) * 2.5` risk formula, and the
//! channel-only fallback on failure are all carried unchanged.

use std::sync::Arc;

use ssi_common::{Investigation, TaxonomyLabel, TaxonomyResult};
use ssi_llm::{ChatMessage, ChatOptions, LlmProvider};

const SYSTEM_PROMPT: &str = r#"You are a fraud analyst classifying a scam website investigation against a five-axis taxonomy.

Axes:
- intent: why the site exists (e.g. INTENT.INVESTMENT, INTENT.ROMANCE, INTENT.IMPOSTER, INTENT.EMPLOYMENT, INTENT.SHOPPING, INTENT.TECH_SUPPORT, INTENT.PRIZE, INTENT.EXTORTION, INTENT.CHARITY)
- channel: how the victim reached it (e.g. CHANNEL.WEB, CHANNEL.EMAIL, CHANNEL.SOCIAL, CHANNEL.SMS)
- technique: social-engineering levers used (e.g. SE.URGENCY, SE.AUTHORITY, SE.SCARCITY, SE.FEAR, SE.RECIPROCITY, SE.TRUST_BUILDING, SE.CONFUSION)
- action: what the victim is pushed to do (e.g. ACTION.SEND_MONEY, ACTION.GIFT_CARDS, ACTION.CRYPTO, ACTION.CREDENTIALS, ACTION.INSTALL, ACTION.CLICK_LINK, ACTION.PROVIDE_PII)
- persona: who the site impersonates, if anyone (e.g. PERSONA.BANK, PERSONA.GOVERNMENT, PERSONA.CELEBRITY, PERSONA.ROMANTIC_INTEREST, PERSONA.NONE)

Respond with JSON only, matching:
{
  "intent": [{"label": "...", "confidence": 0.0, "explanation": "..."}],
  "channel": [...],
  "technique": [...],
  "action": [...],
  "persona": [...],
  "explanation": "one paragraph summary"
}

Include only labels you have evidence for. Omit an axis entirely (empty array) if the evidence doesn't support any label on it."#;

fn build_evidence_text(investigation: &Investigation) -> String {
    let mut text = format!("URL: {}\n", investigation.url);

    if let Some(snapshot) = &investigation.page_snapshot {
        text.push_str(&format!("Page title: {}\n", snapshot.title));
        if !snapshot.redirect_chain.is_empty() {
            text.push_str(&format!("Redirect chain: {}\n", snapshot.redirect_chain.join(" -> ")));
        }
        if !snapshot.technologies.is_empty() {
            text.push_str(&format!("Technologies: {}\n", snapshot.technologies.join(", ")));
        }
        if !snapshot.interactive_elements.is_empty() {
            text.push_str("Form fields:\n");
            for el in &snapshot.interactive_elements {
                let label = if !el.label.is_empty() { &el.label } else if !el.placeholder.is_empty() { &el.placeholder } else { &el.name };
                text.push_str(&format!("- {}[{}] name={:?} label={:?}\n", el.tag, el.element_type, el.name, label));
            }
        }
    }

    if !investigation.threat_indicators.is_empty() {
        text.push_str("Threat indicators:\n");
        for ti in &investigation.threat_indicators {
            text.push_str(&format!("- [{:?}] {} ({})\n", ti.indicator_type, ti.value, ti.context));
        }
    }

    if !investigation.downloads.is_empty() {
        text.push_str("Downloads:\n");
        for d in &investigation.downloads {
            text.push_str(&format!(
                "- {} (SHA-256: {}…) malicious={} VT={}/{}\n",
                d.filename,
                &d.sha256.chars().take(16).collect::<String>(),
                d.is_malicious,
                d.vt_detections,
                d.vt_total_engines,
            ));
        }
    }

    if !investigation.agent_steps.is_empty() {
        text.push_str("Agent interaction steps:\n");
        for step in &investigation.agent_steps {
            text.push_str(&format!("Step {}: {:?} — {}\n", step.step_number, step.action.action, step.action.reasoning));
        }
    } else {
        text.push_str("No active interaction performed.\n");
    }

    if let Some(whois) = &investigation.whois {
        text.push_str(&format!(
            "Registrar: {} | Created: {:?}\n",
            whois.registrar.as_deref().unwrap_or("Unknown"),
            whois.created_at,
        ));
    }
    if let Some(geoip) = &investigation.geoip {
        text.push_str(&format!(
            "Hosting: {} ({})\n",
            geoip.org.as_deref().unwrap_or("Unknown"),
            geoip.country.as_deref().unwrap_or("Unknown"),
        ));
    }
    if let Some(tls) = &investigation.tls {
        text.push_str(&format!("TLS issuer: {} | self-signed: {}\n", tls.issuer, tls.self_signed));
    }

    if !investigation.wallets.is_empty() {
        text.push_str(&format!("Cryptocurrency wallets harvested: {}\n", investigation.wallets.len()));
    }

    text
}

fn intent_weight(label: &str) -> f32 {
    match label {
        "INTENT.IMPOSTER" => 8.0,
        "INTENT.INVESTMENT" => 9.0,
        "INTENT.ROMANCE" => 7.0,
        "INTENT.EMPLOYMENT" => 6.0,
        "INTENT.SHOPPING" => 5.0,
        "INTENT.TECH_SUPPORT" => 7.0,
        "INTENT.PRIZE" => 5.0,
        "INTENT.EXTORTION" => 10.0,
        "INTENT.CHARITY" => 6.0,
        _ => 5.0,
    }
}

fn action_weight(label: &str) -> f32 {
    match label {
        "ACTION.SEND_MONEY" => 10.0,
        "ACTION.GIFT_CARDS" => 8.0,
        "ACTION.CRYPTO" => 9.0,
        "ACTION.CREDENTIALS" => 8.0,
        "ACTION.INSTALL" => 7.0,
        "ACTION.CLICK_LINK" => 3.0,
        "ACTION.PROVIDE_PII" => 6.0,
        _ => 5.0,
    }
}

fn technique_weight(label: &str) -> f32 {
    match label {
        "SE.URGENCY" => 7.0,
        "SE.AUTHORITY" => 7.0,
        "SE.SCARCITY" => 5.0,
        "SE.FEAR" => 8.0,
        "SE.RECIPROCITY" => 4.0,
        "SE.TRUST_BUILDING" => 4.0,
        "SE.CONFUSION" => 5.0,
        _ => 5.0,
    }
}

/// `sum(confidence * weight) * 2.5`, capped at 100.
fn calculate_risk_score(taxonomy: &TaxonomyResult) -> f32 {
    let mut total = 0.0f32;
    for label in &taxonomy.intent {
        total += label.confidence * intent_weight(&label.label);
    }
    for label in &taxonomy.action {
        total += label.confidence * action_weight(&label.label);
    }
    for label in &taxonomy.technique {
        total += label.confidence * technique_weight(&label.label);
    }
    (total * 2.5).min(100.0)
}

/// `TaxonomyResult` has no top-level explanation field (only per-label
/// ones), so the failure reason is pushed onto `investigation.warnings` by
/// the caller instead of being attached here.
fn web_channel_fallback() -> TaxonomyResult {
    TaxonomyResult {
        channel: vec![TaxonomyLabel {
            label: "CHANNEL.WEB".to_string(),
            confidence: 1.0,
            explanation: "SSI investigates web-based scam sites.".to_string(),
        }],
        risk_score: 0.0,
        ..TaxonomyResult::default()
    }
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    trimmed.strip_prefix("```json").or_else(|| trimmed.strip_prefix("```")).map(|s| s.trim_end_matches("```").trim()).unwrap_or(trimmed)
}

fn parse_response(raw: &str) -> Result<TaxonomyResult, serde_json::Error> {
    let text = strip_code_fence(raw);
    let value: serde_json::Value = serde_json::from_str(text)?;

    let labels = |key: &str| -> Vec<TaxonomyLabel> {
        value
            .get(key)
            .and_then(|v| v.as_array())
            .map(|items| {
                items
                    .iter()
                    .map(|item| TaxonomyLabel {
                        label: item.get("label").and_then(|v| v.as_str()).unwrap_or_default().to_string(),
                        confidence: item.get("confidence").and_then(|v| v.as_f64()).unwrap_or(0.0) as f32,
                        explanation: item.get("explanation").and_then(|v| v.as_str()).unwrap_or_default().to_string(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    };

    let mut taxonomy = TaxonomyResult {
        intent: labels("intent"),
        channel: labels("channel"),
        technique: labels("technique"),
        action: labels("action"),
        persona: labels("persona"),
        risk_score: 0.0,
    };
    taxonomy.risk_score = calculate_risk_score(&taxonomy);
    Ok(taxonomy)
}

/// Classifies a completed investigation. Failure — either the LLM call or
/// the JSON parse — falls back to a bare `CHANNEL.WEB` label with
/// `risk_score` left at zero rather than propagating an error, matching
/// the original's soft-failure behaviour; the failure reason is appended
/// to `investigation.warnings` by the caller.
pub async fn classify(llm: Arc<dyn LlmProvider>, investigation: &Investigation) -> Result<TaxonomyResult, String> {
    let evidence = build_evidence_text(investigation);
    let messages = vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(evidence)];
    let options = ChatOptions { json_mode: true, max_tokens: 1024, ..ChatOptions::default() };

    match llm.chat(&messages, &options).await {
        Ok(response) => parse_response(&response.content).map_err(|e| format!("classification parse error: {e}")),
        Err(e) => Err(format!("classification LLM call failed: {e}")),
    }
}

/// Convenience wrapper used when the caller wants the fallback baked in
/// rather than handling the `Err` case itself.
pub async fn classify_or_fallback(llm: Arc<dyn LlmProvider>, investigation: &mut Investigation) -> TaxonomyResult {
    match classify(llm, investigation).await {
        Ok(taxonomy) => taxonomy,
        Err(reason) => {
            investigation.warn(reason);
            web_channel_fallback()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ssi_common::ScanMode;

    #[test]
    fn risk_score_formula_matches_the_weighted_sum() {
        let taxonomy = TaxonomyResult {
            intent: vec![TaxonomyLabel { label: "INTENT.INVESTMENT".into(), confidence: 0.9, explanation: String::new() }],
            action: vec![TaxonomyLabel { label: "ACTION.CRYPTO".into(), confidence: 0.8, explanation: String::new() }],
            technique: vec![TaxonomyLabel { label: "SE.URGENCY".into(), confidence: 0.7, explanation: String::new() }],
            ..TaxonomyResult::default()
        };
        let score = calculate_risk_score(&taxonomy);
        // (0.9*9 + 0.8*9 + 0.7*7) * 2.5 = (8.1 + 7.2 + 4.9) * 2.5 = 20.2 * 2.5 = 50.5
        assert!((score - 50.5).abs() < 0.01);
    }

    #[test]
    fn risk_score_is_capped_at_one_hundred() {
        let taxonomy = TaxonomyResult {
            intent: vec![TaxonomyLabel { label: "INTENT.EXTORTION".into(), confidence: 1.0, explanation: String::new() }],
            action: vec![TaxonomyLabel { label: "ACTION.SEND_MONEY".into(), confidence: 1.0, explanation: String::new() }],
            technique: vec![TaxonomyLabel { label: "SE.FEAR".into(), confidence: 1.0, explanation: String::new() }],
            ..TaxonomyResult::default()
        };
        assert_eq!(calculate_risk_score(&taxonomy), 100.0);
    }

    #[test]
    fn unknown_label_falls_back_to_default_weight_five() {
        let taxonomy = TaxonomyResult {
            intent: vec![TaxonomyLabel { label: "INTENT.UNKNOWN".into(), confidence: 1.0, explanation: String::new() }],
            ..TaxonomyResult::default()
        };
        // 1.0 * 5 * 2.5 = 12.5
        assert!((calculate_risk_score(&taxonomy) - 12.5).abs() < 0.01);
    }

    #[test]
    fn parse_response_strips_code_fences() {
        let raw = "```json\n{\"intent\": [{\"label\": \"INTENT.INVESTMENT\", \"confidence\": 0.8, \"explanation\": \"promises returns\"}]}\n```";
        let taxonomy = parse_response(raw).unwrap();
        assert_eq!(taxonomy.intent.len(), 1);
        assert_eq!(taxonomy.intent[0].label, "INTENT.INVESTMENT");
    }

    #[test]
    fn web_channel_fallback_carries_no_risk() {
        let taxonomy = web_channel_fallback();
        assert_eq!(taxonomy.channel[0].label, "CHANNEL.WEB");
        assert_eq!(taxonomy.risk_score, 0.0);
        let _ = ScanMode::Passive;
    }
}
