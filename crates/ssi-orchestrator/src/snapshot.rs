//! Passive-recon page capture: drives a headless `BrowserSession` once to
//! collect a [`PageSnapshot`] (title, visible text, interactive elements,
//! screenshot) without engaging the agent funnel. Grounded on
//! `ssi_browser::scan`'s `driver.execute(..).convert::<Value>()` idiom,
//! reused here for a general element inventory rather than a
//! state-specific DOM scan.

use ssi_browser::BrowserSession;
use ssi_common::{InteractiveElement, PageSnapshot, SsiError};

const ELEMENT_INVENTORY_JS: &str = r#"
(() => {
    const elements = Array.from(document.querySelectorAll("input, select, textarea, button, a[href]"));
    return elements.slice(0, 200).map((el, index) => ({
        tag: el.tagName.toLowerCase(),
        element_type: el.getAttribute("type") || "",
        name: el.getAttribute("name") || "",
        label: (el.labels && el.labels.length > 0) ? el.labels[0].textContent.trim() : "",
        placeholder: el.getAttribute("placeholder") || "",
        text: (el.textContent || "").trim().slice(0, 200),
        href: el.getAttribute("href") || "",
        required: el.hasAttribute("required"),
        selector: el.id ? `#${el.id}` : "",
        index,
    }));
})()
"#;

async fn run_js<T: serde::de::DeserializeOwned>(session: &BrowserSession, script: &str) -> Result<T, SsiError> {
    let ret = session
        .inner()
        .execute(script, Vec::new())
        .await
        .map_err(|e| SsiError::Browser(format!("script execution failed: {e}")))?;
    let value: serde_json::Value = ret.convert().map_err(|e| SsiError::Browser(format!("script result conversion failed: {e}")))?;
    serde_json::from_value(value).map_err(|e| SsiError::Browser(format!("script result parse failed: {e}")))
}

async fn scan_interactive_elements(session: &BrowserSession) -> Vec<InteractiveElement> {
    match run_js(session, ELEMENT_INVENTORY_JS).await {
        Ok(elements) => elements,
        Err(e) => {
            tracing::warn!(error = %e, "interactive element inventory failed");
            Vec::new()
        }
    }
}

/// Captures a [`PageSnapshot`] by navigating to `url` and reading back
/// title, visible text, interactive elements, and a full-resolution
/// screenshot. `output_dir` is where the screenshot PNG is written.
pub async fn capture(session: &BrowserSession, url: &str, output_dir: &std::path::Path) -> Result<PageSnapshot, SsiError> {
    session.navigate(url).await?;
    session.wait(1.5).await;

    let current_url = session.current_url().await.unwrap_or_else(|_| url.to_string());
    let title: String = run_js(session, "return document.title || ''").await.unwrap_or_default();
    let visible_text = session.page_text().await.unwrap_or_default();
    let interactive_elements = scan_interactive_elements(session).await;

    let redirect_chain = if current_url != url { vec![url.to_string(), current_url.clone()] } else { vec![url.to_string()] };

    let screenshot_path = match session.screenshot_base64_full_res().await {
        Ok(b64) => write_screenshot(output_dir, &b64).ok(),
        Err(e) => {
            tracing::warn!(error = %e, "passive screenshot capture failed");
            None
        }
    };

    Ok(PageSnapshot {
        url: current_url,
        title,
        visible_text,
        interactive_elements,
        redirect_chain,
        screenshot_path,
        dom_path: None,
        har_path: None,
        technologies: Vec::new(),
    })
}

fn write_screenshot(output_dir: &std::path::Path, b64: &str) -> Result<String, SsiError> {
    use base64::Engine;
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(b64)
        .map_err(|e| SsiError::Browser(format!("screenshot base64 decode failed: {e}")))?;
    let path = output_dir.join("passive_screenshot.png");
    std::fs::write(&path, bytes).map_err(|e| SsiError::Browser(format!("screenshot write failed: {e}")))?;
    Ok(path.display().to_string())
}
