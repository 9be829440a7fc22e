//! Browser driver (C5): a single-session abstraction over a WebDriver
//! session, with four-strategy click/type cascades, overlay dismissal, and
//! screenshot capture. Grounded on `original_source/browser/zen_manager.py`
//! for the session-lifecycle shape and `original_source/browser/dom_extractor.py`
//! for page-observation helpers, re-expressed against `thirtyfour` instead
//! of Playwright.

use crate::stealth::{BrowserProfile, STEALTH_SCRIPT};
use base64::Engine;
use serde_json::json;
use ssi_common::SsiError;
use thirtyfour::{By, DesiredCapabilities, WebDriver, WebElement};

const OVERLAY_SELECTORS: &[&str] = &[
    "[id*='cookie' i]",
    "[class*='cookie' i]",
    "[id*='consent' i]",
    "[class*='consent' i]",
    "[class*='gdpr' i]",
    "#onetrust-banner-sdk",
    ".goog-te-banner-frame",
    "[class*='chat-widget' i]",
    "[id*='intercom' i]",
    "[class*='translate-banner' i]",
];

const CLICKABLE_TAGS_SELECTOR: &str = "button, a, [role=button], input[type=submit], input[type=button], .btn";

#[derive(Debug, Clone, Default)]
pub struct ClickOutcome {
    pub success: bool,
    pub strategy: &'static str,
}

#[derive(Debug, Clone, Default)]
pub struct TypeOutcome {
    pub success: bool,
    pub actual: String,
    pub warning: String,
}

pub struct BrowserSession {
    driver: WebDriver,
}

impl BrowserSession {
    /// Connects to a WebDriver server and applies the given fingerprint
    /// profile (proxy, headless mode) via Chrome capabilities.
    pub async fn launch(webdriver_url: &str, headless: bool, profile: &BrowserProfile) -> Result<Self, SsiError> {
        let mut caps = DesiredCapabilities::chrome();
        if headless {
            caps.set_headless().map_err(|e| SsiError::Browser(format!("headless flag failed: {e}")))?;
        }
        if !profile.user_agent.is_empty() {
            caps.add_chrome_arg(&format!("--user-agent={}", profile.user_agent))
                .map_err(|e| SsiError::Browser(format!("user-agent arg failed: {e}")))?;
        }
        if let Some(proxy) = &profile.proxy_url {
            caps.add_chrome_arg(&format!("--proxy-server={proxy}"))
                .map_err(|e| SsiError::Browser(format!("proxy arg failed: {e}")))?;
        }
        caps.add_chrome_arg("--ignore-certificate-errors")
            .map_err(|e| SsiError::Browser(format!("tls-ignore arg failed: {e}")))?;

        let driver = WebDriver::new(webdriver_url, caps)
            .await
            .map_err(|e| SsiError::Browser(format!("webdriver session failed to start: {e}")))?;

        Ok(Self { driver })
    }

    /// Injects the anti-detection scripts. Ideally a CDP
    /// `Page.addScriptToEvaluateOnNewDocument` call so it runs before every
    /// navigation; re-applied here after each `navigate` as a portable
    /// fallback for WebDriver servers without CDP support.
    pub async fn apply_stealth_scripts(&self) -> Result<(), SsiError> {
        self.driver
            .execute(STEALTH_SCRIPT, Vec::new())
            .await
            .map(|_| ())
            .map_err(|e| SsiError::Browser(format!("stealth script injection failed: {e}")))
    }

    pub async fn navigate(&self, url: &str) -> Result<(), SsiError> {
        self.driver
            .goto(url)
            .await
            .map_err(|e| SsiError::Browser(format!("navigation to {url} failed: {e}")))?;
        self.apply_stealth_scripts().await
    }

    pub async fn current_url(&self) -> Result<String, SsiError> {
        self.driver
            .current_url()
            .await
            .map(|u| u.to_string())
            .map_err(|e| SsiError::Browser(format!("could not read current url: {e}")))
    }

    pub async fn page_text(&self) -> Result<String, SsiError> {
        self.driver
            .find(By::Tag("body"))
            .await
            .map_err(|e| SsiError::Browser(format!("body element not found: {e}")))?
            .text()
            .await
            .map_err(|e| SsiError::Browser(format!("could not read page text: {e}")))
    }

    pub async fn page_html(&self) -> Result<String, SsiError> {
        self.driver
            .source()
            .await
            .map_err(|e| SsiError::Browser(format!("could not read page source: {e}")))
    }

    /// Screenshot as base64 PNG, suitable for inlining into a vision-LLM
    /// message payload.
    pub async fn screenshot_base64(&self) -> Result<String, SsiError> {
        let png = self
            .driver
            .screenshot_as_png()
            .await
            .map_err(|e| SsiError::Browser(format!("screenshot failed: {e}")))?;
        Ok(base64::engine::general_purpose::STANDARD.encode(png))
    }

    pub async fn screenshot_bytes(&self) -> Result<Vec<u8>, SsiError> {
        self.driver
            .screenshot_as_png()
            .await
            .map_err(|e| SsiError::Browser(format!("screenshot failed: {e}")))
    }

    /// Removes known cookie banners, chat widgets, translate bars, and
    /// consent overlays. Never fails the step — only records the count
    /// removed.
    pub async fn dismiss_overlays(&self) -> u32 {
        let mut removed = 0;
        for selector in OVERLAY_SELECTORS {
            if let Ok(elements) = self.driver.find_all(By::Css(*selector)).await {
                for el in elements {
                    if el.click().await.is_ok() || self.remove_via_js(&el).await.is_ok() {
                        removed += 1;
                    }
                }
            }
        }
        removed
    }

    async fn remove_via_js(&self, element: &WebElement) -> Result<(), SsiError> {
        self.driver
            .execute("arguments[0].remove();", vec![json!(element.element_id())])
            .await
            .map(|_| ())
            .map_err(|e| SsiError::Browser(format!("overlay removal script failed: {e}")))
    }

    /// Four-strategy click cascade, first success wins.
    pub async fn click(&self, selector: &str, text_hint: &str) -> ClickOutcome {
        // Strategy 1: direct CSS selector.
        if let Ok(el) = self.driver.find(By::Css(selector)).await {
            if el.click().await.is_ok() {
                return ClickOutcome { success: true, strategy: "css_selector" };
            }
        }

        // Strategy 2: case-insensitive text-content search across clickable tags.
        if let Ok(elements) = self.driver.find_all(By::Css(CLICKABLE_TAGS_SELECTOR)).await {
            let needle = if text_hint.is_empty() { selector } else { text_hint }.to_lowercase();
            for el in elements {
                if let Ok(text) = el.text().await {
                    if text.to_lowercase().contains(&needle) && el.click().await.is_ok() {
                        return ClickOutcome { success: true, strategy: "text_content_match" };
                    }
                }
            }
        }

        // Strategy 3: engine-native find by visible text/label.
        if !text_hint.is_empty() {
            if let Ok(el) = self.driver.find(By::XPath(&format!("//*[contains(text(), '{text_hint}')]"))).await {
                if el.click().await.is_ok() {
                    return ClickOutcome { success: true, strategy: "engine_text_find" };
                }
            }
        }

        // Strategy 4: fuzzy keyword match over common interactive attributes.
        if let Ok(elements) = self.driver.find_all(By::Css("[aria-label], [title], [name]")).await {
            let needle = if text_hint.is_empty() { selector } else { text_hint }.to_lowercase();
            for el in elements {
                for attr in ["aria-label", "title", "name"] {
                    if let Ok(Some(value)) = el.attr(attr).await {
                        if value.to_lowercase().contains(&needle) && el.click().await.is_ok() {
                            return ClickOutcome { success: true, strategy: "fuzzy_attribute_match" };
                        }
                    }
                }
            }
        }

        ClickOutcome { success: false, strategy: "none" }
    }

    /// Four-strategy type cascade with readback verification.
    pub async fn type_text(&self, selector: &str, text: &str) -> TypeOutcome {
        if let Ok(el) = self.driver.find(By::Css(selector)).await {
            if el.clear().await.is_ok() && el.send_keys(text).await.is_ok() {
                if let Ok(outcome) = self.verify_typed(&el, text).await {
                    return outcome;
                }
            }
        }

        if let Ok(el) = self.driver.find(By::XPath(&format!("//*[@placeholder='{selector}' or @aria-label='{selector}']"))).await {
            if el.send_keys(text).await.is_ok() {
                if let Ok(outcome) = self.verify_typed(&el, text).await {
                    return outcome;
                }
            }
        }

        if let Ok(el) = self.driver.find(By::Css(selector)).await {
            let script = "arguments[0].value = arguments[1]; \
                arguments[0].dispatchEvent(new Event('input', {bubbles: true})); \
                arguments[0].dispatchEvent(new Event('change', {bubbles: true}));";
            if self
                .driver
                .execute(script, vec![json!(el.element_id()), json!(text)])
                .await
                .is_ok()
            {
                if let Ok(outcome) = self.verify_typed(&el, text).await {
                    return outcome;
                }
            }
        }

        if let Ok(elements) = self.driver.find_all(By::Css("[aria-label], [name], [placeholder]")).await {
            let needle = selector.to_lowercase();
            for el in elements {
                for attr in ["aria-label", "name", "placeholder"] {
                    if let Ok(Some(value)) = el.attr(attr).await {
                        if value.to_lowercase().contains(&needle) && el.send_keys(text).await.is_ok() {
                            if let Ok(outcome) = self.verify_typed(&el, text).await {
                                return outcome;
                            }
                        }
                    }
                }
            }
        }

        TypeOutcome { success: false, actual: String::new(), warning: String::new() }
    }

    async fn verify_typed(&self, element: &WebElement, intended: &str) -> Result<TypeOutcome, SsiError> {
        let actual = element
            .prop("value")
            .await
            .map_err(|e| SsiError::Browser(format!("could not read back field value: {e}")))?
            .unwrap_or_default();

        if actual == intended {
            Ok(TypeOutcome { success: true, actual, warning: String::new() })
        } else if !actual.is_empty() {
            Ok(TypeOutcome {
                success: true,
                actual,
                warning: "typed value does not exactly match intended text".to_string(),
            })
        } else {
            Ok(TypeOutcome { success: false, actual: String::new(), warning: String::new() })
        }
    }

    /// Full-resolution screenshot for milestone/error/stuck evidence capture.
    /// `thirtyfour` always returns the full viewport PNG; this is a distinct
    /// call site from [`Self::screenshot_base64`] so callers can later add
    /// vision-prompt downscaling without touching evidence capture.
    pub async fn screenshot_base64_full_res(&self) -> Result<String, SsiError> {
        self.screenshot_base64().await
    }

    pub async fn select_option(&self, selector: &str, value: &str) -> bool {
        let Ok(el) = self.driver.find(By::Css(selector)).await else {
            return false;
        };
        let script = "const opt = Array.from(arguments[0].options).find(o => \
            o.value === arguments[1] || o.textContent.trim() === arguments[1]); \
            if (opt) { arguments[0].value = opt.value; \
            arguments[0].dispatchEvent(new Event('change', {bubbles: true})); return true; } \
            return false;";
        matches!(
            self.driver.execute(script, vec![json!(el.element_id()), json!(value)]).await,
            Ok(ret) if ret.convert::<bool>().unwrap_or(false)
        )
    }

    /// Dispatches a keydown/keyup pair against the focused element. Driven
    /// through JS rather than native key events so it works the same way
    /// against whichever element currently has focus, without needing to
    /// resolve a selector first.
    pub async fn press_key(&self, key: &str) -> bool {
        const SCRIPT: &str = r#"
        const key = arguments[0];
        const target = document.activeElement || document.body;
        const opts = { key, bubbles: true, cancelable: true };
        target.dispatchEvent(new KeyboardEvent('keydown', opts));
        target.dispatchEvent(new KeyboardEvent('keyup', opts));
        if (key === 'Escape' && typeof target.blur === 'function') { target.blur(); }
        return true;
        "#;
        self.driver.execute(SCRIPT, vec![json!(key)]).await.is_ok()
    }

    pub async fn scroll_down(&self, pixels: i64) {
        let _ = self.driver.execute(&format!("window.scrollBy(0, {pixels});"), Vec::new()).await;
    }

    pub async fn scroll_to_top(&self) {
        let _ = self.driver.execute("window.scrollTo(0, 0);", Vec::new()).await;
    }

    pub async fn get_scroll_position(&self) -> i64 {
        self.driver
            .execute("return window.scrollY || document.documentElement.scrollTop || 0;", Vec::new())
            .await
            .ok()
            .and_then(|ret| ret.convert::<i64>().ok())
            .unwrap_or(0)
    }

    pub async fn wait(&self, seconds: f64) {
        tokio::time::sleep(std::time::Duration::from_millis((seconds.max(0.0) * 1000.0) as u64)).await;
    }

    /// Visible validation/error banners, gathered from common alert/error
    /// class and role selectors.
    pub async fn get_visible_errors(&self) -> Vec<String> {
        const SCRIPT: &str = r#"
        (() => {
            const sel = "[class*='error' i], [class*='alert' i], [role='alert'], .invalid-feedback, .form-error";
            return Array.from(document.querySelectorAll(sel))
                .map(el => el.textContent.trim())
                .filter(t => t.length > 0 && t.length < 300);
        })()
        "#;
        self.driver
            .execute(SCRIPT, Vec::new())
            .await
            .ok()
            .and_then(|ret| ret.convert::<Vec<String>>().ok())
            .unwrap_or_default()
    }

    pub async fn close(self) -> Result<(), SsiError> {
        self.driver
            .quit()
            .await
            .map_err(|e| SsiError::Browser(format!("webdriver session close failed: {e}")))
    }

    pub fn inner(&self) -> &WebDriver {
        &self.driver
    }
}
