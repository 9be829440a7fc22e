//! Browser driver (C5) and DOM inspector (C6): an instrumented WebDriver
//! session plus the pure confidence-scoring layer that lets the agent
//! controller (C10) skip LLM calls when the DOM already answers the
//! question.

pub mod captcha;
pub mod dom_inspector;
pub mod downloads;
pub mod driver;
pub mod scan;
pub mod stealth;

pub use captcha::{detect_captcha, handle_captcha, CaptchaDetection, CaptchaResult, CaptchaType};
pub use dom_inspector::{DomInspection, DomInspector, DomScanData, Outcome};
pub use downloads::{CapturedDownload, DownloadInterceptor};
pub use driver::{BrowserSession, ClickOutcome, TypeOutcome};
pub use stealth::{build_browser_profile, BrowserProfile, ProfileOptions, ProxyPool, ProxyStrategy};
