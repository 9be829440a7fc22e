//! Anti-detection: proxy rotation and fingerprint randomization. Grounded
//! verbatim on `original_source/browser/stealth.py` — the user-agent,
//! viewport, and locale/timezone tables and the stealth init script are
//! carried unchanged; `BrowserProfile` drives `thirtyfour`'s capabilities
//! builder instead of Playwright's `launch()`/`new_context()` kwargs.

use rand::seq::SliceRandom;
use std::sync::atomic::{AtomicUsize, Ordering};

const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:125.0) Gecko/20100101 Firefox/125.0",
];

const VIEWPORTS: &[(u32, u32)] = &[
    (1920, 1080),
    (1366, 768),
    (1536, 864),
    (1440, 900),
    (1280, 720),
    (1600, 900),
    (2560, 1440),
];

const LOCALE_TIMEZONE_PAIRS: &[(&str, &str)] = &[
    ("en-US", "America/New_York"),
    ("en-US", "America/Chicago"),
    ("en-US", "America/Denver"),
    ("en-US", "America/Los_Angeles"),
    ("en-GB", "Europe/London"),
    ("en-AU", "Australia/Sydney"),
    ("en-CA", "America/Toronto"),
    ("de-DE", "Europe/Berlin"),
    ("fr-FR", "Europe/Paris"),
    ("es-ES", "Europe/Madrid"),
    ("ja-JP", "Asia/Tokyo"),
    ("pt-BR", "America/Sao_Paulo"),
];

/// Injected via `driver.execute_cdp` (`Page.addScriptToEvaluateOnNewDocument`)
/// before navigation so it runs in every frame from the start.
pub const STEALTH_SCRIPT: &str = r#"
Object.defineProperty(navigator, 'webdriver', { get: () => undefined });

if (!window.chrome) window.chrome = {};
if (!window.chrome.runtime) window.chrome.runtime = {};

Object.defineProperty(navigator, 'plugins', {
    get: () => [1, 2, 3, 4, 5],
});

Object.defineProperty(navigator, 'languages', {
    get: () => ['en-US', 'en'],
});

const originalQuery = window.navigator.permissions.query;
window.navigator.permissions.query = (parameters) =>
    parameters.name === 'notifications'
        ? Promise.resolve({ state: Notification.permission })
        : originalQuery(parameters);
"#;

#[derive(Debug, Clone, Copy)]
pub enum ProxyStrategy {
    RoundRobin,
    Random,
}

/// Thread-safe round-robin or random proxy selector.
pub struct ProxyPool {
    proxies: Vec<String>,
    strategy: ProxyStrategy,
    cursor: AtomicUsize,
}

impl ProxyPool {
    pub fn new(proxies: Vec<String>, strategy: ProxyStrategy) -> Self {
        Self {
            proxies: proxies.into_iter().map(|p| p.trim().to_string()).filter(|p| !p.is_empty()).collect(),
            strategy,
            cursor: AtomicUsize::new(0),
        }
    }

    pub fn available(&self) -> bool {
        !self.proxies.is_empty()
    }

    pub fn size(&self) -> usize {
        self.proxies.len()
    }

    pub fn next(&self) -> Option<String> {
        if self.proxies.is_empty() {
            return None;
        }
        match self.strategy {
            ProxyStrategy::Random => self.proxies.choose(&mut rand::thread_rng()).cloned(),
            ProxyStrategy::RoundRobin => {
                let idx = self.cursor.fetch_add(1, Ordering::Relaxed) % self.proxies.len();
                Some(self.proxies[idx].clone())
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct BrowserProfile {
    pub user_agent: String,
    pub viewport: (u32, u32),
    pub locale: String,
    pub timezone_id: String,
    pub proxy_url: Option<String>,
    pub device_scale_factor: f64,
}

pub struct ProfileOptions<'a> {
    pub proxy_pool: Option<&'a ProxyPool>,
    pub explicit_proxy: Option<&'a str>,
    pub explicit_user_agent: Option<&'a str>,
    pub randomize_fingerprint: bool,
}

/// Build a [`BrowserProfile`] with optional proxy and fingerprint
/// randomization.
pub fn build_browser_profile(opts: ProfileOptions) -> BrowserProfile {
    let mut rng = rand::thread_rng();
    let mut profile = BrowserProfile::default();

    profile.proxy_url = opts
        .proxy_pool
        .filter(|pool| pool.available())
        .and_then(|pool| pool.next())
        .or_else(|| opts.explicit_proxy.map(|p| p.trim().to_string()).filter(|p| !p.is_empty()));

    if let Some(ua) = opts.explicit_user_agent {
        profile.user_agent = ua.to_string();
    } else if opts.randomize_fingerprint {
        profile.user_agent = USER_AGENTS.choose(&mut rng).unwrap().to_string();
    }

    if opts.randomize_fingerprint {
        profile.viewport = *VIEWPORTS.choose(&mut rng).unwrap();
        let (locale, tz) = LOCALE_TIMEZONE_PAIRS.choose(&mut rng).unwrap();
        profile.locale = locale.to_string();
        profile.timezone_id = tz.to_string();
        profile.device_scale_factor = *[1.0, 1.5, 2.0].choose(&mut rng).unwrap();
    }

    profile
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_robin_cycles_through_all_proxies() {
        let pool = ProxyPool::new(
            vec!["socks5://a".into(), "socks5://b".into()],
            ProxyStrategy::RoundRobin,
        );
        assert_eq!(pool.next().as_deref(), Some("socks5://a"));
        assert_eq!(pool.next().as_deref(), Some("socks5://b"));
        assert_eq!(pool.next().as_deref(), Some("socks5://a"));
    }

    #[test]
    fn empty_pool_is_unavailable() {
        let pool = ProxyPool::new(vec![], ProxyStrategy::RoundRobin);
        assert!(!pool.available());
        assert!(pool.next().is_none());
    }

    #[test]
    fn explicit_proxy_overrides_randomization_when_pool_empty() {
        let pool = ProxyPool::new(vec![], ProxyStrategy::RoundRobin);
        let profile = build_browser_profile(ProfileOptions {
            proxy_pool: Some(&pool),
            explicit_proxy: Some("http://explicit"),
            explicit_user_agent: None,
            randomize_fingerprint: true,
        });
        assert_eq!(profile.proxy_url.as_deref(), Some("http://explicit"));
    }
}
