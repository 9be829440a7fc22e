//! Process-wide configuration, resolved once from the environment.
//!
//! Mirrors the `LlmConfig::from_env` pattern from the `analyzer-llm` crate,
//! generalised to a full namespaced key surface. `Settings` is immutable for
//! the duration of an investigation.

use std::collections::HashMap;
use std::env;
use std::time::Duration;

/// Top-level settings, nested by subsystem.
#[derive(Debug, Clone)]
pub struct Settings {
    pub llm: LlmSettings,
    pub browser: BrowserSettings,
    pub agent: AgentSettings,
    pub evidence: EvidenceSettings,
    pub store: StoreSettings,
    pub cost: CostSettings,
}

#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub provider: String,
    pub model: String,
    pub cheap_model: String,
    pub vision_model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub token_budget_per_session: u64,
    pub call_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct BrowserSettings {
    pub headless: bool,
    pub proxy_urls: Vec<String>,
    pub user_agent: Option<String>,
    pub action_timeout: Duration,
    pub capture_har: bool,
    pub capture_video: bool,
    pub randomise_fingerprint: bool,
    pub apply_stealth_scripts: bool,
    pub captcha_strategy: CaptchaStrategy,
    pub captcha_wait_seconds: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptchaStrategy {
    Skip,
    Wait,
    Solver,
}

impl CaptchaStrategy {
    fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "wait" => CaptchaStrategy::Wait,
            "solver" => CaptchaStrategy::Solver,
            _ => CaptchaStrategy::Skip,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AgentSettings {
    /// Per-state action-count threshold before a state is considered stuck,
    /// keyed by `AgentState::as_str()` with a `"DEFAULT"` fallback — mirrors
    /// `agent_cfg.stuck_thresholds.get(state, get("DEFAULT", 15))` in the
    /// original controller.
    pub stuck_thresholds: HashMap<String, u32>,
    pub max_actions_per_site: u32,
    pub max_repeated_actions: u32,
    /// Per-state blank-page retry budget, same keying scheme as
    /// `stuck_thresholds`.
    pub blank_page_max_retries: HashMap<String, u32>,
    pub overlay_dismiss_enabled: bool,
    pub dom_inspection_enabled: bool,
    pub dom_direct_threshold: i32,
    pub dom_assisted_threshold: i32,
    pub last_actions_window: usize,
}

impl AgentSettings {
    pub fn stuck_threshold_for(&self, state: &str) -> u32 {
        lookup_with_default(&self.stuck_thresholds, state, 15)
    }

    pub fn blank_page_max_retries_for(&self, state: &str) -> u32 {
        lookup_with_default(&self.blank_page_max_retries, state, 3)
    }
}

fn lookup_with_default(map: &HashMap<String, u32>, state: &str, fallback: u32) -> u32 {
    map.get(state).copied().unwrap_or_else(|| map.get("DEFAULT").copied().unwrap_or(fallback))
}

#[derive(Debug, Clone)]
pub struct EvidenceSettings {
    pub output_dir: String,
    pub storage_backend: StorageBackend,
    pub bucket: Option<String>,
    pub prefix: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Local,
    Gcs,
}

#[derive(Debug, Clone)]
pub struct StoreSettings {
    pub backend: StoreBackend,
    pub sqlite_path: Option<String>,
    pub cloudsql_instance: Option<String>,
    pub cloudsql_user: Option<String>,
    pub cloudsql_database: Option<String>,
    pub cloudsql_iam_auth: bool,
}

/// Backend selection (`sqlite|cloudsql`). `ssi-store` wires both sqlx
/// backends behind this enum (see DESIGN.md Open Question 3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Sqlite,
    CloudSql,
}

#[derive(Debug, Clone)]
pub struct CostSettings {
    pub enabled: bool,
    pub budget_usd: f64,
}

fn env_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .ok()
        .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}

fn env_u32(key: &str, default: u32) -> u32 {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_i32(key: &str, default: i32) -> i32 {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_f64(key: &str, default: f64) -> f64 {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_str(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parses a JSON object env var (`{"STATE": 20, "DEFAULT": 15}`) into a
/// per-state map, seeded with `"DEFAULT" -> default` so the map is never
/// empty even when the env var is unset or malformed.
fn env_u32_map(key: &str, default: u32) -> HashMap<String, u32> {
    let mut map = HashMap::new();
    map.insert("DEFAULT".to_string(), default);
    if let Ok(raw) = env::var(key) {
        match serde_json::from_str::<HashMap<String, u32>>(&raw) {
            Ok(parsed) => map.extend(parsed),
            Err(err) => tracing::warn!(key, error = %err, "malformed per-state config map, using defaults"),
        }
    }
    map
}

impl Settings {
    /// Load configuration from environment variables, calling
    /// `dotenv::dotenv().ok()` first (matching the established
    /// `LlmConfig::from_env`).
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();

        Settings {
            llm: LlmSettings {
                provider: env_str("SSI_LLM__PROVIDER", "openai"),
                model: env_str("SSI_LLM__MODEL", "gpt-4o"),
                cheap_model: env_str("SSI_LLM__CHEAP_MODEL", "gpt-4o-mini"),
                vision_model: env_str("SSI_LLM__VISION_MODEL", "gpt-4o"),
                temperature: env_f64("SSI_LLM__TEMPERATURE", 0.2) as f32,
                max_tokens: env_u32("SSI_LLM__MAX_TOKENS", 2048),
                token_budget_per_session: env_u64("SSI_LLM__TOKEN_BUDGET_PER_SESSION", 200_000),
                call_timeout: Duration::from_secs(env_u64("SSI_LLM__CALL_TIMEOUT_SECONDS", 120)),
            },
            browser: BrowserSettings {
                headless: env_bool("SSI_BROWSER__HEADLESS", true),
                proxy_urls: env::var("SSI_BROWSER__PROXY_URLS")
                    .map(|v| v.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect())
                    .unwrap_or_default(),
                user_agent: env::var("SSI_BROWSER__USER_AGENT").ok(),
                action_timeout: Duration::from_secs(env_u64("SSI_BROWSER__ACTION_TIMEOUT_SECONDS", 30)),
                capture_har: env_bool("SSI_BROWSER__CAPTURE_HAR", true),
                capture_video: env_bool("SSI_BROWSER__CAPTURE_VIDEO", false),
                randomise_fingerprint: env_bool("SSI_STEALTH__RANDOMISE_FINGERPRINT", true),
                apply_stealth_scripts: env_bool("SSI_STEALTH__APPLY_STEALTH_SCRIPTS", true),
                captcha_strategy: CaptchaStrategy::parse(&env_str("SSI_CAPTCHA__STRATEGY", "skip")),
                captcha_wait_seconds: env_u64("SSI_CAPTCHA__WAIT_SECONDS", 10),
            },
            agent: AgentSettings {
                stuck_thresholds: env_u32_map("SSI_AGENT__STUCK_THRESHOLDS", 15),
                max_actions_per_site: env_u32("SSI_AGENT__MAX_ACTIONS_PER_SITE", 40),
                max_repeated_actions: env_u32("SSI_AGENT__MAX_REPEATED_ACTIONS", 3),
                blank_page_max_retries: env_u32_map("SSI_AGENT__BLANK_PAGE_MAX_RETRIES", 3),
                overlay_dismiss_enabled: env_bool("SSI_AGENT__OVERLAY_DISMISS_ENABLED", true),
                dom_inspection_enabled: env_bool("SSI_AGENT__DOM_INSPECTION_ENABLED", true),
                dom_direct_threshold: env_i32("SSI_AGENT__DOM_DIRECT_THRESHOLD", 75),
                dom_assisted_threshold: env_i32("SSI_AGENT__DOM_ASSISTED_THRESHOLD", 40),
                last_actions_window: env_u32("SSI_AGENT__LAST_ACTIONS_WINDOW", 5) as usize,
            },
            evidence: EvidenceSettings {
                output_dir: env_str("SSI_EVIDENCE__OUTPUT_DIR", "./ssi_output"),
                storage_backend: match env_str("SSI_EVIDENCE__STORAGE_BACKEND", "local").as_str() {
                    "gcs" => StorageBackend::Gcs,
                    _ => StorageBackend::Local,
                },
                bucket: env::var("SSI_EVIDENCE__BUCKET").ok(),
                prefix: env::var("SSI_EVIDENCE__PREFIX").ok(),
            },
            store: StoreSettings {
                backend: match env_str("SSI_STORE__BACKEND", "sqlite").as_str() {
                    "cloudsql" => StoreBackend::CloudSql,
                    _ => StoreBackend::Sqlite,
                },
                sqlite_path: env::var("SSI_STORE__SQLITE_PATH").ok(),
                cloudsql_instance: env::var("SSI_STORE__CLOUDSQL_INSTANCE").ok(),
                cloudsql_user: env::var("SSI_STORE__CLOUDSQL_USER").ok(),
                cloudsql_database: env::var("SSI_STORE__CLOUDSQL_DATABASE").ok(),
                cloudsql_iam_auth: env_bool("SSI_STORE__CLOUDSQL_IAM_AUTH", false),
            },
            cost: CostSettings {
                enabled: env_bool("SSI_COST__ENABLED", true),
                budget_usd: env_f64("SSI_COST__BUDGET_USD", 5.0),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let settings = Settings::from_env();
        assert!(settings.agent.dom_direct_threshold > settings.agent.dom_assisted_threshold);
        assert!(settings.llm.max_tokens > 0);
    }

    #[test]
    fn captcha_strategy_parses_case_insensitively() {
        assert_eq!(CaptchaStrategy::parse("WAIT"), CaptchaStrategy::Wait);
        assert_eq!(CaptchaStrategy::parse("solver"), CaptchaStrategy::Solver);
        assert_eq!(CaptchaStrategy::parse("bogus"), CaptchaStrategy::Skip);
    }
}
