//! Capability-based role factory: selects provider + model by
//! role (`primary | cheap | vision`) from [`ssi_common::config::LlmSettings`]
//! and wraps every provider in the [`crate::retry::RetryingProvider`]
//! decorator before handing it back.

use std::sync::Arc;

use ssi_common::config::LlmSettings;

use crate::hosted::{HostedKind, HostedProvider};
use crate::local::LocalProvider;
use crate::provider::LlmProvider;
use crate::retry::RetryingProvider;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmRole {
    Primary,
    Cheap,
    Vision,
}

fn model_for_role(settings: &LlmSettings, role: LlmRole) -> String {
    match role {
        LlmRole::Primary => settings.model.clone(),
        LlmRole::Cheap => settings.cheap_model.clone(),
        LlmRole::Vision => settings.vision_model.clone(),
    }
}

fn api_key_for(provider_name: &str) -> String {
    let env_var = match provider_name.to_lowercase().as_str() {
        "anthropic" | "claude" => "ANTHROPIC_API_KEY",
        _ => "OPENAI_API_KEY",
    };
    std::env::var(env_var).unwrap_or_default()
}

/// Builds the provider appropriate for `role`, honouring `settings.provider`
/// ("openai", "anthropic", "local") and wrapping it with retry.
pub fn build_provider(settings: &LlmSettings, role: LlmRole) -> Arc<dyn LlmProvider> {
    let model = model_for_role(settings, role);

    let inner: Arc<dyn LlmProvider> = match settings.provider.to_lowercase().as_str() {
        "anthropic" | "claude" => Arc::new(HostedProvider::new(HostedKind::Anthropic, api_key_for("anthropic"), model)),
        "local" | "ollama" => Arc::new(LocalProvider::new(model, role == LlmRole::Vision)),
        _ => Arc::new(HostedProvider::new(HostedKind::OpenAi, api_key_for("openai"), model)),
    };

    Arc::new(RetryingProvider::new(inner))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn test_settings(provider: &str) -> LlmSettings {
        LlmSettings {
            provider: provider.to_string(),
            model: "gpt-4o".to_string(),
            cheap_model: "gpt-4o-mini".to_string(),
            vision_model: "gpt-4o".to_string(),
            temperature: 0.2,
            max_tokens: 2048,
            token_budget_per_session: 200_000,
            call_timeout: Duration::from_secs(120),
        }
    }

    #[test]
    fn builds_openai_provider_by_default() {
        let settings = test_settings("openai");
        let provider = build_provider(&settings, LlmRole::Vision);
        assert_eq!(provider.model_name(), "gpt-4o");
        assert!(provider.supports_vision());
    }

    #[test]
    fn cheap_role_selects_cheap_model() {
        let settings = test_settings("openai");
        let provider = build_provider(&settings, LlmRole::Cheap);
        assert_eq!(provider.model_name(), "gpt-4o-mini");
    }

    #[test]
    fn local_provider_used_for_local_setting() {
        let settings = test_settings("local");
        let provider = build_provider(&settings, LlmRole::Primary);
        assert_eq!(provider.model_name(), "gpt-4o");
    }
}
