//! Local multimodal provider (a "local multimodal provider for
//! development / cheap roles"): a raw reqwest client against a
//! locally-hosted OpenAI-compatible endpoint (Ollama, LM Studio, etc. all
//! speak this wire shape for `/v1/chat/completions`).

use async_trait::async_trait;
use ssi_common::SsiError;

use crate::message::{ChatMessage, ChatOptions, ChatResponse};
use crate::openai_compat;
use crate::provider::LlmProvider;

const DEFAULT_BASE_URL: &str = "http://localhost:11434/v1";

pub struct LocalProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
    supports_vision: bool,
}

impl LocalProvider {
    pub fn new(model: impl Into<String>, supports_vision: bool) -> Self {
        let base_url = std::env::var("SSI_LLM__LOCAL_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Self { client: reqwest::Client::new(), base_url, model: model.into(), supports_vision }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl LlmProvider for LocalProvider {
    async fn chat(&self, messages: &[ChatMessage], options: &ChatOptions) -> Result<ChatResponse, SsiError> {
        openai_compat::chat(&self.client, &self.base_url, "", &self.model, messages, options).await
    }

    fn supports_vision(&self) -> bool {
        self.supports_vision
    }

    async fn check_connectivity(&self) -> Result<(), SsiError> {
        let probe = vec![ChatMessage::user("ping")];
        let options = ChatOptions { max_tokens: 4, ..ChatOptions::default() };
        self.chat(&probe, &options).await.map(|_| ())
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_base_url_is_ollama_compatible_port() {
        std::env::remove_var("SSI_LLM__LOCAL_BASE_URL");
        let provider = LocalProvider::new("llava", true);
        assert_eq!(provider.base_url, DEFAULT_BASE_URL);
        assert!(provider.supports_vision());
    }

    #[test]
    fn with_base_url_overrides_default() {
        let provider = LocalProvider::new("llava", false).with_base_url("http://example.internal:8000/v1");
        assert_eq!(provider.base_url, "http://example.internal:8000/v1");
        assert!(!provider.supports_vision());
    }
}
