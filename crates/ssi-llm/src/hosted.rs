//! Hosted multimodal/text LLM provider, generalizing the teacher's
//! `call_openai`/`call_anthropic` pair (`analyzer-llm/src/analyzer.rs`) into
//! one provider struct keyed by `HostedKind`.
//!
//! OpenAI is the vision-capable variant (at least one hosted
//! multimodal provider"), using the raw OpenAI-compatible request shape in
//! [`crate::openai_compat`] so image parts reach the API. Anthropic stays
//! text-only here via `rig-core`, matching exactly what's already
//! demonstrates; a caller that sends it images gets the default
//! image-stripping fallback from [`crate::provider::LlmProvider`].

use async_trait::async_trait;
use rig::completion::Prompt;
use rig::providers::{anthropic, openai};
use ssi_common::SsiError;
use std::time::Instant;

use crate::message::{ChatMessage, ChatOptions, ChatResponse, Role};
use crate::openai_compat;
use crate::provider::LlmProvider;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostedKind {
    OpenAi,
    Anthropic,
}

pub struct HostedProvider {
    kind: HostedKind,
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl HostedProvider {
    pub fn new(kind: HostedKind, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self { kind, client: reqwest::Client::new(), api_key: api_key.into(), model: model.into() }
    }

    fn transcript_and_preamble(messages: &[ChatMessage]) -> (String, String) {
        let mut preamble_parts = Vec::new();
        let mut transcript_parts = Vec::new();

        for message in messages {
            match message.role {
                Role::System => preamble_parts.push(message.content.as_text()),
                Role::User => transcript_parts.push(format!("USER: {}", message.content.as_text())),
                Role::Assistant => transcript_parts.push(format!("ASSISTANT: {}", message.content.as_text())),
            }
        }

        (preamble_parts.join("\n\n"), transcript_parts.join("\n\n"))
    }

    async fn chat_rig(&self, messages: &[ChatMessage], options: &ChatOptions) -> Result<ChatResponse, SsiError> {
        let (preamble, prompt_text) = Self::transcript_and_preamble(messages);
        let started = Instant::now();

        let content = match self.kind {
            HostedKind::OpenAi => {
                let client = openai::Client::new(&self.api_key);
                let agent = client
                    .agent(&self.model)
                    .preamble(&preamble)
                    .temperature(options.temperature as f64)
                    .max_tokens(options.max_tokens as u64)
                    .build();
                agent
                    .prompt(&prompt_text)
                    .await
                    .map_err(|e| SsiError::Llm(format!("openai error: {e}")))?
            }
            HostedKind::Anthropic => {
                let client = anthropic::Client::new(&self.api_key, "https://api.anthropic.com", None, "2023-06-01");
                let agent = client
                    .agent(&self.model)
                    .preamble(&preamble)
                    .temperature(options.temperature as f64)
                    .max_tokens(options.max_tokens as u64)
                    .build();
                agent
                    .prompt(&prompt_text)
                    .await
                    .map_err(|e| SsiError::Llm(format!("anthropic error: {e}")))?
            }
        };

        Ok(ChatResponse {
            input_tokens: estimate_tokens(&preamble) + estimate_tokens(&prompt_text),
            output_tokens: estimate_tokens(&content),
            latency_ms: started.elapsed().as_millis() as u64,
            model: self.model.clone(),
            content,
        })
    }
}

/// `rig-core`'s simple prompt API doesn't surface token usage; this is a
/// rough `chars / 4` estimate used only when the real API doesn't report it.
fn estimate_tokens(text: &str) -> u32 {
    (text.len() as u32 / 4).max(if text.is_empty() { 0 } else { 1 })
}

#[async_trait]
impl LlmProvider for HostedProvider {
    async fn chat(&self, messages: &[ChatMessage], options: &ChatOptions) -> Result<ChatResponse, SsiError> {
        self.chat_rig(messages, options).await
    }

    async fn chat_with_images(&self, messages: &[ChatMessage], options: &ChatOptions) -> Result<ChatResponse, SsiError> {
        match self.kind {
            HostedKind::OpenAi => {
                openai_compat::chat(&self.client, "https://api.openai.com/v1", &self.api_key, &self.model, messages, options)
                    .await
            }
            HostedKind::Anthropic => {
                let stripped: Vec<ChatMessage> = messages
                    .iter()
                    .map(|m| ChatMessage { role: m.role, content: m.content.strip_images() })
                    .collect();
                self.chat_rig(&stripped, options).await
            }
        }
    }

    fn supports_vision(&self) -> bool {
        matches!(self.kind, HostedKind::OpenAi)
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
    fn transcript_separates_system_from_turns() {
        let messages = vec![
            ChatMessage::system("You are a fraud analyst."),
            ChatMessage::user("What state is this?"),
            ChatMessage::assistant("FIND_REGISTER"),
        ];
        let (preamble, transcript) = HostedProvider::transcript_and_preamble(&messages);
        assert_eq!(preamble, "You are a fraud analyst.");
        assert!(transcript.contains("USER: What state is this?"));
        assert!(transcript.contains("ASSISTANT: FIND_REGISTER"));
    }

    #[test]
    fn token_estimate_is_nonzero_for_nonempty_text() {
        assert_eq!(estimate_tokens(""), 0);
        assert!(estimate_tokens("a short prompt") > 0);
    }
}
