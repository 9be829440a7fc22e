use async_trait::async_trait;
use ssi_common::SsiError;

use crate::message::{ChatMessage, ChatOptions, ChatResponse};

/// Polymorphic capability set a caller needs from any LLM backend:
/// text chat, vision-augmented chat, and a cheap connectivity probe.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn chat(&self, messages: &[ChatMessage], options: &ChatOptions) -> Result<ChatResponse, SsiError>;

    /// Default impl strips image parts and delegates to `chat` when the
    /// provider doesn't support vision; vision-capable providers override
    /// this to send images through.
    async fn chat_with_images(&self, messages: &[ChatMessage], options: &ChatOptions) -> Result<ChatResponse, SsiError> {
        if self.supports_vision() {
            self.chat(messages, options).await
        } else {
            let stripped: Vec<ChatMessage> = messages
                .iter()
                .map(|m| ChatMessage { role: m.role, content: m.content.strip_images() })
                .collect();
            self.chat(&stripped, options).await
        }
    }

    fn supports_vision(&self) -> bool;

    async fn check_connectivity(&self) -> Result<(), SsiError>;

    fn model_name(&self) -> &str;
}
