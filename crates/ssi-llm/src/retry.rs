//! Retry decorator: wraps any [`LlmProvider`] with jittered
//! exponential back-off. A composition wrapper rather than a trait default,
//! composed rather than inherited, so any provider can opt in.

use async_trait::async_trait;
use rand::Rng;
use ssi_common::SsiError;
use std::sync::Arc;
use std::time::Duration;

use crate::message::{ChatMessage, ChatOptions, ChatResponse};
use crate::provider::LlmProvider;

const INITIAL_DELAY: Duration = Duration::from_secs(1);
const BACKOFF_FACTOR: u32 = 2;
const MAX_DELAY: Duration = Duration::from_secs(30);
const MAX_ATTEMPTS: u32 = 4;

pub struct RetryingProvider {
    inner: Arc<dyn LlmProvider>,
}

impl RetryingProvider {
    pub fn new(inner: Arc<dyn LlmProvider>) -> Self {
        Self { inner }
    }

    async fn with_retry<F, Fut>(&self, op: F) -> Result<ChatResponse, SsiError>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<ChatResponse, SsiError>>,
    {
        let mut delay = INITIAL_DELAY;
        let mut last_err = None;

        for attempt in 1..=MAX_ATTEMPTS {
            match op().await {
                Ok(response) => return Ok(response),
                Err(err) => {
                    tracing::warn!(attempt, model = self.inner.model_name(), error = %err, "LLM call failed, retrying");
                    last_err = Some(err);
                    if attempt < MAX_ATTEMPTS {
                        let jitter = rand::thread_rng().gen_range(0.5..1.5);
                        let jittered = delay.mul_f64(jitter).min(MAX_DELAY);
                        tokio::time::sleep(jittered).await;
                        delay = (delay * BACKOFF_FACTOR).min(MAX_DELAY);
                    }
                }
            }
        }

        Err(last_err.unwrap_or_else(|| SsiError::Llm("retry loop exhausted with no recorded error".to_string())))
    }
}

#[async_trait]
impl LlmProvider for RetryingProvider {
    async fn chat(&self, messages: &[ChatMessage], options: &ChatOptions) -> Result<ChatResponse, SsiError> {
        self.with_retry(|| self.inner.chat(messages, options)).await
    }

    async fn chat_with_images(&self, messages: &[ChatMessage], options: &ChatOptions) -> Result<ChatResponse, SsiError> {
        self.with_retry(|| self.inner.chat_with_images(messages, options)).await
    }

    fn supports_vision(&self) -> bool {
        self.inner.supports_vision()
    }

    async fn check_connectivity(&self) -> Result<(), SsiError> {
        self.inner.check_connectivity().await
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FlakyProvider {
        fail_times: AtomicU32,
    }

    #[async_trait]
    impl LlmProvider for FlakyProvider {
        async fn chat(&self, _messages: &[ChatMessage], _options: &ChatOptions) -> Result<ChatResponse, SsiError> {
            if self.fail_times.fetch_sub(1, Ordering::SeqCst) > 0 {
                Err(SsiError::Llm("transient".to_string()))
            } else {
                Ok(ChatResponse { content: "ok".to_string(), input_tokens: 1, output_tokens: 1, latency_ms: 0, model: "test".to_string() })
            }
        }

        fn supports_vision(&self) -> bool {
            false
        }

        async fn check_connectivity(&self) -> Result<(), SsiError> {
            Ok(())
        }

        fn model_name(&self) -> &str {
            "test"
        }
    }

    #[tokio::test]
    async fn retries_until_success_within_budget() {
        let provider = RetryingProvider::new(Arc::new(FlakyProvider { fail_times: AtomicU32::new(2) }));
        let result = provider.chat(&[ChatMessage::user("hi")], &ChatOptions::default()).await;
        assert_eq!(result.unwrap().content, "ok");
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let provider = RetryingProvider::new(Arc::new(FlakyProvider { fail_times: AtomicU32::new(10) }));
        let result = provider.chat(&[ChatMessage::user("hi")], &ChatOptions::default()).await;
        assert!(result.is_err());
    }
}
