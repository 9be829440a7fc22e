//! Page analyzer (C9): sends screenshots to the LLM and turns the response
//! into a structured [`AgentAction`]. Grounded on
//! `original_source/browser/page_analyzer.py` — conversation window
//! management, old-image stripping, batch-mode fill, and the JSON parsing
//! fallback tree are all carried from there.

use std::sync::Arc;

use serde_json::Value;
use ssi_common::{ActionType, AgentAction};
use ssi_llm::{ChatMessage, ChatOptions, ChatResponse, ContentPart, LlmProvider, MessageContent, Role};

use crate::prompts::{batch_system_prompt, SYSTEM_PROMPT};

const MAX_PAGE_TEXT_CHARS: usize = 3000;
const DEFAULT_MAX_CONTEXT_MESSAGES: usize = 10;
const DEFAULT_MAX_TOKENS: u32 = 4096;
const KEEP_RECENT_IMAGES: usize = 2;

#[derive(Debug, Clone, Default)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub api_calls: u32,
    pub total_latency_ms: u64,
}

impl TokenUsage {
    pub fn add(&mut self, result: &ChatResponse) {
        self.input_tokens += result.input_tokens as u64;
        self.output_tokens += result.output_tokens as u64;
        self.total_latency_ms += result.latency_ms;
        self.api_calls += 1;
    }

    pub fn reset(&mut self) {
        *self = TokenUsage::default();
    }
}

pub struct PageAnalyzer {
    llm: Arc<dyn LlmProvider>,
    max_context_messages: usize,
    max_tokens: u32,
    conversation: Vec<ChatMessage>,
    pub usage: TokenUsage,
    pub last_call_result: Option<ChatResponse>,
}

impl PageAnalyzer {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self {
            llm,
            max_context_messages: DEFAULT_MAX_CONTEXT_MESSAGES,
            max_tokens: DEFAULT_MAX_TOKENS,
            conversation: Vec::new(),
            usage: TokenUsage::default(),
            last_call_result: None,
        }
    }

    pub fn with_limits(mut self, max_context_messages: usize, max_tokens: u32) -> Self {
        self.max_context_messages = max_context_messages;
        self.max_tokens = max_tokens;
        self
    }

    pub fn reset_conversation(&mut self) {
        self.conversation.clear();
        self.usage.reset();
        self.last_call_result = None;
    }

    fn build_context(state: &str, page_text: &str, page_url: &str, extra_context: &str) -> String {
        let mut text = format!("Current state: {state}\nCurrent URL: {page_url}\n");
        if !page_text.is_empty() {
            let truncated: String = page_text.chars().take(MAX_PAGE_TEXT_CHARS).collect();
            text.push_str(&format!("\nVisible page text:\n{truncated}\n"));
        }
        if !extra_context.is_empty() {
            text.push_str(&format!("\n{extra_context}\n"));
        }
        text
    }

    pub async fn analyze_page(
        &mut self,
        screenshot_b64: &str,
        state: &str,
        page_text: &str,
        page_url: &str,
        extra_context: &str,
        include_screenshot: bool,
    ) -> AgentAction {
        let mut parts = Vec::new();
        if include_screenshot && !screenshot_b64.is_empty() {
            parts.push(ContentPart::Image { media_type: "image/png".to_string(), data: screenshot_b64.to_string() });
        }
        let mut text_context = Self::build_context(state, page_text, page_url, extra_context);
        text_context.push_str("\nWhat is the next action? Respond with JSON only.");
        parts.push(ContentPart::Text { text: text_context });

        let user_msg = ChatMessage { role: Role::User, content: MessageContent::Parts(parts) };
        self.conversation.push(user_msg);
        self.trim_conversation();

        let mut messages = vec![ChatMessage::system(SYSTEM_PROMPT)];
        messages.extend(self.conversation.iter().cloned());

        let options = ChatOptions { max_tokens: self.max_tokens, json_mode: true, ..ChatOptions::default() };

        match self.llm.chat_with_images(&messages, &options).await {
            Ok(result) => {
                self.usage.add(&result);
                self.last_call_result = Some(result.clone());

                let raw_text = result.content.trim().to_string();
                if raw_text.is_empty() {
                    tracing::error!("LLM returned empty response");
                    self.conversation.pop();
                    return AgentAction::stuck("LLM returned empty response", 0.0);
                }

                self.conversation.push(ChatMessage::assistant(raw_text.clone()));

                match parse_response(&raw_text) {
                    Ok(action) => {
                        tracing::info!(
                            action = ?action.action,
                            confidence = action.confidence,
                            reasoning = %action.reasoning,
                            "LLM action"
                        );
                        action
                    }
                    Err(e) => {
                        tracing::error!(error = %e, raw = %raw_text, "failed to parse LLM response");
                        self.rollback_last_turn();
                        AgentAction::stuck(format!("Failed to parse LLM response: {e}"), 0.0)
                    }
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "LLM call failed");
                if matches!(self.conversation.last(), Some(m) if m.role == Role::User) {
                    self.conversation.pop();
                }
                AgentAction::stuck(format!("LLM call failed: {e}"), 0.0)
            }
        }
    }

    pub async fn analyze_with_human_guidance(
        &mut self,
        screenshot_b64: &str,
        state: &str,
        human_instruction: &str,
        page_url: &str,
    ) -> AgentAction {
        let extra = format!("HUMAN OPERATOR GUIDANCE: {human_instruction}\nFollow the operator's instruction to proceed.");
        self.analyze_page(screenshot_b64, state, "", page_url, &extra, true).await
    }

    pub async fn analyze_page_batch(
        &mut self,
        screenshot_b64: &str,
        state: &str,
        page_text: &str,
        page_url: &str,
        extra_context: &str,
    ) -> Vec<AgentAction> {
        let mut text_context = Self::build_context(state, page_text, page_url, extra_context);
        text_context.push_str("\nReturn ALL form-fill actions as a JSON array. Only type and select actions for visible required fields.");

        let parts = vec![
            ContentPart::Image { media_type: "image/png".to_string(), data: screenshot_b64.to_string() },
            ContentPart::Text { text: text_context },
        ];
        let user_msg = ChatMessage { role: Role::User, content: MessageContent::Parts(parts) };

        let messages = vec![ChatMessage::system(batch_system_prompt()), user_msg];
        let options = ChatOptions { max_tokens: self.max_tokens, json_mode: true, ..ChatOptions::default() };

        match self.llm.chat_with_images(&messages, &options).await {
            Ok(result) => {
                self.usage.add(&result);
                self.last_call_result = Some(result.clone());

                let raw_text = result.content.trim().to_string();
                if raw_text.is_empty() {
                    return vec![AgentAction::stuck("Batch returned empty response", 0.0)];
                }
                parse_batch_response(&raw_text)
            }
            Err(e) => {
                tracing::error!(error = %e, "batch LLM call failed");
                vec![AgentAction::stuck(format!("Unexpected batch error: {e}"), 0.0)]
            }
        }
    }

    fn rollback_last_turn(&mut self) {
        while matches!(self.conversation.last(), Some(m) if m.role != Role::User) {
            self.conversation.pop();
        }
        if !self.conversation.is_empty() {
            self.conversation.pop();
        }
    }

    /// Keeps a rolling window and strips old images to cut token costs:
    /// drops the oldest messages, then replaces image parts in all but the
    /// last [`KEEP_RECENT_IMAGES`] user messages with a text placeholder.
    fn trim_conversation(&mut self) {
        if self.conversation.len() > self.max_context_messages {
            let excess = self.conversation.len() - self.max_context_messages;
            self.conversation.drain(0..excess);
        }

        let user_indices: Vec<usize> = self
            .conversation
            .iter()
            .enumerate()
            .filter(|(_, m)| m.role == Role::User)
            .map(|(i, _)| i)
            .collect();

        if user_indices.len() > KEEP_RECENT_IMAGES {
            for &idx in &user_indices[..user_indices.len() - KEEP_RECENT_IMAGES] {
                if let MessageContent::Parts(parts) = &self.conversation[idx].content {
                    let stripped: Vec<ContentPart> = parts
                        .iter()
                        .map(|p| match p {
                            ContentPart::Image { .. } => ContentPart::Text { text: "[Previous screenshot omitted]".to_string() },
                            ContentPart::Text { text } => ContentPart::Text { text: text.clone() },
                        })
                        .collect();
                    self.conversation[idx].content = MessageContent::Parts(stripped);
                }
            }
        }
    }
}

fn strip_code_fence(raw_text: &str) -> String {
    if let Some(rest) = raw_text.strip_prefix("```") {
        let mut parts = rest.splitn(2, "```");
        let body = parts.next().unwrap_or("");
        let body = body.strip_prefix("json").unwrap_or(body);
        return body.trim().to_string();
    }
    raw_text.to_string()
}

/// Parses a single-action LLM response. The LLM sometimes returns `value`
/// as a list/dict (e.g. wallet data) instead of a string — that gets
/// re-serialized to a JSON string before struct deserialization, matching
/// the source behaviour.
fn parse_response(raw_text: &str) -> Result<AgentAction, serde_json::Error> {
    let text = strip_code_fence(raw_text);
    let mut value: Value = serde_json::from_str(&text)?;
    normalize_value_field(&mut value);
    serde_json::from_value(value)
}

fn normalize_value_field(value: &mut Value) {
    if let Some(obj) = value.as_object_mut() {
        if let Some(v) = obj.get("value") {
            if !v.is_string() {
                let as_string = serde_json::to_string(v).unwrap_or_default();
                obj.insert("value".to_string(), Value::String(as_string));
            }
        }
    }
}

fn parse_batch_response(raw_text: &str) -> Vec<AgentAction> {
    let text = strip_code_fence(raw_text);
    let parsed: Value = match serde_json::from_str(&text) {
        Ok(v) => v,
        Err(e) => return vec![AgentAction::stuck(format!("Batch JSON parse failed: {e}"), 0.0)],
    };

    let items: Vec<Value> = match parsed {
        Value::Array(items) => items,
        Value::Object(obj) => {
            let wrapped = ["actions", "fills", "fields"].iter().find_map(|key| obj.get(*key));
            match wrapped.and_then(|v| v.as_array()) {
                Some(arr) => arr.clone(),
                None => return vec![AgentAction::stuck("Batch dict had no action list", 0.0)],
            }
        }
        _ => return vec![AgentAction::stuck("Batch was not a non-empty list", 0.0)],
    };

    if items.is_empty() {
        return vec![AgentAction::stuck("Batch was not a non-empty list", 0.0)];
    }

    let mut actions = Vec::new();
    for mut item in items {
        normalize_value_field(&mut item);
        match serde_json::from_value::<AgentAction>(item) {
            Ok(action) if matches!(action.action, ActionType::Type | ActionType::Select | ActionType::Click) => {
                actions.push(action);
            }
            Ok(action) => {
                tracing::warn!(action = ?action.action, "batch contained non-fill action, skipping");
            }
            Err(e) => {
                tracing::warn!(error = %e, "skipping malformed batch item");
            }
        }
    }

    if actions.is_empty() {
        return vec![AgentAction::stuck("Batch produced no valid fill actions", 0.0)];
    }

    actions
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ssi_common::SsiError;
    use std::sync::Mutex;

    struct ScriptedLlm {
        responses: Mutex<Vec<&'static str>>,
    }

    #[async_trait]
    impl LlmProvider for ScriptedLlm {
        async fn chat(&self, _messages: &[ChatMessage], _options: &ChatOptions) -> Result<ChatResponse, SsiError> {
            unreachable!("analyzer always calls chat_with_images")
        }

        async fn chat_with_images(&self, _messages: &[ChatMessage], _options: &ChatOptions) -> Result<ChatResponse, SsiError> {
            let next = self.responses.lock().unwrap().remove(0);
            Ok(ChatResponse { content: next.to_string(), input_tokens: 10, output_tokens: 5, latency_ms: 1, model: "test".to_string() })
        }

        fn supports_vision(&self) -> bool {
            true
        }

        async fn check_connectivity(&self) -> Result<(), SsiError> {
            Ok(())
        }

        fn model_name(&self) -> &str {
            "test"
        }
    }

    fn analyzer_with(responses: Vec<&'static str>) -> PageAnalyzer {
        PageAnalyzer::new(Arc::new(ScriptedLlm { responses: Mutex::new(responses) }))
    }

    #[tokio::test]
    async fn parses_a_well_formed_click_action() {
        let mut analyzer = analyzer_with(vec![
            r#"{"action": "click", "selector": "#signup", "value": "", "reasoning": "found signup link", "confidence": 0.8}"#,
        ]);
        let action = analyzer.analyze_page("", "FIND_REGISTER", "", "https://example.com", "", true).await;
        assert_eq!(action.action, ActionType::Click);
        assert_eq!(action.selector, "#signup");
    }

    #[tokio::test]
    async fn wraps_non_string_value_field_into_json_string() {
        let mut analyzer = analyzer_with(vec![
            r#"{"action": "done", "selector": "", "value": [{"wallet_address": "abc", "token_symbol": "USDT"}], "reasoning": "wallets found", "confidence": 0.9}"#,
        ]);
        let action = analyzer.analyze_page("", "EXTRACT_WALLETS", "", "", "", false).await;
        assert_eq!(action.action, ActionType::Done);
        assert!(action.value.contains("wallet_address"));
    }

    #[tokio::test]
    async fn strips_code_fences_before_parsing() {
        let mut analyzer = analyzer_with(vec![
            "```json\n{\"action\": \"wait\", \"selector\": \"\", \"value\": \"2\", \"reasoning\": \"loading\", \"confidence\": 0.5}\n```",
        ]);
        let action = analyzer.analyze_page("", "LOAD_SITE", "", "", "", false).await;
        assert_eq!(action.action, ActionType::Wait);
    }

    #[tokio::test]
    async fn malformed_json_returns_stuck_and_rolls_back_conversation() {
        let mut analyzer = analyzer_with(vec!["not json at all"]);
        let action = analyzer.analyze_page("", "FIND_REGISTER", "", "", "", false).await;
        assert_eq!(action.action, ActionType::Stuck);
        assert!(analyzer.conversation.is_empty());
    }

    #[tokio::test]
    async fn batch_mode_filters_to_fill_actions_only() {
        let mut analyzer = analyzer_with(vec![
            r#"[{"action": "type", "selector": "#email", "value": "a@b.com", "reasoning": "", "confidence": 0.9},
                {"action": "done", "selector": "", "value": "", "reasoning": "", "confidence": 0.9},
                {"action": "click", "selector": "#terms", "value": "", "reasoning": "", "confidence": 0.9}]"#,
        ]);
        let actions = analyzer.analyze_page_batch("img", "FILL_REGISTER", "", "", "").await;
        assert_eq!(actions.len(), 2);
        assert!(actions.iter().all(|a| matches!(a.action, ActionType::Type | ActionType::Select | ActionType::Click)));
    }

    #[tokio::test]
    async fn batch_mode_unwraps_object_with_actions_key() {
        let mut analyzer = analyzer_with(vec![
            r#"{"actions": [{"action": "select", "selector": "#country", "value": "US", "reasoning": "", "confidence": 0.9}]}"#,
        ]);
        let actions = analyzer.analyze_page_batch("img", "FILL_REGISTER", "", "", "").await;
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].action, ActionType::Select);
    }

    #[test]
    fn conversation_window_trims_oldest_messages() {
        let mut analyzer = analyzer_with(vec![]).with_limits(3, 4096);
        for i in 0..5 {
            analyzer.conversation.push(ChatMessage::user(format!("turn {i}")));
        }
        analyzer.trim_conversation();
        assert_eq!(analyzer.conversation.len(), 3);
    }

    #[test]
    fn old_screenshots_are_replaced_with_placeholder_text() {
        let mut analyzer = analyzer_with(vec![]);
        for i in 0..4 {
            analyzer.conversation.push(ChatMessage {
                role: Role::User,
                content: MessageContent::Parts(vec![
                    ContentPart::Image { media_type: "image/png".to_string(), data: format!("img{i}") },
                    ContentPart::Text { text: format!("context {i}") },
                ]),
            });
        }
        analyzer.trim_conversation();

        let still_has_image = |content: &MessageContent| matches!(content, MessageContent::Parts(parts) if parts.iter().any(|p| matches!(p, ContentPart::Image { .. })));

        assert!(!still_has_image(&analyzer.conversation[0].content));
        assert!(!still_has_image(&analyzer.conversation[1].content));
        assert!(still_has_image(&analyzer.conversation[2].content));
        assert!(still_has_image(&analyzer.conversation[3].content));
    }
}
