//! Raw reqwest client against an OpenAI-compatible `/chat/completions`
//! endpoint, following the same hand-built
//! request/response pair rather than a provider SDK). Shared by the hosted
//! OpenAI provider and the local multimodal provider, both of which speak
//! this same wire shape.

use serde::{Deserialize, Serialize};
use ssi_common::SsiError;
use std::time::Instant;

use crate::message::{ChatMessage, ChatOptions, ChatResponse, ContentPart, MessageContent, Role};

#[derive(Debug, Serialize)]
struct CompatRequest {
    model: String,
    messages: Vec<CompatMessage>,
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Serialize)]
struct CompatMessage {
    role: String,
    content: CompatContent,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum CompatContent {
    Text(String),
    Parts(Vec<CompatPart>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum CompatPart {
    Text { text: String },
    ImageUrl { image_url: CompatImageUrl },
}

#[derive(Debug, Serialize)]
struct CompatImageUrl {
    url: String,
}

#[derive(Debug, Deserialize)]
struct CompatResponse {
    choices: Vec<CompatChoice>,
    #[serde(default)]
    usage: Option<CompatUsage>,
}

#[derive(Debug, Deserialize)]
struct CompatChoice {
    message: CompatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct CompatResponseMessage {
    content: String,
}

#[derive(Debug, Deserialize, Default)]
struct CompatUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

fn to_compat_message(message: &ChatMessage) -> CompatMessage {
    let role = message.role.as_str().to_string();
    let content = match &message.content {
        MessageContent::Text(text) => CompatContent::Text(text.clone()),
        MessageContent::Parts(parts) => CompatContent::Parts(
            parts
                .iter()
                .map(|p| match p {
                    ContentPart::Text { text } => CompatPart::Text { text: text.clone() },
                    ContentPart::Image { media_type, data } => CompatPart::ImageUrl {
                        image_url: CompatImageUrl { url: format!("data:{media_type};base64,{data}") },
                    },
                })
                .collect(),
        ),
    };
    CompatMessage { role, content }
}

pub async fn chat(
    client: &reqwest::Client,
    base_url: &str,
    api_key: &str,
    model: &str,
    messages: &[ChatMessage],
    options: &ChatOptions,
) -> Result<ChatResponse, SsiError> {
    let request = CompatRequest {
        model: model.to_string(),
        messages: messages.iter().map(to_compat_message).collect(),
        temperature: options.temperature,
        max_tokens: options.max_tokens,
        response_format: options.json_mode.then(|| ResponseFormat { kind: "json_object".to_string() }),
    };

    let started = Instant::now();
    let mut builder = client.post(format!("{base_url}/chat/completions")).json(&request);
    if !api_key.is_empty() {
        builder = builder.header("Authorization", format!("Bearer {api_key}"));
    }

    let response = builder
        .send()
        .await
        .map_err(|e| SsiError::Llm(format!("request to {base_url} failed: {e}")))?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(SsiError::Llm(format!("{base_url} returned {status}: {body}")));
    }

    let parsed: CompatResponse = response
        .json()
        .await
        .map_err(|e| SsiError::Llm(format!("failed to parse response from {base_url}: {e}")))?;

    let content = parsed
        .choices
        .into_iter()
        .next()
        .map(|c| c.message.content)
        .ok_or_else(|| SsiError::Llm(format!("{base_url} returned no choices")))?;

    let usage = parsed.usage.unwrap_or_default();

    Ok(ChatResponse {
        content,
        input_tokens: usage.prompt_tokens,
        output_tokens: usage.completion_tokens,
        latency_ms: started.elapsed().as_millis() as u64,
        model: model.to_string(),
    })
}

#[allow(dead_code)]
fn role_label(role: Role) -> &'static str {
    role.as_str()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_part_becomes_data_url() {
        let message = ChatMessage::user_with_image("describe this", "image/png", "Zm9v");
        let compat = to_compat_message(&message);
        let json = serde_json::to_string(&compat).unwrap();
        assert!(json.contains("data:image/png;base64,Zm9v"));
    }
}
