use serde::{Deserialize, Serialize};

use crate::config::ServiceConfig;

/// Message author role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// Message content: either a plain string or a list of typed parts
/// (text + image attachments for vision-capable models).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

/// A single part of a multi-part message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

/// Image attachment reference (data URL or http URL).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageUrl {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// A single chat message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: MessageContent,
}

impl Message {
    /// Build a plain-text message.
    #[must_use]
    pub fn text(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: MessageContent::Text(content.into()),
        }
    }
}

/// Caller-facing streaming request: an ordered message list.
#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    pub messages: Vec<Message>,
}

// ---------------------------------------------------------------------------
// Upstream wire types
// ---------------------------------------------------------------------------

/// Chat completion request wire type sent to the upstream.
#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub temperature: f64,
    pub stream: bool,
}

/// Build the upstream payload for a request.
///
/// A non-empty configured system prompt is prepended as a leading `system`
/// message; the caller's messages follow in order.
#[must_use]
pub fn build_payload(request: &ChatRequest, service: &ServiceConfig) -> ChatCompletionRequest {
    let mut messages = Vec::with_capacity(request.messages.len() + 1);
    if !service.system_prompt.is_empty() {
        messages.push(Message::text(Role::System, service.system_prompt.clone()));
    }
    messages.extend(request.messages.iter().cloned());

    ChatCompletionRequest {
        model: service.model.clone(),
        messages,
        temperature: service.temperature,
        stream: true,
    }
}

/// Chat completion chunk wire type (the `choices[0].delta.content` shape).
#[derive(Debug, Deserialize)]
pub struct ChatCompletionChunk {
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
}

/// One streamed choice.
#[derive(Debug, Deserialize)]
pub struct ChunkChoice {
    #[serde(default)]
    pub delta: ChunkDelta,
}

/// Incremental content fragment inside a streamed choice.
#[derive(Debug, Default, Deserialize)]
pub struct ChunkDelta {
    #[serde(default)]
    pub content: Option<String>,
}

impl ChatCompletionChunk {
    /// Extract `choices[0].delta.content`, if present.
    #[must_use]
    pub fn into_delta_content(self) -> Option<String> {
        self.choices.into_iter().next().and_then(|c| c.delta.content)
    }
}

/// `GET /models` response wire type.
#[derive(Debug, Deserialize)]
pub struct ModelsResponse {
    #[serde(default)]
    pub data: Vec<ModelEntry>,
}

/// One model listing entry.
#[derive(Debug, Deserialize)]
pub struct ModelEntry {
    pub id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_text_serializes_as_plain_string_content() {
        let msg = Message::text(Role::User, "hi");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "user");
        assert_eq!(json["content"], "hi");
    }

    #[test]
    fn multipart_message_serializes_typed_parts() {
        let msg = Message {
            role: Role::User,
            content: MessageContent::Parts(vec![
                ContentPart::Text {
                    text: "what is this?".to_string(),
                },
                ContentPart::ImageUrl {
                    image_url: ImageUrl {
                        url: "data:image/png;base64,AAAA".to_string(),
                        detail: Some("auto".to_string()),
                    },
                },
            ]),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["content"][0]["type"], "text");
        assert_eq!(json["content"][1]["type"], "image_url");
        assert_eq!(json["content"][1]["image_url"]["detail"], "auto");
    }

    #[test]
    fn build_payload_prepends_system_prompt() {
        let service = ServiceConfig {
            system_prompt: "be terse".to_string(),
            ..ServiceConfig::default()
        };
        let request = ChatRequest {
            messages: vec![Message::text(Role::User, "hi")],
        };
        let payload = build_payload(&request, &service);
        assert!(payload.stream);
        assert_eq!(payload.messages.len(), 2);
        assert!(matches!(payload.messages[0].role, Role::System));
        assert!(matches!(payload.messages[1].role, Role::User));
    }

    #[test]
    fn build_payload_skips_empty_system_prompt() {
        let service = ServiceConfig::default();
        let request = ChatRequest {
            messages: vec![Message::text(Role::User, "hi")],
        };
        let payload = build_payload(&request, &service);
        assert_eq!(payload.messages.len(), 1);
    }

    #[test]
    fn chunk_delta_content_extraction() {
        let chunk: ChatCompletionChunk =
            serde_json::from_str(r#"{"choices":[{"delta":{"content":"Hi"}}]}"#).unwrap();
        assert_eq!(chunk.into_delta_content().as_deref(), Some("Hi"));

        let empty: ChatCompletionChunk = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(empty.into_delta_content().is_none());

        let no_content: ChatCompletionChunk =
            serde_json::from_str(r#"{"choices":[{"delta":{"role":"assistant"}}]}"#).unwrap();
        assert!(no_content.into_delta_content().is_none());
    }
}
