//! LLM API types
//!
//! Request/response shapes for the two supported providers: OpenAI-compatible
//! chat completions and the Anthropic messages API.

use serde::{Deserialize, Serialize};

/// Message in a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    /// Create a user message
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: text.into(),
        }
    }

    /// Create an assistant message
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: text.into(),
        }
    }

    /// Create a system message
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: text.into(),
        }
    }

    pub fn is_system(&self) -> bool {
        self.role == "system"
    }
}

/// Provider-neutral completion request
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system: Option<String>,
    pub messages: Vec<Message>,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Builder for [`CompletionRequest`]
#[derive(Debug, Clone)]
pub struct CompletionRequestBuilder {
    request: CompletionRequest,
}

impl CompletionRequestBuilder {
    pub fn new() -> Self {
        Self {
            request: CompletionRequest {
                system: None,
                messages: Vec::new(),
                temperature: 0.0,
                max_tokens: 500,
            },
        }
    }

    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.request.system = Some(system.into());
        self
    }

    pub fn message(mut self, message: Message) -> Self {
        self.request.messages.push(message);
        self
    }

    pub fn messages(mut self, messages: impl IntoIterator<Item = Message>) -> Self {
        self.request.messages.extend(messages);
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.request.temperature = temperature;
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.request.max_tokens = max_tokens;
        self
    }

    pub fn build(self) -> CompletionRequest {
        self.request
    }
}

impl Default for CompletionRequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// OpenAI-compatible chat completions
// ============================================================================

#[derive(Debug, Serialize)]
pub(crate) struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl ChatCompletionRequest {
    pub fn from_request(model: &str, request: &CompletionRequest) -> Self {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        if let Some(system) = &request.system {
            messages.push(Message::system(system.clone()));
        }
        messages.extend(request.messages.iter().cloned());
        Self {
            model: model.to_string(),
            messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatCompletionResponse {
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatChoice {
    pub message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

impl ChatCompletionResponse {
    pub fn text(&self) -> Option<String> {
        self.choices
            .first()
            .and_then(|choice| choice.message.content.clone())
    }
}

// ============================================================================
// Anthropic messages
// ============================================================================

#[derive(Debug, Serialize)]
pub(crate) struct MessagesRequest {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    pub messages: Vec<Message>,
}

impl MessagesRequest {
    /// Anthropic takes the system prompt out of band, so any system-role
    /// messages in the history are folded into it.
    pub fn from_request(model: &str, request: &CompletionRequest) -> Self {
        let mut system_parts: Vec<String> = request.system.iter().cloned().collect();
        let mut messages = Vec::with_capacity(request.messages.len());
        for message in &request.messages {
            if message.is_system() {
                system_parts.push(message.content.clone());
            } else {
                messages.push(message.clone());
            }
        }
        Self {
            model: model.to_string(),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            system: (!system_parts.is_empty()).then(|| system_parts.join("\n\n")),
            messages,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct MessagesResponse {
    pub content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum ContentBlock {
    Text { text: String },
    #[serde(other)]
    Other,
}

impl MessagesResponse {
    pub fn text(&self) -> Option<String> {
        let parts: Vec<&str> = self
            .content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text.as_str()),
                ContentBlock::Other => None,
            })
            .collect();
        (!parts.is_empty()).then(|| parts.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openai_request_prepends_system() {
        let request = CompletionRequestBuilder::new()
            .system("be brief")
            .message(Message::user("hola"))
            .build();
        let body = ChatCompletionRequest::from_request("gpt-3.5-turbo", &request);
        assert_eq!(body.messages.len(), 2);
        assert!(body.messages[0].is_system());
        assert_eq!(body.messages[1].content, "hola");
    }

    #[test]
    fn test_claude_request_folds_system_messages() {
        let request = CompletionRequestBuilder::new()
            .message(Message::system("context"))
            .message(Message::user("hola"))
            .build();
        let body = MessagesRequest::from_request("claude", &request);
        assert_eq!(body.system.as_deref(), Some("context"));
        assert_eq!(body.messages, vec![Message::user("hola")]);
    }

    #[test]
    fn test_claude_response_text_skips_non_text_blocks() {
        let json = r#"{"content":[{"type":"text","text":"uno"},{"type":"tool_use","id":"x"},{"type":"text","text":"dos"}]}"#;
        let response: MessagesResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.text().as_deref(), Some("uno\ndos"));
    }
}
