//! Stateless chat proxy to the Anthropic messages API.
//!
//! The console forwards the whole conversation on each request and
//! returns the assistant's reply; no chat state is kept server-side.

use serde::{Deserialize, Serialize};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 1024;

/// One message of the conversation as the browser sends it.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatMessage {
    pub text: String,
    /// `user` for the human, anything else is treated as the assistant.
    pub sender: String,
}

/// Errors from the chat proxy.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    /// No `ANTHROPIC_API_KEY` was configured.
    #[error("chat is not configured")]
    NotConfigured,

    /// The HTTP request itself failed.
    #[error("chat request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The Anthropic API returned a non-2xx status code.
    #[error("Anthropic API error ({status}): {body}")]
    Api { status: u16, body: String },
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<AnthropicMessage>,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text { text: String },
    #[serde(other)]
    Other,
}

pub struct ChatClient {
    client: reqwest::Client,
    api_key: Option<String>,
    model: String,
}

impl ChatClient {
    pub fn new(api_key: Option<String>, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model,
        }
    }

    /// Whether an API key is configured.
    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Forward the conversation and return the assistant's reply text.
    pub async fn complete(&self, messages: &[ChatMessage]) -> Result<String, ChatError> {
        let api_key = self.api_key.as_deref().ok_or(ChatError::NotConfigured)?;

        let request = AnthropicRequest {
            model: self.model.clone(),
            max_tokens: MAX_TOKENS,
            messages: messages
                .iter()
                .map(|m| AnthropicMessage {
                    role: if m.sender == "user" { "user" } else { "assistant" },
                    content: m.text.clone(),
                })
                .collect(),
        };

        let response = self
            .client
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ChatError::Api { status, body });
        }

        let parsed: AnthropicResponse = response.json().await?;
        let reply = parsed
            .content
            .into_iter()
            .find_map(|block| match block {
                ContentBlock::Text { text } => Some(text),
                ContentBlock::Other => None,
            })
            .unwrap_or_else(|| "Unable to process response".to_string());

        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn complete_without_key_is_not_configured() {
        let client = ChatClient::new(None, "claude-sonnet-4-20250514".into());
        assert!(!client.is_configured());
        let err = client.complete(&[]).await.unwrap_err();
        assert!(matches!(err, ChatError::NotConfigured));
    }

    #[test]
    fn content_blocks_parse_text_and_unknown() {
        let json = r#"{"content": [{"type": "tool_use", "id": "x"}, {"type": "text", "text": "hi"}]}"#;
        let parsed: AnthropicResponse = serde_json::from_str(json).unwrap();
        let text = parsed.content.into_iter().find_map(|b| match b {
            ContentBlock::Text { text } => Some(text),
            ContentBlock::Other => None,
        });
        assert_eq!(text.as_deref(), Some("hi"));
    }
}
