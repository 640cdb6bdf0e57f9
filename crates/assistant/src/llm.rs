//! Language model seam.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use salesdesk_memory::Role;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LlmError {
    #[error("language model unreachable: {0}")]
    Transport(String),

    #[error("language model returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("language model returned no content")]
    Empty,

    #[error("unreadable language model response: {0}")]
    Decode(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub system: Option<String>,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl CompletionRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            system: None,
            messages,
            max_tokens: 1_000,
            temperature: 0.7,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// Text completion.
#[async_trait::async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError>;
}

#[async_trait::async_trait]
impl<M> LanguageModel for Arc<M>
where
    M: LanguageModel + ?Sized,
{
    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError> {
        (**self).complete(request).await
    }
}

/// First JSON object in a model reply, tolerating code fences and chatter.
pub fn extract_json(output: &str) -> &str {
    let cleaned = output
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    let Some(start) = cleaned.find('{') else {
        return cleaned;
    };
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in cleaned[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return &cleaned[start..start + i + 1];
                }
            }
            _ => {}
        }
    }
    &cleaned[start..]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_json_plain() {
        assert_eq!(extract_json(r#"{"type":"upsell"}"#), r#"{"type":"upsell"}"#);
    }

    #[test]
    fn extract_json_with_markdown_and_prose() {
        let raw = "```json\n{\"type\": \"general\", \"extractedData\": {\"note\": \"a } b\"}}\n```";
        assert_eq!(
            extract_json(raw),
            "{\"type\": \"general\", \"extractedData\": {\"note\": \"a } b\"}}"
        );
        assert_eq!(extract_json("Ecco: {\"a\": {\"b\": 1}} fine"), "{\"a\": {\"b\": 1}}");
    }

    #[test]
    fn extract_json_unbalanced_returns_tail() {
        assert_eq!(extract_json("oops {\"a\": 1"), "{\"a\": 1");
        assert_eq!(extract_json("no json here"), "no json here");
    }
}
