//! OpenAI-compatible chat completions client (OpenAI, vLLM, LM Studio, Ollama's `/v1`).

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::llm::{CompletionRequest, LanguageModel, LlmError};

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

pub struct OpenAiCompatibleModel {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

impl OpenAiCompatibleModel {
    /// `endpoint` is the base URL, e.g. `https://api.openai.com`.
    pub fn new(endpoint: &str, model: &str, timeout: Duration) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: None,
        })
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|k| !k.is_empty());
        self
    }

    fn url(&self) -> String {
        format!("{}/v1/chat/completions", self.endpoint)
    }
}

#[async_trait::async_trait]
impl LanguageModel for OpenAiCompatibleModel {
    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError> {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        if let Some(system) = request.system.as_deref() {
            messages.push(WireMessage {
                role: "system",
                content: system,
            });
        }
        messages.extend(request.messages.iter().map(|m| WireMessage {
            role: m.role.as_str(),
            content: &m.content,
        }));

        let body = ChatCompletionRequest {
            model: &self.model,
            messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let mut http = self.client.post(self.url()).json(&body);
        if let Some(key) = &self.api_key {
            http = http.bearer_auth(key);
        }

        let response = http.send().await.map_err(|e| LlmError::Transport(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatCompletionResponse = response.json().await.map_err(|e| LlmError::Decode(e.to_string()))?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(LlmError::Empty)?;

        debug!(model = %self.model, chars = content.len(), "completion received");
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn url_normalises_trailing_slash() {
        let model = OpenAiCompatibleModel::new("http://localhost:11434/", "qwen2.5", Duration::from_secs(5)).unwrap();
        assert_eq!(model.url(), "http://localhost:11434/v1/chat/completions");
    }

    #[test]
    fn blank_api_key_is_ignored() {
        let model = OpenAiCompatibleModel::new("http://x", "m", Duration::from_secs(1))
            .unwrap()
            .with_api_key(Some(String::new()));
        assert!(model.api_key.is_none());
    }

    #[test]
    fn response_without_content_decodes() {
        let parsed: ChatCompletionResponse =
            serde_json::from_value(json!({"choices": [{"message": {"role": "assistant"}}]})).unwrap();
        assert!(parsed.choices[0].message.content.is_none());
    }
}
