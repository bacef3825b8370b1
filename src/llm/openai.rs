//! OpenAI chat-completions backend, also covering any OpenAI-compatible
//! server (Ollama, LM Studio, vLLM) via a custom base URL.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{LlmError, LlmProvider};

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

pub struct OpenAiProvider {
    name: String,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f32,
    client: Client,
}

impl OpenAiProvider {
    /// Backend talking to the hosted OpenAI API.
    pub fn new(
        api_key: impl Into<String>,
        model: &str,
        temperature: f32,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        Self::with_base_url("openai", OPENAI_BASE_URL, api_key, model, temperature, timeout)
    }

    /// Backend talking to any OpenAI-compatible server. `name` is what shows
    /// up in logs and errors; `base_url` is the API root without the
    /// `/chat/completions` suffix.
    pub fn with_base_url(
        name: &str,
        base_url: &str,
        api_key: impl Into<String>,
        model: &str,
        temperature: f32,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            name: name.to_string(),
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            api_key: api_key.into(),
            model: model.to_string(),
            temperature,
            client,
        })
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn chat_complete(&self, system: &str, user: &str) -> Result<String, LlmError> {
        let body = ChatRequest {
            model: &self.model,
            temperature: self.temperature,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
        };

        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.api_key.trim())
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(LlmError::Api {
                provider: self.name.clone(),
                status,
                body,
            });
        }

        let parsed: ChatResponse = resp.json().await.map_err(|e| LlmError::Malformed {
            provider: self.name.clone(),
            detail: e.to_string(),
        })?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| LlmError::Malformed {
                provider: self.name.clone(),
                detail: "no choices in response".into(),
            })
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_matches_wire_shape() {
        let body = ChatRequest {
            model: "phi3:mini",
            temperature: 0.5,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: "sys",
                },
                ChatMessage {
                    role: "user",
                    content: "usr",
                },
            ],
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], "phi3:mini");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "usr");
    }

    #[test]
    fn response_body_parses() {
        let raw = r#"{
            "id": "chatcmpl-1",
            "choices": [
                {"index": 0, "message": {"role": "assistant", "content": "cleaned text"}}
            ],
            "usage": {"total_tokens": 12}
        }"#;
        let parsed: ChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.choices[0].message.content, "cleaned text");
    }

    #[test]
    fn base_url_trailing_slash_is_normalised() {
        let p = OpenAiProvider::with_base_url(
            "local",
            "http://localhost:11434/v1/",
            "ollama",
            "phi3:mini",
            0.5,
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(p.endpoint, "http://localhost:11434/v1/chat/completions");
        assert_eq!(p.name(), "local");
    }
}
