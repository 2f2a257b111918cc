use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use super::{build_prompt, with_retry, RetryPolicy, Translator};
use crate::errors::{AppError, AppResult};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub target_language: String,
}

/// Any OpenAI-compatible chat completions endpoint.
pub struct OpenAiTranslator {
    client: Client,
    config: OpenAiConfig,
    retry: RetryPolicy,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiTranslator {
    pub fn new(client: Client, config: OpenAiConfig, retry: RetryPolicy) -> Self {
        Self {
            client,
            config,
            retry,
        }
    }

    async fn request(&self, text: &str) -> AppResult<String> {
        let body = json!({
            "model": self.config.model,
            "messages": [
                { "role": "user", "content": build_prompt(text, &self.config.target_language) }
            ],
            "temperature": 0.7,
        });

        let response = self
            .client
            .post(format!(
                "{}/chat/completions",
                self.config.base_url.trim_end_matches('/')
            ))
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AppError::api("openai", format!("{status}: {detail}")));
        }

        let parsed: ChatResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or_else(|| AppError::malformed("openai", "response contained no message content"))
    }
}

#[async_trait]
impl Translator for OpenAiTranslator {
    async fn translate(&self, text: &str) -> AppResult<String> {
        with_retry(self.retry, "openai", || self.request(text)).await
    }
}
