use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{build_prompt, with_retry, RetryPolicy, Translator};
use crate::errors::{AppError, AppResult};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub target_language: String,
}

pub struct GeminiTranslator {
    client: Client,
    config: GeminiConfig,
    retry: RetryPolicy,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

impl GeminiTranslator {
    pub fn new(client: Client, config: GeminiConfig, retry: RetryPolicy) -> Self {
        Self {
            client,
            config,
            retry,
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }

    async fn request(&self, text: &str) -> AppResult<String> {
        let body = json!({
            "contents": [{ "parts": [{ "text": build_prompt(text, &self.config.target_language) }] }],
            "generationConfig": { "temperature": 0.7, "candidateCount": 1 },
        });

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AppError::api("gemini", format!("{status}: {detail}")));
        }

        let parsed: GenerateResponse = response.json().await?;
        let translated: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default();

        let translated = translated.trim();
        if translated.is_empty() {
            return Err(AppError::malformed("gemini", "response contained no text"));
        }
        Ok(translated.to_string())
    }
}

#[async_trait]
impl Translator for GeminiTranslator {
    async fn translate(&self, text: &str) -> AppResult<String> {
        with_retry(self.retry, "gemini", || self.request(text)).await
    }
}
