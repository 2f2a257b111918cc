pub mod gemini;
pub mod openai;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{info, warn};

use crate::{
    config::{AiProvider, TranslationSettings},
    errors::{AppError, AppResult},
};

pub use gemini::GeminiTranslator;
pub use openai::OpenAiTranslator;

#[async_trait]
pub trait Translator: Send + Sync {
    /// Translates `text`, retrying internally before giving up.
    async fn translate(&self, text: &str) -> AppResult<String>;
}

/// Bounded retry with the delay doubling after each failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Delay before attempt `n + 1`, counting from 1.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
    }
}

pub async fn with_retry<T, F, Fut>(policy: RetryPolicy, label: &str, mut op: F) -> AppResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = AppResult<T>>,
{
    let attempts = policy.attempts.max(1);
    let mut last_error = String::new();

    for attempt in 1..=attempts {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                warn!(provider = label, attempt, attempts, error = %e, "Translation attempt failed");
                last_error = e.to_string();
                if attempt < attempts {
                    tokio::time::sleep(policy.delay_after(attempt)).await;
                }
            }
        }
    }

    Err(AppError::Translation(format!(
        "{label} gave up after {attempts} attempts: {last_error}"
    )))
}

/// The translator for the selected provider, or `None` when it has no key.
pub fn build_translator(client: Client, settings: &TranslationSettings) -> Option<Arc<dyn Translator>> {
    if !settings.is_available() {
        warn!(provider = ?settings.provider, "No API key for translation provider, translation disabled");
        return None;
    }
    let translator: Arc<dyn Translator> = match settings.provider {
        AiProvider::Gemini => Arc::new(GeminiTranslator::new(
            client,
            settings.gemini.clone(),
            RetryPolicy::default(),
        )),
        AiProvider::OpenAi => Arc::new(OpenAiTranslator::new(
            client,
            settings.openai.clone(),
            RetryPolicy::default(),
        )),
    };
    info!(provider = ?settings.provider, "Translation enabled");
    Some(translator)
}

/// Prompt shared by every provider.
pub fn build_prompt(text: &str, target_language: &str) -> String {
    format!(
        "Translate the following social media post into fluent, natural {target_language}.\n\
         \n\
         Requirements:\n\
         1. Keep the tone and emotion of the original post.\n\
         2. Do not translate word for word; follow the reading habits of the target language.\n\
         3. Keep every URL, #hashtag and @mention exactly as written in the original.\n\
         4. Output only the translated text, without explanations or any other text.\n\
         \n\
         Post:\n\
         {text}"
    )
}
