use reqwest::Client;
use serde::Serialize;

use super::types::{TelegramConfig, TelegramMessage, TelegramPhoto, TelegramResponse};
use crate::errors::{AppError, AppResult};

pub struct TelegramClient {
    client: Client,
    config: TelegramConfig,
}

impl TelegramClient {
    pub fn new(client: Client, config: TelegramConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &TelegramConfig {
        &self.config
    }

    pub async fn send_message(
        &self,
        text: &str,
        parse_mode: Option<&str>,
        disable_web_page_preview: bool,
    ) -> AppResult<()> {
        let message = TelegramMessage {
            chat_id: self.config.chat_id.clone(),
            text: text.to_string(),
            parse_mode: parse_mode.map(|s| s.to_string()),
            disable_web_page_preview: Some(disable_web_page_preview),
        };
        self.call("sendMessage", &message).await
    }

    pub async fn send_html_message(&self, html_text: &str) -> AppResult<()> {
        self.send_message(html_text, Some("HTML"), false).await
    }

    /// Sends an image by URL with an HTML caption.
    pub async fn send_photo(&self, photo_url: &str, html_caption: &str) -> AppResult<()> {
        let photo = TelegramPhoto {
            chat_id: self.config.chat_id.clone(),
            photo: photo_url.to_string(),
            caption: html_caption.to_string(),
            parse_mode: Some("HTML".to_string()),
        };
        self.call("sendPhoto", &photo).await
    }

    async fn call<B: Serialize + ?Sized>(&self, method: &str, body: &B) -> AppResult<()> {
        let response = self
            .client
            .post(self.config.method_url(method))
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        // Error replies still carry {"ok": false, "description": ...}
        let parsed: Option<TelegramResponse<serde_json::Value>> = serde_json::from_str(&text).ok();

        if !status.is_success() {
            let detail = parsed
                .and_then(|r| r.description)
                .unwrap_or(text);
            return Err(AppError::api("telegram", format!("{method} {status}: {detail}")));
        }

        let Some(telegram_response) = parsed else {
            return Err(AppError::malformed("telegram", format!("{method}: {text}")));
        };

        if !telegram_response.ok {
            let error_msg = telegram_response
                .description
                .unwrap_or_else(|| "Unknown Telegram API error".to_string());
            return Err(AppError::api("telegram", error_msg));
        }

        if telegram_response.result.is_some() {
            Ok(())
        } else {
            Err(AppError::malformed("telegram", "No result in Telegram response"))
        }
    }
}
