use serde::{Deserialize, Serialize};

pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";

#[derive(Debug, Serialize, Deserialize)]
pub struct TelegramMessage {
    pub chat_id: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disable_web_page_preview: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TelegramPhoto {
    pub chat_id: String,
    /// URL Telegram fetches the image from
    pub photo: String,
    pub caption: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_mode: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TelegramResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
    pub api_base_url: String,
}

impl TelegramConfig {
    pub fn new(bot_token: impl Into<String>, chat_id: impl Into<String>) -> Self {
        Self {
            bot_token: bot_token.into(),
            chat_id: chat_id.into(),
            api_base_url: DEFAULT_API_BASE.to_string(),
        }
    }

    pub fn with_api_base(mut self, api_base_url: impl Into<String>) -> Self {
        self.api_base_url = api_base_url.into();
        self
    }

    pub fn is_complete(&self) -> bool {
        !self.bot_token.trim().is_empty() && !self.chat_id.trim().is_empty()
    }

    pub fn method_url(&self, method: &str) -> String {
        format!(
            "{}/bot{}/{}",
            self.api_base_url.trim_end_matches('/'),
            self.bot_token,
            method
        )
    }
}
