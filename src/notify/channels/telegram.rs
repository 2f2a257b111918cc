use async_trait::async_trait;
use reqwest::Client;
use tracing::{info, warn};

use super::{ChannelKind, Delivery, NotificationChannel};
use crate::{
    errors::{AppError, AppResult},
    models::notification::{truncate_chars, NotificationPayload},
    telegram::{client::TelegramClient, types::TelegramConfig},
};

/// Caption ceiling for `sendPhoto` (Telegram allows 1024).
pub const CAPTION_LIMIT: usize = 1000;
/// Per-section budget keeping a full message under Telegram's 4096 limit.
const SECTION_LIMIT: usize = 1800;

/// Telegram Bot API channel.
///
/// Items with exactly one image go out as `sendPhoto` when the rendered
/// caption fits; everything else is a `sendMessage` with the link preview
/// enabled. A failed photo send is retried once as a text message.
pub struct TelegramChannel {
    client: TelegramClient,
}

#[derive(Debug, PartialEq, Eq)]
enum SendMode<'a> {
    Photo(&'a str),
    Text { degraded: bool },
}

impl TelegramChannel {
    pub fn new(http: Client, config: TelegramConfig) -> Self {
        Self {
            client: TelegramClient::new(http, config),
        }
    }

    fn is_configured(&self) -> bool {
        self.client.config().is_complete()
    }
}

#[async_trait]
impl NotificationChannel for TelegramChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Telegram
    }

    async fn send_item(&self, payload: &NotificationPayload) -> AppResult<Delivery> {
        if !self.is_configured() {
            let missing = AppError::AuthMissing { channel: "telegram" };
            warn!(error = %missing, "Skipping send");
            return Ok(Delivery::Skipped);
        }

        let body = render_body(payload);

        match choose_mode(payload, &body) {
            SendMode::Photo(photo) => match self.client.send_photo(photo, &body).await {
                Ok(()) => {
                    info!(channel = "telegram", link = %payload.link, method = "sendPhoto", "Sent to Telegram");
                    Ok(Delivery::Delivered)
                }
                Err(e) => {
                    warn!(
                        channel = "telegram",
                        link = %payload.link,
                        error = %e,
                        "sendPhoto failed, degrading to text"
                    );
                    self.client.send_html_message(&body).await?;
                    info!(channel = "telegram", link = %payload.link, "Degraded text send succeeded");
                    Ok(Delivery::Degraded)
                }
            },
            SendMode::Text { degraded } => {
                if degraded {
                    warn!(
                        channel = "telegram",
                        link = %payload.link,
                        caption_chars = body.chars().count(),
                        "Caption too long for sendPhoto, relying on link preview"
                    );
                }
                self.client.send_html_message(&body).await?;
                info!(channel = "telegram", link = %payload.link, method = "sendMessage", "Sent to Telegram");
                Ok(if degraded {
                    Delivery::Degraded
                } else {
                    Delivery::Delivered
                })
            }
        }
    }

    async fn send_plain(&self, text: &str) -> AppResult<Delivery> {
        if !self.is_configured() {
            let missing = AppError::AuthMissing { channel: "telegram" };
            warn!(error = %missing, "Skipping status message");
            return Ok(Delivery::Skipped);
        }
        self.client.send_html_message(text).await?;
        info!(channel = "telegram", "Status message sent");
        Ok(Delivery::Delivered)
    }
}

fn choose_mode<'a>(payload: &'a NotificationPayload, body: &str) -> SendMode<'a> {
    match payload.images.as_slice() {
        [only] if body.chars().count() <= CAPTION_LIMIT => SendMode::Photo(only),
        [_] => SendMode::Text { degraded: true },
        _ => SendMode::Text { degraded: false },
    }
}

fn escape_html_text(text: &str) -> String {
    html_escape::encode_text(text).into_owned()
}

/// Renders the HTML body shared by captions and text messages.
pub fn render_body(payload: &NotificationPayload) -> String {
    let mut message = format!(
        "📢 <b>{}</b>\n\n<b>Original:</b>\n{}\n\n",
        escape_html_text(&payload.author),
        escape_html_text(&truncate_chars(&payload.original_text, SECTION_LIMIT)),
    );

    if let Some(translated) = &payload.translated_text {
        message.push_str(&format!(
            "<b>Translation:</b>\n{}\n\n",
            escape_html_text(&truncate_chars(translated, SECTION_LIMIT))
        ));
    }

    message.push_str(&format!(
        "🔗 <a href=\"{}\">View post</a>",
        html_escape::encode_double_quoted_attribute(&payload.link)
    ));
    message
}
