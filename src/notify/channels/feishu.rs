use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{info, warn};

use super::{ChannelKind, Delivery, NotificationChannel};
use crate::{
    errors::{AppError, AppResult},
    feishu::{card, client::FeishuClient, types::FeishuConfig},
    models::notification::NotificationPayload,
    notify::credential::CredentialCache,
};

/// Feishu (Lark) app bot channel.
///
/// Needs a tenant token from the shared [`CredentialCache`]. Items go out as
/// interactive cards with the first image embedded when it uploads. A
/// recipient that rejects the card gets the item as plain text instead.
pub struct FeishuChannel {
    client: FeishuClient,
    credentials: Arc<CredentialCache>,
}

/// One message for every recipient, with an optional plain-text retry.
struct Outgoing<'a> {
    msg_type: &'static str,
    content: String,
    fallback_text: Option<String>,
    link: Option<&'a str>,
}

/// How a fan-out over the recipients went.
#[derive(Debug, Default)]
struct FanOut {
    sent: usize,
    fell_back: usize,
}

impl FeishuChannel {
    pub fn new(http: Client, config: FeishuConfig, credentials: Arc<CredentialCache>) -> Self {
        Self {
            client: FeishuClient::new(http, config),
            credentials,
        }
    }

    /// Token for this call, or `None` when the channel must sit this one out.
    async fn token(&self) -> Option<String> {
        if !self.client.config().is_complete() {
            let missing = AppError::AuthMissing { channel: "feishu" };
            warn!(error = %missing, "Skipping send");
            return None;
        }
        match self.credentials.get_token().await {
            Ok(token) => Some(token),
            Err(e) => {
                warn!(channel = "feishu", error = %e, "Could not obtain Feishu access token");
                None
            }
        }
    }

    /// Sends to every recipient independently; fails only if nobody received it.
    async fn send_to_all(&self, token: &str, message: &Outgoing<'_>) -> AppResult<FanOut> {
        let link = message.link.unwrap_or("-");
        let recipients = &self.client.config().receive_ids;
        let mut outcome = FanOut::default();
        let mut last_error = None;

        for receive_id in recipients {
            let err = match self
                .client
                .send_message(token, receive_id, message.msg_type, &message.content)
                .await
            {
                Ok(()) => {
                    outcome.sent += 1;
                    info!(channel = "feishu", receive_id = %receive_id, link = %link, "Sent to Feishu");
                    continue;
                }
                Err(e) => e,
            };

            let Some(text) = &message.fallback_text else {
                warn!(channel = "feishu", receive_id = %receive_id, link = %link, error = %err, "Feishu send failed");
                last_error = Some(err);
                continue;
            };

            warn!(
                channel = "feishu",
                receive_id = %receive_id,
                link = %link,
                error = %err,
                "Card rejected, degrading to text"
            );
            match self.client.send_message(token, receive_id, "text", text).await {
                Ok(()) => {
                    outcome.sent += 1;
                    outcome.fell_back += 1;
                    info!(channel = "feishu", receive_id = %receive_id, link = %link, "Degraded text send succeeded");
                }
                Err(e) => {
                    warn!(channel = "feishu", receive_id = %receive_id, link = %link, error = %e, "Feishu text fallback failed");
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) if outcome.sent == 0 => Err(AppError::api(
                "feishu",
                format!("all {} recipients failed, last error: {e}", recipients.len()),
            )),
            _ => Ok(outcome),
        }
    }
}

#[async_trait]
impl NotificationChannel for FeishuChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Feishu
    }

    async fn send_item(&self, payload: &NotificationPayload) -> AppResult<Delivery> {
        let Some(token) = self.token().await else {
            return Ok(Delivery::Skipped);
        };

        let mut degraded = false;
        let image_key = match payload.images.first() {
            Some(image_url) => match self.client.upload_image(&token, image_url).await {
                Ok(key) => Some(key),
                Err(e) => {
                    warn!(
                        channel = "feishu",
                        link = %payload.link,
                        image = %image_url,
                        error = %e,
                        "Image upload failed, sending card without image"
                    );
                    degraded = true;
                    None
                }
            },
            None => None,
        };

        let message = Outgoing {
            msg_type: "interactive",
            content: serde_json::to_string(&card::build_card(payload, image_key.as_deref()))?,
            fallback_text: Some(serde_json::to_string(&card::build_fallback_text(payload))?),
            link: Some(&payload.link),
        };
        let outcome = self.send_to_all(&token, &message).await?;

        Ok(if degraded || outcome.fell_back > 0 {
            Delivery::Degraded
        } else {
            Delivery::Delivered
        })
    }

    async fn send_plain(&self, text: &str) -> AppResult<Delivery> {
        let Some(token) = self.token().await else {
            return Ok(Delivery::Skipped);
        };
        let message = Outgoing {
            msg_type: "text",
            content: serde_json::to_string(&card::build_text(text))?,
            fallback_text: None,
            link: None,
        };
        self.send_to_all(&token, &message).await?;
        Ok(Delivery::Delivered)
    }
}
