mod feishu;
mod telegram;

pub use feishu::FeishuChannel;
pub use telegram::TelegramChannel;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;

use crate::{errors::AppResult, models::notification::NotificationPayload};

/// The closed set of supported channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    Telegram,
    Feishu,
}

impl ChannelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelKind::Telegram => "telegram",
            ChannelKind::Feishu => "feishu",
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChannelKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "telegram" => Ok(ChannelKind::Telegram),
            "feishu" | "lark" => Ok(ChannelKind::Feishu),
            other => Err(format!("unsupported notification channel '{other}'")),
        }
    }
}

/// How a send ended when it did not fail outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Sent in the channel's rich form.
    Delivered,
    /// Rich form abandoned, content still sent in a simpler form.
    Degraded,
    /// Nothing sent: missing credentials or token.
    Skipped,
}

/// Trait for notification channels.
///
/// Implementations degrade instead of retrying; an `Err` means nothing
/// reached the channel for this call.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    fn kind(&self) -> ChannelKind;

    /// Send one feed item in the channel's rich format.
    async fn send_item(&self, payload: &NotificationPayload) -> AppResult<Delivery>;

    /// Send a status message not tied to a feed item.
    async fn send_plain(&self, text: &str) -> AppResult<Delivery>;
}
