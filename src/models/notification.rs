use super::feed_item::FeedItem;
use serde::{Deserialize, Serialize};

/// The normalized unit fanned out to every channel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub author: String,
    pub original_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translated_text: Option<String>,
    pub link: String,
    pub images: Vec<String>,
}

impl NotificationPayload {
    pub fn from_item(item: &FeedItem, translated_text: Option<String>) -> Self {
        Self {
            author: item.author.clone(),
            original_text: item.body_text.clone(),
            translated_text: translated_text.filter(|t| !t.trim().is_empty()),
            link: item.link.clone(),
            images: item.images.clone(),
        }
    }
}

/// Truncate to `limit` characters, marking the cut.
pub fn truncate_chars(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let kept: String = text.chars().take(limit.saturating_sub(1)).collect();
    format!("{}…", kept.trim_end())
}
