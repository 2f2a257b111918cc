use serde::{Deserialize, Serialize};

/// One entry as returned by a feed source, before content extraction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawEntry {
    pub link: Option<String>,
    pub author: Option<String>,
    /// HTML body (description / content)
    pub description: String,
    pub published: Option<String>,
}

/// A fetched feed; entries are newest-first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchedFeed {
    pub title: Option<String>,
    pub entries: Vec<RawEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedItem {
    /// Unique within its feed. Empty when the entry had no link.
    pub link: String,
    pub author: String,
    pub body_text: String,
    pub published_at: String,
    pub images: Vec<String>,
}

impl FeedItem {
    pub fn has_link(&self) -> bool {
        !self.link.trim().is_empty()
    }
}
