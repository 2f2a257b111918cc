use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info};

use crate::{
    errors::{AppError, AppResult},
    models::feed_item::{FetchedFeed, RawEntry},
};

/// Supplies a feed's entries, newest first.
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch(&self, feed_id: &str) -> AppResult<FetchedFeed>;
}

pub struct HttpFeedSource {
    client: Client,
}

impl HttpFeedSource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    async fn fetch(&self, feed_id: &str) -> AppResult<FetchedFeed> {
        let response = self
            .client
            .get(feed_id)
            // See: https://stackoverflow.com/a/7001617/5155484
            .header(
                "Accept",
                "application/rss+xml, application/rdf+xml, application/atom+xml, application/feed+json, application/xml;q=0.9, text/xml;q=0.8",
            )
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::api("feed", status.to_string()));
        }

        let body = response.bytes().await?;
        info!(feed = %feed_id, bytes = body.len(), "Got response for feed");
        parse_feed(&body)
    }
}

/// Parses raw feed bytes, keeping the document's entry order.
pub fn parse_feed(body: &[u8]) -> AppResult<FetchedFeed> {
    let parsed = feed_rs::parser::parse(body)?;
    debug!("Found {} entries", parsed.entries.len());

    let entries = parsed
        .entries
        .into_iter()
        .map(|entry| {
            // entry.authors and entry.links may be empty
            let link = entry.links.first().map(|l| l.href.clone());
            let author = entry
                .authors
                .first()
                .map(|a| a.name.trim().to_string())
                .filter(|name| !name.is_empty());
            let description = entry
                .summary
                .map(|s| s.content)
                .or_else(|| entry.content.and_then(|c| c.body))
                .unwrap_or_default();

            RawEntry {
                link,
                author,
                description,
                published: entry.published.map(|p| p.to_rfc3339()),
            }
        })
        .collect();

    Ok(FetchedFeed {
        title: parsed.title.map(|t| t.content),
        entries,
    })
}
