use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::feed_item::{FeedItem, RawEntry};

/// Turns a raw feed entry into a deliverable item.
pub trait ContentExtractor: Send + Sync {
    fn extract(&self, entry: &RawEntry, feed_title: Option<&str>) -> FeedItem;
}

static IMG_SRC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?is)<img\b[^>]*?\bsrc\s*=\s*["']([^"']+)["']"#).unwrap());
static IMG_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<img\b[^>]*>").unwrap());
static ANCHOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<a\b[^>]*?\bhref\s*=\s*["']([^"']*)["'][^>]*>(.*?)</a\s*>"#).unwrap()
});
static LINE_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<br\s*/?>").unwrap());
static BLOCK_END: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)</(p|div|blockquote|li|h[1-6])\s*>").unwrap());
static SCRIPT_STYLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<(script|style)\b.*?</(script|style)\s*>").unwrap());
static ANY_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]+>").unwrap());
static BLANK_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n[ \t]*(\n[ \t]*)+").unwrap());

/// Regex-based HTML extraction for feed descriptions.
#[derive(Debug, Default, Clone, Copy)]
pub struct HtmlContentExtractor;

impl ContentExtractor for HtmlContentExtractor {
    fn extract(&self, entry: &RawEntry, feed_title: Option<&str>) -> FeedItem {
        let author = entry
            .author
            .as_deref()
            .or(feed_title)
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .unwrap_or("Unknown")
            .to_string();

        FeedItem {
            link: entry.link.clone().unwrap_or_default().trim().to_string(),
            author,
            body_text: html_to_text(&entry.description),
            published_at: entry.published.clone().unwrap_or_default(),
            images: extract_images(&entry.description),
        }
    }
}

/// `<img src>` values in document order, without duplicates.
pub fn extract_images(html: &str) -> Vec<String> {
    let mut images: Vec<String> = Vec::new();
    for caps in IMG_SRC.captures_iter(html) {
        let src = html_escape::decode_html_entities(caps[1].trim()).into_owned();
        if !src.is_empty() && !images.contains(&src) {
            images.push(src);
        }
    }
    images
}

/// Converts an HTML fragment to readable plain text.
pub fn html_to_text(html: &str) -> String {
    let text = SCRIPT_STYLE.replace_all(html, "");
    let text = IMG_TAG.replace_all(&text, "");
    let text = ANCHOR.replace_all(&text, |caps: &regex::Captures| {
        let href = caps[1].trim();
        let label = ANY_TAG.replace_all(&caps[2], "");
        let label = label.trim();
        match (label.is_empty(), href.is_empty() || label == href) {
            (true, _) => href.to_string(),
            (false, true) => label.to_string(),
            (false, false) => format!("{label} ({href})"),
        }
    });
    let text = LINE_BREAK.replace_all(&text, "\n");
    let text = BLOCK_END.replace_all(&text, "\n\n");
    let text = ANY_TAG.replace_all(&text, "");
    let text = html_escape::decode_html_entities(&text);
    let text = text.replace('\u{a0}', " ").replace("\r\n", "\n");
    let text = BLANK_RUN.replace_all(&text, "\n\n");

    text.lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}
