use serde_json::{json, Value};

use crate::models::notification::{truncate_chars, NotificationPayload};

/// Per-section budget keeping a card well under Feishu's 30 KB payload cap.
pub const SECTION_LIMIT: usize = 4000;

/// Builds a schema 2.0 interactive card for one item.
pub fn build_card(payload: &NotificationPayload, image_key: Option<&str>) -> Value {
    let mut elements = vec![json!({
        "tag": "markdown",
        "content": format!(
            "### **Original**\n{}",
            truncate_chars(&payload.original_text, SECTION_LIMIT)
        ),
    })];

    if let Some(translated) = &payload.translated_text {
        elements.push(json!({
            "tag": "markdown",
            "content": format!(
                "### **Translation**\n{}",
                truncate_chars(translated, SECTION_LIMIT)
            ),
        }));
    }

    if let Some(image_key) = image_key {
        elements.push(json!({
            "tag": "img",
            "img_key": image_key,
            "alt": { "tag": "plain_text", "content": "post image" },
        }));
    }

    elements.push(json!({
        "tag": "markdown",
        "content": format!("[View post]({})", payload.link),
    }));

    json!({
        "schema": "2.0",
        "config": { "update_multi": true, "width_mode": "fill" },
        "header": {
            "title": { "tag": "plain_text", "content": format!("📢 {}", payload.author) },
            "template": "blue",
        },
        "body": { "elements": elements },
    })
}

/// Plain-text rendering of an item, sent when a card is rejected.
pub fn build_fallback_text(payload: &NotificationPayload) -> Value {
    let mut text = format!(
        "📢 {}\n\n{}\n\n",
        payload.author,
        truncate_chars(&payload.original_text, SECTION_LIMIT)
    );
    if let Some(translated) = &payload.translated_text {
        text.push_str(&truncate_chars(translated, SECTION_LIMIT));
        text.push_str("\n\n");
    }
    text.push_str(&payload.link);
    build_text(&text)
}

pub fn build_text(text: &str) -> Value {
    json!({ "text": text })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(translated: Option<&str>) -> NotificationPayload {
        NotificationPayload {
            author: "Someone".to_string(),
            original_text: "hello #rust".to_string(),
            translated_text: translated.map(str::to_string),
            link: "https://x.com/someone/status/1".to_string(),
            images: Vec::new(),
        }
    }

    #[test]
    fn test_card_without_translation_or_image() {
        let card = build_card(&payload(None), None);
        let elements = card["body"]["elements"].as_array().unwrap();
        assert_eq!(elements.len(), 2);
        assert_eq!(card["header"]["title"]["content"], "📢 Someone");
        assert_eq!(card["schema"], "2.0");
        assert!(elements[0]["content"].as_str().unwrap().contains("hello #rust"));
        assert_eq!(elements[1]["content"], "[View post](https://x.com/someone/status/1)");
    }

    #[test]
    fn test_card_with_translation_and_image() {
        let card = build_card(&payload(Some("你好 #rust")), Some("img_v2_abc"));
        let elements = card["body"]["elements"].as_array().unwrap();
        assert_eq!(elements.len(), 4);
        assert!(elements[1]["content"].as_str().unwrap().contains("你好 #rust"));
        assert_eq!(elements[2]["tag"], "img");
        assert_eq!(elements[2]["img_key"], "img_v2_abc");
    }

    #[test]
    fn test_card_sections_are_capped() {
        let mut long = payload(Some(&"译".repeat(SECTION_LIMIT * 2)));
        long.original_text = "x".repeat(SECTION_LIMIT * 2);

        let card = build_card(&long, None);
        assert!(card.to_string().len() < 30 * 1024);
        let elements = card["body"]["elements"].as_array().unwrap();
        assert!(elements[0]["content"].as_str().unwrap().ends_with('…'));
        assert!(elements[1]["content"].as_str().unwrap().ends_with('…'));
    }

    #[test]
    fn test_fallback_text_keeps_all_parts() {
        let text = build_fallback_text(&payload(Some("你好 #rust")));
        assert_eq!(
            text["text"],
            "📢 Someone\n\nhello #rust\n\n你好 #rust\n\nhttps://x.com/someone/status/1"
        );

        let text = build_fallback_text(&payload(None));
        assert_eq!(text["text"], "📢 Someone\n\nhello #rust\n\nhttps://x.com/someone/status/1");
    }
}
