use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::{
    errors::{AppError, AppResult},
    models::{
        feed_item::{FetchedFeed, RawEntry},
        notification::NotificationPayload,
    },
    notify::{
        channels::{ChannelKind, Delivery, NotificationChannel},
        credential::Clock,
    },
    tasks::feed_monitor::source::FeedSource,
    translate::Translator,
};

/// A clock that only moves when told to.
pub struct FixedClock {
    now: AtomicI64,
}

impl FixedClock {
    pub fn new(now: i64) -> Self {
        Self {
            now: AtomicI64::new(now),
        }
    }

    pub fn advance(&self, secs: i64) {
        self.now.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now_epoch_secs(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Records what it was asked to send: the payload link for items and the
/// text for plain messages.
#[derive(Clone)]
pub struct FakeChannel {
    kind: ChannelKind,
    fail: bool,
    calls: Arc<Mutex<Vec<String>>>,
}

impl FakeChannel {
    pub fn new(kind: ChannelKind) -> Self {
        Self {
            kind,
            fail: false,
            calls: Arc::default(),
        }
    }

    pub fn failing(kind: ChannelKind) -> Self {
        Self {
            fail: true,
            ..Self::new(kind)
        }
    }

    pub fn calls(&self) -> Arc<Mutex<Vec<String>>> {
        self.calls.clone()
    }

    fn record(&self, entry: &str) -> AppResult<Delivery> {
        self.calls.lock().unwrap().push(entry.to_string());
        if self.fail {
            Err(AppError::api(self.kind.as_str(), "simulated outage"))
        } else {
            Ok(Delivery::Delivered)
        }
    }
}

#[async_trait]
impl NotificationChannel for FakeChannel {
    fn kind(&self) -> ChannelKind {
        self.kind
    }

    async fn send_item(&self, payload: &NotificationPayload) -> AppResult<Delivery> {
        self.record(&payload.link)
    }

    async fn send_plain(&self, text: &str) -> AppResult<Delivery> {
        self.record(text)
    }
}

/// Serves canned entries per feed id; unknown feeds fail.
#[derive(Default)]
pub struct FakeSource {
    feeds: Mutex<HashMap<String, Vec<RawEntry>>>,
}

impl FakeSource {
    pub fn set(&self, feed_id: &str, entries: Vec<RawEntry>) {
        self.feeds
            .lock()
            .unwrap()
            .insert(feed_id.to_string(), entries);
    }
}

#[async_trait]
impl FeedSource for FakeSource {
    async fn fetch(&self, feed_id: &str) -> AppResult<FetchedFeed> {
        let entries = self
            .feeds
            .lock()
            .unwrap()
            .get(feed_id)
            .cloned()
            .ok_or_else(|| AppError::api("feed", format!("404 Not Found: {feed_id}")))?;
        Ok(FetchedFeed {
            title: Some("Test Feed".to_string()),
            entries,
        })
    }
}

/// Upper-cases its input and counts calls.
#[derive(Default)]
pub struct FakeTranslator {
    calls: AtomicUsize,
}

impl FakeTranslator {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Translator for FakeTranslator {
    async fn translate(&self, text: &str) -> AppResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(text.to_uppercase())
    }
}

pub fn raw_entry(link: &str, description: &str) -> RawEntry {
    RawEntry {
        link: Some(link.to_string()),
        author: Some("tester".to_string()),
        description: description.to_string(),
        published: None,
    }
}

pub fn sample_payload(link: &str) -> NotificationPayload {
    NotificationPayload {
        author: "tester".to_string(),
        original_text: "Hello from the feed".to_string(),
        translated_text: None,
        link: link.to_string(),
        images: Vec::new(),
    }
}
