use std::sync::Arc;
use std::time::Instant;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::{
    dedup::select_new_items,
    extract::ContentExtractor,
    source::FeedSource,
};
use crate::{
    errors::AppResult,
    models::{feed::FeedConfig, feed_item::FeedItem, notification::NotificationPayload},
    notify::router::NotificationRouter,
    observability::log_cycle_summary,
    state::StateStore,
    tasks::types::{CycleSummary, FeedReport, Pacing},
    translate::Translator,
};

/// One polling pass: fetch, extract, deduplicate, translate, route, checkpoint.
pub struct FeedMonitor {
    source: Arc<dyn FeedSource>,
    extractor: Arc<dyn ContentExtractor>,
    translator: Option<Arc<dyn Translator>>,
    router: NotificationRouter,
    store: StateStore,
    pacing: Pacing,
}

impl FeedMonitor {
    pub fn new(
        source: Arc<dyn FeedSource>,
        extractor: Arc<dyn ContentExtractor>,
        translator: Option<Arc<dyn Translator>>,
        router: NotificationRouter,
        store: StateStore,
        pacing: Pacing,
    ) -> Self {
        Self {
            source,
            extractor,
            translator,
            router,
            store,
            pacing,
        }
    }

    pub fn router(&self) -> &NotificationRouter {
        &self.router
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    /// Processes every feed in order. A failing feed is logged and skipped.
    pub async fn run_cycle(
        &self,
        feeds: &[FeedConfig],
        only_latest: bool,
        shutdown: &watch::Receiver<bool>,
    ) -> CycleSummary {
        let started = Instant::now();
        let mut summary = CycleSummary {
            feeds: feeds.len(),
            ..Default::default()
        };

        for (index, feed) in feeds.iter().enumerate() {
            if *shutdown.borrow() {
                summary.interrupted = true;
                break;
            }

            match self.process_feed(feed, only_latest, shutdown).await {
                Ok(report) => {
                    summary.delivered += report.delivered;
                    if report.interrupted {
                        summary.interrupted = true;
                        break;
                    }
                }
                Err(e) => {
                    summary.failed_feeds += 1;
                    warn!(feed = %feed.short_id(), error = %e, transient = e.is_transient(), "Error processing feed");
                }
            }

            if index + 1 < feeds.len() && self.pause(self.pacing.feed_delay, shutdown).await {
                summary.interrupted = true;
                break;
            }
        }

        log_cycle_summary(
            summary.feeds,
            summary.delivered,
            summary.failed_feeds,
            started.elapsed().as_millis() as u64,
        );
        summary
    }

    /// Runs the pipeline for one feed.
    ///
    /// With `only_latest` the newest item is delivered and the state file is
    /// neither read nor written.
    pub async fn process_feed(
        &self,
        feed: &FeedConfig,
        only_latest: bool,
        shutdown: &watch::Receiver<bool>,
    ) -> AppResult<FeedReport> {
        let fetched = self.source.fetch(&feed.id).await?;
        if fetched.entries.is_empty() {
            info!(feed = %feed.short_id(), "Feed has no entries");
            return Ok(FeedReport::default());
        }

        let items: Vec<FeedItem> = fetched
            .entries
            .iter()
            .map(|entry| self.extractor.extract(entry, fetched.title.as_deref()))
            .collect();

        let checkpoint = if only_latest {
            None
        } else {
            StateStore::checkpoint(&self.store.load(), &feed.id)
        };

        let selection = select_new_items(items, checkpoint.as_deref(), only_latest);
        let mut report = FeedReport {
            new_items: selection.new_items.len(),
            ..Default::default()
        };

        if let Some(seed) = selection.seed_link {
            info!(feed = %feed.short_id(), link = %seed, "First contact with feed, recording checkpoint without sending");
            self.store.set_checkpoint(&feed.id, &seed)?;
            report.seeded = true;
            return Ok(report);
        }

        if selection.new_items.is_empty() {
            debug!(feed = %feed.short_id(), "No new items");
            return Ok(report);
        }
        info!(feed = %feed.short_id(), count = selection.new_items.len(), "Found new items");

        let total = selection.new_items.len();
        for (index, item) in selection.new_items.iter().enumerate() {
            let translated = self.translate(feed, item).await;
            let payload = NotificationPayload::from_item(item, translated);

            let dispatch = self.router.dispatch(&payload).await;
            if dispatch.delivered() > 0 {
                report.delivered += 1;
            }

            // The checkpoint follows the attempt, whatever the channels said.
            if !only_latest {
                if let Err(e) = self.store.set_checkpoint(&feed.id, &item.link) {
                    warn!(feed = %feed.short_id(), link = %item.link, error = %e, "Failed to save checkpoint");
                }
            }

            if index + 1 < total && self.pause(self.pacing.item_delay, shutdown).await {
                report.interrupted = true;
                break;
            }
        }

        Ok(report)
    }

    async fn translate(&self, feed: &FeedConfig, item: &FeedItem) -> Option<String> {
        if !feed.translation_enabled || item.body_text.trim().is_empty() {
            return None;
        }
        let translator = self.translator.as_ref()?;

        match translator.translate(&item.body_text).await {
            Ok(text) => Some(text),
            Err(e) => {
                warn!(feed = %feed.short_id(), link = %item.link, error = %e, "Translation failed, sending original only");
                None
            }
        }
    }

    /// Sleeps for `delay`, returning early with `true` if shutdown was requested.
    async fn pause(&self, delay: std::time::Duration, shutdown: &watch::Receiver<bool>) -> bool {
        if *shutdown.borrow() {
            return true;
        }
        if delay.is_zero() {
            return false;
        }
        let mut shutdown = shutdown.clone();
        tokio::select! {
            _ = tokio::time::sleep(delay) => false,
            changed = shutdown.changed() => changed.is_ok() && *shutdown.borrow(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        notify::channels::ChannelKind,
        tasks::feed_monitor::extract::HtmlContentExtractor,
        test_helpers::{raw_entry, FakeChannel, FakeSource, FakeTranslator},
    };
    use tempfile::TempDir;

    struct Harness {
        monitor: FeedMonitor,
        source: Arc<FakeSource>,
        telegram: FakeChannel,
        translator: Arc<FakeTranslator>,
        _dir: TempDir,
    }

    fn harness(feishu_fails: bool) -> Harness {
        let dir = TempDir::new().unwrap();
        let source = Arc::new(FakeSource::default());
        let translator = Arc::new(FakeTranslator::default());
        let telegram = FakeChannel::new(ChannelKind::Telegram);
        let feishu = if feishu_fails {
            FakeChannel::failing(ChannelKind::Feishu)
        } else {
            FakeChannel::new(ChannelKind::Feishu)
        };
        let router = NotificationRouter::new(vec![Box::new(telegram.clone()), Box::new(feishu)]);
        let monitor = FeedMonitor::new(
            source.clone(),
            Arc::new(HtmlContentExtractor),
            Some(translator.clone()),
            router,
            StateStore::new(dir.path().join("state.json")),
            Pacing::none(),
        );
        Harness {
            monitor,
            source,
            telegram,
            translator,
            _dir: dir,
        }
    }

    fn links(entries: &[&str]) -> Vec<crate::models::feed_item::RawEntry> {
        entries.iter().map(|l| raw_entry(l, "body")).collect()
    }

    #[tokio::test]
    async fn test_first_contact_seeds_without_sending() {
        let h = harness(false);
        let (_tx, rx) = watch::channel(false);
        let feed = FeedConfig::new("https://rss/a", true);
        h.source.set(&feed.id, links(&["l3", "l2", "l1"]));

        let report = h.monitor.process_feed(&feed, false, &rx).await.unwrap();
        assert!(report.seeded);
        assert!(h.telegram.calls().lock().unwrap().is_empty());
        assert_eq!(
            StateStore::checkpoint(&h.monitor.store().load(), &feed.id).as_deref(),
            Some("l3")
        );
    }

    #[tokio::test]
    async fn test_new_items_delivered_oldest_first() {
        let h = harness(false);
        let (_tx, rx) = watch::channel(false);
        let feed = FeedConfig::new("https://rss/a", true);
        h.monitor.store().set_checkpoint(&feed.id, "l1").unwrap();
        h.source.set(&feed.id, links(&["l3", "l2", "l1"]));

        let report = h.monitor.process_feed(&feed, false, &rx).await.unwrap();
        assert_eq!(report.delivered, 2);
        assert_eq!(*h.telegram.calls().lock().unwrap(), vec!["l2", "l3"]);
        assert_eq!(
            StateStore::checkpoint(&h.monitor.store().load(), &feed.id).as_deref(),
            Some("l3")
        );

        // unchanged feed, nothing new
        let report = h.monitor.process_feed(&feed, false, &rx).await.unwrap();
        assert_eq!(report.new_items, 0);
        assert_eq!(h.telegram.calls().lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_only_latest_leaves_state_untouched() {
        let h = harness(false);
        let (_tx, rx) = watch::channel(false);
        let feed = FeedConfig::new("https://rss/a", false);
        h.source.set(&feed.id, links(&["l3", "l2", "l1"]));

        let report = h.monitor.process_feed(&feed, true, &rx).await.unwrap();
        assert_eq!(report.delivered, 1);
        assert_eq!(*h.telegram.calls().lock().unwrap(), vec!["l3"]);
        assert!(!h.monitor.store().path().exists());
    }

    #[tokio::test]
    async fn test_channel_failure_still_advances_checkpoint() {
        let h = harness(true);
        let (_tx, rx) = watch::channel(false);
        let feed = FeedConfig::new("https://rss/a", true);
        h.monitor.store().set_checkpoint(&feed.id, "l1").unwrap();
        h.source.set(&feed.id, links(&["l2", "l1"]));

        h.monitor.process_feed(&feed, false, &rx).await.unwrap();
        assert_eq!(*h.telegram.calls().lock().unwrap(), vec!["l2"]);
        assert_eq!(
            StateStore::checkpoint(&h.monitor.store().load(), &feed.id).as_deref(),
            Some("l2")
        );
    }

    #[tokio::test]
    async fn test_translation_respects_feed_flag() {
        let h = harness(false);
        let (_tx, rx) = watch::channel(false);
        let on = FeedConfig::new("https://rss/on", true);
        let off = FeedConfig::new("https://rss/off", false);
        for feed in [&on, &off] {
            h.monitor.store().set_checkpoint(&feed.id, "old").unwrap();
            h.source.set(&feed.id, links(&["new", "old"]));
        }

        h.monitor.process_feed(&off, false, &rx).await.unwrap();
        assert_eq!(h.translator.calls(), 0);
        h.monitor.process_feed(&on, false, &rx).await.unwrap();
        assert_eq!(h.translator.calls(), 1);
    }

    #[tokio::test]
    async fn test_failing_feed_does_not_stop_cycle() {
        let h = harness(false);
        let (_tx, rx) = watch::channel(false);
        let broken = FeedConfig::new("https://rss/broken", true);
        let good = FeedConfig::new("https://rss/good", true);
        h.monitor.store().set_checkpoint(&good.id, "g1").unwrap();
        h.source.set(&good.id, links(&["g2", "g1"]));

        let summary = h.monitor.run_cycle(&[broken, good], false, &rx).await;
        assert_eq!(summary.failed_feeds, 1);
        assert_eq!(summary.delivered, 1);
        assert_eq!(*h.telegram.calls().lock().unwrap(), vec!["g2"]);
    }

    #[tokio::test]
    async fn test_shutdown_stops_before_next_feed() {
        let h = harness(false);
        let (tx, rx) = watch::channel(false);
        tx.send(true).unwrap();

        let summary = h
            .monitor
            .run_cycle(&[FeedConfig::new("https://rss/a", true)], false, &rx)
            .await;
        assert!(summary.interrupted);
        assert!(h.telegram.calls().lock().unwrap().is_empty());
    }
}
