use std::time::Duration;

pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(1800);
pub const MIN_CHECK_INTERVAL: Duration = Duration::from_secs(60);
pub const DEFAULT_ITEM_DELAY: Duration = Duration::from_secs(3);
pub const DEFAULT_FEED_DELAY: Duration = Duration::from_secs(2);

/// Pauses between deliveries, to stay under channel rate limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    pub item_delay: Duration,
    pub feed_delay: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            item_delay: DEFAULT_ITEM_DELAY,
            feed_delay: DEFAULT_FEED_DELAY,
        }
    }
}

impl Pacing {
    pub fn none() -> Self {
        Self {
            item_delay: Duration::ZERO,
            feed_delay: Duration::ZERO,
        }
    }
}

/// What one pass over the configured feeds achieved.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CycleSummary {
    pub feeds: usize,
    pub delivered: usize,
    pub failed_feeds: usize,
    pub interrupted: bool,
}

/// Outcome for a single feed within a cycle.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FeedReport {
    pub new_items: usize,
    pub delivered: usize,
    pub seeded: bool,
    pub interrupted: bool,
}
