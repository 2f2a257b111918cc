use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize structured logging
pub fn init_logging() {
    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level));

    if log_format == "json" {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_current_span(false)
                    .with_span_list(false),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_target(true)
                    .with_thread_ids(false),
            )
            .init();
    }

    info!(
        service = "feedrelay",
        version = env!("CARGO_PKG_VERSION"),
        log_level = %log_level,
        log_format = %log_format,
        "Logging initialized"
    );
}

/// Logs the outcome of one polling cycle in a consistent shape.
pub fn log_cycle_summary(feeds: usize, delivered: usize, failed_feeds: usize, duration_ms: u64) {
    info!(
        feeds = feeds,
        delivered = delivered,
        failed_feeds = failed_feeds,
        duration_ms = duration_ms,
        "Feed cycle completed"
    );
}
