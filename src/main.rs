use std::sync::Arc;

use clap::Parser;
use dotenvy::dotenv;
use tokio::sync::watch;
use tracing::{error, info, warn};

use feedrelay::{
    config::AppConfig,
    errors::AppResult,
    http::{build_client, DEFAULT_TIMEOUT},
    notify::{build_router, credential::SystemClock},
    observability::init_logging,
    state::StateStore,
    tasks::feed_monitor::{extract::HtmlContentExtractor, source::HttpFeedSource, FeedMonitor},
    translate::build_translator,
};

/// CLI options
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Run a single polling cycle and exit
    #[clap(long)]
    once: bool,

    /// Deliver the newest item of every feed at startup without touching state
    #[clap(long)]
    probe: bool,
}

#[tokio::main]
async fn main() {
    dotenv().ok();
    init_logging();

    let args = Args::parse();
    if let Err(e) = run(args).await {
        error!(error = %e, "Fatal error");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> AppResult<()> {
    let config = AppConfig::from_env()?;
    config.log_summary();
    for warning in config.warnings() {
        warn!("{warning}");
    }

    let http = build_client(config.proxy_url.as_deref(), DEFAULT_TIMEOUT)?;
    let router = build_router(&config, &http, Arc::new(SystemClock));
    let mut store = StateStore::new(&config.state_file);
    if let Some(first) = config.feeds.first() {
        store = store.with_legacy_feed(&first.id);
    }

    let monitor = FeedMonitor::new(
        Arc::new(HttpFeedSource::new(http.clone())),
        Arc::new(HtmlContentExtractor),
        build_translator(http, &config.translation),
        router,
        store,
        config.pacing,
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        wait_for_signal().await;
        info!("Shutdown requested, stopping after the current item");
        let _ = shutdown_tx.send(true);
    });

    monitor
        .router()
        .broadcast_plain(&format!(
            "✅ Feed relay started\nMonitoring {} feed(s), checking every {} minute(s).",
            config.feeds.len(),
            (config.check_interval.as_secs() / 60).max(1)
        ))
        .await;

    if args.probe || config.startup_probe {
        info!("Running startup probe");
        monitor.run_cycle(&config.feeds, true, &shutdown_rx).await;
    }

    let mut shutdown = shutdown_rx.clone();
    loop {
        if *shutdown.borrow() {
            break;
        }
        let summary = monitor.run_cycle(&config.feeds, false, &shutdown_rx).await;
        if args.once || summary.interrupted {
            break;
        }

        info!(secs = config.check_interval.as_secs(), "Waiting for next check");
        tokio::select! {
            _ = tokio::time::sleep(config.check_interval) => {}
            _ = shutdown.changed() => {}
        }
    }

    monitor.router().broadcast_plain("🛑 Feed relay stopped").await;
    info!("Stopped");
    Ok(())
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = sigterm.recv() => {}
            }
        }
        Err(e) => {
            warn!(error = %e, "Could not install SIGTERM handler");
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
