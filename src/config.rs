use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::{info, warn};

use crate::{
    errors::{AppError, AppResult},
    feishu::types::{self as feishu_types, FeishuConfig},
    models::feed::FeedConfig,
    notify::channels::ChannelKind,
    tasks::types::{Pacing, DEFAULT_CHECK_INTERVAL, MIN_CHECK_INTERVAL},
    telegram::types::{self as telegram_types, TelegramConfig},
    translate::{
        gemini::{self, GeminiConfig},
        openai::{self, OpenAiConfig},
    },
};

const DEFAULT_CHANNELS: &str = "telegram,feishu";
const DEFAULT_STATE_FILE: &str = "state.json";
const DEFAULT_TARGET_LANGUAGE: &str = "Simplified Chinese";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiProvider {
    Gemini,
    OpenAi,
}

impl FromStr for AiProvider {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "gemini" => Ok(AiProvider::Gemini),
            "openai" => Ok(AiProvider::OpenAi),
            other => Err(AppError::Config(format!("unknown AI_PROVIDER '{other}'"))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TranslationSettings {
    pub provider: AiProvider,
    pub gemini: GeminiConfig,
    pub openai: OpenAiConfig,
}

impl TranslationSettings {
    /// Whether the selected provider has an API key.
    pub fn is_available(&self) -> bool {
        match self.provider {
            AiProvider::Gemini => !self.gemini.api_key.is_empty(),
            AiProvider::OpenAi => !self.openai.api_key.is_empty(),
        }
    }
}

/// Process configuration, read once from the environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub feeds: Vec<FeedConfig>,
    /// Channels that were requested and have complete credentials.
    pub channels: Vec<ChannelKind>,
    pub telegram: TelegramConfig,
    pub feishu: FeishuConfig,
    pub translation: TranslationSettings,
    pub check_interval: Duration,
    pub proxy_url: Option<String>,
    pub state_file: PathBuf,
    pub pacing: Pacing,
    pub startup_probe: bool,
}

impl AppConfig {
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> AppResult<Self> {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let get_or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let feeds = parse_feeds(&get("RSS_URL").unwrap_or_default());

        let telegram = TelegramConfig::new(
            get("TG_BOT_TOKEN").unwrap_or_default(),
            get("TG_CHAT_ID").unwrap_or_default(),
        )
        .with_api_base(get_or("TG_API_BASE", telegram_types::DEFAULT_API_BASE));

        let feishu = FeishuConfig::new(
            get("FEISHU_APP_ID").unwrap_or_default(),
            get("FEISHU_APP_SECRET").unwrap_or_default(),
            split_list(&get("FEISHU_RECEIVE_IDS").unwrap_or_default()),
        )
        .with_receive_id_type(get_or(
            "FEISHU_RECEIVE_ID_TYPE",
            feishu_types::DEFAULT_RECEIVE_ID_TYPE,
        ))
        .with_api_base(get_or("FEISHU_API_BASE", feishu_types::DEFAULT_API_BASE));

        let channels = enabled_channels(&get_or("NOTIFY_CHANNELS", DEFAULT_CHANNELS), |kind| {
            match kind {
                ChannelKind::Telegram => telegram.is_complete(),
                ChannelKind::Feishu => feishu.is_complete(),
            }
        });

        let target_language = get_or("TRANSLATE_TARGET_LANG", DEFAULT_TARGET_LANGUAGE);
        let translation = TranslationSettings {
            provider: get_or("AI_PROVIDER", "gemini")
                .parse()
                .unwrap_or_else(|e: AppError| {
                    warn!(error = %e, "Falling back to gemini");
                    AiProvider::Gemini
                }),
            gemini: GeminiConfig {
                api_key: get("GEMINI_API_KEY").unwrap_or_default(),
                base_url: get_or("GEMINI_BASE_URL", gemini::DEFAULT_BASE_URL),
                model: get_or("GEMINI_MODEL", gemini::DEFAULT_MODEL),
                target_language: target_language.clone(),
            },
            openai: OpenAiConfig {
                api_key: get("OPENAI_API_KEY").unwrap_or_default(),
                base_url: get_or("OPENAI_BASE_URL", openai::DEFAULT_BASE_URL),
                model: get_or("OPENAI_MODEL", openai::DEFAULT_MODEL),
                target_language,
            },
        };

        let pacing = Pacing {
            item_delay: Duration::from_secs(parse_number(get("ITEM_DELAY_SECS"), "ITEM_DELAY_SECS", 3)?),
            feed_delay: Duration::from_secs(parse_number(get("FEED_DELAY_SECS"), "FEED_DELAY_SECS", 2)?),
        };

        Ok(Self {
            feeds,
            channels,
            telegram,
            feishu,
            translation,
            check_interval: clamp_interval(parse_number(
                get("CHECK_INTERVAL"),
                "CHECK_INTERVAL",
                DEFAULT_CHECK_INTERVAL.as_secs(),
            )?),
            proxy_url: get("PROXY_URL"),
            state_file: PathBuf::from(get_or("STATE_FILE", DEFAULT_STATE_FILE)),
            pacing,
            startup_probe: get("STARTUP_PROBE").map(|v| parse_bool(&v)).unwrap_or(false),
        })
    }

    /// Problems worth a warning at startup. None of them stop the process.
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.feeds.is_empty() {
            warnings.push("RSS_URL is empty, no feeds will be monitored".to_string());
        }
        if self.channels.is_empty() {
            warnings.push("No notification channel is enabled".to_string());
        }
        if self.feeds.iter().any(|f| f.translation_enabled) && !self.translation.is_available() {
            warnings.push(format!(
                "Translation is enabled for some feeds but {:?} has no API key, items will be sent untranslated",
                self.translation.provider
            ));
        }
        warnings
    }

    pub fn log_summary(&self) {
        info!(
            feeds = self.feeds.len(),
            channels = ?self.channels,
            provider = ?self.translation.provider,
            interval_secs = self.check_interval.as_secs(),
            proxy = self.proxy_url.is_some(),
            state_file = %self.state_file.display(),
            "Configuration loaded"
        );
        for feed in &self.feeds {
            info!(feed = %feed.id, translate = feed.translation_enabled, "Monitoring feed");
        }
    }
}

/// Parses the comma-separated `URL[@T|@F]` list, keeping the first
/// occurrence of each URL.
pub fn parse_feeds(raw: &str) -> Vec<FeedConfig> {
    let mut feeds: Vec<FeedConfig> = Vec::new();
    for feed in raw.split(',').filter_map(FeedConfig::parse) {
        if feeds.iter().any(|f| f.id == feed.id) {
            warn!(feed = %feed.id, "Duplicate feed ignored");
            continue;
        }
        feeds.push(feed);
    }
    feeds
}

fn enabled_channels(raw: &str, has_credentials: impl Fn(ChannelKind) -> bool) -> Vec<ChannelKind> {
    let mut channels = Vec::new();
    for name in raw.split(',').map(str::trim).filter(|n| !n.is_empty()) {
        let kind = match name.parse::<ChannelKind>() {
            Ok(kind) => kind,
            Err(e) => {
                warn!(channel = %name, "{e}, ignoring");
                continue;
            }
        };
        if channels.contains(&kind) {
            continue;
        }
        if !has_credentials(kind) {
            warn!(channel = %kind, "Channel requested but credentials are incomplete, skipping");
            continue;
        }
        channels.push(kind);
    }
    channels
}

fn clamp_interval(secs: u64) -> Duration {
    if secs < MIN_CHECK_INTERVAL.as_secs() {
        warn!(
            requested_secs = secs,
            min_secs = MIN_CHECK_INTERVAL.as_secs(),
            "CHECK_INTERVAL too short, using the minimum"
        );
        return MIN_CHECK_INTERVAL;
    }
    Duration::from_secs(secs)
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_number(value: Option<String>, key: &str, default: u64) -> AppResult<u64> {
    match value {
        None => Ok(default),
        Some(v) => v
            .parse()
            .map_err(|_| AppError::Config(format!("{key} must be a whole number of seconds, got '{v}'"))),
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
