pub mod channels;
pub mod credential;
pub mod router;

use std::sync::Arc;

use reqwest::Client;

use crate::{
    config::AppConfig,
    feishu::client::FeishuTokenExchange,
    notify::{
        channels::{ChannelKind, FeishuChannel, NotificationChannel, TelegramChannel},
        credential::{Clock, CredentialCache},
        router::NotificationRouter,
    },
};

/// Builds one adapter per enabled channel, in configured order.
pub fn build_router(config: &AppConfig, http: &Client, clock: Arc<dyn Clock>) -> NotificationRouter {
    let channels = config
        .channels
        .iter()
        .map(|kind| -> Box<dyn NotificationChannel> {
            match kind {
                ChannelKind::Telegram => {
                    Box::new(TelegramChannel::new(http.clone(), config.telegram.clone()))
                }
                ChannelKind::Feishu => {
                    let exchange = FeishuTokenExchange::new(http.clone(), config.feishu.clone());
                    let credentials = Arc::new(CredentialCache::new(Box::new(exchange), clock.clone()));
                    Box::new(FeishuChannel::new(
                        http.clone(),
                        config.feishu.clone(),
                        credentials,
                    ))
                }
            }
        })
        .collect();
    NotificationRouter::new(channels)
}
