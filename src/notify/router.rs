use tracing::{info, warn};

use super::channels::{ChannelKind, Delivery, NotificationChannel};
use crate::models::notification::NotificationPayload;

/// Per-channel outcome of one fan-out.
#[derive(Debug, Default)]
pub struct DispatchReport {
    pub outcomes: Vec<(ChannelKind, Result<Delivery, String>)>,
}

impl DispatchReport {
    /// Channels that received the content, rich or degraded.
    pub fn delivered(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, r)| matches!(r, Ok(Delivery::Delivered | Delivery::Degraded)))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|(_, r)| r.is_err()).count()
    }
}

/// Fans notifications out to every enabled channel. One channel failing
/// never stops the others.
#[derive(Default)]
pub struct NotificationRouter {
    channels: Vec<Box<dyn NotificationChannel>>,
}

impl NotificationRouter {
    pub fn new(channels: Vec<Box<dyn NotificationChannel>>) -> Self {
        Self { channels }
    }

    pub fn enabled(&self) -> Vec<ChannelKind> {
        self.channels.iter().map(|c| c.kind()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub async fn dispatch(&self, payload: &NotificationPayload) -> DispatchReport {
        let mut report = DispatchReport::default();
        for channel in &self.channels {
            let kind = channel.kind();
            let outcome = match channel.send_item(payload).await {
                Ok(delivery) => {
                    info!(channel = %kind, link = %payload.link, outcome = ?delivery, "Item dispatched");
                    Ok(delivery)
                }
                Err(e) => {
                    warn!(channel = %kind, link = %payload.link, error = %e, "Channel delivery failed");
                    Err(e.to_string())
                }
            };
            report.outcomes.push((kind, outcome));
        }
        report
    }

    pub async fn broadcast_plain(&self, text: &str) -> DispatchReport {
        let mut report = DispatchReport::default();
        for channel in &self.channels {
            let kind = channel.kind();
            let outcome = match channel.send_plain(text).await {
                Ok(delivery) => Ok(delivery),
                Err(e) => {
                    warn!(channel = %kind, error = %e, "Status message failed");
                    Err(e.to_string())
                }
            };
            report.outcomes.push((kind, outcome));
        }
        report
    }
}
