use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::errors::AppResult;

/// Seconds shaved off the server TTL so a token is never used at the edge.
pub const SAFETY_MARGIN_SECS: i64 = 120;
/// Minimum lifetime granted to a freshly exchanged token.
pub const MIN_LIFETIME_SECS: i64 = 60;

pub trait Clock: Send + Sync {
    fn now_epoch_secs(&self) -> i64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_epoch_secs(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// A token as issued by the remote service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub value: String,
    pub ttl_secs: i64,
}

#[async_trait]
pub trait TokenExchange: Send + Sync {
    async fn exchange(&self) -> AppResult<IssuedToken>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedToken {
    pub value: String,
    pub expires_at_epoch_secs: i64,
}

/// Short-lived bearer token obtained through a credential exchange.
pub struct CredentialCache {
    exchange: Box<dyn TokenExchange>,
    clock: Arc<dyn Clock>,
    slot: Mutex<Option<CachedToken>>,
}

impl CredentialCache {
    pub fn new(exchange: Box<dyn TokenExchange>, clock: Arc<dyn Clock>) -> Self {
        Self {
            exchange,
            clock,
            slot: Mutex::new(None),
        }
    }

    /// Returns the cached token, exchanging credentials when it is absent or
    /// expired. The check and refresh run under one lock, so concurrent
    /// callers share a single exchange.
    pub async fn get_token(&self) -> AppResult<String> {
        let mut slot = self.slot.lock().await;
        let now = self.clock.now_epoch_secs();

        if let Some(cached) = slot.as_ref() {
            if now < cached.expires_at_epoch_secs {
                debug!(expires_in = cached.expires_at_epoch_secs - now, "Reusing cached token");
                return Ok(cached.value.clone());
            }
        }

        let issued = self.exchange.exchange().await?;
        let lifetime = (issued.ttl_secs - SAFETY_MARGIN_SECS).max(MIN_LIFETIME_SECS);
        let cached = CachedToken {
            value: issued.value,
            expires_at_epoch_secs: now + lifetime,
        };
        info!(lifetime_secs = lifetime, "Obtained new access token");

        let value = cached.value.clone();
        *slot = Some(cached);
        Ok(value)
    }
}
