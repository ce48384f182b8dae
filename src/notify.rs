//! Ephemeral user-facing notifications.
//!
//! A single-slot channel: at most one notice is visible at a time, the last
//! posted one wins, and each notice expires on its own after a fixed
//! duration unless dismissed earlier. Nothing is persisted.

use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::RwLock;

/// How long a notice stays visible unless dismissed.
const NOTICE_TTL: Duration = Duration::from_secs(3);

/// A visible notice.
#[derive(Debug, Clone, Serialize)]
pub struct Notice {
    pub message: String,

    #[serde(skip)]
    posted_at: Instant,
}

/// Single-slot notification channel.
#[derive(Debug)]
pub struct Notifier {
    slot: RwLock<Option<Notice>>,
    ttl: Duration,
}

impl Notifier {
    pub fn new() -> Self {
        Self::with_ttl(NOTICE_TTL)
    }

    /// Custom expiry, for tests.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            slot: RwLock::new(None),
            ttl,
        }
    }

    /// Post a message, replacing any notice still on display.
    pub async fn post(&self, message: impl Into<String>) {
        let notice = Notice {
            message: message.into(),
            posted_at: Instant::now(),
        };
        *self.slot.write().await = Some(notice);
    }

    /// The currently visible notice, if it has not expired.
    pub async fn current(&self) -> Option<Notice> {
        let slot = self.slot.read().await;
        slot.as_ref()
            .filter(|n| n.posted_at.elapsed() < self.ttl)
            .cloned()
    }

    /// Dismiss the visible notice ahead of its expiry.
    pub async fn dismiss(&self) {
        *self.slot.write().await = None;
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}
