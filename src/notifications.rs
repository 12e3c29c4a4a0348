//! Unread notification count, refreshed on a fixed interval while a user is logged in.
//!
//! The poller is owned by the authenticated session: the session service starts one on login (or
//! a successful bootstrap) and stops it synchronously on logout. Ticks never overlap because the
//! task awaits each fetch before waiting for the next tick.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::error::AppResult;
use crate::http::ApiClient;

pub const UNREAD_PATH: &str = "notificaciones/no-leidas";

#[async_trait]
pub trait NotificationSource: Send + Sync {
    async fn unread_count(&self) -> AppResult<u64>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnreadCount {
    pub count: u64,
    pub refreshed_at: DateTime<Utc>,
}

pub struct HttpNotificationSource {
    api: ApiClient,
}

impl HttpNotificationSource {
    pub fn new(api: ApiClient) -> Self { Self { api } }
}

#[derive(Deserialize)]
struct UnreadPayload {
    #[serde(alias = "total", alias = "cantidad")]
    count: u64,
}

#[async_trait]
impl NotificationSource for HttpNotificationSource {
    async fn unread_count(&self) -> AppResult<u64> {
        let p: UnreadPayload = self.api.get_json(UNREAD_PATH).await?;
        Ok(p.count)
    }
}

/// A running refresh task. Dropping it stops the task.
pub struct NotificationPoller {
    task: Option<JoinHandle<()>>,
    tx: Arc<watch::Sender<Option<UnreadCount>>>,
}

impl NotificationPoller {
    /// Spawn on the current tokio runtime. The first fetch happens immediately.
    pub fn start(source: Arc<dyn NotificationSource>, interval: Duration) -> Self {
        let (tx, _rx) = watch::channel(None);
        let tx = Arc::new(tx);
        let publish = tx.clone();
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                match source.unread_count().await {
                    Ok(count) => {
                        debug!(target: "adopta::notify", count, "unread count refreshed");
                        publish.send_replace(Some(UnreadCount { count, refreshed_at: Utc::now() }));
                    }
                    // keep the last value; the next tick is the retry
                    Err(e) => warn!(target: "adopta::notify", error = %e, "unread count refresh failed"),
                }
            }
        });
        Self { task: Some(task), tx }
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<UnreadCount>> { self.tx.subscribe() }

    pub fn latest(&self) -> Option<UnreadCount> { *self.tx.borrow() }

    pub fn is_running(&self) -> bool { self.task.as_ref().map(|t| !t.is_finished()).unwrap_or(false) }

    /// Abort the task and clear the published count. Safe to call twice.
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            debug!(target: "adopta::notify", "poller stopped");
        }
        self.tx.send_replace(None);
    }
}

impl Drop for NotificationPoller {
    fn drop(&mut self) { self.stop(); }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU64, Ordering};

    use super::*;
    use crate::error::AppError;

    struct Counting {
        calls: AtomicU64,
        fail: bool,
    }

    #[async_trait]
    impl NotificationSource for Counting {
        async fn unread_count(&self) -> AppResult<u64> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fail { return Err(AppError::network("network", "down")); }
            Ok(n)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn publishes_and_stops() {
        let src = Arc::new(Counting { calls: AtomicU64::new(0), fail: false });
        let mut poller = NotificationPoller::start(src.clone(), Duration::from_secs(30));
        let mut rx = poller.subscribe();
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().map(|u| u.count), Some(1));

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(poller.latest().map(|u| u.count), Some(2));

        poller.stop();
        assert!(poller.latest().is_none());
        let calls = src.calls.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(src.calls.load(Ordering::SeqCst), calls);
        assert!(!poller.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn failures_keep_polling_without_value() {
        let src = Arc::new(Counting { calls: AtomicU64::new(0), fail: true });
        let poller = NotificationPoller::start(src.clone(), Duration::from_secs(5));
        tokio::time::sleep(Duration::from_secs(11)).await;
        assert!(src.calls.load(Ordering::SeqCst) >= 2);
        assert!(poller.latest().is_none());
    }
}
