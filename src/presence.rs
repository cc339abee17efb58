//! Online player count polling.
//!
//! Fetches once on start, then on a fixed interval. A failed fetch keeps
//! the last good value so the display never flickers to empty.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Notify};
use tokio::time::MissedTickBehavior;

use crate::bridge::HostBridge;
use crate::task::TaskGuard;

/// Owns the polling timer. Dropping it stops polling.
pub struct PresencePoller {
    count: watch::Receiver<Option<u32>>,
    refresh: Arc<Notify>,
    _task: TaskGuard,
}

impl PresencePoller {
    pub fn start(bridge: Arc<HostBridge>, interval: Duration) -> Self {
        let (tx, count) = watch::channel(None);
        let refresh = Arc::new(Notify::new());
        let task = TaskGuard::spawn("presence", poll_loop(bridge, interval, tx, refresh.clone()));

        Self {
            count,
            refresh,
            _task: task,
        }
    }

    /// Fetch now instead of waiting for the next tick
    pub fn refresh(&self) {
        self.refresh.notify_one();
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<u32>> {
        self.count.clone()
    }
}

async fn poll_loop(
    bridge: Arc<HostBridge>,
    interval: Duration,
    tx: watch::Sender<Option<u32>>,
    refresh: Arc<Notify>,
) {
    // First tick completes immediately
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = refresh.notified() => {}
        }

        match bridge.get_online_count().await {
            Ok(count) => {
                tracing::trace!("Online count: {}", count);
                tx.send_replace(Some(count));
            }
            Err(e) => tracing::warn!("Failed to fetch online count: {}", e),
        }
    }
}
