//! Periodic countdown refresh.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use tokio::time::MissedTickBehavior;

use super::{EventEngine, Notification};
use crate::task::TaskGuard;

/// Drives [`EventEngine::tick`] on a fixed cadence. Dropping the ticker stops it.
pub struct EventTicker {
    _task: TaskGuard,
}

impl EventTicker {
    pub fn start<F>(engine: Arc<Mutex<EventEngine>>, period: Duration, on_notify: F) -> Self
    where
        F: Fn(Notification) + Send + 'static,
    {
        let task = TaskGuard::spawn("event ticker", async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                let fired = {
                    let mut engine = engine.lock().unwrap_or_else(|p| p.into_inner());
                    engine.tick(Utc::now())
                };
                for notification in fired {
                    on_notify(notification);
                }
            }
        });

        Self { _task: task }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EventsConfig;
    use crate::db::Database;
    use crate::events::sound::Silent;
    use crate::events::MuteState;
    use crate::model::{EventCategory, LauncherEvent};
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_ticker_delivers_and_stops() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let mut engine = EventEngine::new(MuteState::load(db), &EventsConfig::default(), Box::new(Silent));
        engine.replace_events(vec![LauncherEvent {
            id: "soon".to_string(),
            name: "Soon".to_string(),
            category: EventCategory::Bosses,
            next_start: Utc::now() + chrono::Duration::seconds(30),
            description: None,
        }]);
        engine.set_mute_all(false);
        engine.set_muted("soon", false);
        let engine = Arc::new(Mutex::new(engine));

        let (tx, mut rx) = mpsc::unbounded_channel();
        let ticker = EventTicker::start(engine.clone(), Duration::from_millis(10), move |n| {
            let _ = tx.send(n);
        });

        let notification = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(notification.event_id, "soon");
        assert!(engine.lock().unwrap().timer("soon").is_some());

        drop(ticker);
        // Sender lives in the aborted task, so the channel closes
        let closed = tokio::time::timeout(Duration::from_secs(2), rx.recv()).await.unwrap();
        assert!(closed.is_none());
    }
}
