//! Event schedule countdowns and start notifications.
//!
//! The engine holds the current event list (placeholders until the host
//! pushes a real one), recomputes every countdown on each tick, and fires a
//! notification once per event occurrence when it enters the threshold
//! window:
//!
//! ```text
//! 0 < remaining_ms <= threshold
//!   && (id, next_start) not yet notified
//!   && !mute_all && !muted[id]
//! ```
//!
//! Suppressed crossings are not remembered, so unmuting inside the window
//! still lets the notification through on the next tick.

mod mute;
mod pager;
mod schedule;
pub mod sound;
mod ticker;
mod timer;

pub use mute::MuteState;
pub use pager::{BoardPage, EventBoard};
pub use schedule::placeholder_events;
pub use ticker::EventTicker;
pub use timer::{format_remaining, EventTimer};

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Local, Utc};

use crate::config::EventsConfig;
use crate::model::LauncherEvent;
use sound::NotificationSound;

/// An event that just entered its notification window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub event_id: String,
    pub name: String,
    pub next_start: DateTime<Utc>,
    pub remaining_ms: i64,
}

impl Notification {
    /// Minutes until start, rounded up
    pub fn minutes_until(&self) -> i64 {
        (self.remaining_ms + 59_999) / 60_000
    }
}

pub struct EventEngine {
    events: Vec<LauncherEvent>,
    timers: HashMap<String, EventTimer>,
    notified: HashSet<(String, DateTime<Utc>)>,
    mute: MuteState,
    threshold_ms: i64,
    sound: Box<dyn NotificationSound>,
    live: bool,
}

impl EventEngine {
    pub fn new(mute: MuteState, config: &EventsConfig, sound: Box<dyn NotificationSound>) -> Self {
        Self {
            events: Vec::new(),
            timers: HashMap::new(),
            notified: HashSet::new(),
            mute,
            threshold_ms: config.notify_threshold_ms,
            sound,
            live: false,
        }
    }

    /// Show the built-in schedule. Ignored once the host has sent a list.
    pub fn load_placeholders(&mut self, now: DateTime<Local>) {
        if self.live {
            return;
        }
        let events = placeholder_events(&now);
        tracing::debug!("Showing {} placeholder events", events.len());
        self.install(events);
    }

    /// Replace the whole list with the host's version
    pub fn replace_events(&mut self, events: Vec<LauncherEvent>) {
        tracing::debug!("Received {} events from host", events.len());
        self.live = true;
        self.install(events);
    }

    fn install(&mut self, events: Vec<LauncherEvent>) {
        let ids: HashSet<&str> = events.iter().map(|e| e.id.as_str()).collect();
        self.timers.retain(|id, _| ids.contains(id.as_str()));
        self.notified.retain(|(id, _)| ids.contains(id.as_str()));
        self.mute.sync_known(&ids);
        self.events = events;
    }

    /// Move placeholder events whose start has passed on to their next
    /// occurrence. Host lists are left alone.
    fn roll_placeholders(&mut self, now: DateTime<Utc>) {
        if self.live || !self.events.iter().any(|e| e.next_start <= now) {
            return;
        }
        tracing::debug!("Placeholder events started; moving to next occurrences");
        self.install(placeholder_events(&now.with_timezone(&Local)));
    }

    /// Whether the list came from the host rather than the placeholder schedule
    pub fn is_live(&self) -> bool {
        self.live
    }

    /// Recompute every countdown without notifying
    pub fn update_timers(&mut self, now: DateTime<Utc>) {
        for event in &self.events {
            self.timers.insert(event.id.clone(), EventTimer::at(event, now));
        }
    }

    /// Recompute every countdown and return the notifications that fired
    pub fn tick(&mut self, now: DateTime<Utc>) -> Vec<Notification> {
        self.roll_placeholders(now);
        self.update_timers(now);
        let mut fired = Vec::new();

        for event in &self.events {
            let remaining = event.remaining_ms(now);
            if remaining <= 0 || remaining > self.threshold_ms {
                continue;
            }
            let key = (event.id.clone(), event.next_start);
            if self.notified.contains(&key) {
                continue;
            }
            if self.mute.mute_all() || self.mute.is_muted(&event.id) {
                tracing::trace!("Suppressed notification for {} (muted)", event.id);
                continue;
            }

            tracing::info!("{} starts in {}", event.name, format_remaining(remaining));
            self.notified.insert(key);
            fired.push(Notification {
                event_id: event.id.clone(),
                name: event.name.clone(),
                next_start: event.next_start,
                remaining_ms: remaining,
            });
        }

        if !fired.is_empty() {
            self.sound.play();
        }
        fired
    }

    pub fn events(&self) -> &[LauncherEvent] {
        &self.events
    }

    pub fn timers(&self) -> &HashMap<String, EventTimer> {
        &self.timers
    }

    pub fn timer(&self, id: &str) -> Option<&EventTimer> {
        self.timers.get(id)
    }

    /// Whether the occurrence starting at `next_start` was already announced
    pub fn is_notified(&self, id: &str, next_start: DateTime<Utc>) -> bool {
        self.notified.contains(&(id.to_string(), next_start))
    }

    /// Forget every announced occurrence
    pub fn reset_notified(&mut self) {
        self.notified.clear();
    }

    pub fn board<'a>(&'a self, board: &EventBoard) -> BoardPage<'a> {
        board.view(&self.events, &self.timers)
    }

    // ==================== Mute state ====================

    pub fn is_muted(&self, id: &str) -> bool {
        self.mute.is_muted(id)
    }

    pub fn set_muted(&mut self, id: &str, muted: bool) {
        tracing::info!("{} notifications for {}", if muted { "Muted" } else { "Unmuted" }, id);
        self.mute.set_muted(id, muted);
    }

    pub fn mute_all(&self) -> bool {
        self.mute.mute_all()
    }

    pub fn set_mute_all(&mut self, muted: bool) {
        tracing::info!("{} all event notifications", if muted { "Muted" } else { "Unmuted" });
        self.mute.set_mute_all(muted);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::model::EventCategory;
    use chrono::{Duration, TimeZone};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingSound(Arc<AtomicUsize>);

    impl NotificationSound for CountingSound {
        fn play(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 4, 12, 0, 0).unwrap()
    }

    fn event(id: &str, starts_in_ms: i64) -> LauncherEvent {
        LauncherEvent {
            id: id.to_string(),
            name: format!("Event {}", id),
            category: EventCategory::Events,
            next_start: t0() + Duration::milliseconds(starts_in_ms),
            description: None,
        }
    }

    fn engine() -> (EventEngine, Arc<AtomicUsize>, Arc<Database>) {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let plays = Arc::new(AtomicUsize::new(0));
        let engine = EventEngine::new(
            MuteState::load(db.clone()),
            &EventsConfig::default(),
            Box::new(CountingSound(plays.clone())),
        );
        (engine, plays, db)
    }

    #[test]
    fn test_threshold_crossing_fires_once() {
        let (mut engine, plays, _db) = engine();
        engine.replace_events(vec![event("E", 61_000)]);
        engine.set_mute_all(false);
        engine.set_muted("E", false);

        assert!(engine.tick(t0()).is_empty());

        let fired = engine.tick(t0() + Duration::milliseconds(2_000));
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].event_id, "E");
        assert_eq!(fired[0].remaining_ms, 59_000);
        assert!(engine.is_notified("E", t0() + Duration::milliseconds(61_000)));

        assert!(engine.tick(t0() + Duration::milliseconds(3_000)).is_empty());
        assert_eq!(plays.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_mute_all_suppresses_everything() {
        for per_event in [true, false] {
            let (mut engine, plays, _db) = engine();
            engine.replace_events(vec![event("E", 61_000)]);
            engine.set_mute_all(true);
            engine.set_muted("E", per_event);

            engine.tick(t0());
            assert!(engine.tick(t0() + Duration::milliseconds(2_000)).is_empty());
            assert_eq!(plays.load(Ordering::SeqCst), 0);
        }
    }

    #[test]
    fn test_muted_event_fires_after_unmute() {
        let (mut engine, _, _db) = engine();
        engine.replace_events(vec![event("E", 61_000)]);
        engine.set_mute_all(false);

        // New ids start muted
        assert!(engine.is_muted("E"));
        assert!(engine.tick(t0() + Duration::milliseconds(2_000)).is_empty());
        assert!(!engine.is_notified("E", t0() + Duration::milliseconds(61_000)));

        engine.set_muted("E", false);
        assert_eq!(engine.tick(t0() + Duration::milliseconds(3_000)).len(), 1);
    }

    #[test]
    fn test_started_events_never_fire() {
        let (mut engine, _, _db) = engine();
        engine.replace_events(vec![event("E", 0), event("F", -5_000)]);
        engine.set_mute_all(false);
        engine.set_muted("E", false);
        engine.set_muted("F", false);

        assert!(engine.tick(t0()).is_empty());
        assert_eq!(engine.timer("E").unwrap().formatted, "Started");
    }

    #[test]
    fn test_next_occurrence_notifies_again() {
        let (mut engine, _, _db) = engine();
        engine.set_mute_all(false);
        engine.set_muted("E", false);

        engine.replace_events(vec![event("E", 30_000)]);
        assert_eq!(engine.tick(t0()).len(), 1);

        // Same id, next day's start
        let mut tomorrow = event("E", 30_000);
        tomorrow.next_start = tomorrow.next_start + Duration::days(1);
        engine.replace_events(vec![tomorrow]);
        assert_eq!(engine.tick(t0() + Duration::days(1)).len(), 1);
    }

    #[test]
    fn test_replace_prunes_vanished_events() {
        let (mut engine, _, db) = engine();
        engine.set_mute_all(false);
        engine.set_muted("A", false);
        engine.replace_events(vec![event("A", 30_000), event("B", 90_000)]);
        engine.tick(t0());
        assert!(engine.is_notified("A", t0() + Duration::milliseconds(30_000)));
        assert!(engine.timer("B").is_some());

        engine.replace_events(vec![event("C", 90_000)]);
        assert!(!engine.is_notified("A", t0() + Duration::milliseconds(30_000)));
        assert!(engine.timer("A").is_none());
        assert!(engine.timer("B").is_none());

        // New id defaulted to muted; the unmute on A outlives the list, B's
        // default entry does not
        let stored = MuteState::load(db);
        assert!(stored.entries().get("C").copied().unwrap_or(false));
        assert_eq!(stored.entries().get("A"), Some(&false));
        assert!(!stored.entries().contains_key("B"));
    }

    #[test]
    fn test_update_timers_never_notifies() {
        let (mut engine, plays, _db) = engine();
        engine.set_mute_all(false);
        engine.set_muted("A", false);
        engine.replace_events(vec![event("A", 30_000)]);

        engine.update_timers(t0());
        assert_eq!(engine.timer("A").unwrap().remaining_ms, 30_000);
        assert_eq!(plays.load(Ordering::SeqCst), 0);
        assert_eq!(engine.tick(t0()).len(), 1);
    }

    #[test]
    fn test_reset_notified() {
        let (mut engine, _, _db) = engine();
        engine.set_mute_all(false);
        engine.set_muted("A", false);
        engine.replace_events(vec![event("A", 30_000)]);

        assert_eq!(engine.tick(t0()).len(), 1);
        engine.reset_notified();
        assert_eq!(engine.tick(t0()).len(), 1);
    }

    #[test]
    fn test_placeholders_until_host_list() {
        let (mut engine, _, _db) = engine();
        engine.load_placeholders(Local::now());
        assert!(!engine.is_live());
        assert!(engine.events().iter().any(|e| e.id == "blood-castle"));

        engine.replace_events(vec![event("real", 90_000)]);
        engine.load_placeholders(Local::now());
        assert!(engine.is_live());
        assert_eq!(engine.events().len(), 1);
    }

    #[test]
    fn test_placeholders_roll_over_after_start() {
        let (mut engine, _, _db) = engine();
        engine.load_placeholders(t0().with_timezone(&Local));
        let first: Vec<_> = engine.events().iter().map(|e| e.next_start).collect();

        let later = t0() + Duration::days(8);
        engine.tick(later);
        assert!(engine.events().iter().all(|e| e.next_start > later));
        assert!(engine.timers().values().all(|t| !t.has_started));
        assert_ne!(engine.events().iter().map(|e| e.next_start).collect::<Vec<_>>(), first);
    }

    #[test]
    fn test_placeholder_next_occurrence_notifies() {
        let (mut engine, _, _db) = engine();
        engine.set_mute_all(false);
        engine.load_placeholders(t0().with_timezone(&Local));
        engine.set_muted("blood-castle", false);

        let start = engine
            .events()
            .iter()
            .find(|e| e.id == "blood-castle")
            .unwrap()
            .next_start;
        let fired = engine.tick(start - Duration::seconds(30));
        assert!(fired.iter().any(|n| n.event_id == "blood-castle"));

        // Once it has started the next occurrence gets its own notification
        engine.tick(start + Duration::seconds(1));
        let next = engine
            .events()
            .iter()
            .find(|e| e.id == "blood-castle")
            .unwrap()
            .next_start;
        assert!(next > start);
        let fired = engine.tick(next - Duration::seconds(30));
        assert!(fired.iter().any(|n| n.event_id == "blood-castle"));
    }

    #[test]
    fn test_host_list_never_rolls() {
        let (mut engine, _, _db) = engine();
        engine.replace_events(vec![event("E", 1_000)]);
        engine.tick(t0() + Duration::days(2));
        assert_eq!(engine.events()[0].next_start, t0() + Duration::milliseconds(1_000));
        assert!(engine.timer("E").unwrap().has_started);
    }

    #[test]
    fn test_notification_minutes() {
        let n = Notification {
            event_id: "E".to_string(),
            name: "E".to_string(),
            next_start: t0(),
            remaining_ms: 59_000,
        };
        assert_eq!(n.minutes_until(), 1);
    }
}
