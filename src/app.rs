//! Top-level launcher controller.
//!
//! Owns the bridge, local storage and the three long-lived components
//! (update controller, presence poller, event engine) and turns everything
//! they observe into [`StatusEvent`]s for whatever front end is attached.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use anyhow::Result;
use tokio::sync::mpsc;

use crate::bridge::{HostBridge, HostCommand};
use crate::config::Config;
use crate::db::Database;
use crate::events::{self, EventBoard, EventEngine, EventTicker, MuteState, Notification};
use crate::model::{Session, Tab, UnmanagedProcess};
use crate::presence::PresencePoller;
use crate::task::TaskGuard;
use crate::update::{UpdateBanner, UpdateController};

/// Everything the front end needs to react to
#[derive(Debug, Clone, PartialEq)]
pub enum StatusEvent {
    /// An event entered its notification window
    Notification(Notification),
    /// Update banner changed (`None` hides it)
    UpdateBanner(Option<UpdateBanner>),
    /// The host reported an update failure
    UpdateFailed(String),
    OnlineCount(u32),
    /// Result of a game launch triggered on the host side
    GameLaunched(bool),
    UnmanagedProcess(UnmanagedProcess),
    /// Host asked to switch views
    Navigate(Tab),
    ShowSettings,
    /// The host replaced the event list
    EventsUpdated(usize),
}

/// Background tasks started by [`LauncherApp::start_background`]
struct Background {
    presence: PresencePoller,
    _ticker: EventTicker,
    _forwarders: Vec<TaskGuard>,
}

pub struct LauncherApp {
    config: Config,
    bridge: Arc<HostBridge>,
    session: Session,
    updates: UpdateController,
    engine: Arc<Mutex<EventEngine>>,
    board: Mutex<EventBoard>,
    status_tx: mpsc::UnboundedSender<StatusEvent>,
    background: Option<Background>,
}

impl LauncherApp {
    /// Open storage and the host bridge described by `config`, then wire
    /// everything up
    pub async fn open(config: Config) -> Result<(Self, mpsc::UnboundedReceiver<StatusEvent>)> {
        let db = match Database::open(&config.storage) {
            Ok(db) => db,
            Err(e) => {
                tracing::warn!("Local storage unavailable ({}); mute settings will not persist", e);
                Database::open_in_memory()?
            }
        };
        let bridge = HostBridge::from_config(&config.host);
        Ok(Self::with_parts(config, Arc::new(bridge), Arc::new(db)).await)
    }

    /// Wire the core around an existing bridge and store
    pub async fn with_parts(
        config: Config,
        bridge: Arc<HostBridge>,
        db: Arc<Database>,
    ) -> (Self, mpsc::UnboundedReceiver<StatusEvent>) {
        let (status_tx, status_rx) = mpsc::unbounded_channel();

        if bridge.connect().await {
            tracing::info!("Using native host");
        } else {
            tracing::info!("No native host; running with mock data");
        }
        let session = bridge.get_session().await;
        tracing::info!("Session: {} (admin: {})", session.username, session.is_admin);

        let updates = UpdateController::new(bridge.clone());
        updates.attach().await;

        let mut engine = EventEngine::new(
            MuteState::load(db),
            &config.events,
            events::sound::from_config(&config.events),
        );
        engine.load_placeholders(chrono::Local::now());
        let engine = Arc::new(Mutex::new(engine));
        let board = Mutex::new(EventBoard::new(config.events.page_size));

        let app = Self {
            config,
            bridge,
            session,
            updates,
            engine,
            board,
            status_tx,
            background: None,
        };
        app.wire_events().await;
        app.wire_host_signals().await;

        (app, status_rx)
    }

    async fn wire_events(&self) {
        let initial = self.bridge.get_events().await;
        if !initial.is_empty() {
            self.engine().replace_events(initial);
        }

        let engine = self.engine.clone();
        let tx = self.status_tx.clone();
        self.bridge
            .on_event_updated(move |events| {
                let count = events.len();
                engine
                    .lock()
                    .unwrap_or_else(|p| p.into_inner())
                    .replace_events(events);
                let _ = tx.send(StatusEvent::EventsUpdated(count));
            })
            .await;
    }

    async fn wire_host_signals(&self) {
        let tx = self.status_tx.clone();
        self.bridge
            .on_game_launched(move |success| {
                let _ = tx.send(StatusEvent::GameLaunched(success));
            })
            .await;

        let tx = self.status_tx.clone();
        self.bridge
            .on_unmanaged_process_detected(move |process| {
                tracing::warn!("Unmanaged game client detected: {} ({})", process.name, process.pid);
                let _ = tx.send(StatusEvent::UnmanagedProcess(process));
            })
            .await;

        let tx = self.status_tx.clone();
        self.bridge
            .on_host_command(move |command| {
                let event = match command {
                    HostCommand::Navigate(tab) => StatusEvent::Navigate(tab),
                    HostCommand::ShowSettings => StatusEvent::ShowSettings,
                };
                let _ = tx.send(event);
            })
            .await;
    }

    /// Start polling, countdowns and update forwarding. Idempotent.
    pub fn start_background(&mut self) {
        if self.background.is_some() {
            return;
        }

        let presence = PresencePoller::start(
            self.bridge.clone(),
            Duration::from_secs(self.config.presence.interval_secs.max(1)),
        );

        let tx = self.status_tx.clone();
        let ticker = EventTicker::start(
            self.engine.clone(),
            Duration::from_millis(self.config.events.tick_ms.max(1)),
            move |notification| {
                let _ = tx.send(StatusEvent::Notification(notification));
            },
        );

        let forwarders = vec![
            self.forward_presence(&presence),
            self.forward_updates(),
        ];

        self.background = Some(Background {
            presence,
            _ticker: ticker,
            _forwarders: forwarders,
        });
    }

    fn forward_presence(&self, presence: &PresencePoller) -> TaskGuard {
        let mut rx = presence.subscribe();
        let tx = self.status_tx.clone();
        TaskGuard::spawn("presence forwarder", async move {
            while rx.changed().await.is_ok() {
                let count = *rx.borrow_and_update();
                if let Some(count) = count {
                    let _ = tx.send(StatusEvent::OnlineCount(count));
                }
            }
        })
    }

    fn forward_updates(&self) -> TaskGuard {
        let mut rx = self.updates.subscribe();
        let tx = self.status_tx.clone();
        TaskGuard::spawn("update forwarder", async move {
            let mut banner = rx.borrow().banner();
            let mut error = rx.borrow().error_banner().map(str::to_string);

            while rx.changed().await.is_ok() {
                let state = rx.borrow_and_update().clone();

                if state.banner() != banner {
                    banner = state.banner();
                    let _ = tx.send(StatusEvent::UpdateBanner(banner));
                }
                let current_error = state.error_banner().map(str::to_string);
                if current_error != error {
                    if let Some(message) = &current_error {
                        let _ = tx.send(StatusEvent::UpdateFailed(message.clone()));
                    }
                    error = current_error;
                }
            }
        })
    }

    /// Fetch the online count now. While background tasks run this goes
    /// through the poller, so a failed fetch yields its last good value.
    pub async fn online_count(&self) -> Result<Option<u32>> {
        let Some(background) = &self.background else {
            return Ok(Some(self.bridge.get_online_count().await?));
        };

        let mut rx = background.presence.subscribe();
        let _ = rx.borrow_and_update();
        background.presence.refresh();

        let wait = Duration::from_millis(self.config.host.request_timeout_ms);
        if tokio::time::timeout(wait, rx.changed()).await.is_err() {
            tracing::debug!("No fresh online count; using the last one");
        }
        let count = *rx.borrow();
        Ok(count)
    }

    /// Stop every background task
    pub fn shutdown(&mut self) {
        if self.background.take().is_some() {
            tracing::info!("Stopped background tasks");
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn bridge(&self) -> &HostBridge {
        &self.bridge
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn updates(&self) -> &UpdateController {
        &self.updates
    }

    /// Lock the event engine. Do not hold across an await.
    pub fn engine(&self) -> MutexGuard<'_, EventEngine> {
        self.engine.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Category filter and page cursor of the event board
    pub fn board(&self) -> MutexGuard<'_, EventBoard> {
        self.board.lock().unwrap_or_else(|p| p.into_inner())
    }
}
