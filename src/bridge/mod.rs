//! Typed bridge to the native host process.
//!
//! `HostBridge` is the single place where host absence is made transparent:
//!
//! - RPC operations await the one-time connection attempt, then either call
//!   the host or return a fixed mock value.
//! - Signal subscriptions register process-lifetime handlers; in mock mode
//!   they are accepted and never fire.
//! - Payloads are decoded through `decode`, where malformed data becomes
//!   "no data" instead of an error.
//!
//! The bridge is constructed once by the top-level controller and shared as
//! `Arc<HostBridge>`. Tests build one over a fake transport.

pub mod channel;
mod decode;
mod mock;
pub mod protocol;

#[cfg(test)]
pub(crate) mod fake_host;

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use thiserror::Error;

pub use channel::{HostChannel, NoHost, TcpTransport, Transport};
use protocol::{method, signal};

use crate::config::HostConfig;
use crate::model::{
    LaunchResult, LauncherEvent, Resolution, Session, Settings, Tab, UnmanagedProcess,
};

/// Errors crossing the host boundary
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Host transport unavailable")]
    TransportUnavailable,

    #[error("Host operation failed: {0}")]
    OperationFailed(String),

    #[error("Malformed {kind} payload: {source}")]
    Decode {
        kind: &'static str,
        source: serde_json::Error,
    },

    #[error("Failed to encode request: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Host did not answer request {0} in time")]
    Timeout(u64),

    #[error("Host connection closed")]
    Closed,

    #[error("Host speaks protocol {actual}, expected {expected}")]
    ProtocolMismatch { expected: u32, actual: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Commands the host may invoke on the client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCommand {
    /// Switch the front end to another view
    Navigate(Tab),
    /// Open the settings surface
    ShowSettings,
}

impl HostCommand {
    fn parse(name: &str, args: &[Value]) -> Option<Self> {
        match name {
            "navigate" => {
                let tab = args.first().and_then(Value::as_str)?;
                match tab.parse() {
                    Ok(tab) => Some(HostCommand::Navigate(tab)),
                    Err(e) => {
                        tracing::warn!("Ignoring host navigation: {}", e);
                        None
                    }
                }
            }
            "showSettings" => Some(HostCommand::ShowSettings),
            other => {
                tracing::warn!("Ignoring unknown host command: {}", other);
                None
            }
        }
    }
}

/// Typed façade over [`HostChannel`]
pub struct HostBridge {
    channel: HostChannel,
}

impl HostBridge {
    pub fn new(transport: Box<dyn Transport>, config: &HostConfig) -> Self {
        Self {
            channel: HostChannel::new(
                transport,
                Duration::from_millis(config.connect_timeout_ms),
                Duration::from_millis(config.request_timeout_ms),
            ),
        }
    }

    /// Bridge over TCP to the configured host address
    pub fn from_config(config: &HostConfig) -> Self {
        Self::new(Box::new(TcpTransport::new(config.address.clone())), config)
    }

    /// Bridge that never reaches a host
    pub fn mock(config: &HostConfig) -> Self {
        Self::new(Box::new(NoHost), config)
    }

    /// Attempt the host handshake (once). Never fails; returns whether the
    /// real host is in use.
    pub async fn connect(&self) -> bool {
        self.channel.connect().await
    }

    pub fn is_connected(&self) -> bool {
        self.channel.is_connected()
    }

    #[cfg(test)]
    pub(crate) fn channel(&self) -> &HostChannel {
        &self.channel
    }

    async fn call(&self, method: &str, params: Vec<Value>) -> Result<Value, BridgeError> {
        self.channel.request(method, params).await
    }

    /// Call a method whose failure the caller never sees
    async fn fire_and_forget(&self, method: &str, params: Vec<Value>) {
        match self.call(method, params).await {
            Ok(_) => {}
            Err(BridgeError::TransportUnavailable) => tracing::debug!("Mock: {}", method),
            Err(e) => tracing::warn!("{} failed: {}", method, e),
        }
    }

    /// Call a method answering a boolean; mock and failure both mean `false`
    async fn call_flag(&self, method: &str, params: Vec<Value>) -> bool {
        match self.call(method, params).await {
            Ok(raw) => decode::flag(raw).unwrap_or(false),
            Err(BridgeError::TransportUnavailable) => {
                tracing::debug!("Mock: {}", method);
                false
            }
            Err(e) => {
                tracing::warn!("{} failed: {}", method, e);
                false
            }
        }
    }

    // ==================== Settings ====================

    pub async fn get_settings(&self) -> Settings {
        match self.call(method::GET_SETTINGS, Vec::new()).await {
            Ok(raw) => decode::settings(raw).unwrap_or_else(mock::settings),
            Err(BridgeError::TransportUnavailable) => mock::settings(),
            Err(e) => {
                tracing::error!("Failed to get settings: {}", e);
                mock::settings()
            }
        }
    }

    /// Persist settings through the host. A rejection is surfaced so the
    /// settings surface can stay open with an inline error.
    pub async fn save_settings(&self, settings: &Settings) -> Result<(), BridgeError> {
        let blob = serde_json::to_string(settings)?;
        match self.call(method::SAVE_SETTINGS, vec![Value::String(blob)]).await {
            Ok(raw) => {
                if decode::flag(raw).unwrap_or(false) {
                    Ok(())
                } else {
                    Err(BridgeError::OperationFailed(
                        "host rejected the settings".to_string(),
                    ))
                }
            }
            Err(BridgeError::TransportUnavailable) => {
                tracing::info!("Mock save settings: {:?}", settings);
                Ok(())
            }
            Err(e) => {
                tracing::error!("Failed to save settings: {}", e);
                Err(e)
            }
        }
    }

    pub async fn set_resolution(&self, resolution: Resolution, windowed: bool) {
        let (width, height) = resolution.dimensions();
        self.fire_and_forget(
            method::SET_RESOLUTION,
            vec![json!(width), json!(height), json!(windowed)],
        )
        .await;
    }

    // ==================== Game ====================

    pub async fn launch_game(&self) -> LaunchResult {
        match self.call(method::LAUNCH_GAME, Vec::new()).await {
            Ok(raw) => decode::launch_result(raw)
                .unwrap_or_else(|| LaunchResult::failed("Malformed launch result from host")),
            Err(BridgeError::TransportUnavailable) => mock::launch_result(),
            Err(e) => {
                tracing::error!("Failed to launch game: {}", e);
                LaunchResult::failed(e.to_string())
            }
        }
    }

    pub async fn bring_game_to_front(&self) -> bool {
        self.call_flag(method::BRING_GAME_TO_FRONT, Vec::new()).await
    }

    pub async fn close_game(&self) -> bool {
        self.call_flag(method::CLOSE_GAME, Vec::new()).await
    }

    // ==================== Session & presence ====================

    pub async fn get_session(&self) -> Session {
        match self.call(method::GET_SESSION, Vec::new()).await {
            Ok(raw) => decode::session(raw).unwrap_or_else(mock::session),
            Err(BridgeError::TransportUnavailable) => mock::session(),
            Err(e) => {
                tracing::error!("Failed to get session: {}", e);
                mock::session()
            }
        }
    }

    /// Online player count. Failures are returned so the poller can keep
    /// the last good value.
    pub async fn get_online_count(&self) -> Result<u32, BridgeError> {
        match self.call(method::GET_ONLINE_COUNT, Vec::new()).await {
            Ok(raw) => decode::count(raw).ok_or_else(|| {
                BridgeError::OperationFailed("host returned an invalid online count".to_string())
            }),
            Err(BridgeError::TransportUnavailable) => Ok(mock::ONLINE_COUNT),
            Err(e) => Err(e),
        }
    }

    // ==================== Update system ====================

    pub async fn check_for_updates(&self) -> Result<(), BridgeError> {
        match self.call(method::CHECK_FOR_UPDATES, Vec::new()).await {
            Ok(_) => Ok(()),
            Err(BridgeError::TransportUnavailable) => {
                tracing::debug!("Mock check for updates");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    pub async fn start_update(&self) -> Result<(), BridgeError> {
        match self.call(method::START_UPDATE, Vec::new()).await {
            Ok(_) => Ok(()),
            Err(BridgeError::TransportUnavailable) => {
                tracing::debug!("Mock start update");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    pub async fn cancel_update(&self) {
        self.fire_and_forget(method::CANCEL_UPDATE, Vec::new()).await;
    }

    // ==================== Events ====================

    pub async fn get_events(&self) -> Vec<LauncherEvent> {
        match self.call(method::GET_EVENTS, Vec::new()).await {
            Ok(raw) => decode::events(raw),
            Err(BridgeError::TransportUnavailable) => Vec::new(),
            Err(e) => {
                tracing::error!("Failed to get events: {}", e);
                Vec::new()
            }
        }
    }

    // ==================== Process management ====================

    pub async fn get_unmanaged_processes(&self) -> Vec<UnmanagedProcess> {
        match self.call(method::GET_UNMANAGED_PROCESSES, Vec::new()).await {
            Ok(raw) => decode::processes(raw),
            Err(BridgeError::TransportUnavailable) => Vec::new(),
            Err(e) => {
                tracing::error!("Failed to get unmanaged processes: {}", e);
                Vec::new()
            }
        }
    }

    pub async fn kill_unmanaged_process(&self, pid: u32) -> bool {
        self.call_flag(method::KILL_UNMANAGED_PROCESS, vec![json!(pid)])
            .await
    }

    // ==================== Window control ====================

    /// Begin a window drag. Never fails.
    pub async fn start_drag(&self, x: i32, y: i32) {
        self.fire_and_forget(method::START_DRAG, vec![json!(x), json!(y)])
            .await;
    }

    /// Ask the host to exit. Never fails.
    pub async fn exit_launcher(&self) {
        self.fire_and_forget(method::EXIT_LAUNCHER, Vec::new()).await;
    }

    // ==================== Signal subscriptions ====================

    async fn subscribe<F>(&self, name: &'static str, handler: F)
    where
        F: Fn(&[Value]) + Send + Sync + 'static,
    {
        if !self.connect().await {
            tracing::debug!("Mock: {} subscribed", name);
        }
        self.channel.subscribe(name, Arc::new(handler));
    }

    pub async fn on_update_available<F>(&self, callback: F)
    where
        F: Fn(String) + Send + Sync + 'static,
    {
        self.subscribe(signal::UPDATE_AVAILABLE, move |args| {
            callback(decode::text(first(args)))
        })
        .await;
    }

    pub async fn on_download_progress<F>(&self, callback: F)
    where
        F: Fn(u8) + Send + Sync + 'static,
    {
        self.subscribe(signal::DOWNLOAD_PROGRESS, move |args| {
            if let Some(percent) = decode::percent(first(args)) {
                callback(percent);
            }
        })
        .await;
    }

    pub async fn on_update_error<F>(&self, callback: F)
    where
        F: Fn(String) + Send + Sync + 'static,
    {
        self.subscribe(signal::UPDATE_ERROR, move |args| {
            callback(decode::text(first(args)))
        })
        .await;
    }

    pub async fn on_update_finished<F>(&self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.subscribe(signal::UPDATE_FINISHED, move |_| callback())
            .await;
    }

    pub async fn on_game_launched<F>(&self, callback: F)
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        self.subscribe(signal::GAME_LAUNCHED, move |args| {
            if let Some(success) = decode::flag(first(args)) {
                callback(success);
            }
        })
        .await;
    }

    /// Live replacement of the event list. Malformed pushes are dropped.
    pub async fn on_event_updated<F>(&self, callback: F)
    where
        F: Fn(Vec<LauncherEvent>) + Send + Sync + 'static,
    {
        self.subscribe(signal::EVENT_UPDATED, move |args| {
            match decode::event_list(first(args)) {
                Some(events) => callback(events),
                None => tracing::warn!("Dropping malformed event push"),
            }
        })
        .await;
    }

    pub async fn on_unmanaged_process_detected<F>(&self, callback: F)
    where
        F: Fn(UnmanagedProcess) + Send + Sync + 'static,
    {
        self.subscribe(signal::UNMANAGED_PROCESS_DETECTED, move |args| {
            if let Some(process) = decode::process(first(args)) {
                callback(process);
            }
        })
        .await;
    }

    /// Inbound commands from the host, e.g. navigation requests
    pub async fn on_host_command<F>(&self, callback: F)
    where
        F: Fn(HostCommand) + Send + Sync + 'static,
    {
        if !self.connect().await {
            tracing::debug!("Mock: host commands subscribed");
        }
        self.channel.subscribe_commands(Arc::new(move |name: &str, args: &[Value]| {
            if let Some(command) = HostCommand::parse(name, args) {
                callback(command);
            }
        }));
    }
}

fn first(args: &[Value]) -> Value {
    args.first().cloned().unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::fake_host::{FakeHost, HostScript};
    use std::sync::Mutex;
    use std::time::Instant;

    fn config() -> HostConfig {
        HostConfig {
            connect_timeout_ms: 200,
            request_timeout_ms: 500,
            ..HostConfig::default()
        }
    }

    fn bridge_for(host: &FakeHost) -> HostBridge {
        HostBridge::new(host.transport(), &config())
    }

    #[tokio::test]
    async fn test_mock_mode_session_resolves_quickly() {
        let bridge = HostBridge::mock(&config());
        let started = Instant::now();
        let session = bridge.get_session().await;
        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(session, mock::session());
        assert!(!bridge.is_connected());
    }

    #[tokio::test]
    async fn test_mock_mode_unreachable_tcp_host() {
        let config = HostConfig {
            address: "127.0.0.1:1".to_string(),
            ..config()
        };
        let bridge = HostBridge::from_config(&config);
        let session = bridge.get_session().await;
        assert_eq!(session.username, "Admin");
    }

    #[tokio::test]
    async fn test_mock_mode_values() {
        let bridge = HostBridge::mock(&config());
        bridge.start_drag(5, 5).await;
        bridge.exit_launcher().await;
        bridge.cancel_update().await;

        assert_eq!(bridge.get_settings().await, mock::settings());
        assert!(bridge.save_settings(&mock::settings()).await.is_ok());
        assert!(bridge.launch_game().await.success);
        assert_eq!(bridge.get_online_count().await.unwrap(), 1);
        assert!(bridge.get_events().await.is_empty());
        assert!(bridge.get_unmanaged_processes().await.is_empty());
        assert!(!bridge.kill_unmanaged_process(42).await);
        assert!(!bridge.bring_game_to_front().await);
        assert!(!bridge.close_game().await);
        assert!(bridge.start_update().await.is_ok());
    }

    #[tokio::test]
    async fn test_mock_mode_subscriptions_never_fire() {
        let bridge = HostBridge::mock(&config());
        let fired = Arc::new(Mutex::new(false));
        let flag = fired.clone();
        bridge
            .on_update_available(move |_| *flag.lock().unwrap() = true)
            .await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!*fired.lock().unwrap());
    }

    #[tokio::test]
    async fn test_session_decoded_from_string() {
        let host = FakeHost::start(HostScript::default().reply(
            "getSession",
            json!(r#"{"logged":true,"username":"mira","is_admin":false}"#),
        ));
        let bridge = bridge_for(&host);
        let session = bridge.get_session().await;
        assert!(bridge.is_connected());
        assert_eq!(session.username, "mira");
        assert!(!session.is_admin);
    }

    #[tokio::test]
    async fn test_malformed_settings_fall_back() {
        let host = FakeHost::start(HostScript::default().reply("getSettings", json!("{broken")));
        let bridge = bridge_for(&host);
        assert_eq!(bridge.get_settings().await, mock::settings());
    }

    #[tokio::test]
    async fn test_save_settings_sends_blob_and_surfaces_rejection() {
        let host = FakeHost::start(HostScript::default().reply("saveSettings", json!(false)));
        let bridge = bridge_for(&host);

        let result = bridge.save_settings(&mock::settings()).await;
        assert!(matches!(result, Err(BridgeError::OperationFailed(_))));

        let (_, params) = host
            .calls()
            .into_iter()
            .find(|(m, _)| m == "saveSettings")
            .unwrap();
        let blob = params[0].as_str().unwrap();
        let sent: Settings = serde_json::from_str(blob).unwrap();
        assert_eq!(sent, mock::settings());
    }

    #[tokio::test]
    async fn test_launch_failure_is_typed_result() {
        let host = FakeHost::start(HostScript::default().fail("launchGame", "Max clients reached (3)"));
        let bridge = bridge_for(&host);
        let result = bridge.launch_game().await;
        assert!(!result.success);
        assert!(result.message.contains("Max clients reached"));
    }

    #[tokio::test]
    async fn test_fire_and_forget_swallows_errors() {
        let host = FakeHost::start(
            HostScript::default()
                .fail("startDrag", "no window")
                .fail("exitLauncher", "busy"),
        );
        let bridge = bridge_for(&host);
        bridge.start_drag(1, 2).await;
        bridge.exit_launcher().await;

        let calls = host.calls();
        assert_eq!(calls[0], ("startDrag".to_string(), vec![json!(1), json!(2)]));
        assert_eq!(calls[1].0, "exitLauncher");
    }

    #[tokio::test]
    async fn test_set_resolution_sends_dimensions() {
        let host = FakeHost::start(HostScript::default());
        let bridge = bridge_for(&host);
        bridge.set_resolution(Resolution::R1024x768, true).await;
        assert_eq!(
            host.calls()[0],
            (
                "setResolution".to_string(),
                vec![json!(1024), json!(768), json!(true)]
            )
        );
    }

    #[tokio::test]
    async fn test_online_count_failure_surfaces() {
        let host = FakeHost::start(HostScript::default().fail("getOnlineCount", "db down"));
        let bridge = bridge_for(&host);
        assert!(bridge.get_online_count().await.is_err());
    }

    #[tokio::test]
    async fn test_event_push_reaches_subscriber() {
        let host = FakeHost::start(HostScript::default());
        let bridge = bridge_for(&host);

        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = received.clone();
        bridge
            .on_event_updated(move |events| sink.lock().unwrap().push(events))
            .await;

        let payload = json!([{
            "id": "rd", "name": "Red Dragon", "category": "bosses",
            "nextStart": "2026-05-01T20:00:00Z"
        }])
        .to_string();
        host.emit("eventUpdated", vec![json!(payload)]).await;
        host.emit("eventUpdated", vec![json!("{garbage")]).await;
        host.emit("eventUpdated", vec![json!({"events": []})]).await;
        host.emit("eventUpdated", vec![json!("[]")]).await;
        host.settle(&bridge.channel).await;

        // Malformed pushes never reach the subscriber; an empty list does
        let received = received.lock().unwrap();
        assert_eq!(received.len(), 2);
        assert_eq!(received[0][0].id, "rd");
        assert!(received[1].is_empty());
    }

    #[tokio::test]
    async fn test_unmanaged_process_signal() {
        let host = FakeHost::start(HostScript::default());
        let bridge = bridge_for(&host);

        let seen = Arc::new(Mutex::new(None));
        let sink = seen.clone();
        bridge
            .on_unmanaged_process_detected(move |p| *sink.lock().unwrap() = Some(p))
            .await;

        host.emit(
            "unmanagedProcessDetected",
            vec![json!(r#"{"pid":4711,"name":"main.exe"}"#)],
        )
        .await;
        host.settle(&bridge.channel).await;

        let seen = seen.lock().unwrap();
        assert_eq!(seen.as_ref().unwrap().pid, 4711);
    }

    #[tokio::test]
    async fn test_host_navigation_command() {
        let host = FakeHost::start(HostScript::default());
        let bridge = bridge_for(&host);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        bridge
            .on_host_command(move |c| sink.lock().unwrap().push(c))
            .await;

        host.command("navigate", vec![json!("events")]).await;
        host.command("navigate", vec![json!("nowhere")]).await;
        host.command("showSettings", Vec::new()).await;
        host.settle(&bridge.channel).await;

        assert_eq!(
            *seen.lock().unwrap(),
            vec![HostCommand::Navigate(Tab::Events), HostCommand::ShowSettings]
        );
    }
}
