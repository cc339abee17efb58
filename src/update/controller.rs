//! Drives [`UpdateState`] from host signals and user actions.

use std::sync::Arc;

use tokio::sync::watch;

use super::{UpdateActionError, UpdateState};
use crate::bridge::HostBridge;

/// Owns the update state and publishes every change on a watch channel
pub struct UpdateController {
    bridge: Arc<HostBridge>,
    state: Arc<watch::Sender<UpdateState>>,
}

impl UpdateController {
    pub fn new(bridge: Arc<HostBridge>) -> Self {
        let (state, _) = watch::channel(UpdateState::default());
        Self {
            bridge,
            state: Arc::new(state),
        }
    }

    /// Subscribe to the host's update signals. Call once.
    pub async fn attach(&self) {
        let state = self.state.clone();
        self.bridge
            .on_update_available(move |version| {
                tracing::info!("Update available: {}", version);
                state.send_if_modified(|s| s.update_available(version));
            })
            .await;

        let state = self.state.clone();
        self.bridge
            .on_download_progress(move |percent| {
                state.send_if_modified(|s| s.download_progress(percent));
            })
            .await;

        let state = self.state.clone();
        self.bridge
            .on_update_error(move |message| {
                tracing::error!("Update failed: {}", message);
                state.send_if_modified(|s| s.fail(message));
            })
            .await;

        let state = self.state.clone();
        self.bridge
            .on_update_finished(move || {
                if state.send_if_modified(|s| s.finish()) {
                    tracing::info!("Update finished");
                }
            })
            .await;
    }

    pub fn subscribe(&self) -> watch::Receiver<UpdateState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> UpdateState {
        self.state.borrow().clone()
    }

    /// Apply a guarded transition, returning its error without publishing
    fn transition(
        &self,
        f: impl FnOnce(&mut UpdateState) -> Result<(), UpdateActionError>,
    ) -> Result<(), UpdateActionError> {
        let mut outcome = Ok(());
        self.state.send_if_modified(|s| match f(s) {
            Ok(()) => true,
            Err(e) => {
                outcome = Err(e);
                false
            }
        });
        outcome
    }

    fn record_failure(&self, message: String) {
        self.state.send_if_modified(|s| s.fail(message));
    }

    /// Ask the host to look for an update. Any `updateAvailable` signal the
    /// host emits meanwhile wins over the fallback to idle.
    pub async fn check_for_updates(&self) -> Result<(), UpdateActionError> {
        self.transition(UpdateState::begin_check)?;

        match self.bridge.check_for_updates().await {
            Ok(()) => {
                self.state.send_if_modified(UpdateState::end_check);
                Ok(())
            }
            Err(e) => {
                tracing::error!("Update check failed: {}", e);
                self.record_failure(e.to_string());
                Err(e.into())
            }
        }
    }

    /// Start downloading the announced update
    pub async fn start_update(&self) -> Result<(), UpdateActionError> {
        self.transition(UpdateState::begin_download)?;
        tracing::info!("Starting update");

        if let Err(e) = self.bridge.start_update().await {
            tracing::error!("Failed to start update: {}", e);
            self.record_failure(e.to_string());
            return Err(e.into());
        }
        Ok(())
    }

    pub async fn cancel_update(&self) -> Result<(), UpdateActionError> {
        self.transition(UpdateState::cancel)?;
        tracing::info!("Cancelling update");
        self.bridge.cancel_update().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::fake_host::{FakeHost, HostScript};
    use crate::config::HostConfig;
    use crate::update::UpdateStatus;
    use serde_json::json;

    fn controller_for(host: &FakeHost) -> UpdateController {
        let config = HostConfig {
            connect_timeout_ms: 200,
            request_timeout_ms: 500,
            ..HostConfig::default()
        };
        UpdateController::new(Arc::new(HostBridge::new(host.transport(), &config)))
    }

    #[tokio::test]
    async fn test_signals_drive_state() {
        let host = FakeHost::start(HostScript::default());
        let controller = controller_for(&host);
        controller.attach().await;
        let mut rx = controller.subscribe();

        host.emit("updateAvailable", vec![json!("1.4.0")]).await;
        host.settle(controller.bridge.channel()).await;
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().status, UpdateStatus::UpdateAvailable);

        controller.start_update().await.unwrap();
        assert!(host.called("startUpdate"));

        for percent in [10, 40, 30, 90] {
            host.emit("downloadProgress", vec![json!(percent)]).await;
        }
        host.settle(controller.bridge.channel()).await;
        assert_eq!(controller.state().progress, 90);

        host.emit("updateFinished", Vec::new()).await;
        host.settle(controller.bridge.channel()).await;
        assert_eq!(controller.state().status, UpdateStatus::Finished);
    }

    #[tokio::test]
    async fn test_start_without_update_is_rejected() {
        let host = FakeHost::start(HostScript::default());
        let controller = controller_for(&host);
        controller.attach().await;

        let result = controller.start_update().await;
        assert!(matches!(
            result,
            Err(UpdateActionError::NotAvailable(UpdateStatus::Idle))
        ));
        assert!(!host.called("startUpdate"));
    }

    #[tokio::test]
    async fn test_error_signal_is_sticky() {
        let host = FakeHost::start(HostScript::default());
        let controller = controller_for(&host);
        controller.attach().await;

        host.emit("updateAvailable", vec![json!("1.4.0")]).await;
        host.emit("updateError", vec![json!("checksum mismatch")]).await;
        host.emit("downloadProgress", vec![json!(50)]).await;
        host.settle(controller.bridge.channel()).await;

        let state = controller.state();
        assert_eq!(state.status, UpdateStatus::Error);
        assert_eq!(state.error_banner(), Some("checksum mismatch"));
        assert!(controller.start_update().await.is_err());
    }

    #[tokio::test]
    async fn test_check_falls_back_to_idle() {
        let host = FakeHost::start(HostScript::default());
        let controller = controller_for(&host);
        controller.attach().await;

        controller.check_for_updates().await.unwrap();
        assert_eq!(controller.state().status, UpdateStatus::Idle);
    }

    #[tokio::test]
    async fn test_check_keeps_announced_update() {
        let host = FakeHost::start(HostScript::default().emit_on(
            "checkForUpdates",
            "updateAvailable",
            vec![json!("2.0.0")],
        ));
        let controller = controller_for(&host);
        controller.attach().await;

        controller.check_for_updates().await.unwrap();
        let state = controller.state();
        assert_eq!(state.status, UpdateStatus::UpdateAvailable);
        assert_eq!(state.version.as_deref(), Some("2.0.0"));
    }

    #[tokio::test]
    async fn test_failed_start_records_error() {
        let host = FakeHost::start(HostScript::default().fail("startUpdate", "server offline"));
        let controller = controller_for(&host);
        controller.attach().await;

        host.emit("updateAvailable", vec![json!("1.4.0")]).await;
        host.settle(controller.bridge.channel()).await;

        assert!(matches!(
            controller.start_update().await,
            Err(UpdateActionError::Bridge(_))
        ));
        assert_eq!(controller.state().status, UpdateStatus::Error);
    }

    #[tokio::test]
    async fn test_cancel_returns_to_available() {
        let host = FakeHost::start(HostScript::default());
        let controller = controller_for(&host);
        controller.attach().await;

        host.emit("updateAvailable", vec![json!("1.4.0")]).await;
        host.settle(controller.bridge.channel()).await;
        controller.start_update().await.unwrap();
        controller.cancel_update().await.unwrap();

        assert_eq!(controller.state().status, UpdateStatus::UpdateAvailable);
        assert!(host.called("cancelUpdate"));
    }
}
