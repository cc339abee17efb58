//! Long-running status stream

use anyhow::Result;
use serde_json::{json, Value};
use tokio::sync::mpsc;

use crate::app::{LauncherApp, StatusEvent};
use crate::cli::output::{print_line, print_success, OutputFormat};
use crate::update::BannerKind;

pub async fn run(
    app: &mut LauncherApp,
    mut status_rx: mpsc::UnboundedReceiver<StatusEvent>,
    format: OutputFormat,
    quiet: bool,
) -> Result<()> {
    app.start_background();
    print_success("Watching launcher activity (Ctrl-C to stop)", quiet);

    loop {
        tokio::select! {
            event = status_rx.recv() => {
                let Some(event) = event else { break };
                let line = to_json(&event);
                print_line(&line, format, |_| to_text(&event));
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted");
                break;
            }
        }
    }

    Ok(())
}

fn to_json(event: &StatusEvent) -> Value {
    match event {
        StatusEvent::Notification(n) => json!({
            "type": "notification",
            "id": n.event_id,
            "name": n.name,
            "next_start": n.next_start,
            "remaining_ms": n.remaining_ms,
        }),
        StatusEvent::UpdateBanner(banner) => json!({
            "type": "update_banner",
            "banner": banner.map(|b| json!({
                "kind": match b.kind {
                    BannerKind::UpdateRequired => "update_required",
                    BannerKind::Downloading => "downloading",
                },
                "progress": b.progress,
            })),
        }),
        StatusEvent::UpdateFailed(message) => json!({ "type": "update_failed", "message": message }),
        StatusEvent::OnlineCount(count) => json!({ "type": "online_count", "count": count }),
        StatusEvent::GameLaunched(success) => json!({ "type": "game_launched", "success": success }),
        StatusEvent::UnmanagedProcess(p) => {
            json!({ "type": "unmanaged_process", "pid": p.pid, "name": p.name })
        }
        StatusEvent::Navigate(tab) => json!({ "type": "navigate", "view": tab.to_string() }),
        StatusEvent::ShowSettings => json!({ "type": "show_settings" }),
        StatusEvent::EventsUpdated(count) => json!({ "type": "events_updated", "count": count }),
    }
}

pub(crate) fn to_text(event: &StatusEvent) -> String {
    match event {
        StatusEvent::Notification(n) => {
            format!("[event] {} starts in {} minute(s)", n.name, n.minutes_until())
        }
        StatusEvent::UpdateBanner(Some(b)) => match b.kind {
            BannerKind::UpdateRequired => "[update] Update required".to_string(),
            BannerKind::Downloading => format!("[update] Downloading... {}%", b.progress),
        },
        StatusEvent::UpdateBanner(None) => "[update] Banner cleared".to_string(),
        StatusEvent::UpdateFailed(message) => format!("[update] Failed: {}", message),
        StatusEvent::OnlineCount(count) => format!("[online] {} players", count),
        StatusEvent::GameLaunched(true) => "[game] Launched".to_string(),
        StatusEvent::GameLaunched(false) => "[game] Launch failed".to_string(),
        StatusEvent::UnmanagedProcess(p) => {
            format!("[process] Unmanaged client {} (pid {})", p.name, p.pid)
        }
        StatusEvent::Navigate(tab) => format!("[host] Navigate to {}", tab),
        StatusEvent::ShowSettings => "[host] Open settings".to_string(),
        StatusEvent::EventsUpdated(count) => format!("[events] {} events received", count),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::update::UpdateBanner;

    #[test]
    fn test_banner_json() {
        let event = StatusEvent::UpdateBanner(Some(UpdateBanner {
            kind: BannerKind::Downloading,
            progress: 42,
        }));
        let value = to_json(&event);
        assert_eq!(value["type"], "update_banner");
        assert_eq!(value["banner"]["kind"], "downloading");
        assert_eq!(to_text(&event), "[update] Downloading... 42%");
    }

    #[test]
    fn test_cleared_banner_is_null() {
        let value = to_json(&StatusEvent::UpdateBanner(None));
        assert!(value["banner"].is_null());
    }
}
