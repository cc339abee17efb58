//! Session and launcher lifecycle commands

use anyhow::Result;
use serde::Serialize;

use crate::app::LauncherApp;
use crate::cli::output::{print_formatted, print_success, OutputFormat};
use crate::model::Session;

#[derive(Serialize)]
struct SessionResult<'a> {
    #[serde(flatten)]
    session: &'a Session,
    host_connected: bool,
}

pub async fn show(app: &LauncherApp, format: OutputFormat) -> Result<()> {
    let result = SessionResult {
        session: app.session(),
        host_connected: app.bridge().is_connected(),
    };

    print_formatted(&result, format, |r| {
        let mut out = if r.session.logged {
            format!("Logged in as {}", r.session.username)
        } else {
            "Not logged in".to_string()
        };
        if r.session.is_admin {
            out.push_str(" (admin)");
        }
        if !r.host_connected {
            out.push_str("\n[mock data: no native host]");
        }
        out
    });

    Ok(())
}

#[derive(Serialize)]
struct OnlineResult {
    online: Option<u32>,
}

pub async fn online(app: &LauncherApp, format: OutputFormat) -> Result<()> {
    let online = app.online_count().await?;
    print_formatted(&OnlineResult { online }, format, |r| match r.online {
        Some(count) => format!("{} players online", count),
        None => "Online count unavailable".to_string(),
    });
    Ok(())
}

pub async fn exit(app: &LauncherApp, quiet: bool) -> Result<()> {
    app.bridge().exit_launcher().await;
    print_success("Exit requested", quiet);
    Ok(())
}
