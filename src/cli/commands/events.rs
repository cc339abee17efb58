//! Event schedule commands

use anyhow::Result;
use chrono::{Local, Utc};
use clap::Subcommand;
use serde::Serialize;

use crate::app::LauncherApp;
use crate::cli::output::{print_formatted, print_success, OutputFormat};
use crate::events::{BoardPage, EventBoard, EventEngine};
use crate::model::EventCategory;

#[derive(Subcommand, Debug)]
pub enum EventsCommands {
    /// Show the event board with countdowns
    List {
        /// Only show one category (events, invasions, bosses, others)
        #[arg(long, conflicts_with = "all")]
        category: Option<EventCategory>,

        /// Clear the category filter
        #[arg(long)]
        all: bool,

        /// Page number (1-based)
        #[arg(long)]
        page: Option<usize>,
    },

    /// Show the next page of the board
    Next,

    /// Show the previous page of the board
    Prev,

    /// Allow already announced events to notify again
    ResetNotified,

    /// Mute notifications for an event
    Mute {
        /// Event id
        id: String,
    },

    /// Unmute notifications for an event
    Unmute {
        /// Event id
        id: String,
    },

    /// Mute all event notifications
    MuteAll,

    /// Unmute event notifications (per-event flags still apply)
    UnmuteAll,
}

#[derive(Serialize)]
struct EventRow {
    id: String,
    name: String,
    category: EventCategory,
    starts_at: String,
    countdown: String,
    remaining_ms: Option<i64>,
    muted: bool,
    notified: bool,
}

#[derive(Serialize)]
struct BoardResult {
    category: Option<EventCategory>,
    page: usize,
    page_count: usize,
    total: usize,
    live: bool,
    mute_all: bool,
    events: Vec<EventRow>,
}

pub async fn run(
    command: EventsCommands,
    app: &LauncherApp,
    format: OutputFormat,
    quiet: bool,
) -> Result<()> {
    match command {
        EventsCommands::List {
            category,
            all,
            page,
        } => {
            {
                let mut board = app.board();
                if all {
                    board.set_category(None);
                } else if category.is_some() {
                    board.set_category(category);
                }
            }
            show_board(app, format, |board, total| {
                if let Some(page) = page {
                    board.go_to(page, total);
                }
            })
        }
        EventsCommands::Next => show_board(app, format, EventBoard::next_page),
        EventsCommands::Prev => show_board(app, format, EventBoard::prev_page),
        EventsCommands::ResetNotified => {
            app.engine().reset_notified();
            print_success("Notification history cleared", quiet);
            Ok(())
        }
        EventsCommands::Mute { id } => {
            app.engine().set_muted(&id, true);
            print_success(&format!("Muted {}", id), quiet);
            Ok(())
        }
        EventsCommands::Unmute { id } => {
            app.engine().set_muted(&id, false);
            print_success(&format!("Unmuted {}", id), quiet);
            Ok(())
        }
        EventsCommands::MuteAll => {
            app.engine().set_mute_all(true);
            print_success("All event notifications muted", quiet);
            Ok(())
        }
        EventsCommands::UnmuteAll => {
            app.engine().set_mute_all(false);
            print_success("Event notifications unmuted", quiet);
            Ok(())
        }
    }
}

/// Refresh countdowns, move the page cursor, then print the current page
fn show_board(
    app: &LauncherApp,
    format: OutputFormat,
    move_cursor: impl FnOnce(&mut EventBoard, usize),
) -> Result<()> {
    let mut engine = app.engine();
    engine.update_timers(Utc::now());

    let mut board = app.board();
    let total = board.filtered(engine.events(), engine.timers()).len();
    move_cursor(&mut board, total);

    let view = engine.board(&board);
    let result = board_result(&view, board.category(), &engine);

    print_formatted(&result, format, format_board_text);
    Ok(())
}

fn board_result(
    view: &BoardPage<'_>,
    category: Option<EventCategory>,
    engine: &EventEngine,
) -> BoardResult {
    let events = view
        .items
        .iter()
        .map(|(event, timer)| EventRow {
            id: event.id.clone(),
            name: event.name.clone(),
            category: event.category,
            starts_at: event
                .next_start
                .with_timezone(&Local)
                .format("%a %H:%M")
                .to_string(),
            countdown: timer.map(|t| t.formatted.clone()).unwrap_or_default(),
            remaining_ms: timer.map(|t| t.remaining_ms),
            muted: engine.is_muted(&event.id),
            notified: engine.is_notified(&event.id, event.next_start),
        })
        .collect();

    BoardResult {
        category,
        page: view.page,
        page_count: view.page_count,
        total: view.total,
        live: engine.is_live(),
        mute_all: engine.mute_all(),
        events,
    }
}

fn format_board_text(r: &BoardResult) -> String {
    if r.events.is_empty() {
        return match r.category {
            Some(c) => format!("No upcoming {} events", c.as_str()),
            None => "No upcoming events".to_string(),
        };
    }

    let mut lines: Vec<String> = r
        .events
        .iter()
        .map(|e| {
            format!(
                "{:<18} {:<10} {:<10} {:>12} {}",
                e.name,
                e.category.as_str(),
                e.starts_at,
                e.countdown,
                if e.muted { "(muted)" } else { "" }
            )
        })
        .collect();

    lines.push(format!(
        "Page {}/{} ({} events, {})",
        r.page,
        r.page_count,
        r.total,
        r.category.map_or("all categories", |c| c.as_str())
    ));
    if !r.live {
        lines.push("Showing the built-in schedule".to_string());
    }
    if r.mute_all {
        lines.push("All notifications muted".to_string());
    }
    lines.join("\n")
}
