//! Fixed answers used when no host is reachable.

use crate::model::{LaunchResult, Session, Settings};

pub const ONLINE_COUNT: u32 = 1;

pub fn settings() -> Settings {
    Settings {
        language: "en".to_string(),
        resolution: "1366x768".to_string(),
        window_mode: true,
        sound: true,
        music: true,
        server_name: None,
        version: Some("1.0.0".to_string()),
        update_url: None,
        api_url: None,
        game_executable: None,
        max_clients: None,
        kill_unmanaged_clients: None,
    }
}

pub fn session() -> Session {
    Session {
        logged: true,
        username: "Admin".to_string(),
        is_admin: true,
    }
}

pub fn launch_result() -> LaunchResult {
    LaunchResult {
        success: true,
        message: "Mock launch successful".to_string(),
    }
}
