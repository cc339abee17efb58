//! Wire format spoken with the host.
//!
//! Newline-delimited JSON, one frame per line:
//!
//! ```text
//!   client → host   {"id": 7, "method": "getSettings", "params": []}
//!   host → client   {"id": 7, "result": "..."}      or {"id": 7, "error": "..."}
//!   host → client   {"signal": "downloadProgress", "args": [42]}
//!   host → client   {"command": "navigate", "args": ["events"]}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Bump when the frame layout changes incompatibly. Checked during the
/// `hello` handshake.
pub const PROTOCOL_VERSION: u32 = 1;

/// Method name of the handshake request
pub const HELLO: &str = "hello";

/// Request frame sent to the host
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub id: u64,
    pub method: String,
    #[serde(default)]
    pub params: Vec<Value>,
}

/// Any frame the host can send
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Inbound {
    Response {
        id: u64,
        #[serde(default)]
        result: Option<Value>,
        #[serde(default)]
        error: Option<String>,
    },
    Signal {
        signal: String,
        #[serde(default)]
        args: Vec<Value>,
    },
    Command {
        command: String,
        #[serde(default)]
        args: Vec<Value>,
    },
}

impl Request {
    pub fn new(id: u64, method: &str, params: Vec<Value>) -> Self {
        Self {
            id,
            method: method.to_string(),
            params,
        }
    }

    /// Serialise as a single line including the trailing newline
    pub fn encode(&self) -> serde_json::Result<String> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}

impl Inbound {
    pub fn decode(line: &str) -> serde_json::Result<Self> {
        serde_json::from_str(line)
    }
}

/// RPC method names exposed by the host
pub mod method {
    pub const GET_SETTINGS: &str = "getSettings";
    pub const SAVE_SETTINGS: &str = "saveSettings";
    pub const SET_RESOLUTION: &str = "setResolution";
    pub const LAUNCH_GAME: &str = "launchGame";
    pub const GET_SESSION: &str = "getSession";
    pub const GET_ONLINE_COUNT: &str = "getOnlineCount";
    pub const CHECK_FOR_UPDATES: &str = "checkForUpdates";
    pub const START_UPDATE: &str = "startUpdate";
    pub const CANCEL_UPDATE: &str = "cancelUpdate";
    pub const GET_EVENTS: &str = "getEvents";
    pub const GET_UNMANAGED_PROCESSES: &str = "getUnmanagedProcesses";
    pub const KILL_UNMANAGED_PROCESS: &str = "killUnmanagedProcess";
    pub const BRING_GAME_TO_FRONT: &str = "bringGameToFront";
    pub const CLOSE_GAME: &str = "closeGame";
    pub const EXIT_LAUNCHER: &str = "exitLauncher";
    pub const START_DRAG: &str = "startDrag";
}

/// Signal names emitted by the host
pub mod signal {
    pub const UPDATE_AVAILABLE: &str = "updateAvailable";
    pub const DOWNLOAD_PROGRESS: &str = "downloadProgress";
    pub const UPDATE_ERROR: &str = "updateError";
    pub const UPDATE_FINISHED: &str = "updateFinished";
    pub const GAME_LAUNCHED: &str = "gameLaunched";
    pub const EVENT_UPDATED: &str = "eventUpdated";
    pub const UNMANAGED_PROCESS_DETECTED: &str = "unmanagedProcessDetected";
}
