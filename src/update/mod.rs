//! Client update lifecycle.
//!
//! The host owns the actual download and install. This module tracks what
//! the host reports through its update signals and decides which user
//! actions are allowed in each phase:
//!
//! ```text
//! idle → checking → update_available → downloading → finished
//!                                                  ↘ error
//! ```
//!
//! `error` is reachable from every state and is sticky until the host
//! announces a fresh update.

mod controller;

pub use controller::UpdateController;

use thiserror::Error;

use crate::bridge::BridgeError;

/// Current phase of the update lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpdateStatus {
    #[default]
    Idle,
    Checking,
    UpdateAvailable,
    Downloading,
    Finished,
    Error,
}

impl UpdateStatus {
    /// Get a human-readable description of the current phase
    pub fn description(&self) -> &'static str {
        match self {
            UpdateStatus::Idle => "Up to date",
            UpdateStatus::Checking => "Checking for updates...",
            UpdateStatus::UpdateAvailable => "Update required",
            UpdateStatus::Downloading => "Downloading update...",
            UpdateStatus::Finished => "Update complete!",
            UpdateStatus::Error => "Update failed",
        }
    }
}

/// Errors returned by user-initiated update actions
#[derive(Debug, Error)]
pub enum UpdateActionError {
    #[error("No update available (status: {})", .0.description())]
    NotAvailable(UpdateStatus),

    #[error("An update is already downloading")]
    InProgress,

    #[error(transparent)]
    Bridge(#[from] BridgeError),
}

/// Which banner the front end should show
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BannerKind {
    UpdateRequired,
    Downloading,
}

/// Derived banner contents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateBanner {
    pub kind: BannerKind,
    pub progress: u8,
}

/// Snapshot of the update lifecycle
///
/// Transition methods return whether anything changed, so they can be fed
/// straight into `watch::Sender::send_if_modified`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateState {
    pub status: UpdateStatus,
    /// Version announced by the host
    pub version: Option<String>,
    /// Latest reported download percentage (0-100)
    pub progress: u8,
    /// Sticky error message
    pub error: Option<String>,
}

impl UpdateState {
    /// User asked for a check. Not allowed while downloading.
    pub fn begin_check(&mut self) -> Result<(), UpdateActionError> {
        if self.status == UpdateStatus::Downloading {
            return Err(UpdateActionError::InProgress);
        }
        self.status = UpdateStatus::Checking;
        self.error = None;
        Ok(())
    }

    /// The check call returned. Falls back to idle unless a signal already
    /// moved the state on.
    pub fn end_check(&mut self) -> bool {
        if self.status != UpdateStatus::Checking {
            return false;
        }
        self.status = UpdateStatus::Idle;
        true
    }

    /// Host announced an update. Valid from any state; clears a previous error.
    pub fn update_available(&mut self, version: String) -> bool {
        self.status = UpdateStatus::UpdateAvailable;
        self.version = Some(version);
        self.progress = 0;
        self.error = None;
        true
    }

    /// User started the download
    pub fn begin_download(&mut self) -> Result<(), UpdateActionError> {
        if self.status != UpdateStatus::UpdateAvailable {
            return Err(UpdateActionError::NotAvailable(self.status));
        }
        self.status = UpdateStatus::Downloading;
        self.progress = 0;
        Ok(())
    }

    /// Record the latest progress report. Values are taken as-is (clamped to
    /// 100) even when they go backwards; reaching 100 does not finish.
    pub fn download_progress(&mut self, percent: u8) -> bool {
        if self.status != UpdateStatus::Downloading {
            tracing::debug!("Ignoring download progress {} while {:?}", percent, self.status);
            return false;
        }
        let percent = percent.min(100);
        if self.progress == percent {
            return false;
        }
        self.progress = percent;
        true
    }

    /// Host reported a failure. Valid from any state.
    pub fn fail(&mut self, message: String) -> bool {
        self.status = UpdateStatus::Error;
        self.error = Some(message);
        true
    }

    /// Host finished installing. Only meaningful while downloading.
    pub fn finish(&mut self) -> bool {
        if self.status != UpdateStatus::Downloading {
            tracing::warn!("Ignoring update finished while {:?}", self.status);
            return false;
        }
        self.status = UpdateStatus::Finished;
        self.progress = 100;
        true
    }

    /// User cancelled the download; the update stays available
    pub fn cancel(&mut self) -> Result<(), UpdateActionError> {
        if self.status != UpdateStatus::Downloading {
            return Err(UpdateActionError::NotAvailable(self.status));
        }
        self.status = UpdateStatus::UpdateAvailable;
        self.progress = 0;
        Ok(())
    }

    pub fn banner(&self) -> Option<UpdateBanner> {
        let kind = match self.status {
            UpdateStatus::UpdateAvailable => BannerKind::UpdateRequired,
            UpdateStatus::Downloading => BannerKind::Downloading,
            _ => return None,
        };
        Some(UpdateBanner {
            kind,
            progress: self.progress,
        })
    }

    pub fn error_banner(&self) -> Option<&str> {
        match self.status {
            UpdateStatus::Error => self.error.as_deref(),
            _ => None,
        }
    }
}
