//! Enforcement capability boundary.
//!
//! The core never blocks input, mutes audio or kills processes itself. It
//! emits [`Command`]s and hands them to an [`EnforcementPort`] implemented by
//! the host layer. Every port call may fail; the controller logs the failure
//! and keeps the session running with that capability degraded.

mod policy;
mod recording;

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::EnforcementError;

pub use policy::EnforcementProfile;
pub use recording::RecordingPort;

/// One enforcement primitive group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    Input,
    Audio,
    Overlay,
    Processes,
}

impl Capability {
    pub const ALL: [Capability; 4] = [
        Capability::Input,
        Capability::Audio,
        Capability::Overlay,
        Capability::Processes,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Capability::Input => "input",
            Capability::Audio => "audio",
            Capability::Overlay => "overlay",
            Capability::Processes => "processes",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Availability flags reported once by the port at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    pub input: bool,
    pub audio: bool,
    pub overlay: bool,
    pub processes: bool,
}

impl Capabilities {
    pub fn all() -> Self {
        Self {
            input: true,
            audio: true,
            overlay: true,
            processes: true,
        }
    }

    pub fn none() -> Self {
        Self {
            input: false,
            audio: false,
            overlay: false,
            processes: false,
        }
    }

    pub fn has(&self, capability: Capability) -> bool {
        match capability {
            Capability::Input => self.input,
            Capability::Audio => self.audio,
            Capability::Overlay => self.overlay,
            Capability::Processes => self.processes,
        }
    }

    pub fn missing(&self) -> Vec<Capability> {
        Capability::ALL
            .into_iter()
            .filter(|c| !self.has(*c))
            .collect()
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::all()
    }
}

/// A running process as seen by the port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessInfo {
    pub pid: u32,
    pub name: String,
    /// `None` when the executable path could not be read.
    pub executable_path: Option<PathBuf>,
}

/// Capability set the host environment provides.
///
/// Contract for implementors:
/// - every state-changing call is idempotent;
/// - `mute_audio`/`unmute_audio` should return `Ok` when there is simply no
///   audio device, rather than an error;
/// - `list_processes` skips entries it cannot read instead of failing.
pub trait EnforcementPort: Send + Sync {
    /// Which capabilities this host supports. Read once by the controller.
    fn capabilities(&self) -> Capabilities {
        Capabilities::all()
    }

    fn block_input(&self) -> Result<(), EnforcementError>;

    fn unblock_input(&self) -> Result<(), EnforcementError>;

    fn mute_audio(&self) -> Result<(), EnforcementError>;

    fn unmute_audio(&self) -> Result<(), EnforcementError>;

    fn show_overlay(&self, message: &str) -> Result<(), EnforcementError>;

    fn hide_overlay(&self) -> Result<(), EnforcementError>;

    fn list_processes(&self) -> Vec<ProcessInfo>;

    /// Terminate every process with this exact name. Returns how many died.
    fn kill_process_by_name(&self, name: &str) -> Result<usize, EnforcementError>;

    /// Terminate every process whose executable lives at `path`.
    fn terminate_by_path(&self, path: &Path) -> Result<usize, EnforcementError>;
}

/// A single enforcement side effect issued on a phase transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", content = "message", rename_all = "snake_case")]
pub enum Command {
    BlockInput,
    UnblockInput,
    MuteAudio,
    UnmuteAudio,
    ShowOverlay(String),
    HideOverlay,
}

impl Command {
    pub fn capability(&self) -> Capability {
        match self {
            Command::BlockInput | Command::UnblockInput => Capability::Input,
            Command::MuteAudio | Command::UnmuteAudio => Capability::Audio,
            Command::ShowOverlay(_) | Command::HideOverlay => Capability::Overlay,
        }
    }

    /// Full release: what a pause, stop or night-lock exit issues first.
    pub fn release() -> Vec<Command> {
        vec![
            Command::UnblockInput,
            Command::UnmuteAudio,
            Command::HideOverlay,
        ]
    }

    pub fn apply(&self, port: &dyn EnforcementPort) -> Result<(), EnforcementError> {
        match self {
            Command::BlockInput => port.block_input(),
            Command::UnblockInput => port.unblock_input(),
            Command::MuteAudio => port.mute_audio(),
            Command::UnmuteAudio => port.unmute_audio(),
            Command::ShowOverlay(message) => port.show_overlay(message),
            Command::HideOverlay => port.hide_overlay(),
        }
    }
}
