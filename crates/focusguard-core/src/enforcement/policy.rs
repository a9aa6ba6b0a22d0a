//! Per-phase enforcement policy.
//!
//! | Phase     | block_input        | mute_audio | show_overlay | terminate_tools |
//! |-----------|--------------------|------------|--------------|-----------------|
//! | Working   | no                 | no         | no           | yes             |
//! | Resting   | hard mode only     | yes        | yes          | hard mode only  |
//! | Paused    | no                 | no         | no           | no              |
//! | NightLock | yes                | yes        | yes          | no              |
//! | Idle      | no                 | no         | no           | no              |

use serde::{Deserialize, Serialize};

use super::Command;
use crate::session::Phase;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnforcementProfile {
    pub block_input: bool,
    pub mute_audio: bool,
    pub show_overlay: bool,
    /// Watchdog terminates matching tools (it always reports them).
    pub terminate_tools: bool,
    /// Watchdog scans at all.
    pub watchdog_active: bool,
}

impl EnforcementProfile {
    pub fn for_phase(phase: Phase, hard_mode: bool) -> Self {
        match phase {
            Phase::Working => Self {
                block_input: false,
                mute_audio: false,
                show_overlay: false,
                terminate_tools: true,
                watchdog_active: true,
            },
            Phase::Resting => Self {
                block_input: hard_mode,
                mute_audio: true,
                show_overlay: true,
                terminate_tools: hard_mode,
                watchdog_active: true,
            },
            Phase::NightLock => Self {
                block_input: true,
                mute_audio: true,
                show_overlay: true,
                terminate_tools: false,
                watchdog_active: true,
            },
            Phase::Paused | Phase::Idle => Self::released(),
        }
    }

    pub fn released() -> Self {
        Self {
            block_input: false,
            mute_audio: false,
            show_overlay: false,
            terminate_tools: false,
            watchdog_active: false,
        }
    }

    /// Entry side effects. Every primitive is set explicitly so a phase
    /// entered from any prior state ends in the same enforcement state.
    pub fn commands(&self, overlay_message: &str) -> Vec<Command> {
        let input = if self.block_input {
            Command::BlockInput
        } else {
            Command::UnblockInput
        };
        let audio = if self.mute_audio {
            Command::MuteAudio
        } else {
            Command::UnmuteAudio
        };
        let overlay = if self.show_overlay {
            Command::ShowOverlay(overlay_message.to_string())
        } else {
            Command::HideOverlay
        };
        vec![input, audio, overlay]
    }
}
