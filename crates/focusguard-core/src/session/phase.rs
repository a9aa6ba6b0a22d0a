use std::fmt;

use serde::{Deserialize, Serialize};

use crate::enforcement::Capability;

/// Mode of the session timeline. Exactly one is active at any time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Idle,
    Working,
    Resting,
    Paused,
    /// Forced rest overlaid by the night guard.
    NightLock,
}

impl Phase {
    /// Phases that carry a running countdown.
    pub fn is_counting(self) -> bool {
        matches!(self, Phase::Working | Phase::Resting)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Working => "working",
            Phase::Resting => "resting",
            Phase::Paused => "paused",
            Phase::NightLock => "night lock",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot returned by `get_status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStatus {
    pub phase: Phase,
    pub remaining_seconds: u64,
    /// Phase that will be restored when a pause or night lock ends.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resume_phase: Option<Phase>,
    /// Work phases finished since the session started.
    #[serde(default)]
    pub completed_cycles: u32,
    /// Capabilities currently running as no-ops.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub degraded: Vec<Capability>,
}

impl SessionStatus {
    pub fn idle() -> Self {
        Self {
            phase: Phase::Idle,
            remaining_seconds: 0,
            resume_phase: None,
            completed_cycles: 0,
            degraded: Vec::new(),
        }
    }
}
