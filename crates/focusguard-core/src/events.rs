use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::enforcement::Capability;
use crate::session::Phase;

/// Every state change in the system produces an Event.
/// The controller broadcasts them; front ends render them as status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    PhaseStarted {
        phase: Phase,
        duration_secs: u64,
        at: DateTime<Utc>,
    },
    PhaseCompleted {
        phase: Phase,
        at: DateTime<Utc>,
    },
    Paused {
        from: Phase,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    Resumed {
        phase: Phase,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    Stopped {
        from: Phase,
        at: DateTime<Utc>,
    },
    NightLockEntered {
        resume_phase: Phase,
        at: DateTime<Utc>,
    },
    NightLockExited {
        restored: Phase,
        at: DateTime<Utc>,
    },
    /// A blocked tool was seen during an enforcing phase. Enforcement has
    /// already been withdrawn when this is published.
    TamperDetected {
        tools: Vec<String>,
        phase: Phase,
        at: DateTime<Utc>,
    },
    /// A capability stopped working; the session continues without it.
    EnforcementUnavailable {
        capability: Capability,
        reason: String,
        at: DateTime<Utc>,
    },
}

impl Event {
    pub fn at(&self) -> DateTime<Utc> {
        match self {
            Event::PhaseStarted { at, .. }
            | Event::PhaseCompleted { at, .. }
            | Event::Paused { at, .. }
            | Event::Resumed { at, .. }
            | Event::Stopped { at, .. }
            | Event::NightLockEntered { at, .. }
            | Event::NightLockExited { at, .. }
            | Event::TamperDetected { at, .. }
            | Event::EnforcementUnavailable { at, .. } => *at,
        }
    }
}
