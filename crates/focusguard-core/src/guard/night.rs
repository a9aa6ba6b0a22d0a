//! Night guard.
//!
//! Overlays a forced-rest phase on top of the session during a wall-clock
//! hour window. It only observes the hour and requests transitions through
//! the controller; it never touches session state itself.

use std::sync::Arc;

use chrono::{DateTime, Local, TimeZone, Timelike};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::session::{Phase, SessionController};

/// Half-open hour range `[start_hour, end_hour)`. Wraps past midnight when
/// `start_hour > end_hour` (e.g. 22 to 6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NightWindow {
    start_hour: u32,
    end_hour: u32,
}

impl NightWindow {
    pub fn new(start_hour: u32, end_hour: u32) -> Result<Self> {
        if start_hour > 23 || end_hour > 24 {
            return Err(CoreError::invalid_config(
                "night",
                format!("hours must be within 0..24, got {start_hour}..{end_hour}"),
            ));
        }
        if start_hour == end_hour {
            return Err(CoreError::invalid_config("night", "window is empty"));
        }
        Ok(Self {
            start_hour,
            end_hour,
        })
    }

    pub fn start_hour(&self) -> u32 {
        self.start_hour
    }

    pub fn end_hour(&self) -> u32 {
        self.end_hour
    }

    pub fn contains(&self, hour: u32) -> bool {
        if self.start_hour < self.end_hour {
            (self.start_hour..self.end_hour).contains(&hour)
        } else {
            hour >= self.start_hour || hour < self.end_hour
        }
    }
}

impl Default for NightWindow {
    fn default() -> Self {
        Self {
            start_hour: 0,
            end_hour: 6,
        }
    }
}

/// What a check did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NightAction {
    Entered,
    Exited,
}

pub struct NightGuard {
    controller: Arc<SessionController>,
    window: NightWindow,
}

impl NightGuard {
    pub fn new(controller: Arc<SessionController>, window: NightWindow) -> Self {
        Self { controller, window }
    }

    pub fn window(&self) -> NightWindow {
        self.window
    }

    /// Compare the hour of `now` (in its own time zone) against the window.
    pub fn check<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Option<NightAction> {
        let in_window = self.window.contains(now.hour());
        let phase = self.controller.get_status().phase;
        match (in_window, phase == Phase::NightLock) {
            (true, false) => {
                tracing::info!(hour = now.hour(), %phase, "night window reached");
                self.controller.enter_night_lock();
                Some(NightAction::Entered)
            }
            (false, true) => {
                tracing::info!(hour = now.hour(), "night window over");
                self.controller.exit_night_lock();
                Some(NightAction::Exited)
            }
            _ => None,
        }
    }

    /// Check against the controller's wall clock in the local time zone.
    pub fn check_now(&self) -> Option<NightAction> {
        let now = self.controller.clock().now_wall().with_timezone(&Local);
        self.check(&now)
    }
}
