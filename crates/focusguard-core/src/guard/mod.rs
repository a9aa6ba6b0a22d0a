//! Observers that request transitions from outside the command surface.

mod night;
mod watchdog;

pub use night::{NightAction, NightGuard, NightWindow};
pub use watchdog::{MatchKind, ScanReport, TamperWatchdog, ToolMatch};
pub(crate) use watchdog::tool_stem;
