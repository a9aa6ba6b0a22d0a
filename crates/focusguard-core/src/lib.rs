//! # FocusGuard Core Library
//!
//! This library provides the enforcement core of FocusGuard: a work/rest
//! session timer that actually makes the user stop. It is host-agnostic;
//! everything that touches the operating system goes through
//! [`EnforcementPort`], and the CLI binary supplies the real port.
//!
//! ## Architecture
//!
//! - **Session**: A pure state machine over monotonic time, wrapped by a
//!   controller that serializes callers and applies enforcement commands
//!   outside its lock
//! - **Enforcement**: Per-phase profiles and the port trait for input,
//!   audio, overlay and process control
//! - **Guards**: The night guard (forced rest during a wall-clock window)
//!   and the tamper watchdog (bypass tool detection)
//! - **Runtime**: Tokio loops that drive ticks, night checks and scans
//! - **Storage**: TOML-based configuration
//!
//! ## Key Components
//!
//! - [`SessionController`]: Serialized transition API
//! - [`SessionStateMachine`]: Core phase state machine
//! - [`NightGuard`] / [`TamperWatchdog`]: Observers feeding the controller
//! - [`Config`]: Application configuration management

pub mod clock;
pub mod enforcement;
pub mod error;
pub mod events;
pub mod guard;
pub mod runtime;
pub mod session;
pub mod storage;

pub use clock::{ManualClock, Now, SystemClock, TimeSource};
pub use enforcement::{
    Capabilities, Capability, Command, EnforcementPort, EnforcementProfile, ProcessInfo,
    RecordingPort,
};
pub use error::{ConfigError, CoreError, EnforcementError};
pub use events::Event;
pub use guard::{NightAction, NightGuard, NightWindow, ScanReport, TamperWatchdog};
pub use runtime::{Runtime, RuntimeConfig, RuntimeHandle};
pub use session::{Phase, SessionController, SessionPolicy, SessionStateMachine, SessionStatus};
pub use storage::Config;
