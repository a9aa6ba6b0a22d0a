mod controller;
mod machine;
mod phase;
mod policy;

pub use controller::SessionController;
pub use machine::{SessionStateMachine, Transition};
pub use phase::{Phase, SessionStatus};
pub use policy::{
    default_break_activities, default_night_message, parse_minutes, DurationBounds, SessionPolicy,
    DEFAULT_REST_BOUNDS, DEFAULT_WORK_BOUNDS,
};
