use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use clap::Args;
use focusguard_core::session::parse_minutes;
use focusguard_core::{
    Config, EnforcementProfile, ManualClock, RecordingPort, SessionController, SessionStatus,
};
use serde::Serialize;

use super::print_json_line;

#[derive(Args)]
pub struct StatusArgs {
    /// Work minutes (defaults to session.work_minutes)
    #[arg(long)]
    work: Option<String>,
    /// Rest minutes (defaults to session.rest_minutes)
    #[arg(long)]
    rest: Option<String>,
    /// Apply hard mode on top of the config
    #[arg(long)]
    hard: bool,
}

#[derive(Serialize)]
struct DryRun {
    status: SessionStatus,
    work_secs: u64,
    rest_secs: u64,
    enforcement: EnforcementProfile,
}

/// Start a session against a recording port and report what it would do.
pub fn run(args: StatusArgs) -> anyhow::Result<()> {
    let config = Config::load().context("loading config")?;
    let work = match &args.work {
        Some(raw) => parse_minutes("work_minutes", raw)?,
        None => config.session.work_minutes,
    };
    let rest = match &args.rest {
        Some(raw) => parse_minutes("rest_minutes", raw)?,
        None => config.session.rest_minutes,
    };
    let mut policy = config.session_policy();
    policy.hard_mode |= args.hard;
    let (work_secs, rest_secs) = policy.durations(work, rest)?;

    let controller = SessionController::new(
        Arc::new(RecordingPort::new()),
        Arc::new(ManualClock::new(Utc::now())),
        policy,
    );
    let status = controller.start(work, rest)?;
    print_json_line(&DryRun {
        status,
        work_secs,
        rest_secs,
        enforcement: controller.enforcement(),
    })
}
