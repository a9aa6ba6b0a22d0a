use std::sync::Arc;

use anyhow::Context;
use focusguard_core::{Config, EnforcementPort, SessionController, SystemClock, TamperWatchdog};

use super::print_json_line;
use crate::host::HostPort;

/// Report blocked tools currently running. Nothing is terminated.
pub fn run() -> anyhow::Result<()> {
    let config = Config::load().context("loading config")?;
    let port = Arc::new(HostPort::new());
    let controller = Arc::new(SessionController::new(
        port.clone(),
        Arc::new(SystemClock::new()),
        config.session_policy(),
    ));
    let watchdog = TamperWatchdog::new(controller, &config.watchdog.blocked_tools);

    let matches = watchdog.find_matches(&port.list_processes());
    tracing::info!(count = matches.len(), "scan finished");
    print_json_line(&matches)
}
