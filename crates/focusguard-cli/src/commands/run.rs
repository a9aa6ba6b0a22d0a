use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Args;
use focusguard_core::session::parse_minutes;
use focusguard_core::{
    Config, NightGuard, Runtime, SessionController, SystemClock, TamperWatchdog,
};
use tokio::sync::broadcast::error::RecvError;

use super::print_json_line;
use crate::host::HostPort;

#[derive(Args)]
pub struct RunArgs {
    /// Work minutes (defaults to session.work_minutes)
    #[arg(long)]
    work: Option<String>,
    /// Rest minutes (defaults to session.rest_minutes)
    #[arg(long)]
    rest: Option<String>,
    /// Block input and terminate tools during rests too
    #[arg(long)]
    hard: bool,
    /// Stop on its own after this many seconds
    #[arg(long, value_name = "SECS")]
    exit_after: Option<u64>,
}

pub fn run(args: RunArgs) -> anyhow::Result<()> {
    let config = Config::load().context("loading config")?;
    let work = match &args.work {
        Some(raw) => parse_minutes("work_minutes", raw)?,
        None => config.session.work_minutes,
    };
    let rest = match &args.rest {
        Some(raw) => parse_minutes("rest_minutes", raw)?,
        None => config.session.rest_minutes,
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("building tokio runtime")?;
    runtime.block_on(run_session(config, work, rest, args.hard, args.exit_after))
}

async fn run_session(
    config: Config,
    work: u32,
    rest: u32,
    hard: bool,
    exit_after: Option<u64>,
) -> anyhow::Result<()> {
    let mut policy = config.session_policy();
    policy.hard_mode |= hard;

    let controller = Arc::new(SessionController::new(
        Arc::new(HostPort::new()),
        Arc::new(SystemClock::new()),
        policy,
    ));
    let mut events = controller.subscribe();

    let status = controller.start(work, rest)?;
    print_json_line(&status)?;

    let mut session = Runtime::new(controller.clone(), config.runtime_config());
    if config.night.enabled {
        session = session.with_night_guard(NightGuard::new(controller.clone(), config.night_window()?));
    }
    if config.watchdog.enabled {
        session = session.with_watchdog(TamperWatchdog::new(
            controller.clone(),
            &config.watchdog.blocked_tools,
        ));
    }
    let handle = session.spawn();

    let deadline = async {
        match exit_after {
            Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(deadline);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                tracing::info!("interrupted");
                break;
            }
            _ = &mut deadline => break,
            received = events.recv() => match received {
                Ok(event) => print_json_line(&event)?,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "event stream lagged");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    let status = handle.shutdown().await;
    // Release events from the final stop.
    while let Ok(event) = events.try_recv() {
        print_json_line(&event)?;
    }
    print_json_line(&status)?;
    Ok(())
}
