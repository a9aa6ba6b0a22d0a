//! Background loops: countdown ticks, night checks and watchdog scans.
//!
//! Each loop owns a tokio interval and exits when the shared cancellation
//! token fires. Loop bodies call into the controller, which may block on
//! port calls, so they run on the blocking pool.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::guard::{NightGuard, TamperWatchdog};
use crate::session::{SessionController, SessionStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub tick_interval: Duration,
    pub night_check_interval: Duration,
    pub scan_interval: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            night_check_interval: Duration::from_secs(30),
            scan_interval: Duration::from_secs(1),
        }
    }
}

pub struct Runtime {
    controller: Arc<SessionController>,
    night_guard: Option<NightGuard>,
    watchdog: Option<TamperWatchdog>,
    config: RuntimeConfig,
}

impl Runtime {
    pub fn new(controller: Arc<SessionController>, config: RuntimeConfig) -> Self {
        Self {
            controller,
            night_guard: None,
            watchdog: None,
            config,
        }
    }

    pub fn with_night_guard(mut self, guard: NightGuard) -> Self {
        self.night_guard = Some(guard);
        self
    }

    pub fn with_watchdog(mut self, watchdog: TamperWatchdog) -> Self {
        self.watchdog = Some(watchdog);
        self
    }

    /// Start the loops on the current tokio runtime.
    pub fn spawn(self) -> RuntimeHandle {
        let cancel = CancellationToken::new();
        let mut tasks = Vec::with_capacity(3);

        let controller = self.controller.clone();
        tasks.push(spawn_loop(
            "tick",
            self.config.tick_interval,
            cancel.clone(),
            move || {
                controller.tick();
            },
        ));

        if let Some(guard) = self.night_guard {
            tasks.push(spawn_loop(
                "night",
                self.config.night_check_interval,
                cancel.clone(),
                move || {
                    guard.check_now();
                },
            ));
        }

        if let Some(watchdog) = self.watchdog {
            tasks.push(spawn_loop(
                "watchdog",
                self.config.scan_interval,
                cancel.clone(),
                move || {
                    watchdog.scan();
                },
            ));
        }

        tracing::info!(loops = tasks.len(), "runtime started");
        RuntimeHandle {
            controller: self.controller,
            cancel,
            tasks,
        }
    }
}

pub struct RuntimeHandle {
    controller: Arc<SessionController>,
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl RuntimeHandle {
    pub fn controller(&self) -> &Arc<SessionController> {
        &self.controller
    }

    /// Token that stops every loop when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Stop the loops, wait for them, then stop the session so every
    /// enforcement primitive is released. A night lock is lifted too: the
    /// process is going away and nothing would release it later.
    pub async fn shutdown(self) -> SessionStatus {
        self.cancel.cancel();
        for task in self.tasks {
            if let Err(err) = task.await {
                tracing::error!(error = %err, "runtime task failed");
            }
        }
        let controller = self.controller;
        let release = move || {
            controller.stop();
            controller.exit_night_lock();
            controller.get_status()
        };
        match tokio::task::spawn_blocking(release).await {
            Ok(status) => {
                tracing::info!("runtime stopped");
                status
            }
            Err(err) => {
                tracing::error!(error = %err, "final stop failed");
                SessionStatus::idle()
            }
        }
    }
}

fn spawn_loop<F>(
    name: &'static str,
    period: Duration,
    cancel: CancellationToken,
    step: F,
) -> JoinHandle<()>
where
    F: Fn() + Send + Sync + 'static,
{
    let step = Arc::new(step);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {
                    let step = step.clone();
                    if let Err(err) = tokio::task::spawn_blocking(move || step()).await {
                        tracing::error!(task = name, error = %err, "loop step panicked");
                    }
                }
            }
        }
        tracing::debug!(task = name, "loop exited");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::enforcement::{EnforcementPort, RecordingPort};
    use crate::session::{Phase, SessionPolicy};
    use chrono::Utc;

    fn setup() -> (Arc<RecordingPort>, Arc<ManualClock>, Arc<SessionController>) {
        let port = Arc::new(RecordingPort::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let controller = Arc::new(SessionController::new(
            port.clone(),
            clock.clone(),
            SessionPolicy::default(),
        ));
        (port, clock, controller)
    }

    #[tokio::test(start_paused = true)]
    async fn tick_loop_drives_phase_switch() {
        let (port, clock, controller) = setup();
        controller.start(25, 5).unwrap();
        let handle = Runtime::new(controller.clone(), RuntimeConfig::default()).spawn();

        clock.advance_secs(1500);
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(controller.get_status().phase, Phase::Resting);
        assert!(port.state().muted);

        let status = handle.shutdown().await;
        assert_eq!(status.phase, Phase::Idle);
        assert!(!port.state().muted);
        assert!(port.state().overlay.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn watchdog_loop_pauses_on_tamper() {
        let (port, _clock, controller) = setup();
        controller.start(25, 5).unwrap();
        let watchdog = TamperWatchdog::new(controller.clone(), &["taskmgr.exe".to_string()]);
        let handle = Runtime::new(controller.clone(), RuntimeConfig::default())
            .with_watchdog(watchdog)
            .spawn();

        port.spawn_process(904242, "taskmgr.exe", None);
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(controller.get_status().phase, Phase::Paused);
        assert!(port.list_processes().is_empty());

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_lifts_night_lock() {
        let (port, _clock, controller) = setup();
        controller.start(25, 5).unwrap();
        controller.enter_night_lock();
        assert!(port.state().input_blocked);

        let handle = Runtime::new(controller, RuntimeConfig::default()).spawn();
        let status = handle.shutdown().await;
        assert_eq!(status.phase, Phase::Idle);
        assert!(!port.state().input_blocked);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_token_stops_loops() {
        let (port, _clock, controller) = setup();
        let handle = Runtime::new(controller, RuntimeConfig::default()).spawn();
        handle.cancellation_token().cancel();
        let status = handle.shutdown().await;
        assert_eq!(status.phase, Phase::Idle);
        // Idle stop issues no commands.
        assert!(port.calls().is_empty());
    }
}
