//! Session state machine.
//!
//! A pure, single-owner state machine. It performs no I/O and has no
//! internal threads: the caller supplies the current time to every
//! operation and receives a [`Transition`] describing the enforcement
//! commands to issue and the events to publish.
//!
//! ## State Transitions
//!
//! ```text
//! Idle --start--> Working <--tick--> Resting
//!                    |                  |
//!                    +--pause/tamper----+--> Paused --resume--> (Working | Resting)
//!
//! any --enter_night_lock--> NightLock --exit_night_lock--> resume_phase
//! any --stop--> Idle   (NightLock keeps the lock and only forgets the session)
//! ```
//!
//! ## Countdown
//!
//! The countdown is never decremented. Each counting phase keeps the
//! monotonic instant its current running window started and the time
//! credited by earlier windows; `remaining = duration - elapsed` is derived
//! from those on demand, so the number of `tick` calls has no influence on
//! the result.

use std::time::{Duration, Instant};

use crate::clock::Now;
use crate::enforcement::{Command, EnforcementProfile};
use crate::error::{CoreError, Result};
use crate::events::Event;

use super::phase::{Phase, SessionStatus};
use super::policy::SessionPolicy;

/// Outcome of a state change.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub from: Phase,
    pub to: Phase,
    /// Side effects to issue, in order.
    pub commands: Vec<Command>,
    pub events: Vec<Event>,
}

impl Transition {
    fn new(from: Phase, to: Phase) -> Self {
        Self {
            from,
            to,
            commands: Vec::new(),
            events: Vec::new(),
        }
    }

    pub fn is_tamper(&self) -> bool {
        self.events
            .iter()
            .any(|e| matches!(e, Event::TamperDetected { .. }))
    }
}

/// Countdown of the current work or rest phase.
#[derive(Debug, Clone, Copy)]
struct Countdown {
    /// `Working` or `Resting`.
    phase: Phase,
    duration: Duration,
    /// Elapsed time from windows that already ended (pauses, night locks).
    credited: Duration,
    /// Start of the running window; `None` while suspended.
    started_at: Option<Instant>,
    paused_at: Option<Instant>,
}

impl Countdown {
    fn begin(phase: Phase, duration_secs: u64, now: Instant) -> Self {
        Self {
            phase,
            duration: Duration::from_secs(duration_secs),
            credited: Duration::ZERO,
            started_at: Some(now),
            paused_at: None,
        }
    }

    fn elapsed(&self, now: Instant) -> Duration {
        let running = self
            .started_at
            .map(|start| now.saturating_duration_since(start))
            .unwrap_or(Duration::ZERO);
        self.credited + running
    }

    fn remaining_secs(&self, now: Instant) -> u64 {
        self.duration
            .as_secs()
            .saturating_sub(self.elapsed(now).as_secs())
    }

    fn suspend(&mut self, now: Instant) {
        if self.started_at.is_some() {
            self.credited = self.elapsed(now);
            self.started_at = None;
            self.paused_at = Some(now);
        }
    }

    /// Equivalent to `started_at = now - (duration - remaining)`.
    fn resume(&mut self, now: Instant) {
        if self.started_at.is_none() {
            self.started_at = Some(now);
            self.paused_at = None;
        }
    }
}

/// The session timeline.
#[derive(Debug, Clone)]
pub struct SessionStateMachine {
    policy: SessionPolicy,
    phase: Phase,
    work_duration_secs: u64,
    rest_duration_secs: u64,
    countdown: Option<Countdown>,
    /// Last computed countdown value.
    remaining_secs: u64,
    /// Phase to restore when a night lock ends.
    resume_phase: Option<Phase>,
    completed_cycles: u32,
}

impl SessionStateMachine {
    pub fn new(policy: SessionPolicy) -> Self {
        Self {
            policy,
            phase: Phase::Idle,
            work_duration_secs: 0,
            rest_duration_secs: 0,
            countdown: None,
            remaining_secs: 0,
            resume_phase: None,
            completed_cycles: 0,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn policy(&self) -> &SessionPolicy {
        &self.policy
    }

    pub fn resume_phase(&self) -> Option<Phase> {
        self.resume_phase
    }

    pub fn work_duration_secs(&self) -> u64 {
        self.work_duration_secs
    }

    pub fn rest_duration_secs(&self) -> u64 {
        self.rest_duration_secs
    }

    pub fn enforcement(&self) -> EnforcementProfile {
        EnforcementProfile::for_phase(self.phase, self.policy.hard_mode)
    }

    /// Countdown as of `now`, without mutating anything.
    pub fn remaining_secs(&self, now: Instant) -> u64 {
        match (self.phase, self.countdown) {
            (Phase::Idle, _) | (_, None) => 0,
            (_, Some(countdown)) => countdown.remaining_secs(now),
        }
    }

    pub fn status(&self, now: Instant) -> SessionStatus {
        let resume_phase = match self.phase {
            Phase::Paused => self.countdown.map(|c| c.phase),
            Phase::NightLock => self.resume_phase,
            _ => None,
        };
        SessionStatus {
            phase: self.phase,
            remaining_seconds: self.remaining_secs(now),
            resume_phase,
            completed_cycles: self.completed_cycles,
            degraded: Vec::new(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Begin a new work/rest cycle.
    pub fn start(&mut self, work_minutes: u32, rest_minutes: u32, now: Now) -> Result<Transition> {
        if !matches!(self.phase, Phase::Idle | Phase::Paused) {
            return Err(self.invalid("start"));
        }
        let (work, rest) = self.policy.durations(work_minutes, rest_minutes)?;

        let from = self.phase;
        self.work_duration_secs = work;
        self.rest_duration_secs = rest;
        self.resume_phase = None;
        self.completed_cycles = 0;

        let mut transition = Transition::new(from, Phase::Working);
        self.enter_counting(Phase::Working, now, &mut transition);
        tracing::info!(work_secs = work, rest_secs = rest, "session started");
        Ok(transition)
    }

    /// Recompute the countdown and switch phase when it reaches zero.
    pub fn tick(&mut self, now: Now) -> Option<Transition> {
        if !self.phase.is_counting() {
            return None;
        }
        let countdown = self.countdown?;
        self.remaining_secs = countdown.remaining_secs(now.monotonic);
        tracing::trace!(phase = %self.phase, remaining = self.remaining_secs, "tick");
        if self.remaining_secs > 0 {
            return None;
        }

        let finished = self.phase;
        let next = match finished {
            Phase::Working => {
                self.completed_cycles = self.completed_cycles.saturating_add(1);
                Phase::Resting
            }
            _ => Phase::Working,
        };
        let mut transition = Transition::new(finished, next);
        transition.events.push(Event::PhaseCompleted {
            phase: finished,
            at: now.wall,
        });
        self.enter_counting(next, now, &mut transition);
        tracing::info!(from = %finished, to = %next, cycles = self.completed_cycles, "phase completed");
        Some(transition)
    }

    pub fn pause(&mut self, now: Now) -> Result<Transition> {
        if !self.phase.is_counting() {
            return Err(self.invalid("pause"));
        }
        Ok(self.suspend_to_paused(now))
    }

    pub fn resume(&mut self, now: Now) -> Result<Transition> {
        if self.phase != Phase::Paused {
            return Err(self.invalid("resume"));
        }
        let Some(mut countdown) = self.countdown else {
            return Err(self.invalid("resume"));
        };
        countdown.resume(now.monotonic);
        self.countdown = Some(countdown);
        self.phase = countdown.phase;
        self.remaining_secs = countdown.remaining_secs(now.monotonic);

        let mut transition = Transition::new(Phase::Paused, countdown.phase);
        transition.commands = self.entry_commands(countdown.phase);
        transition.events.push(Event::Resumed {
            phase: countdown.phase,
            remaining_secs: self.remaining_secs,
            at: now.wall,
        });
        tracing::info!(phase = %countdown.phase, remaining = self.remaining_secs, "session resumed");
        Ok(transition)
    }

    /// End the session. A no-op from `Idle`.
    ///
    /// During a night lock the lock stays in force; only the session behind
    /// it is discarded, so the lock exits to `Idle`.
    pub fn stop(&mut self, now: Now) -> Option<Transition> {
        match self.phase {
            Phase::Idle => None,
            Phase::NightLock => {
                let from = self.resume_phase.unwrap_or(Phase::Idle);
                if from == Phase::Idle {
                    return None;
                }
                self.clear_session();
                self.resume_phase = Some(Phase::Idle);
                let mut transition = Transition::new(Phase::NightLock, Phase::NightLock);
                transition.events.push(Event::Stopped { from, at: now.wall });
                tracing::info!("session stopped behind night lock");
                Some(transition)
            }
            from => {
                self.clear_session();
                self.phase = Phase::Idle;
                let mut transition = Transition::new(from, Phase::Idle);
                transition.commands = Command::release();
                transition.events.push(Event::Stopped { from, at: now.wall });
                tracing::info!(from = %from, "session stopped");
                Some(transition)
            }
        }
    }

    /// Suspend whatever is active and force rest. `None` if already locked.
    pub fn enter_night_lock(&mut self, now: Now) -> Option<Transition> {
        if self.phase == Phase::NightLock {
            return None;
        }
        let prior = self.phase;
        if let Some(countdown) = self.countdown.as_mut() {
            countdown.suspend(now.monotonic);
            self.remaining_secs = countdown.remaining_secs(now.monotonic);
        }
        self.resume_phase = Some(prior);
        self.phase = Phase::NightLock;

        let mut transition = Transition::new(prior, Phase::NightLock);
        transition.commands = self.entry_commands(Phase::NightLock);
        transition.events.push(Event::NightLockEntered {
            resume_phase: prior,
            at: now.wall,
        });
        tracing::info!(resume_phase = %prior, "night lock entered");
        Some(transition)
    }

    /// Lift the night lock and restore `resume_phase`. `None` if not locked.
    pub fn exit_night_lock(&mut self, now: Now) -> Option<Transition> {
        if self.phase != Phase::NightLock {
            return None;
        }
        let restored = self.resume_phase.take().unwrap_or(Phase::Idle);
        let mut transition = Transition::new(Phase::NightLock, restored);
        transition.commands = Command::release();
        transition.events.push(Event::NightLockExited {
            restored,
            at: now.wall,
        });

        if restored.is_counting() {
            if let Some(countdown) = self.countdown.as_mut() {
                countdown.resume(now.monotonic);
                self.remaining_secs = countdown.remaining_secs(now.monotonic);
            }
            let entry = self.entry_commands(restored);
            if entry != transition.commands {
                transition.commands.extend(entry);
            }
            transition.events.push(Event::Resumed {
                phase: restored,
                remaining_secs: self.remaining_secs,
                at: now.wall,
            });
        } else if restored == Phase::Idle {
            self.clear_session();
        }
        self.phase = restored;
        tracing::info!(restored = %restored, "night lock exited");
        Some(transition)
    }

    /// A blocked tool was found. Enforcement is withdrawn and the detection
    /// is always surfaced, even when no state change results.
    ///
    /// Takes precedence over a phase completion due at the same instant:
    /// the countdown is frozen where it stands (possibly at zero) instead of
    /// rolling into the next phase.
    pub fn report_tamper(&mut self, tools: Vec<String>, now: Now) -> Transition {
        let detected = Event::TamperDetected {
            tools: tools.clone(),
            phase: self.phase,
            at: now.wall,
        };
        tracing::warn!(phase = %self.phase, ?tools, "tamper detected");

        match self.phase {
            Phase::Working | Phase::Resting => {
                let mut transition = self.suspend_to_paused(now);
                transition.events.insert(0, detected);
                transition
            }
            Phase::NightLock => {
                // The lock holds; the session behind it comes back paused.
                if matches!(self.resume_phase, Some(Phase::Working | Phase::Resting)) {
                    self.resume_phase = Some(Phase::Paused);
                }
                let mut transition = Transition::new(Phase::NightLock, Phase::NightLock);
                transition.events.push(detected);
                transition
            }
            phase => {
                let mut transition = Transition::new(phase, phase);
                transition.events.push(detected);
                transition
            }
        }
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn invalid(&self, operation: &'static str) -> CoreError {
        CoreError::InvalidTransition {
            operation,
            phase: self.phase,
        }
    }

    fn duration_of(&self, phase: Phase) -> u64 {
        match phase {
            Phase::Working => self.work_duration_secs,
            Phase::Resting => self.rest_duration_secs,
            _ => 0,
        }
    }

    fn overlay_message(&self, phase: Phase) -> &str {
        match phase {
            Phase::NightLock => &self.policy.night_message,
            _ => self.policy.break_message(self.completed_cycles.saturating_sub(1)),
        }
    }

    fn entry_commands(&self, phase: Phase) -> Vec<Command> {
        EnforcementProfile::for_phase(phase, self.policy.hard_mode)
            .commands(self.overlay_message(phase))
    }

    fn enter_counting(&mut self, phase: Phase, now: Now, transition: &mut Transition) {
        let duration = self.duration_of(phase);
        self.countdown = Some(Countdown::begin(phase, duration, now.monotonic));
        self.remaining_secs = duration;
        self.phase = phase;
        transition.commands.extend(self.entry_commands(phase));
        transition.events.push(Event::PhaseStarted {
            phase,
            duration_secs: duration,
            at: now.wall,
        });
    }

    fn suspend_to_paused(&mut self, now: Now) -> Transition {
        let from = self.phase;
        if let Some(countdown) = self.countdown.as_mut() {
            countdown.suspend(now.monotonic);
            self.remaining_secs = countdown.remaining_secs(now.monotonic);
        }
        self.phase = Phase::Paused;

        let mut transition = Transition::new(from, Phase::Paused);
        transition.commands = Command::release();
        transition.events.push(Event::Paused {
            from,
            remaining_secs: self.remaining_secs,
            at: now.wall,
        });
        tracing::info!(from = %from, remaining = self.remaining_secs, "session paused");
        transition
    }

    fn clear_session(&mut self) {
        self.countdown = None;
        self.remaining_secs = 0;
        self.resume_phase = None;
        self.completed_cycles = 0;
        self.work_duration_secs = 0;
        self.rest_duration_secs = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::policy::DurationBounds;
    use chrono::{TimeZone, Utc};

    fn origin() -> Now {
        Now {
            monotonic: Instant::now(),
            wall: Utc.with_ymd_and_hms(2026, 5, 4, 9, 0, 0).unwrap(),
        }
    }

    fn at(base: Now, secs: u64) -> Now {
        base.after(Duration::from_secs(secs))
    }

    fn short_policy() -> SessionPolicy {
        SessionPolicy {
            work_bounds: DurationBounds::new(1, 120),
            rest_bounds: DurationBounds::new(1, 10),
            ..SessionPolicy::default()
        }
    }

    #[test]
    fn start_sets_working_with_full_duration() {
        let t0 = origin();
        let mut m = SessionStateMachine::new(SessionPolicy::default());
        let tr = m.start(25, 5, t0).unwrap();
        assert_eq!(tr.to, Phase::Working);
        assert_eq!(
            tr.commands,
            vec![Command::UnblockInput, Command::UnmuteAudio, Command::HideOverlay]
        );
        let status = m.status(t0.monotonic);
        assert_eq!(status.phase, Phase::Working);
        assert_eq!(status.remaining_seconds, 1500);
    }

    #[test]
    fn start_rejected_while_running() {
        let t0 = origin();
        let mut m = SessionStateMachine::new(SessionPolicy::default());
        m.start(25, 5, t0).unwrap();
        let err = m.start(30, 5, at(t0, 10)).unwrap_err();
        assert!(matches!(
            err,
            CoreError::InvalidTransition { operation: "start", phase: Phase::Working }
        ));
        assert_eq!(m.work_duration_secs(), 1500);
    }

    #[test]
    fn invalid_config_leaves_state_untouched() {
        let t0 = origin();
        let mut m = SessionStateMachine::new(SessionPolicy::default());
        assert!(matches!(m.start(0, 5, t0), Err(CoreError::InvalidConfig { .. })));
        assert_eq!(m.phase(), Phase::Idle);
        assert_eq!(m.remaining_secs(t0.monotonic), 0);
    }

    #[test]
    fn tick_is_noop_outside_counting_phases() {
        let t0 = origin();
        let mut m = SessionStateMachine::new(short_policy());
        assert!(m.tick(at(t0, 5000)).is_none());
        m.start(1, 1, t0).unwrap();
        m.pause(at(t0, 10)).unwrap();
        assert!(m.tick(at(t0, 5000)).is_none());
        assert_eq!(m.phase(), Phase::Paused);
    }

    #[test]
    fn work_rolls_into_rest_and_back() {
        let t0 = origin();
        let mut m = SessionStateMachine::new(short_policy());
        m.start(1, 1, t0).unwrap();

        assert!(m.tick(at(t0, 59)).is_none());
        let tr = m.tick(at(t0, 61)).unwrap();
        assert_eq!((tr.from, tr.to), (Phase::Working, Phase::Resting));
        assert_eq!(m.status(at(t0, 61).monotonic).remaining_seconds, 60);
        assert!(tr
            .commands
            .iter()
            .any(|c| matches!(c, Command::ShowOverlay(_))));

        let tr = m.tick(at(t0, 122)).unwrap();
        assert_eq!((tr.from, tr.to), (Phase::Resting, Phase::Working));
        assert_eq!(m.status(at(t0, 122).monotonic).completed_cycles, 1);
    }

    #[test]
    fn rest_overlay_rotates_break_messages() {
        let t0 = origin();
        let policy = SessionPolicy {
            break_activities: vec!["walk".into(), "stretch".into()],
            ..short_policy()
        };
        let mut m = SessionStateMachine::new(policy);
        m.start(1, 1, t0).unwrap();
        let first = m.tick(at(t0, 60)).unwrap();
        m.tick(at(t0, 120)).unwrap();
        let second = m.tick(at(t0, 180)).unwrap();
        assert!(first.commands.contains(&Command::ShowOverlay("walk".into())));
        assert!(second.commands.contains(&Command::ShowOverlay("stretch".into())));
    }

    #[test]
    fn pause_twice_matches_pause_once() {
        let t0 = origin();
        let mut m = SessionStateMachine::new(SessionPolicy::default());
        m.start(25, 5, t0).unwrap();
        m.pause(at(t0, 100)).unwrap();
        let once = m.status(at(t0, 100).monotonic);
        assert!(m.pause(at(t0, 150)).is_err());
        assert_eq!(m.status(at(t0, 150).monotonic), once);
    }

    #[test]
    fn pause_resume_preserves_remaining() {
        let t0 = origin();
        let mut m = SessionStateMachine::new(SessionPolicy::default());
        m.start(25, 5, t0).unwrap();
        let tr = m.pause(at(t0, 300)).unwrap();
        assert_eq!(tr.commands, Command::release());
        let before = m.status(at(t0, 300).monotonic).remaining_seconds;
        assert_eq!(before, 1200);

        let tr = m.resume(at(t0, 300 + 3600)).unwrap();
        assert_eq!(tr.to, Phase::Working);
        assert_eq!(m.status(at(t0, 3900).monotonic).remaining_seconds, before);
        assert_eq!(m.status(at(t0, 3910).monotonic).remaining_seconds, before - 10);
    }

    #[test]
    fn resume_requires_paused() {
        let t0 = origin();
        let mut m = SessionStateMachine::new(SessionPolicy::default());
        assert!(matches!(
            m.resume(t0),
            Err(CoreError::InvalidTransition { operation: "resume", phase: Phase::Idle })
        ));
    }

    #[test]
    fn resume_reapplies_rest_entry_effects() {
        let t0 = origin();
        let policy = SessionPolicy {
            hard_mode: true,
            ..short_policy()
        };
        let mut m = SessionStateMachine::new(policy);
        m.start(1, 1, t0).unwrap();
        m.tick(at(t0, 60)).unwrap();
        m.pause(at(t0, 70)).unwrap();
        let tr = m.resume(at(t0, 80)).unwrap();
        assert_eq!(tr.to, Phase::Resting);
        assert_eq!(tr.commands[0], Command::BlockInput);
        assert_eq!(tr.commands[1], Command::MuteAudio);
    }

    #[test]
    fn stop_is_idempotent() {
        let t0 = origin();
        let mut m = SessionStateMachine::new(SessionPolicy::default());
        assert!(m.stop(t0).is_none());
        m.start(25, 5, t0).unwrap();
        let tr = m.stop(at(t0, 5)).unwrap();
        assert_eq!(tr.commands, Command::release());
        assert_eq!(m.status(at(t0, 5).monotonic), SessionStatus::idle());
        assert!(m.stop(at(t0, 6)).is_none());
    }

    #[test]
    fn start_allowed_again_from_paused() {
        let t0 = origin();
        let mut m = SessionStateMachine::new(SessionPolicy::default());
        m.start(25, 5, t0).unwrap();
        m.pause(at(t0, 30)).unwrap();
        m.start(45, 10, at(t0, 40)).unwrap();
        assert_eq!(m.status(at(t0, 40).monotonic).remaining_seconds, 2700);
    }

    #[test]
    fn night_lock_suspends_and_restores_working() {
        let t0 = origin();
        let mut m = SessionStateMachine::new(SessionPolicy::default());
        m.start(25, 5, t0).unwrap();
        let tr = m.enter_night_lock(at(t0, 500)).unwrap();
        assert_eq!(
            tr.commands[..2],
            [Command::BlockInput, Command::MuteAudio]
        );
        assert_eq!(m.status(at(t0, 500).monotonic).resume_phase, Some(Phase::Working));
        assert!(m.enter_night_lock(at(t0, 530)).is_none());
        assert!(m.tick(at(t0, 5000)).is_none());

        let tr = m.exit_night_lock(at(t0, 20_000)).unwrap();
        assert_eq!(tr.to, Phase::Working);
        assert_eq!(tr.commands, Command::release());
        assert_eq!(m.status(at(t0, 20_000).monotonic).remaining_seconds, 1000);
    }

    #[test]
    fn night_lock_from_idle_restores_idle() {
        let t0 = origin();
        let mut m = SessionStateMachine::new(SessionPolicy::default());
        let tr = m.enter_night_lock(t0).unwrap();
        assert_eq!(tr.from, Phase::Idle);
        let tr = m.exit_night_lock(at(t0, 60)).unwrap();
        assert_eq!(tr.to, Phase::Idle);
        assert_eq!(tr.commands, Command::release());
        assert!(m.exit_night_lock(at(t0, 61)).is_none());
    }

    #[test]
    fn night_lock_exit_into_rest_reblocks() {
        let t0 = origin();
        let mut m = SessionStateMachine::new(short_policy());
        m.start(1, 5, t0).unwrap();
        m.tick(at(t0, 60)).unwrap();
        m.enter_night_lock(at(t0, 90)).unwrap();
        let tr = m.exit_night_lock(at(t0, 1000)).unwrap();
        assert_eq!(tr.to, Phase::Resting);
        assert_eq!(&tr.commands[..3], Command::release().as_slice());
        assert!(tr.commands[3..].contains(&Command::MuteAudio));
        assert_eq!(m.status(at(t0, 1000).monotonic).remaining_seconds, 270);
    }

    #[test]
    fn stop_during_night_lock_keeps_lock() {
        let t0 = origin();
        let mut m = SessionStateMachine::new(SessionPolicy::default());
        m.start(25, 5, t0).unwrap();
        m.enter_night_lock(at(t0, 10)).unwrap();
        let tr = m.stop(at(t0, 20)).unwrap();
        assert!(tr.commands.is_empty());
        assert_eq!(m.phase(), Phase::NightLock);
        assert!(m.stop(at(t0, 30)).is_none());
        let tr = m.exit_night_lock(at(t0, 40)).unwrap();
        assert_eq!(tr.to, Phase::Idle);
    }

    #[test]
    fn tamper_forces_pause_and_surfaces_event() {
        let t0 = origin();
        let mut m = SessionStateMachine::new(SessionPolicy::default());
        m.start(25, 5, t0).unwrap();
        let tr = m.report_tamper(vec!["taskmgr.exe".into()], at(t0, 42));
        assert!(tr.is_tamper());
        assert_eq!(tr.to, Phase::Paused);
        assert_eq!(tr.commands, Command::release());
        assert!(matches!(tr.events[0], Event::TamperDetected { .. }));
        assert!(matches!(tr.events[1], Event::Paused { from: Phase::Working, .. }));
    }

    #[test]
    fn tamper_beats_simultaneous_completion() {
        let t0 = origin();
        let mut m = SessionStateMachine::new(short_policy());
        m.start(1, 1, t0).unwrap();
        let instant = at(t0, 60);
        m.report_tamper(vec!["procexp.exe".into()], instant);
        assert!(m.tick(instant).is_none());
        let status = m.status(instant.monotonic);
        assert_eq!(status.phase, Phase::Paused);
        assert_eq!(status.resume_phase, Some(Phase::Working));
        assert_eq!(status.remaining_seconds, 0);
    }

    #[test]
    fn tamper_during_night_lock_holds_lock_and_pauses_session() {
        let t0 = origin();
        let mut m = SessionStateMachine::new(SessionPolicy::default());
        m.start(25, 5, t0).unwrap();
        m.enter_night_lock(at(t0, 60)).unwrap();
        let tr = m.report_tamper(vec!["taskmgr.exe".into()], at(t0, 70));
        assert!(tr.is_tamper());
        assert!(tr.commands.is_empty());
        assert_eq!(m.phase(), Phase::NightLock);
        let tr = m.exit_night_lock(at(t0, 80)).unwrap();
        assert_eq!(tr.to, Phase::Paused);
        assert_eq!(m.status(at(t0, 80).monotonic).remaining_seconds, 1440);
        m.resume(at(t0, 90)).unwrap();
        assert_eq!(m.phase(), Phase::Working);
    }

    #[test]
    fn tamper_while_idle_changes_nothing_but_is_reported() {
        let t0 = origin();
        let mut m = SessionStateMachine::new(SessionPolicy::default());
        let tr = m.report_tamper(vec!["taskmgr.exe".into()], t0);
        assert!(tr.is_tamper());
        assert_eq!(tr.to, Phase::Idle);
        assert_eq!(m.phase(), Phase::Idle);
    }

    #[test]
    fn long_gap_between_ticks_switches_once() {
        let t0 = origin();
        let mut m = SessionStateMachine::new(short_policy());
        m.start(1, 1, t0).unwrap();
        let tr = m.tick(at(t0, 10_000)).unwrap();
        assert_eq!(tr.to, Phase::Resting);
        assert_eq!(m.status(at(t0, 10_000).monotonic).remaining_seconds, 60);
    }
}
