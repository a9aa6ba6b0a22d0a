//! Serialized transition API over the state machine.
//!
//! Every caller (command surface, tick loop, night guard, watchdog) goes
//! through [`SessionController`]. A transition is computed under the state
//! lock, which is released before any port call. Each transition draws a
//! ticket while it still holds the state lock, and commands are applied
//! strictly in ticket order, so enforcement never runs out of sequence even
//! though the port is called outside the lock.

use std::collections::BTreeSet;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use tokio::sync::broadcast;

use crate::clock::{Now, TimeSource};
use crate::enforcement::{Capabilities, Capability, Command, EnforcementPort, EnforcementProfile};
use crate::error::Result;
use crate::events::Event;

use super::machine::{SessionStateMachine, Transition};
use super::phase::SessionStatus;
use super::policy::SessionPolicy;

const EVENT_CAPACITY: usize = 256;

struct Guarded {
    machine: SessionStateMachine,
    next_ticket: u64,
}

/// Hands out apply turns in the order tickets were drawn.
#[derive(Default)]
struct Sequencer {
    serving: Mutex<u64>,
    turn: Condvar,
}

impl Sequencer {
    fn wait_for(&self, ticket: u64) -> Turn<'_> {
        let mut serving = self.serving.lock().unwrap_or_else(PoisonError::into_inner);
        while *serving != ticket {
            serving = self
                .turn
                .wait(serving)
                .unwrap_or_else(PoisonError::into_inner);
        }
        Turn {
            sequencer: self,
            serving: Some(serving),
        }
    }
}

/// The current apply turn. Dropping it hands over to the next ticket, also
/// when a port call unwinds.
struct Turn<'a> {
    sequencer: &'a Sequencer,
    serving: Option<MutexGuard<'a, u64>>,
}

impl Drop for Turn<'_> {
    fn drop(&mut self) {
        if let Some(mut serving) = self.serving.take() {
            *serving += 1;
            drop(serving);
        }
        self.sequencer.turn.notify_all();
    }
}

pub struct SessionController {
    state: Mutex<Guarded>,
    sequencer: Sequencer,
    port: Arc<dyn EnforcementPort>,
    clock: Arc<dyn TimeSource>,
    capabilities: Capabilities,
    /// Capabilities that failed at runtime.
    failed: Mutex<BTreeSet<Capability>>,
    /// Missing capabilities already announced with an event.
    announced: Mutex<BTreeSet<Capability>>,
    events: broadcast::Sender<Event>,
}

impl SessionController {
    pub fn new(
        port: Arc<dyn EnforcementPort>,
        clock: Arc<dyn TimeSource>,
        policy: SessionPolicy,
    ) -> Self {
        let capabilities = port.capabilities();
        for capability in capabilities.missing() {
            tracing::warn!(%capability, "capability unavailable on this host, running without it");
        }
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            state: Mutex::new(Guarded {
                machine: SessionStateMachine::new(policy),
                next_ticket: 0,
            }),
            sequencer: Sequencer::default(),
            port,
            clock,
            capabilities,
            failed: Mutex::new(BTreeSet::new()),
            announced: Mutex::new(BTreeSet::new()),
            events,
        }
    }

    // ── Command surface ──────────────────────────────────────────────

    pub fn start(&self, work_minutes: u32, rest_minutes: u32) -> Result<SessionStatus> {
        self.transact(|m, now| m.start(work_minutes, rest_minutes, now).map(Some))?;
        Ok(self.get_status())
    }

    pub fn pause(&self) -> Result<SessionStatus> {
        self.transact(|m, now| m.pause(now).map(Some))?;
        Ok(self.get_status())
    }

    pub fn resume(&self) -> Result<SessionStatus> {
        self.transact(|m, now| m.resume(now).map(Some))?;
        Ok(self.get_status())
    }

    /// Always succeeds; a no-op from `Idle`.
    pub fn stop(&self) -> SessionStatus {
        self.transact_infallible(|m, now| m.stop(now));
        self.get_status()
    }

    pub fn get_status(&self) -> SessionStatus {
        let mut status = {
            let guard = self.lock_state();
            guard.machine.status(self.clock.now_monotonic())
        };
        status.degraded = self.degraded();
        status
    }

    // ── Observer surface ─────────────────────────────────────────────

    /// Drive the countdown. Returns the events of a phase switch, if any.
    pub fn tick(&self) -> Vec<Event> {
        self.transact_infallible(|m, now| m.tick(now))
    }

    pub fn enter_night_lock(&self) -> Vec<Event> {
        self.transact_infallible(|m, now| m.enter_night_lock(now))
    }

    pub fn exit_night_lock(&self) -> Vec<Event> {
        self.transact_infallible(|m, now| m.exit_night_lock(now))
    }

    /// Withdraw enforcement after a detection. The returned events always
    /// include `TamperDetected`.
    pub fn report_tamper(&self, tools: Vec<String>) -> Vec<Event> {
        self.transact_infallible(|m, now| Some(m.report_tamper(tools, now)))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    /// Enforcement profile of the current phase.
    pub fn enforcement(&self) -> EnforcementProfile {
        self.lock_state().machine.enforcement()
    }

    pub fn port(&self) -> &Arc<dyn EnforcementPort> {
        &self.port
    }

    pub fn clock(&self) -> &Arc<dyn TimeSource> {
        &self.clock
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// Missing at startup plus failed since.
    pub fn degraded(&self) -> Vec<Capability> {
        let failed = self.failed.lock().unwrap_or_else(PoisonError::into_inner);
        let mut all: BTreeSet<Capability> = self.capabilities.missing().into_iter().collect();
        all.extend(failed.iter().copied());
        all.into_iter().collect()
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn lock_state(&self) -> MutexGuard<'_, Guarded> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn transact_infallible<F>(&self, op: F) -> Vec<Event>
    where
        F: FnOnce(&mut SessionStateMachine, Now) -> Option<Transition>,
    {
        match self.transact(|m, now| Ok(op(m, now))) {
            Ok(events) => events,
            Err(_) => Vec::new(),
        }
    }

    fn transact<F>(&self, op: F) -> Result<Vec<Event>>
    where
        F: FnOnce(&mut SessionStateMachine, Now) -> Result<Option<Transition>>,
    {
        let (transition, ticket, now) = {
            let mut guard = self.lock_state();
            let now = Now::read(self.clock.as_ref());
            let Some(transition) = op(&mut guard.machine, now)? else {
                return Ok(Vec::new());
            };
            let ticket = guard.next_ticket;
            guard.next_ticket += 1;
            (transition, ticket, now)
        };

        let mut events = transition.events;
        {
            let _turn = self.sequencer.wait_for(ticket);
            events.extend(self.apply(&transition.commands, now));
        }

        for event in &events {
            // No subscribers is fine.
            let _ = self.events.send(event.clone());
        }
        Ok(events)
    }

    /// Issue commands; failures degrade the capability instead of aborting.
    fn apply(&self, commands: &[Command], now: Now) -> Vec<Event> {
        let mut events = Vec::new();
        for command in commands {
            let capability = command.capability();
            if !self.capabilities.has(capability) {
                tracing::debug!(?command, %capability, "skipped, capability unavailable");
                let first = self
                    .announced
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert(capability);
                if first {
                    events.push(Event::EnforcementUnavailable {
                        capability,
                        reason: "not supported on this host".into(),
                        at: now.wall,
                    });
                }
                continue;
            }
            match command.apply(self.port.as_ref()) {
                Ok(()) => {
                    let mut failed = self.failed.lock().unwrap_or_else(PoisonError::into_inner);
                    if failed.remove(&capability) {
                        tracing::info!(%capability, "capability recovered");
                    }
                }
                Err(err) => {
                    tracing::warn!(?command, %capability, error = %err, "enforcement call failed");
                    let newly = self
                        .failed
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .insert(capability);
                    if newly {
                        events.push(Event::EnforcementUnavailable {
                            capability,
                            reason: err.to_string(),
                            at: now.wall,
                        });
                    }
                }
            }
        }
        events
    }
}
