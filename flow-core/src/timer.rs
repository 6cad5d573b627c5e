//! Focus/break timer state machine.
//!
//! Remaining time is never decremented. While running, the machine holds an
//! absolute deadline and every [`TimerMachine::tick`] recomputes
//! `seconds_remaining` from it, so a process that was suspended for an
//! arbitrary interval catches up on its next tick.
//!
//! Operations return [`TimerEffect`]s instead of performing side effects.
//! The caller (flow-client) turns them into notifications, history entries
//! and store writes.

use flow_types::{SettingsPatch, TimerPhase, TimerSettings, TimerSnapshot, Timestamp, TypesError};
use thiserror::Error;

use crate::role::Role;

/// Timer errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimerError {
    /// A follower attempted a host-only mutation.
    #[error("permission denied: only the host can control the timer")]
    PermissionDenied,

    /// The merged settings are out of range.
    #[error(transparent)]
    InvalidSettings(#[from] TypesError),
}

/// Side effects requested by a timer operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEffect {
    /// A phase ran out and the next one started. Notify and alert once.
    PhaseCompleted {
        /// Phase that ended.
        from: TimerPhase,
        /// Phase that started.
        to: TimerPhase,
        /// Whether the break involved closes a cycle.
        cycle_closing: bool,
    },
    /// Ask the history collaborator to open a new cycle.
    NewCycle,
    /// Runtime state changed; a host must publish it.
    StateChanged,
}

/// Local countdown state.
///
/// Invariant: `running` iff `deadline.is_some()`, and after a tick at `now`
/// `seconds_remaining == deadline.secs_until_rounded(now)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerRuntimeState {
    /// Current phase.
    pub phase: TimerPhase,
    /// Seconds left in the current phase.
    pub seconds_remaining: u32,
    /// Whether the countdown is running.
    pub running: bool,
    /// Focus phases completed since the last reset.
    pub completed_cycles: u32,
    /// Absolute end of the current phase.
    pub deadline: Option<Timestamp>,
}

/// A phase that ran out locally, identified the way a shared record would
/// describe it before the transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Expiry {
    phase: TimerPhase,
    completed_cycles: u32,
    deadline: Timestamp,
}

/// The timer state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerMachine {
    settings: TimerSettings,
    state: TimerRuntimeState,
    role: Role,
    last_expiry: Option<Expiry>,
}

impl TimerMachine {
    /// A stopped timer at the start of a focus phase.
    pub fn new(settings: TimerSettings) -> Self {
        Self {
            settings,
            state: TimerRuntimeState {
                phase: TimerPhase::Focus,
                seconds_remaining: settings.focus_secs(),
                running: false,
                completed_cycles: 0,
                deadline: None,
            },
            role: Role::Solo,
            last_expiry: None,
        }
    }

    /// Current runtime state.
    pub fn state(&self) -> &TimerRuntimeState {
        &self.state
    }

    /// Current settings.
    pub fn settings(&self) -> &TimerSettings {
        &self.settings
    }

    /// Role the machine gates mutations against.
    pub fn role(&self) -> Role {
        self.role
    }

    /// Set the caller's role. Called by the session synchronizer.
    pub fn set_role(&mut self, role: Role) {
        self.role = role;
    }

    /// State and settings in record form.
    pub fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot {
            phase: self.state.phase,
            seconds_remaining: self.state.seconds_remaining,
            running: self.state.running,
            completed_cycles: self.state.completed_cycles,
            deadline: self.state.deadline,
            settings: self.settings,
        }
    }

    fn check_permission(&self) -> Result<(), TimerError> {
        if self.role.can_mutate() {
            Ok(())
        } else {
            Err(TimerError::PermissionDenied)
        }
    }

    /// Start or pause the countdown.
    ///
    /// Pausing keeps the last computed `seconds_remaining`.
    pub fn toggle(&mut self, now: Timestamp) -> Result<Vec<TimerEffect>, TimerError> {
        self.check_permission()?;

        if self.state.running {
            self.state.running = false;
            self.state.deadline = None;
        } else {
            self.state.running = true;
            self.state.deadline = Some(now.add_secs(self.state.seconds_remaining));
        }
        Ok(vec![TimerEffect::StateChanged])
    }

    /// Stop and return to the start of the first focus phase.
    pub fn reset(&mut self) -> Result<Vec<TimerEffect>, TimerError> {
        self.check_permission()?;

        self.state = TimerRuntimeState {
            phase: TimerPhase::Focus,
            seconds_remaining: self.settings.focus_secs(),
            running: false,
            completed_cycles: 0,
            deadline: None,
        };
        self.last_expiry = None;
        Ok(vec![TimerEffect::NewCycle, TimerEffect::StateChanged])
    }

    /// Merge new settings.
    ///
    /// A stopped timer shows the new length of the current phase at once.
    /// A running phase keeps its deadline; the settings apply from the next
    /// phase on.
    pub fn update_settings(
        &mut self,
        patch: &SettingsPatch,
    ) -> Result<Vec<TimerEffect>, TimerError> {
        self.check_permission()?;

        let merged = self.settings.merged(patch);
        merged.validate()?;
        if merged == self.settings {
            return Ok(vec![]);
        }

        self.settings = merged;
        if !self.state.running {
            self.state.seconds_remaining = self
                .settings
                .phase_secs(self.state.phase, self.state.completed_cycles);
        }
        Ok(vec![TimerEffect::StateChanged])
    }

    /// Recompute remaining time from the deadline; fire a transition if it
    /// has run out.
    ///
    /// At most one transition fires per tick. The next phase's deadline is
    /// measured from `now`, not from the missed deadline.
    pub fn tick(&mut self, now: Timestamp) -> Vec<TimerEffect> {
        let Some(deadline) = self.state.deadline.filter(|_| self.state.running) else {
            return vec![];
        };

        self.state.seconds_remaining = deadline.secs_until_rounded(now);
        if self.state.seconds_remaining == 0 {
            self.on_expire(deadline, now)
        } else {
            vec![]
        }
    }

    fn on_expire(&mut self, deadline: Timestamp, now: Timestamp) -> Vec<TimerEffect> {
        let from = self.state.phase;
        let mut effects = Vec::with_capacity(3);
        self.last_expiry = Some(Expiry {
            phase: from,
            completed_cycles: self.state.completed_cycles,
            deadline,
        });

        let (to, duration, cycle_closing) = match from {
            TimerPhase::Focus => {
                self.state.completed_cycles = self.state.completed_cycles.saturating_add(1);
                let cycles = self.state.completed_cycles;
                (
                    TimerPhase::Break,
                    self.settings.break_secs(cycles),
                    self.settings.is_cycle_closing(cycles),
                )
            }
            TimerPhase::Break => {
                let closing = self.settings.is_cycle_closing(self.state.completed_cycles);
                if closing {
                    effects.push(TimerEffect::NewCycle);
                }
                (TimerPhase::Focus, self.settings.focus_secs(), closing)
            }
        };

        self.state.phase = to;
        self.state.seconds_remaining = duration;
        self.state.running = true;
        self.state.deadline = Some(now.add_secs(duration));

        effects.push(TimerEffect::PhaseCompleted {
            from,
            to,
            cycle_closing,
        });
        effects.push(TimerEffect::StateChanged);
        effects
    }

    /// Overwrite every field from a shared record.
    ///
    /// A running snapshot keeps its deadline when it has one; otherwise the
    /// deadline is rebuilt from `now` and the remaining seconds.
    ///
    /// A snapshot of the phase this machine already expired (same phase,
    /// cycle count and deadline) is stale: the writer has not ticked yet.
    /// Only its settings are taken, so the transition is not replayed.
    pub fn import_remote(&mut self, snapshot: &TimerSnapshot, now: Timestamp) {
        self.settings = snapshot.settings;
        if self.is_expired_snapshot(snapshot) {
            return;
        }
        let deadline = if snapshot.running {
            Some(
                snapshot
                    .deadline
                    .unwrap_or_else(|| now.add_secs(snapshot.seconds_remaining)),
            )
        } else {
            None
        };
        self.state = TimerRuntimeState {
            phase: snapshot.phase,
            seconds_remaining: match deadline {
                Some(d) => d.secs_until_rounded(now),
                None => snapshot.seconds_remaining,
            },
            running: snapshot.running,
            completed_cycles: snapshot.completed_cycles,
            deadline,
        };
    }

    fn is_expired_snapshot(&self, snapshot: &TimerSnapshot) -> bool {
        snapshot.running
            && self.last_expiry.is_some_and(|e| {
                e.phase == snapshot.phase
                    && e.completed_cycles == snapshot.completed_cycles
                    && Some(e.deadline) == snapshot.deadline
            })
    }
}
