//! # flow-core
//!
//! Pure logic for the flowsync group timer (no I/O, instant tests).
//!
//! This crate implements the timer and session-role state machines and the
//! schedule evaluator without any network or disk I/O.
//!
//! ## Design Philosophy
//!
//! All modules in this crate are **pure** - they take input and produce output
//! without side effects. Time arrives as an argument read from a [`Clock`],
//! and side effects leave as values ([`TimerEffect`], [`RoleAction`]).
//!
//! The actual I/O (session store, notifications, the poll loop) is performed
//! by `flow-client`, which interprets those values.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod clock;
pub mod role;
pub mod schedule;
pub mod timer;

pub use clock::{Clock, ManualClock, SystemClock};
pub use role::{Role, RoleAction, RoleEvent, RoleState, SessionNotice, TerminationReason};
pub use schedule::{FiredSet, ScheduleError, ScheduleEvaluator, ScheduleRule, ScheduleTrigger};
pub use timer::{TimerEffect, TimerError, TimerMachine, TimerRuntimeState};
