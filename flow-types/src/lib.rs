//! # flow-types
//!
//! Shared record types for the flowsync group timer.
//!
//! This crate provides the foundational types used across all flowsync crates:
//! - [`MemberId`], [`RoomCode`], [`Timestamp`] - Identity and ordering types
//! - [`TimerSettings`], [`SettingsPatch`], [`TimerPhase`] - Timer configuration
//! - [`GroupSession`], [`GroupMember`], [`TimerSnapshot`], [`SessionPatch`] - The shared session record
//! - [`TypesError`] - Error types

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod ids;
mod session;
mod settings;

pub use error::TypesError;
pub use ids::{MemberId, RoomCode, Timestamp, ROOM_CODE_LEN};
pub use session::{GroupMember, GroupSession, SessionPatch, TimerSnapshot};
pub use settings::{SettingsPatch, TimerPhase, TimerSettings};
