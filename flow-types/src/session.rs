//! Shared session record.
//!
//! A [`GroupSession`] is the single shared source of truth while a group
//! session is active. It is always written as a whole record; `version`
//! is the only arbitration field.

use serde::{Deserialize, Serialize};

use crate::ids::{MemberId, RoomCode, Timestamp};
use crate::settings::{TimerPhase, TimerSettings};

/// Timer runtime fields as carried in a shared record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerSnapshot {
    /// Current phase.
    pub phase: TimerPhase,
    /// Seconds remaining as of the last write.
    pub seconds_remaining: u32,
    /// Whether the countdown is running.
    pub running: bool,
    /// Focus phases completed since the last reset.
    pub completed_cycles: u32,
    /// Absolute end of the current phase. Present iff `running`.
    #[serde(default)]
    pub deadline: Option<Timestamp>,
    /// Settings in effect.
    pub settings: TimerSettings,
}

impl TimerSnapshot {
    /// A stopped timer at the start of a focus phase.
    pub fn idle(settings: TimerSettings) -> Self {
        Self {
            phase: TimerPhase::Focus,
            seconds_remaining: settings.focus_secs(),
            running: false,
            completed_cycles: 0,
            deadline: None,
            settings,
        }
    }
}

/// One participant of a group session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMember {
    /// Process-unique member id.
    pub id: MemberId,
    /// Display name.
    pub name: String,
    /// Whether this member created the session.
    pub is_host: bool,
    /// Last time this member was seen by the store.
    pub last_seen: Timestamp,
}

impl GroupMember {
    /// Create a member with a fresh id.
    pub fn new(name: &str, is_host: bool, now: Timestamp) -> Self {
        Self {
            id: MemberId::new(),
            name: name.to_string(),
            is_host,
            last_seen: now,
        }
    }
}

/// The shared session record, keyed by room code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSession {
    /// Room code (store key).
    pub id: RoomCode,
    /// The member allowed to mutate timer fields.
    pub host_id: MemberId,
    /// Timer runtime fields.
    pub timer: TimerSnapshot,
    /// Members in join order, unique by id.
    pub members: Vec<GroupMember>,
    /// Monotonic write timestamp.
    pub version: Timestamp,
}

impl GroupSession {
    /// Create a session with `host` as its sole member.
    pub fn new(id: RoomCode, host: GroupMember, timer: TimerSnapshot, now: Timestamp) -> Self {
        Self {
            id,
            host_id: host.id,
            timer,
            members: vec![host],
            version: now,
        }
    }

    /// Look up a member by id.
    pub fn member(&self, id: &MemberId) -> Option<&GroupMember> {
        self.members.iter().find(|m| m.id == *id)
    }

    /// Whether `id` is listed as a member.
    pub fn has_member(&self, id: &MemberId) -> bool {
        self.member(id).is_some()
    }

    /// Append a member, replacing any existing entry with the same id.
    pub fn add_member(&mut self, member: GroupMember) {
        if let Some(existing) = self.members.iter_mut().find(|m| m.id == member.id) {
            *existing = member;
        } else {
            self.members.push(member);
        }
    }

    /// Remove a member. Returns whether it was present.
    pub fn remove_member(&mut self, id: &MemberId) -> bool {
        let before = self.members.len();
        self.members.retain(|m| m.id != *id);
        self.members.len() != before
    }

    /// Advance `version` to `now`, or one past the current version if the
    /// clock has not moved forward.
    pub fn bump_version(&mut self, now: Timestamp) {
        self.version = now.max(self.version.next());
    }

    /// Merge a partial timer update into this record. Does not touch `version`.
    pub fn apply(&mut self, patch: &SessionPatch) {
        let timer = &mut self.timer;
        if let Some(phase) = patch.phase {
            timer.phase = phase;
        }
        if let Some(secs) = patch.seconds_remaining {
            timer.seconds_remaining = secs;
        }
        if let Some(running) = patch.running {
            timer.running = running;
            if !running {
                timer.deadline = None;
            }
        }
        if let Some(cycles) = patch.completed_cycles {
            timer.completed_cycles = cycles;
        }
        if let Some(deadline) = patch.deadline {
            timer.deadline = deadline;
        }
        if let Some(settings) = patch.settings {
            timer.settings = settings;
        }
    }
}

/// Partial update of a record's timer fields, pushed by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionPatch {
    /// New phase.
    pub phase: Option<TimerPhase>,
    /// New remaining seconds.
    pub seconds_remaining: Option<u32>,
    /// New running flag. `Some(false)` also clears the deadline.
    pub running: Option<bool>,
    /// New cycle count.
    pub completed_cycles: Option<u32>,
    /// New deadline; `Some(None)` clears it.
    pub deadline: Option<Option<Timestamp>>,
    /// New settings.
    pub settings: Option<TimerSettings>,
}

impl SessionPatch {
    /// A patch that overwrites every timer field with `snapshot`.
    pub fn from_snapshot(snapshot: &TimerSnapshot) -> Self {
        Self {
            phase: Some(snapshot.phase),
            seconds_remaining: Some(snapshot.seconds_remaining),
            running: Some(snapshot.running),
            completed_cycles: Some(snapshot.completed_cycles),
            deadline: Some(snapshot.deadline),
            settings: Some(snapshot.settings),
        }
    }
}
