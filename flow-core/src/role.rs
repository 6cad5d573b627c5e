//! Session role state machine.
//!
//! Pure, side-effect-free: takes an event, produces a new state plus a list
//! of actions. The client interprets the actions (starting or cancelling
//! the poll loop, delivering notices).
//!
//! ```text
//! Solo --Created--> Host
//! Solo --Joined---> Follower
//! Host|Follower --LeaveRequested--> Solo
//! Host|Follower --SessionMissing|SelfEvicted--> Solo   (with a notice)
//! ```

use flow_types::RoomCode;

/// The caller's authority over the shared timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Role {
    /// No active session; full local control.
    #[default]
    Solo,
    /// Session creator; the only writer of timer fields.
    Host,
    /// Passive member; timer state is overwritten from the shared record.
    Follower,
}

impl Role {
    /// Whether this role may start, pause, reset or reconfigure the timer.
    pub fn can_mutate(&self) -> bool {
        !matches!(self, Self::Follower)
    }
}

/// Role state, carrying the active room code.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RoleState {
    /// Not in a session.
    #[default]
    Solo,
    /// Hosting `code`.
    Host {
        /// Active room code.
        code: RoomCode,
    },
    /// Following `code`.
    Follower {
        /// Active room code.
        code: RoomCode,
    },
}

impl RoleState {
    /// The timer-gating role for this state.
    pub fn role(&self) -> Role {
        match self {
            Self::Solo => Role::Solo,
            Self::Host { .. } => Role::Host,
            Self::Follower { .. } => Role::Follower,
        }
    }

    /// Active room code, if any.
    pub fn code(&self) -> Option<&RoomCode> {
        match self {
            Self::Solo => None,
            Self::Host { code } | Self::Follower { code } => Some(code),
        }
    }

    /// Whether a session is active.
    pub fn is_active(&self) -> bool {
        !matches!(self, Self::Solo)
    }

    /// Process an event and return the new state plus actions to execute.
    ///
    /// Events that do not apply to the current state leave it unchanged and
    /// produce no actions.
    pub fn on_event(self, event: RoleEvent) -> (Self, Vec<RoleAction>) {
        match (self, event) {
            (Self::Solo, RoleEvent::Created { code }) => (
                Self::Host { code: code.clone() },
                vec![
                    RoleAction::StartPolling,
                    RoleAction::Notify(SessionNotice::Created { code }),
                ],
            ),
            (Self::Solo, RoleEvent::Joined { code }) => (
                Self::Follower { code: code.clone() },
                vec![
                    RoleAction::StartPolling,
                    RoleAction::Notify(SessionNotice::Joined { code }),
                ],
            ),

            (Self::Host { code } | Self::Follower { code }, RoleEvent::LeaveRequested) => (
                Self::Solo,
                vec![
                    RoleAction::CancelPolling,
                    RoleAction::Notify(SessionNotice::Left { code }),
                ],
            ),
            (Self::Host { code } | Self::Follower { code }, RoleEvent::SessionMissing) => (
                Self::Solo,
                vec![
                    RoleAction::CancelPolling,
                    RoleAction::Notify(SessionNotice::Terminated {
                        code,
                        reason: TerminationReason::SessionMissing,
                    }),
                ],
            ),
            (Self::Host { code } | Self::Follower { code }, RoleEvent::SelfEvicted) => (
                Self::Solo,
                vec![
                    RoleAction::CancelPolling,
                    RoleAction::Notify(SessionNotice::Terminated {
                        code,
                        reason: TerminationReason::Evicted,
                    }),
                ],
            ),

            (state, _) => (state, vec![]),
        }
    }
}

/// Events in the session lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleEvent {
    /// This client created a session.
    Created {
        /// New room code.
        code: RoomCode,
    },
    /// This client joined a session.
    Joined {
        /// Joined room code.
        code: RoomCode,
    },
    /// The user asked to leave.
    LeaveRequested,
    /// A poll found no record under the room code.
    SessionMissing,
    /// A poll found the record without this client in it.
    SelfEvicted,
}

/// Actions for the client to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleAction {
    /// Begin the periodic poll loop.
    StartPolling,
    /// Stop the poll loop and discard any in-flight result.
    CancelPolling,
    /// Deliver a notice to the user.
    Notify(SessionNotice),
}

/// Why a session ended without this client asking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationReason {
    /// The record was deleted (host left, or every member left).
    SessionMissing,
    /// This client is no longer in the member list.
    Evicted,
}

/// User-facing session notices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionNotice {
    /// A session was created.
    Created {
        /// Room code to share.
        code: RoomCode,
    },
    /// A session was joined.
    Joined {
        /// Joined room code.
        code: RoomCode,
    },
    /// This client left a session.
    Left {
        /// Left room code.
        code: RoomCode,
    },
    /// The session ended remotely.
    Terminated {
        /// Room code of the ended session.
        code: RoomCode,
        /// What the poll observed.
        reason: TerminationReason,
    },
}

impl SessionNotice {
    /// Notification title and body.
    pub fn message(&self) -> (String, String) {
        match self {
            Self::Created { code } => (
                "Group session created".into(),
                format!("Share code {} to invite others.", code),
            ),
            Self::Joined { code } => ("Joined group session".into(), format!("Joined {}.", code)),
            Self::Left { code } => ("Left group session".into(), format!("Left {}.", code)),
            Self::Terminated { code, reason } => (
                "Group session ended".into(),
                match reason {
                    TerminationReason::SessionMissing => {
                        format!("Session {} was closed.", code)
                    }
                    TerminationReason::Evicted => {
                        format!("You were removed from session {}.", code)
                    }
                },
            ),
        }
    }
}
