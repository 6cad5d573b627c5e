//! Timer settings and phases.

use serde::{Deserialize, Serialize};

use crate::error::TypesError;

/// The current timer mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TimerPhase {
    /// Work phase. The initial phase.
    #[default]
    Focus,
    /// Rest phase following a focus phase.
    Break,
}

impl TimerPhase {
    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Focus => "focus",
            Self::Break => "break",
        }
    }
}

/// Durations and cycle length for the timer.
///
/// Immutable value; updates replace it wholesale (see [`SettingsPatch`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerSettings {
    /// Focus phase length in minutes (> 0).
    pub focus_minutes: u32,
    /// Break length in minutes (>= 0).
    pub break_minutes: u32,
    /// Focus phases per cycle (>= 1).
    pub sessions_per_cycle: u32,
    /// Length of the cycle-closing break. Falls back to `break_minutes`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub long_break_minutes: Option<u32>,
}

impl Default for TimerSettings {
    fn default() -> Self {
        Self {
            focus_minutes: 25,
            break_minutes: 5,
            sessions_per_cycle: 4,
            long_break_minutes: None,
        }
    }
}

impl TimerSettings {
    /// Create settings with a single break length.
    pub fn new(focus_minutes: u32, break_minutes: u32, sessions_per_cycle: u32) -> Self {
        Self {
            focus_minutes,
            break_minutes,
            sessions_per_cycle,
            long_break_minutes: None,
        }
    }

    /// Set a distinct length for the cycle-closing break.
    pub fn with_long_break(mut self, minutes: u32) -> Self {
        self.long_break_minutes = Some(minutes);
        self
    }

    /// Check range constraints.
    pub fn validate(&self) -> Result<(), TypesError> {
        if self.focus_minutes == 0 {
            return Err(TypesError::InvalidSettings(
                "focus_minutes must be > 0".into(),
            ));
        }
        if self.sessions_per_cycle == 0 {
            return Err(TypesError::InvalidSettings(
                "sessions_per_cycle must be >= 1".into(),
            ));
        }
        Ok(())
    }

    /// Focus phase length in seconds.
    pub fn focus_secs(&self) -> u32 {
        self.focus_minutes.saturating_mul(60)
    }

    /// Whether the break following focus number `completed_cycles` closes a cycle.
    ///
    /// `completed_cycles` is the count *after* the focus phase was credited.
    pub fn is_cycle_closing(&self, completed_cycles: u32) -> bool {
        completed_cycles > 0 && completed_cycles % self.sessions_per_cycle.max(1) == 0
    }

    /// Break length in seconds for the break following focus number `completed_cycles`.
    pub fn break_secs(&self, completed_cycles: u32) -> u32 {
        let minutes = if self.is_cycle_closing(completed_cycles) {
            self.long_break_minutes.unwrap_or(self.break_minutes)
        } else {
            self.break_minutes
        };
        minutes.saturating_mul(60)
    }

    /// Length in seconds of `phase` given the current cycle count.
    pub fn phase_secs(&self, phase: TimerPhase, completed_cycles: u32) -> u32 {
        match phase {
            TimerPhase::Focus => self.focus_secs(),
            TimerPhase::Break => self.break_secs(completed_cycles),
        }
    }

    /// Merge a partial update, returning the new settings.
    pub fn merged(&self, patch: &SettingsPatch) -> Self {
        Self {
            focus_minutes: patch.focus_minutes.unwrap_or(self.focus_minutes),
            break_minutes: patch.break_minutes.unwrap_or(self.break_minutes),
            sessions_per_cycle: patch.sessions_per_cycle.unwrap_or(self.sessions_per_cycle),
            long_break_minutes: patch.long_break_minutes.unwrap_or(self.long_break_minutes),
        }
    }
}

/// Partial settings update. Absent fields keep their current value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SettingsPatch {
    /// New focus length in minutes.
    #[serde(default)]
    pub focus_minutes: Option<u32>,
    /// New break length in minutes.
    #[serde(default)]
    pub break_minutes: Option<u32>,
    /// New cycle length.
    #[serde(default)]
    pub sessions_per_cycle: Option<u32>,
    /// New cycle-closing break length; `Some(None)` clears it.
    #[serde(default)]
    pub long_break_minutes: Option<Option<u32>>,
}

impl SettingsPatch {
    /// A patch that replaces every field with `settings`.
    pub fn replace_with(settings: &TimerSettings) -> Self {
        Self {
            focus_minutes: Some(settings.focus_minutes),
            break_minutes: Some(settings.break_minutes),
            sessions_per_cycle: Some(settings.sessions_per_cycle),
            long_break_minutes: Some(settings.long_break_minutes),
        }
    }

    /// True if the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
