//! Collaborator capabilities consumed by the client.
//!
//! Notifications, alert sounds and cycle history are outside the timer's
//! consistency story: they are best-effort, never block, and a failure in
//! any of them must not surface as a timer error.

mod mock;

pub use mock::{RecordingAlert, RecordingHistory, RecordingNotifier};

use std::sync::Arc;
use thiserror::Error;

/// Alert playback errors.
#[derive(Debug, Error)]
pub enum AlertError {
    /// The platform refused playback (e.g. autoplay policy).
    #[error("playback denied: {0}")]
    Denied(String),

    /// The output device failed.
    #[error("audio device error: {0}")]
    Device(String),
}

/// Delivers user-visible notifications.
///
/// Best-effort with no delivery guarantee. Implementations must return
/// promptly.
pub trait Notifier: Send + Sync {
    /// Show a notification.
    fn notify(&self, title: &str, body: &str);
}

/// Plays the phase-completion alert.
pub trait AlertSound: Send + Sync {
    /// Fire-and-forget playback. Errors are logged by the caller and dropped.
    fn play_alert(&self) -> Result<(), AlertError>;

    /// Select the alert sound by name. Unknown names may be ignored.
    fn select_sound(&self, _name: &str) {}
}

/// Receives cycle boundaries for the history log.
pub trait CycleHistory: Send + Sync {
    /// Open a new history cycle.
    fn start_new_cycle(&self);
}

/// Notifier that writes to the tracing log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, title: &str, body: &str) {
        tracing::info!(title, body, "notification");
    }
}

/// Alert that makes no sound.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentAlert;

impl AlertSound for SilentAlert {
    fn play_alert(&self) -> Result<(), AlertError> {
        Ok(())
    }
}

/// History sink that discards cycle boundaries.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoHistory;

impl CycleHistory for NoHistory {
    fn start_new_cycle(&self) {}
}

/// The set of collaborators a client talks to.
#[derive(Clone)]
pub struct Capabilities {
    /// Notification channel; also carries session-ended notices.
    pub notifier: Arc<dyn Notifier>,
    /// Alert sound.
    pub alert: Arc<dyn AlertSound>,
    /// Cycle history.
    pub history: Arc<dyn CycleHistory>,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            notifier: Arc::new(LogNotifier),
            alert: Arc::new(SilentAlert),
            history: Arc::new(NoHistory),
        }
    }
}

impl std::fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Capabilities").finish_non_exhaustive()
    }
}

impl Capabilities {
    /// Replace the notifier.
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Replace the alert sound.
    pub fn with_alert(mut self, alert: Arc<dyn AlertSound>) -> Self {
        self.alert = alert;
        self
    }

    /// Replace the history sink.
    pub fn with_history(mut self, history: Arc<dyn CycleHistory>) -> Self {
        self.history = history;
        self
    }
}
