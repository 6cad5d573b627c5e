//! Recording capabilities for testing.
//!
//! Each recorder captures what it was asked to do. Clones share state.

use super::{AlertError, AlertSound, CycleHistory, Notifier};
use std::sync::{Arc, Mutex};

/// Notifier that records every notification.
#[derive(Debug, Default, Clone)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<(String, String)>>>,
}

impl RecordingNotifier {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// All `(title, body)` pairs so far.
    pub fn notifications(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Number of notifications whose title equals `title`.
    pub fn count_titled(&self, title: &str) -> usize {
        self.notifications()
            .iter()
            .filter(|(t, _)| t == title)
            .count()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, title: &str, body: &str) {
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((title.to_string(), body.to_string()));
    }
}

/// Alert that counts plays and can be told to fail.
#[derive(Debug, Default, Clone)]
pub struct RecordingAlert {
    inner: Arc<Mutex<AlertInner>>,
}

#[derive(Debug, Default)]
struct AlertInner {
    plays: usize,
    fail: bool,
    selected: Option<String>,
}

impl RecordingAlert {
    /// Create a recorder that plays successfully.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every play fail (as a browser would under autoplay policy).
    pub fn fail_always(&self) {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).fail = true;
    }

    /// Number of play attempts.
    pub fn plays(&self) -> usize {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).plays
    }

    /// Last selected sound name.
    pub fn selected(&self) -> Option<String> {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .selected
            .clone()
    }
}

impl AlertSound for RecordingAlert {
    fn play_alert(&self) -> Result<(), AlertError> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.plays += 1;
        if inner.fail {
            Err(AlertError::Denied("autoplay blocked".into()))
        } else {
            Ok(())
        }
    }

    fn select_sound(&self, name: &str) {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).selected = Some(name.to_string());
    }
}

/// History sink that counts new cycles.
#[derive(Debug, Default, Clone)]
pub struct RecordingHistory {
    cycles: Arc<Mutex<usize>>,
}

impl RecordingHistory {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cycles opened.
    pub fn cycles(&self) -> usize {
        *self.cycles.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl CycleHistory for RecordingHistory {
    fn start_new_cycle(&self) {
        *self.cycles.lock().unwrap_or_else(|e| e.into_inner()) += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notifier_records_in_order() {
        let n = RecordingNotifier::new();
        n.notify("a", "1");
        n.notify("b", "2");
        n.notify("a", "3");

        assert_eq!(n.notifications().len(), 3);
        assert_eq!(n.count_titled("a"), 2);
    }

    #[test]
    fn alert_counts_failed_plays() {
        let alert = RecordingAlert::new();
        alert.play_alert().unwrap();
        alert.fail_always();
        assert!(alert.play_alert().is_err());
        assert_eq!(alert.plays(), 2);
    }

    #[test]
    fn clones_share_history() {
        let h = RecordingHistory::new();
        let h2 = h.clone();
        h.start_new_cycle();
        h2.start_new_cycle();
        assert_eq!(h.cycles(), 2);
    }
}
