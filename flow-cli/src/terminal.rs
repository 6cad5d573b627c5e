//! Terminal implementations of the client capabilities.

use flow_client::{AlertError, AlertSound, Capabilities, CycleHistory, Notifier};
use std::io::Write;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Prints notifications on their own line.
#[derive(Debug, Default)]
pub struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn notify(&self, title: &str, body: &str) {
        println!("\n>> {}: {}", title, body);
    }
}

/// Rings the terminal bell.
#[derive(Debug, Default)]
pub struct TerminalBell;

impl AlertSound for TerminalBell {
    fn play_alert(&self) -> Result<(), AlertError> {
        let mut out = std::io::stdout();
        out.write_all(b"\x07")
            .and_then(|()| out.flush())
            .map_err(|e| AlertError::Device(e.to_string()))
    }

    fn select_sound(&self, name: &str) {
        tracing::debug!(sound = name, "terminal bell ignores sound selection");
    }
}

/// Counts history cycles and logs each new one.
#[derive(Debug, Default)]
pub struct CycleCounter {
    cycle: AtomicU32,
}

impl CycleHistory for CycleCounter {
    fn start_new_cycle(&self) {
        let cycle = self.cycle.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::info!(cycle, "new cycle");
    }
}

/// Capabilities wired to the terminal.
pub fn capabilities() -> Capabilities {
    Capabilities::default()
        .with_notifier(Arc::new(TerminalNotifier))
        .with_alert(Arc::new(TerminalBell))
        .with_history(Arc::new(CycleCounter::default()))
}

/// Format seconds as `MM:SS`. Minutes are not wrapped into hours.
pub fn format_remaining(secs: u32) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_minutes_and_seconds() {
        assert_eq!(format_remaining(0), "00:00");
        assert_eq!(format_remaining(59), "00:59");
        assert_eq!(format_remaining(1500), "25:00");
        assert_eq!(format_remaining(6001), "100:01");
    }

    #[test]
    fn cycle_counter_counts() {
        let history = CycleCounter::default();
        history.start_new_cycle();
        history.start_new_cycle();
        assert_eq!(history.cycle.load(Ordering::SeqCst), 2);
    }
}
