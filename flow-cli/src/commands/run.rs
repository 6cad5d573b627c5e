//! Run a timer in the terminal: alone, as host, or as a follower.

use anyhow::{Context, Result};
use flow_client::{ClientConfig, FileStore, FlowClient, SessionStore};
use flow_core::{FiredSet, ScheduleEvaluator, SystemClock, TimerRuntimeState};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::terminal::{self, format_remaining};

/// File next to the session records that remembers which rules fired today.
const FIRED_FILE: &str = "fired_schedules.json";

/// How the timer participates in a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// No session.
    Solo,
    /// Create a session.
    Host {
        /// Display name.
        name: String,
    },
    /// Join a session.
    Join {
        /// Display name.
        name: String,
        /// Room code to join.
        code: String,
    },
}

/// Run the timer until Ctrl-C or until the session ends.
pub async fn run(config: &Config, store_dir: &Path, mode: Mode) -> Result<()> {
    let store = FileStore::open(store_dir)
        .await
        .context("Failed to open session store")?;
    let fired_path = store_dir.join(FIRED_FILE);
    let mut schedules = config
        .schedule_evaluator()?
        .with_fired(load_fired(&fired_path).await);

    let client = FlowClient::with_parts(
        ClientConfig::default().with_poll_interval(config.sync.poll_interval()),
        store,
        config.timer,
        Arc::new(SystemClock),
        terminal::capabilities(),
    );

    match &mode {
        Mode::Solo => {
            client.toggle().await?;
        }
        Mode::Host { name } => {
            let code = client.create(name).await?;
            println!("Hosting session {} (share this code)", code);
            client.toggle().await?;
        }
        Mode::Join { name, code } => {
            let session = client.join(name, code).await?;
            println!(
                "Joined session {} ({} members)",
                session.id,
                session.members.len()
            );
        }
    }

    let result = drive(
        &client,
        &mut schedules,
        &fired_path,
        config.sync.tick_interval(),
    )
    .await;

    if let Err(e) = client.leave().await {
        warn!(error = %e, "leave did not clean up the shared record");
    }
    result
}

/// Tick, fire schedules and print state until interrupted.
async fn drive<S: SessionStore + 'static>(
    client: &FlowClient<S>,
    schedules: &mut ScheduleEvaluator,
    fired_path: &Path,
    tick: Duration,
) -> Result<()> {
    let in_session = client.in_session().await;
    let mut ticker = interval(tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut last_line = String::new();

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                client.tick().await;

                if let Some(trigger) = schedules.due(chrono::Local::now().naive_local()) {
                    if let Err(e) = client.apply_schedule(&trigger).await {
                        warn!(rule = %trigger.rule_id, error = %e, "schedule not applied");
                    }
                    if let Err(e) = save_fired(fired_path, schedules.fired()).await {
                        warn!(path = %fired_path.display(), error = %e, "could not record fired schedule");
                    }
                }

                if in_session && !client.in_session().await {
                    println!("\nSession ended.");
                    return Ok(());
                }

                let line = status_line(&client.timer_state().await);
                if line != last_line {
                    println!("{}", line);
                    last_line = line;
                }
            }
            result = &mut ctrl_c => {
                result.context("Failed to listen for Ctrl-C")?;
                info!("interrupted");
                return Ok(());
            }
        }
    }
}

/// Load the fired-today set. A missing or unreadable file starts empty.
async fn load_fired(path: &Path) -> FiredSet {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return FiredSet::default(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "could not read fired schedules");
            return FiredSet::default();
        }
    };
    match serde_json::from_slice(&bytes) {
        Ok(fired) => fired,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "ignoring corrupt fired schedules");
            FiredSet::default()
        }
    }
}

/// Write the fired-today set via a temp file and rename.
async fn save_fired(path: &Path, fired: &FiredSet) -> Result<()> {
    let json = serde_json::to_vec_pretty(fired).context("Failed to serialize fired schedules")?;
    let tmp: PathBuf = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, json)
        .await
        .with_context(|| format!("Failed to write {}", tmp.display()))?;
    tokio::fs::rename(&tmp, path)
        .await
        .with_context(|| format!("Failed to replace {}", path.display()))?;
    debug!(path = %path.display(), "saved fired schedules");
    Ok(())
}

/// One-line rendering of the timer.
fn status_line(state: &TimerRuntimeState) -> String {
    format!(
        "{:<5} {} {} (completed: {})",
        state.phase.label(),
        format_remaining(state.seconds_remaining),
        if state.running { "running" } else { "paused" },
        state.completed_cycles
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use flow_types::TimerPhase;

    #[test]
    fn status_line_shows_phase_and_time() {
        let state = TimerRuntimeState {
            phase: TimerPhase::Focus,
            seconds_remaining: 1499,
            running: true,
            completed_cycles: 2,
            deadline: None,
        };

        let line = status_line(&state);

        assert!(line.contains("24:59"));
        assert!(line.contains("running"));
        assert!(line.contains("completed: 2"));
    }

    #[tokio::test]
    async fn fired_set_survives_a_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(FIRED_FILE);
        let today = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        let mut fired = FiredSet::default();
        fired.insert("weekday-morning", today);

        save_fired(&path, &fired).await.unwrap();
        let loaded = load_fired(&path).await;

        assert_eq!(loaded, fired);
        assert!(loaded.contains("weekday-morning", today));
    }

    #[tokio::test]
    async fn missing_or_corrupt_fired_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(FIRED_FILE);

        assert_eq!(load_fired(&path).await, FiredSet::default());

        std::fs::write(&path, "{not json").unwrap();
        assert_eq!(load_fired(&path).await, FiredSet::default());
    }

    #[tokio::test]
    async fn join_unknown_code_fails_before_driving() {
        let dir = tempfile::tempdir().unwrap();
        let mode = Mode::Join {
            name: "Ben".into(),
            code: "NOPE00".into(),
        };

        let result = run(&Config::default(), dir.path(), mode).await;

        assert!(result.is_err());
    }
}
