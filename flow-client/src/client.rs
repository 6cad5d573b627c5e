//! FlowClient - the main interface for flowsync.
//!
//! This module provides [`FlowClient`], which owns a local timer and keeps
//! it in step with a shared group session.
//!
//! # Architecture
//!
//! FlowClient uses pure state machines (from flow-core) for timer and role
//! logic and interprets their effects and actions to perform actual I/O via
//! the [`SessionStore`] trait and the capability traits.
//!
//! ```text
//! Application → FlowClient → SessionStore → shared record
//!                   ↓
//!              flow-core (TimerMachine, RoleState)
//! ```
//!
//! The host is the only writer of timer fields. Followers poll the record
//! and overwrite their local timer whenever its `version` moves forward.
//!
//! # Example
//!
//! ```ignore
//! use flow_client::{ClientConfig, FlowClient, MemoryStore};
//!
//! let client = FlowClient::new(ClientConfig::default(), MemoryStore::new(), settings);
//! let code = client.create("Ana").await?;
//! client.toggle().await?;
//! ```

use std::sync::{Arc, Mutex as StdMutex, Weak};
use std::time::Duration;

use flow_core::{
    Clock, Role, RoleAction, RoleEvent, RoleState, ScheduleTrigger, SystemClock, TerminationReason,
    TimerEffect, TimerError, TimerMachine, TimerRuntimeState,
};
use flow_types::{
    GroupMember, GroupSession, RoomCode, SessionPatch, SettingsPatch, TimerPhase, TimerSettings,
    TimerSnapshot, Timestamp, TypesError,
};
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::capability::Capabilities;
use crate::store::{SessionStore, StoreError};

/// Title of phase-completion notifications.
pub const NOTIFICATION_TITLE: &str = "Flow Timer";

/// How many fresh codes `create` tries before giving up.
const MAX_CODE_ATTEMPTS: usize = 8;

/// Client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    /// A required input was empty or out of range.
    #[error("invalid input: {0}")]
    Validation(String),

    /// A follower attempted a host-only mutation.
    #[error("permission denied: only the host can control the timer")]
    PermissionDenied,

    /// No session is stored under the code.
    #[error("no session found for code {code}")]
    NotFound {
        /// The code that was looked up.
        code: RoomCode,
    },

    /// create/join while a session is already active.
    #[error("already in session {code}")]
    AlreadyInSession {
        /// The active session.
        code: RoomCode,
    },

    /// Store error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Identifier generation failed.
    #[error(transparent)]
    Types(#[from] TypesError),

    /// Every generated room code was already taken.
    #[error("could not find a free room code")]
    CodeSpaceExhausted,
}

impl From<TimerError> for ClientError {
    fn from(err: TimerError) -> Self {
        match err {
            TimerError::PermissionDenied => Self::PermissionDenied,
            TimerError::InvalidSettings(e) => Self::Validation(e.to_string()),
        }
    }
}

/// Configuration for FlowClient.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Interval between polls of the shared record.
    pub poll_interval: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
        }
    }
}

impl ClientConfig {
    /// Set the poll interval. Zero is raised to one millisecond.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval.max(Duration::from_millis(1));
        self
    }
}

/// Result of one poll of the shared record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// No session is active.
    Inactive,
    /// Nothing to import.
    Unchanged,
    /// A newer record was imported into the local timer.
    Applied,
    /// The session ended; the client is Solo again.
    Terminated(TerminationReason),
    /// The store could not be read; the next poll retries.
    StoreUnavailable,
    /// The session was left or replaced while the read was in flight.
    Discarded,
}

#[derive(Debug, Default)]
struct SyncState {
    role: RoleState,
    me: Option<GroupMember>,
    session: Option<GroupSession>,
    last_applied: Option<Timestamp>,
    generation: u64,
}

struct Inner<S> {
    config: ClientConfig,
    store: S,
    clock: Arc<dyn Clock>,
    caps: Capabilities,
    // Lock order: sync, then timer.
    sync: Mutex<SyncState>,
    timer: Mutex<TimerMachine>,
    poll_task: StdMutex<Option<JoinHandle<()>>>,
}

/// The group timer client.
///
/// Cheap to clone; clones drive the same timer and session.
pub struct FlowClient<S: SessionStore + 'static> {
    inner: Arc<Inner<S>>,
}

impl<S: SessionStore + 'static> Clone for FlowClient<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: SessionStore + 'static> std::fmt::Debug for FlowClient<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlowClient")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl<S: SessionStore + 'static> FlowClient<S> {
    /// Create a Solo client on the system clock with default capabilities.
    pub fn new(config: ClientConfig, store: S, settings: TimerSettings) -> Self {
        Self::with_parts(
            config,
            store,
            settings,
            Arc::new(SystemClock),
            Capabilities::default(),
        )
    }

    /// Create a Solo client with an explicit clock and capabilities.
    pub fn with_parts(
        config: ClientConfig,
        store: S,
        settings: TimerSettings,
        clock: Arc<dyn Clock>,
        capabilities: Capabilities,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                store,
                clock,
                caps: capabilities,
                sync: Mutex::new(SyncState::default()),
                timer: Mutex::new(TimerMachine::new(settings)),
                poll_task: StdMutex::new(None),
            }),
        }
    }

    /// The session store.
    pub fn store(&self) -> &S {
        &self.inner.store
    }

    // ===========================================
    // Timer operations
    // ===========================================

    /// Start or pause the timer. Host-gated.
    pub async fn toggle(&self) -> Result<(), ClientError> {
        self.run_timer(|timer, now| timer.toggle(now)).await
    }

    /// Stop and return to the first focus phase. Host-gated.
    pub async fn reset(&self) -> Result<(), ClientError> {
        self.run_timer(|timer, _| timer.reset()).await
    }

    /// Merge new settings. Host-gated.
    pub async fn update_settings(&self, patch: &SettingsPatch) -> Result<(), ClientError> {
        self.run_timer(|timer, _| timer.update_settings(patch)).await
    }

    /// Advance the local countdown from the clock.
    ///
    /// Fires at most one phase transition. Never gated: a follower's local
    /// countdown expires on its own and is corrected by the next poll.
    pub async fn tick(&self) -> Vec<TimerEffect> {
        let now = self.inner.clock.now();
        let (effects, snapshot) = {
            let mut timer = self.inner.timer.lock().await;
            let effects = timer.tick(now);
            (effects, timer.snapshot())
        };
        self.handle_effects(&effects, &snapshot).await;
        effects
    }

    /// Apply a schedule rule: adopt its settings and start if stopped.
    pub async fn apply_schedule(&self, trigger: &ScheduleTrigger) -> Result<(), ClientError> {
        self.update_settings(&SettingsPatch::replace_with(&trigger.settings))
            .await?;
        self.inner.caps.alert.select_sound(&trigger.sound);
        if !self.timer_state().await.running {
            self.toggle().await?;
        }
        info!(rule = %trigger.rule_id, "schedule applied");
        Ok(())
    }

    async fn run_timer<F>(&self, op: F) -> Result<(), ClientError>
    where
        F: FnOnce(&mut TimerMachine, Timestamp) -> Result<Vec<TimerEffect>, TimerError>,
    {
        let now = self.inner.clock.now();
        let (effects, snapshot) = {
            let mut timer = self.inner.timer.lock().await;
            let effects = op(&mut timer, now)?;
            (effects, timer.snapshot())
        };
        self.handle_effects(&effects, &snapshot).await;
        Ok(())
    }

    async fn handle_effects(&self, effects: &[TimerEffect], snapshot: &TimerSnapshot) {
        for effect in effects {
            match *effect {
                TimerEffect::PhaseCompleted { from, .. } => {
                    self.inner
                        .caps
                        .notifier
                        .notify(NOTIFICATION_TITLE, phase_message(from));
                    if let Err(e) = self.inner.caps.alert.play_alert() {
                        warn!(error = %e, "alert playback failed");
                    }
                }
                TimerEffect::NewCycle => self.inner.caps.history.start_new_cycle(),
                TimerEffect::StateChanged => self.push(snapshot).await,
            }
        }
    }

    /// Current runtime state.
    pub async fn timer_state(&self) -> TimerRuntimeState {
        *self.inner.timer.lock().await.state()
    }

    /// Current settings.
    pub async fn settings(&self) -> TimerSettings {
        *self.inner.timer.lock().await.settings()
    }

    /// Timer state and settings in record form.
    pub async fn snapshot(&self) -> TimerSnapshot {
        self.inner.timer.lock().await.snapshot()
    }

    // ===========================================
    // Session operations
    // ===========================================

    /// Current role.
    pub async fn role(&self) -> Role {
        self.inner.sync.lock().await.role.role()
    }

    /// Whether a group session is active.
    pub async fn in_session(&self) -> bool {
        self.inner.sync.lock().await.role.is_active()
    }

    /// Active room code.
    pub async fn room_code(&self) -> Option<RoomCode> {
        self.inner.sync.lock().await.role.code().cloned()
    }

    /// Last record seen by this client.
    pub async fn session(&self) -> Option<GroupSession> {
        self.inner.sync.lock().await.session.clone()
    }

    /// This client's membership entry.
    pub async fn member(&self) -> Option<GroupMember> {
        self.inner.sync.lock().await.me.clone()
    }

    /// Whether the background poll loop is running.
    pub fn is_polling(&self) -> bool {
        self.poll_slot()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Create a session from the current timer and become its host.
    pub async fn create(&self, name: &str) -> Result<RoomCode, ClientError> {
        let name = require("name", name)?;

        let mut sync = self.inner.sync.lock().await;
        if let Some(code) = sync.role.code() {
            return Err(ClientError::AlreadyInSession { code: code.clone() });
        }

        let code = self.unique_code().await?;
        let now = self.inner.clock.now();
        let me = GroupMember::new(name, true, now);
        let snapshot = self.inner.timer.lock().await.snapshot();
        let session = GroupSession::new(code.clone(), me.clone(), snapshot, now);
        self.inner.store.put(&session).await?;

        sync.generation += 1;
        let (role, actions) =
            std::mem::take(&mut sync.role).on_event(RoleEvent::Created { code: code.clone() });
        sync.role = role;
        sync.me = Some(me);
        sync.last_applied = Some(session.version);
        sync.session = Some(session);
        self.inner.timer.lock().await.set_role(Role::Host);
        let generation = sync.generation;
        drop(sync);

        info!(%code, "created group session");
        self.execute(actions, generation);
        Ok(code)
    }

    /// Join an existing session as a follower.
    ///
    /// The code is trimmed and upper-cased. On success the local timer is
    /// overwritten from the record.
    pub async fn join(&self, name: &str, code: &str) -> Result<GroupSession, ClientError> {
        let name = require("name", name)?;
        let code = RoomCode::parse(code)
            .ok_or_else(|| ClientError::Validation("room code must not be empty".into()))?;

        let mut sync = self.inner.sync.lock().await;
        if let Some(active) = sync.role.code() {
            return Err(ClientError::AlreadyInSession {
                code: active.clone(),
            });
        }

        let mut record = self
            .inner
            .store
            .get(&code)
            .await?
            .ok_or_else(|| ClientError::NotFound { code: code.clone() })?;

        let now = self.inner.clock.now();
        let me = GroupMember::new(name, false, now);
        record.add_member(me.clone());
        record.bump_version(now);
        self.inner.store.put(&record).await?;

        {
            let mut timer = self.inner.timer.lock().await;
            timer.import_remote(&record.timer, now);
            timer.set_role(Role::Follower);
        }

        sync.generation += 1;
        let (role, actions) =
            std::mem::take(&mut sync.role).on_event(RoleEvent::Joined { code: code.clone() });
        sync.role = role;
        sync.me = Some(me);
        sync.last_applied = Some(record.version);
        sync.session = Some(record.clone());
        let generation = sync.generation;
        drop(sync);

        info!(%code, members = record.members.len(), "joined group session");
        self.execute(actions, generation);
        Ok(record)
    }

    /// Leave the active session. A no-op when Solo.
    ///
    /// The client is Solo when this returns, even on error. A host leaving
    /// (or the last member leaving) deletes the record; anyone else only
    /// removes themselves.
    pub async fn leave(&self) -> Result<(), ClientError> {
        let mut sync = self.inner.sync.lock().await;
        let (Some(code), Some(me)) = (sync.role.code().cloned(), sync.me.clone()) else {
            return Ok(());
        };

        let actions = self.deactivate(&mut sync, RoleEvent::LeaveRequested).await;
        let generation = sync.generation;
        self.execute(actions, generation);

        let result = self.remove_member(&code, &me).await;
        drop(sync);

        match &result {
            Ok(()) => info!(%code, "left group session"),
            Err(e) => warn!(%code, error = %e, "left group session; record cleanup failed"),
        }
        result.map_err(Into::into)
    }

    async fn remove_member(&self, code: &RoomCode, me: &GroupMember) -> Result<(), StoreError> {
        let Some(mut record) = self.inner.store.get(code).await? else {
            return Ok(());
        };

        record.remove_member(&me.id);
        if record.host_id == me.id || record.members.is_empty() {
            self.inner.store.delete(code).await
        } else {
            self.inner.store.put(&record).await
        }
    }

    /// Read the shared record once and reconcile.
    ///
    /// Followers import a record whose version is newer than the last one
    /// applied. A missing record or a missing self ends the session.
    pub async fn poll(&self) -> PollOutcome {
        self.poll_generation(None).await
    }

    async fn poll_generation(&self, expected: Option<u64>) -> PollOutcome {
        let (code, generation) = {
            let sync = self.inner.sync.lock().await;
            let Some(code) = sync.role.code().cloned() else {
                return PollOutcome::Inactive;
            };
            if expected.is_some_and(|g| g != sync.generation) {
                return PollOutcome::Discarded;
            }
            (code, sync.generation)
        };

        // The store read runs without the lock so leave() is never blocked
        // behind it.
        let fetched = self.inner.store.get(&code).await;

        let mut sync = self.inner.sync.lock().await;
        if sync.generation != generation {
            debug!(%code, "discarding poll result from a previous session");
            return PollOutcome::Discarded;
        }

        let record = match fetched {
            Ok(Some(record)) => record,
            Ok(None) => {
                return self.terminate(&mut sync, RoleEvent::SessionMissing).await;
            }
            Err(e) => {
                warn!(%code, error = %e, "poll failed; retrying next interval");
                return PollOutcome::StoreUnavailable;
            }
        };

        let present = sync
            .me
            .as_ref()
            .is_some_and(|me| record.has_member(&me.id));
        if !present {
            return self.terminate(&mut sync, RoleEvent::SelfEvicted).await;
        }

        let newer = sync.last_applied.map_or(true, |v| record.version > v);
        if sync.role.role() == Role::Follower && newer {
            let now = self.inner.clock.now();
            self.inner
                .timer
                .lock()
                .await
                .import_remote(&record.timer, now);
            debug!(%code, version = %record.version, "applied remote timer");
            sync.last_applied = Some(record.version);
            sync.session = Some(record);
            return PollOutcome::Applied;
        }

        let stale = sync
            .session
            .as_ref()
            .is_some_and(|cached| record.version < cached.version);
        if !stale {
            sync.session = Some(record);
        }
        PollOutcome::Unchanged
    }

    /// Merge the host's timer into the shared record.
    ///
    /// Ignored unless this client is the host. Failures are logged and not
    /// retried; the next mutation pushes the full timer again.
    async fn push(&self, snapshot: &TimerSnapshot) {
        let mut sync = self.inner.sync.lock().await;
        let code = match &sync.role {
            RoleState::Host { code } => code.clone(),
            _ => {
                debug!("not hosting; push skipped");
                return;
            }
        };

        let mut record = match self.inner.store.get(&code).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                warn!(%code, "session record missing; push skipped");
                return;
            }
            Err(e) => {
                warn!(%code, error = %e, "push failed");
                return;
            }
        };

        record.apply(&SessionPatch::from_snapshot(snapshot));
        record.bump_version(self.inner.clock.now());
        if let Err(e) = self.inner.store.put(&record).await {
            warn!(%code, error = %e, "push failed");
            return;
        }

        debug!(%code, version = %record.version, "pushed timer");
        sync.last_applied = Some(record.version);
        sync.session = Some(record);
    }

    async fn terminate(&self, sync: &mut SyncState, event: RoleEvent) -> PollOutcome {
        let reason = match event {
            RoleEvent::SelfEvicted => TerminationReason::Evicted,
            _ => TerminationReason::SessionMissing,
        };
        let actions = self.deactivate(sync, event).await;
        warn!(?reason, "group session ended");
        self.execute(actions, sync.generation);
        PollOutcome::Terminated(reason)
    }

    /// Apply a leaving event and clear session state. Bumps the generation
    /// so in-flight polls are discarded.
    async fn deactivate(&self, sync: &mut SyncState, event: RoleEvent) -> Vec<RoleAction> {
        sync.generation += 1;
        let (role, actions) = std::mem::take(&mut sync.role).on_event(event);
        sync.role = role;
        sync.me = None;
        sync.session = None;
        sync.last_applied = None;
        self.inner.timer.lock().await.set_role(Role::Solo);
        actions
    }

    fn execute(&self, actions: Vec<RoleAction>, generation: u64) {
        for action in actions {
            match action {
                RoleAction::StartPolling => self.spawn_poll_loop(generation),
                RoleAction::CancelPolling => {
                    if let Some(handle) = self.poll_slot().take() {
                        handle.abort();
                    }
                }
                RoleAction::Notify(notice) => {
                    let (title, body) = notice.message();
                    self.inner.caps.notifier.notify(&title, &body);
                }
            }
        }
    }

    fn spawn_poll_loop(&self, generation: u64) {
        let weak: Weak<Inner<S>> = Arc::downgrade(&self.inner);
        let period = self.inner.config.poll_interval;

        let handle = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                let client = FlowClient { inner };
                match client.poll_generation(Some(generation)).await {
                    PollOutcome::Inactive
                    | PollOutcome::Discarded
                    | PollOutcome::Terminated(_) => break,
                    outcome => debug!(?outcome, generation, "poll"),
                }
            }
            debug!(generation, "poll loop stopped");
        });

        if let Some(previous) = self.poll_slot().replace(handle) {
            previous.abort();
        }
    }

    fn poll_slot(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.inner
            .poll_task
            .lock()
            .unwrap_or_else(|e| e.into_inner())
    }

    async fn unique_code(&self) -> Result<RoomCode, ClientError> {
        for _ in 0..MAX_CODE_ATTEMPTS {
            let code = RoomCode::generate()?;
            if self.inner.store.get(&code).await?.is_none() {
                return Ok(code);
            }
            debug!(%code, "room code taken; regenerating");
        }
        Err(ClientError::CodeSpaceExhausted)
    }
}

fn require<'a>(field: &str, value: &'a str) -> Result<&'a str, ClientError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(ClientError::Validation(format!("{} must not be empty", field)))
    } else {
        Ok(trimmed)
    }
}

fn phase_message(ended: TimerPhase) -> &'static str {
    match ended {
        TimerPhase::Focus => "Focus time is over! Take a break.",
        TimerPhase::Break => "Break is over! Time to focus again.",
    }
}
