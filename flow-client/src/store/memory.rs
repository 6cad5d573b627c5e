//! In-memory session store.
//!
//! Clones share the same map, so several clients in one process (or one
//! test) can act as participants of the same session. Failures can be
//! injected per call for testing.

use super::{SessionStore, StoreError};
use async_trait::async_trait;
use flow_types::{GroupSession, RoomCode};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// In-memory session store.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryStoreInner>>,
}

#[derive(Debug, Default)]
struct MemoryStoreInner {
    records: HashMap<RoomCode, GroupSession>,
    put_count: usize,
    fail_next_get: Option<String>,
    fail_next_put: Option<String>,
    fail_next_delete: Option<String>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryStoreInner> {
        // A poisoned map is still a consistent map: every mutation is a
        // single insert or remove.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Seed a record directly, bypassing failure injection.
    pub fn insert(&self, session: GroupSession) {
        self.lock().records.insert(session.id.clone(), session);
    }

    /// Read a record directly, bypassing failure injection.
    pub fn record(&self, code: &RoomCode) -> Option<GroupSession> {
        self.lock().records.get(code).cloned()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.lock().records.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of successful `put` calls.
    pub fn put_count(&self) -> usize {
        self.lock().put_count
    }

    /// Cause the next get() to fail with the given error.
    pub fn fail_next_get(&self, error: &str) {
        self.lock().fail_next_get = Some(error.to_string());
    }

    /// Cause the next put() to fail with the given error.
    pub fn fail_next_put(&self, error: &str) {
        self.lock().fail_next_put = Some(error.to_string());
    }

    /// Cause the next delete() to fail with the given error.
    pub fn fail_next_delete(&self, error: &str) {
        self.lock().fail_next_delete = Some(error.to_string());
    }

    /// Clear all records, counters and injected failures.
    pub fn reset(&self) {
        *self.lock() = MemoryStoreInner::default();
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn get(&self, code: &RoomCode) -> Result<Option<GroupSession>, StoreError> {
        let mut inner = self.lock();

        if let Some(error) = inner.fail_next_get.take() {
            return Err(StoreError::Unavailable(error));
        }

        Ok(inner.records.get(code).cloned())
    }

    async fn put(&self, session: &GroupSession) -> Result<(), StoreError> {
        let mut inner = self.lock();

        if let Some(error) = inner.fail_next_put.take() {
            return Err(StoreError::Unavailable(error));
        }

        inner.records.insert(session.id.clone(), session.clone());
        inner.put_count += 1;
        Ok(())
    }

    async fn delete(&self, code: &RoomCode) -> Result<(), StoreError> {
        let mut inner = self.lock();

        if let Some(error) = inner.fail_next_delete.take() {
            return Err(StoreError::Unavailable(error));
        }

        inner.records.remove(code);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flow_types::{GroupMember, TimerSettings, TimerSnapshot, Timestamp};

    fn session(code: &str) -> GroupSession {
        let now = Timestamp::from_millis(1_000);
        GroupSession::new(
            RoomCode::parse(code).unwrap(),
            GroupMember::new("host", true, now),
            TimerSnapshot::idle(TimerSettings::default()),
            now,
        )
    }

    // ===========================================
    // MemoryStore Basic Tests
    // ===========================================

    #[tokio::test]
    async fn put_then_get_returns_record() {
        let store = MemoryStore::new();
        let s = session("ABC123");

        store.put(&s).await.unwrap();

        assert_eq!(store.get(&s.id).await.unwrap(), Some(s));
        assert_eq!(store.put_count(), 1);
    }

    #[tokio::test]
    async fn get_missing_returns_none() {
        let store = MemoryStore::new();
        let code = RoomCode::parse("NOPE00").unwrap();
        assert_eq!(store.get(&code).await.unwrap(), None);
    }

    #[tokio::test]
    async fn put_replaces_whole_record() {
        let store = MemoryStore::new();
        let mut s = session("ABC123");
        store.put(&s).await.unwrap();

        s.timer.running = true;
        s.members.clear();
        store.put(&s).await.unwrap();

        let stored = store.record(&s.id).unwrap();
        assert!(stored.timer.running);
        assert!(stored.members.is_empty());
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let store = MemoryStore::new();
        let s = session("ABC123");
        store.put(&s).await.unwrap();

        store.delete(&s.id).await.unwrap();
        store.delete(&s.id).await.unwrap();

        assert!(store.is_empty());
    }

    // ===========================================
    // Error Condition Tests
    // ===========================================

    #[tokio::test]
    async fn forced_get_failure_is_one_shot() {
        let store = MemoryStore::new();
        let s = session("ABC123");
        store.insert(s.clone());
        store.fail_next_get("offline");

        assert!(matches!(
            store.get(&s.id).await,
            Err(StoreError::Unavailable(_))
        ));
        assert!(store.get(&s.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn forced_put_failure_leaves_store_untouched() {
        let store = MemoryStore::new();
        store.fail_next_put("offline");

        let result = store.put(&session("ABC123")).await;

        assert!(matches!(result, Err(StoreError::Unavailable(_))));
        assert!(store.is_empty());
        assert_eq!(store.put_count(), 0);
    }

    #[tokio::test]
    async fn forced_delete_failure() {
        let store = MemoryStore::new();
        let s = session("ABC123");
        store.insert(s.clone());
        store.fail_next_delete("offline");

        assert!(store.delete(&s.id).await.is_err());
        assert!(store.record(&s.id).is_some());
    }

    // ===========================================
    // Clone and Shared State Tests
    // ===========================================

    #[tokio::test]
    async fn clones_share_records() {
        let a = MemoryStore::new();
        let b = a.clone();
        let s = session("ABC123");

        a.put(&s).await.unwrap();

        assert_eq!(b.get(&s.id).await.unwrap(), Some(s));
    }

    #[tokio::test]
    async fn reset_clears_everything() {
        let store = MemoryStore::new();
        store.put(&session("ABC123")).await.unwrap();
        store.fail_next_get("x");

        store.reset();

        assert!(store.is_empty());
        assert_eq!(store.put_count(), 0);
        let code = RoomCode::parse("ABC123").unwrap();
        assert!(store.get(&code).await.is_ok());
    }
}
