//! File-backed session store.
//!
//! One JSON file per room code inside a shared directory. Every process on
//! the host that points at the same directory sees the same sessions, which
//! is enough for terminal clients to share a timer.
//!
//! Writes go to a temporary file that is then renamed over the record, so a
//! concurrent reader sees either the old or the new record, never a torn one.

use super::{SessionStore, StoreError};
use async_trait::async_trait;
use flow_types::{GroupSession, RoomCode};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Directory-backed session store.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Use `dir` as the shared store, creating it if needed.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    /// The backing directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Record path for `code`, or `None` if the code cannot name a file.
    fn record_path(&self, code: &RoomCode) -> Option<PathBuf> {
        let s = code.as_str();
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return None;
        }
        Some(self.dir.join(format!("session_{}.json", s)))
    }
}

#[async_trait]
impl SessionStore for FileStore {
    async fn get(&self, code: &RoomCode) -> Result<Option<GroupSession>, StoreError> {
        let Some(path) = self.record_path(code) else {
            return Ok(None);
        };

        let contents = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|e| StoreError::Corrupt {
                code: code.clone(),
                reason: e.to_string(),
            })
    }

    async fn put(&self, session: &GroupSession) -> Result<(), StoreError> {
        let path = self.record_path(&session.id).ok_or_else(|| {
            StoreError::Serialization(format!("room code {:?} is not a valid key", session.id))
        })?;

        let contents = serde_json::to_vec_pretty(session)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, contents).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn delete(&self, code: &RoomCode) -> Result<(), StoreError> {
        let Some(path) = self.record_path(code) else {
            return Ok(());
        };

        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flow_types::{GroupMember, TimerSettings, TimerSnapshot, Timestamp};
    use tempfile::tempdir;

    fn session(code: &str) -> GroupSession {
        let now = Timestamp::from_millis(1_000);
        GroupSession::new(
            RoomCode::parse(code).unwrap(),
            GroupMember::new("host", true, now),
            TimerSnapshot::idle(TimerSettings::default()),
            now,
        )
    }

    #[tokio::test]
    async fn open_creates_directory() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("a").join("b");

        let store = FileStore::open(&nested).await.unwrap();

        assert!(nested.is_dir());
        assert_eq!(store.dir(), nested.as_path());
    }

    #[tokio::test]
    async fn put_get_delete_cycle() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();
        let s = session("ABC123");

        store.put(&s).await.unwrap();
        assert!(dir.path().join("session_ABC123.json").exists());
        assert_eq!(store.get(&s.id).await.unwrap(), Some(s.clone()));

        store.delete(&s.id).await.unwrap();
        assert_eq!(store.get(&s.id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn delete_missing_is_ok() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();
        store
            .delete(&RoomCode::parse("GONE00").unwrap())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn two_handles_share_directory() {
        let dir = tempdir().unwrap();
        let a = FileStore::open(dir.path()).await.unwrap();
        let b = FileStore::open(dir.path()).await.unwrap();
        let s = session("SHARED");

        a.put(&s).await.unwrap();

        assert_eq!(b.get(&s.id).await.unwrap(), Some(s));
    }

    #[tokio::test]
    async fn corrupt_record_is_reported() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();
        tokio::fs::write(dir.path().join("session_BAD000.json"), b"{not json")
            .await
            .unwrap();

        let result = store.get(&RoomCode::parse("BAD000").unwrap()).await;

        assert!(matches!(result, Err(StoreError::Corrupt { .. })));
    }

    #[tokio::test]
    async fn path_like_codes_never_touch_the_filesystem() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();
        let code = RoomCode::parse("../etc").unwrap();

        assert_eq!(store.get(&code).await.unwrap(), None);
        store.delete(&code).await.unwrap();
    }
}
