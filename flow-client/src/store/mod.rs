//! Session store abstraction for flowsync.
//!
//! The store is the only "network" in this design: a shared key-value
//! space holding one [`GroupSession`] per room code, polled by every
//! participant. A push channel could replace it behind the same trait as
//! long as the host still writes and followers still observe.
//!
//! # Design
//!
//! The store trait is async and record-oriented:
//! - `get()` reads the current record, if any
//! - `put()` replaces the whole record, keyed by `session.id`
//! - `delete()` removes a record (idempotent)
//!
//! There is no partial update and no locking; `version` on the record is
//! the only arbitration field.
//!
//! # Example
//!
//! ```ignore
//! let store = MemoryStore::new();
//! store.put(&session).await?;
//! let fetched = store.get(&session.id).await?;
//! store.delete(&session.id).await?;
//! ```

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use flow_types::{GroupSession, RoomCode};
use thiserror::Error;

/// Store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Filesystem error.
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored record could not be decoded.
    #[error("corrupt record for {code}: {reason}")]
    Corrupt {
        /// Room code of the record.
        code: RoomCode,
        /// Decoder message.
        reason: String,
    },

    /// A record could not be encoded.
    #[error("serialization failed: {0}")]
    Serialization(String),
}

/// Shared, eventually-visible storage for session records.
///
/// Implementations handle the underlying medium (memory, files, a remote
/// key-value service).
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Read the record stored under `code`.
    async fn get(&self, code: &RoomCode) -> Result<Option<GroupSession>, StoreError>;

    /// Replace the record keyed by `session.id`.
    async fn put(&self, session: &GroupSession) -> Result<(), StoreError>;

    /// Remove the record under `code`. Removing a missing record succeeds.
    async fn delete(&self, code: &RoomCode) -> Result<(), StoreError>;
}
