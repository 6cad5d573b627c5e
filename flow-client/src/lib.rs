//! # flow-client
//!
//! Client library for the flowsync group focus timer.
//!
//! This is the library that front ends use to run a timer alone or as part
//! of a group session.
//!
//! ## Features
//!
//! - **Deadline-based timer**: remaining time is recomputed from an absolute
//!   deadline, so suspended processes catch up on their next tick
//! - **Host-authoritative sessions**: one writer, followers poll and import
//! - **Store Abstraction**: pluggable session store (file, memory)
//! - **Pure State Machines**: uses flow-core for side-effect-free logic
//!
//! ## Example
//!
//! ```ignore
//! use flow_client::{ClientConfig, FileStore, FlowClient};
//!
//! let store = FileStore::open("/tmp/flowsync").await?;
//! let client = FlowClient::new(ClientConfig::default(), store, settings);
//!
//! // Host a session and start the timer
//! let code = client.create("Ana").await?;
//! client.toggle().await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod capability;
pub mod client;
pub mod store;

pub use capability::{
    AlertError, AlertSound, Capabilities, CycleHistory, LogNotifier, NoHistory, Notifier,
    RecordingAlert, RecordingHistory, RecordingNotifier, SilentAlert,
};
pub use client::{ClientConfig, ClientError, FlowClient, PollOutcome, NOTIFICATION_TITLE};
pub use store::{FileStore, MemoryStore, SessionStore, StoreError};
