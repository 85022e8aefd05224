//! # parlor-backend
//!
//! Behavioral contracts for the external services the chat client consumes:
//! a realtime document store with child-event subscriptions and an object
//! storage service with upload progress reporting. Ships complete in-memory
//! implementations used by tests and the demo binary.
//!
//! The client never talks to a concrete backend directly; both stores are
//! injected as trait objects at component construction.

pub mod error;
pub mod memory;
pub mod realtime;
pub mod storage;

pub use error::{BackendError, Result};
pub use memory::{MemoryObjectStore, MemoryRealtimeStore};
pub use realtime::{
    ChildCallback, ChildEvent, ConnectedCallback, ListenerHandle, RealtimeStore,
};
pub use storage::{ObjectStore, UploadEvent, UploadMetadata, UploadObserver};
