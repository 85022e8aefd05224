//! Contract of the realtime document store.
//!
//! The store is a tree of JSON documents addressed by `/`-separated paths.
//! Writes fan out to subscribers as child events; a subscription call
//! returns immediately and its effects arrive later as callback
//! invocations, in arrival order per path. Distinct paths carry no
//! cross-ordering guarantee.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use uuid::Uuid;

use crate::error::Result;

/// The two child-event kinds a path subscription can observe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChildEvent {
    /// A child appeared under the path (including replayed history).
    Added,
    /// A child was removed from under the path.
    Removed,
}

/// Opaque cancellation handle for one active subscription.
///
/// Handles are the only teardown primitive: passing one to
/// [`RealtimeStore::unsubscribe`] cancels delivery. Cancelling twice is a
/// no-op, so callers that guarantee exactly-once teardown can treat a
/// second call as harmless.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListenerHandle {
    id: Uuid,
}

impl ListenerHandle {
    pub fn new() -> Self {
        Self { id: Uuid::new_v4() }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }
}

impl Default for ListenerHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Invoked with `(child_key, document)` for every observed child event.
pub type ChildCallback = Arc<dyn Fn(&str, &Value) + Send + Sync>;

/// Invoked with the connection state: once with the current state at
/// subscription time, then on every change.
pub type ConnectedCallback = Arc<dyn Fn(bool) + Send + Sync>;

/// Path-scoped realtime document store.
///
/// Implementations must invoke callbacks with no internal lock held, so a
/// callback may re-enter the store (the connection callback installing a
/// disconnect hook relies on this).
pub trait RealtimeStore: Send + Sync {
    /// Append `value` under `path` with a generated child key.
    ///
    /// The store injects a server-assigned `timestamp` field (milliseconds,
    /// strictly monotonic across all pushes) into the stored document and
    /// returns it. `value` must be a JSON object.
    fn push(&self, path: &str, value: Value) -> Result<i64>;

    /// Write `value` at exactly `path` (parent collection / leaf key).
    fn set(&self, path: &str, value: Value) -> Result<()>;

    /// Merge `children` into the collection at `path`, one leaf per entry.
    fn update(&self, path: &str, children: BTreeMap<String, Value>) -> Result<()>;

    /// Delete the leaf at `path`. Removing an absent leaf is a no-op.
    fn remove(&self, path: &str) -> Result<()>;

    /// One-shot read. Collection paths yield an object keyed by child key;
    /// leaf paths yield the stored document. Absent paths yield `None`.
    fn once(&self, path: &str) -> Result<Option<Value>>;

    /// Subscribe to child events under `path`.
    ///
    /// `Added` subscriptions replay existing children (in key order) before
    /// any live event, then deliver each future addition exactly once.
    fn subscribe_child(
        &self,
        path: &str,
        event: ChildEvent,
        callback: ChildCallback,
    ) -> Result<ListenerHandle>;

    /// Subscribe to connection-state notifications. The current state is
    /// delivered immediately.
    fn subscribe_connection(&self, callback: ConnectedCallback) -> Result<ListenerHandle>;

    /// Register a removal of `path` to run server-side if this client
    /// disconnects uncleanly. Registering the same path twice is a no-op.
    fn on_disconnect_remove(&self, path: &str) -> Result<()>;

    /// Cancel the subscription behind `handle`. Unknown or already-removed
    /// handles are ignored.
    fn unsubscribe(&self, handle: &ListenerHandle) -> Result<()>;
}
