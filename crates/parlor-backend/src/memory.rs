//! In-memory implementations of the backend contracts.
//!
//! [`MemoryRealtimeStore`] keeps the document tree in a map of collection
//! paths to ordered children and fans events out synchronously on the
//! writer's thread. [`MemoryObjectStore`] holds uploaded bytes and reports
//! a chunked progress sequence. Both power the test suite and the demo
//! binary; production deployments inject real service adapters instead.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use bytes::Bytes;
use chrono::Utc;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::error::{BackendError, Result};
use crate::realtime::{
    ChildCallback, ChildEvent, ConnectedCallback, ListenerHandle, RealtimeStore,
};
use crate::storage::{ObjectStore, UploadEvent, UploadMetadata, UploadObserver};

struct ChildListener {
    handle: ListenerHandle,
    path: String,
    event: ChildEvent,
    callback: ChildCallback,
}

struct ConnectionWatcher {
    handle: ListenerHandle,
    callback: ConnectedCallback,
}

#[derive(Default)]
struct Inner {
    /// Collection path -> child key -> document. BTreeMap keeps children
    /// in key order, which matches arrival order for pushed records.
    nodes: HashMap<String, BTreeMap<String, Value>>,
    listeners: Vec<ChildListener>,
    watchers: Vec<ConnectionWatcher>,
    /// Paths to remove when the client disconnects uncleanly.
    disconnect_removals: Vec<String>,
    connected: bool,
    last_timestamp: i64,
    fail_writes: bool,
}

/// In-memory realtime document store.
pub struct MemoryRealtimeStore {
    inner: Mutex<Inner>,
}

impl MemoryRealtimeStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                connected: true,
                ..Inner::default()
            }),
        }
    }

    // A poisoned lock still holds consistent data; keep serving.
    fn inner(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Make every subsequent write fail, to exercise error paths in tests.
    pub fn fail_writes(&self, fail: bool) {
        self.inner().fail_writes = fail;
    }

    /// Number of active child-event subscriptions.
    pub fn listener_count(&self) -> usize {
        self.inner().listeners.len()
    }

    /// Number of active connection-state watchers.
    pub fn watcher_count(&self) -> usize {
        self.inner().watchers.len()
    }

    /// Number of children currently stored under `path`.
    pub fn child_count(&self, path: &str) -> usize {
        self.inner().nodes.get(path).map_or(0, BTreeMap::len)
    }

    /// Simulate an unclean disconnect: run every registered disconnect
    /// removal, then notify connection watchers of the lost connection.
    pub fn simulate_disconnect(&self) {
        let (removals, watchers) = {
            let mut inner = self.inner();
            inner.connected = false;
            let removals = std::mem::take(&mut inner.disconnect_removals);
            let watchers: Vec<ConnectedCallback> =
                inner.watchers.iter().map(|w| w.callback.clone()).collect();
            (removals, watchers)
        };
        for path in removals {
            debug!(path = %path, "Running disconnect cleanup");
            if self.remove(&path).is_err() {
                debug!(path = %path, "Disconnect cleanup write rejected");
            }
        }
        for watcher in watchers {
            watcher(false);
        }
    }

    /// Re-establish the connection and notify watchers.
    pub fn reconnect(&self) {
        let watchers: Vec<ConnectedCallback> = {
            let mut inner = self.inner();
            inner.connected = true;
            inner.watchers.iter().map(|w| w.callback.clone()).collect()
        };
        for watcher in watchers {
            watcher(true);
        }
    }

    fn next_timestamp(inner: &mut Inner) -> i64 {
        let now = Utc::now().timestamp_millis();
        inner.last_timestamp = now.max(inner.last_timestamp + 1);
        inner.last_timestamp
    }

    fn listeners_for(inner: &Inner, path: &str, event: ChildEvent) -> Vec<ChildCallback> {
        inner
            .listeners
            .iter()
            .filter(|l| l.path == path && l.event == event)
            .map(|l| l.callback.clone())
            .collect()
    }

    /// Insert `value` at `parent`/`key`, returning the Added callbacks to
    /// fire if the key is new. Callers invoke them after the lock drops.
    fn insert_child(
        inner: &mut Inner,
        parent: &str,
        key: String,
        value: Value,
    ) -> Vec<ChildCallback> {
        let children = inner.nodes.entry(parent.to_string()).or_default();
        let is_new = !children.contains_key(&key);
        children.insert(key, value);
        if is_new {
            Self::listeners_for(inner, parent, ChildEvent::Added)
        } else {
            Vec::new()
        }
    }
}

impl Default for MemoryRealtimeStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Split a leaf path into `(parent_collection, child_key)`.
fn split_leaf(path: &str) -> Result<(&str, &str)> {
    path.rsplit_once('/')
        .filter(|(parent, key)| !parent.is_empty() && !key.is_empty())
        .ok_or_else(|| BackendError::InvalidPath(path.to_string()))
}

impl RealtimeStore for MemoryRealtimeStore {
    fn push(&self, path: &str, value: Value) -> Result<i64> {
        let mut doc = match value {
            Value::Object(map) => map,
            other => {
                return Err(BackendError::WriteFailed(format!(
                    "push expects an object, got {other}"
                )))
            }
        };

        let (timestamp, key, stored, callbacks) = {
            let mut inner = self.inner();
            if inner.fail_writes {
                return Err(BackendError::WriteFailed("store unavailable".to_string()));
            }
            let timestamp = Self::next_timestamp(&mut inner);
            doc.insert("timestamp".to_string(), Value::from(timestamp));
            let stored = Value::Object(doc);
            // Timestamp-prefixed keys keep BTreeMap order == arrival order.
            let key = format!("{timestamp:016}-{}", Uuid::new_v4().simple());
            let callbacks = Self::insert_child(&mut inner, path, key.clone(), stored.clone());
            (timestamp, key, stored, callbacks)
        };

        debug!(path = %path, key = %key, timestamp, "Pushed record");
        for callback in callbacks {
            callback(&key, &stored);
        }
        Ok(timestamp)
    }

    fn set(&self, path: &str, value: Value) -> Result<()> {
        let (parent, key) = split_leaf(path)?;
        let callbacks = {
            let mut inner = self.inner();
            if inner.fail_writes {
                return Err(BackendError::WriteFailed("store unavailable".to_string()));
            }
            Self::insert_child(&mut inner, parent, key.to_string(), value.clone())
        };
        for callback in callbacks {
            callback(key, &value);
        }
        Ok(())
    }

    fn update(&self, path: &str, children: BTreeMap<String, Value>) -> Result<()> {
        let mut pending: Vec<(String, Value, Vec<ChildCallback>)> = Vec::new();
        {
            let mut inner = self.inner();
            if inner.fail_writes {
                return Err(BackendError::WriteFailed("store unavailable".to_string()));
            }
            for (key, value) in children {
                let callbacks = Self::insert_child(&mut inner, path, key.clone(), value.clone());
                pending.push((key, value, callbacks));
            }
        }
        for (key, value, callbacks) in pending {
            for callback in callbacks {
                callback(&key, &value);
            }
        }
        Ok(())
    }

    fn remove(&self, path: &str) -> Result<()> {
        let (parent, key) = split_leaf(path)?;
        let removed = {
            let mut inner = self.inner();
            if inner.fail_writes {
                return Err(BackendError::WriteFailed("store unavailable".to_string()));
            }
            let removed = inner
                .nodes
                .get_mut(parent)
                .and_then(|children| children.remove(key));
            removed.map(|value| (value, Self::listeners_for(&inner, parent, ChildEvent::Removed)))
        };
        if let Some((value, callbacks)) = removed {
            for callback in callbacks {
                callback(key, &value);
            }
        }
        Ok(())
    }

    fn once(&self, path: &str) -> Result<Option<Value>> {
        let inner = self.inner();
        if let Some(children) = inner.nodes.get(path) {
            let map: serde_json::Map<String, Value> = children
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            return Ok(Some(Value::Object(map)));
        }
        let (parent, key) = split_leaf(path)?;
        Ok(inner
            .nodes
            .get(parent)
            .and_then(|children| children.get(key))
            .cloned())
    }

    fn subscribe_child(
        &self,
        path: &str,
        event: ChildEvent,
        callback: ChildCallback,
    ) -> Result<ListenerHandle> {
        let handle = ListenerHandle::new();
        let replay: Vec<(String, Value)> = {
            let mut inner = self.inner();
            let replay = if event == ChildEvent::Added {
                inner
                    .nodes
                    .get(path)
                    .map(|children| {
                        children
                            .iter()
                            .map(|(k, v)| (k.clone(), v.clone()))
                            .collect()
                    })
                    .unwrap_or_default()
            } else {
                Vec::new()
            };
            inner.listeners.push(ChildListener {
                handle: handle.clone(),
                path: path.to_string(),
                event,
                callback: callback.clone(),
            });
            replay
        };
        debug!(path = %path, event = ?event, replayed = replay.len(), "Child subscription added");
        for (key, value) in replay {
            callback(&key, &value);
        }
        Ok(handle)
    }

    fn subscribe_connection(&self, callback: ConnectedCallback) -> Result<ListenerHandle> {
        let handle = ListenerHandle::new();
        let connected = {
            let mut inner = self.inner();
            inner.watchers.push(ConnectionWatcher {
                handle: handle.clone(),
                callback: callback.clone(),
            });
            inner.connected
        };
        callback(connected);
        Ok(handle)
    }

    fn on_disconnect_remove(&self, path: &str) -> Result<()> {
        let mut inner = self.inner();
        if !inner.disconnect_removals.iter().any(|p| p == path) {
            inner.disconnect_removals.push(path.to_string());
        }
        Ok(())
    }

    fn unsubscribe(&self, handle: &ListenerHandle) -> Result<()> {
        let mut inner = self.inner();
        inner.listeners.retain(|l| l.handle != *handle);
        inner.watchers.retain(|w| w.handle != *handle);
        Ok(())
    }
}

struct StoredObject {
    data: Bytes,
    content_type: Option<String>,
}

#[derive(Default)]
struct ObjectsInner {
    objects: HashMap<String, StoredObject>,
    fail_next: bool,
}

/// In-memory object storage with chunked progress reporting.
pub struct MemoryObjectStore {
    inner: Mutex<ObjectsInner>,
}

/// Number of progress notifications emitted per upload.
const PROGRESS_STEPS: u64 = 4;

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(ObjectsInner::default()),
        }
    }

    fn inner(&self) -> std::sync::MutexGuard<'_, ObjectsInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Make the next upload fail before any byte is transferred.
    pub fn fail_next_upload(&self) {
        self.inner().fail_next = true;
    }

    /// Paths of every stored object, in no particular order.
    pub fn object_paths(&self) -> Vec<String> {
        self.inner().objects.keys().cloned().collect()
    }

    /// Bytes stored at `path`, if present.
    pub fn object(&self, path: &str) -> Option<Bytes> {
        self.inner().objects.get(path).map(|o| o.data.clone())
    }

    /// Stored content type for `path`, if present.
    pub fn content_type(&self, path: &str) -> Option<String> {
        self.inner()
            .objects
            .get(path)
            .and_then(|o| o.content_type.clone())
    }
}

impl Default for MemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectStore for MemoryObjectStore {
    fn upload(
        &self,
        path: &str,
        data: Bytes,
        metadata: UploadMetadata,
        observer: UploadObserver,
    ) -> Result<()> {
        let total = data.len() as u64;
        {
            let mut inner = self.inner();
            if inner.fail_next {
                inner.fail_next = false;
                drop(inner);
                observer(UploadEvent::Failed {
                    reason: "transfer interrupted".to_string(),
                });
                return Ok(());
            }
            inner.objects.insert(
                path.to_string(),
                StoredObject {
                    data,
                    content_type: metadata.content_type,
                },
            );
        }

        let step = (total / PROGRESS_STEPS).max(1);
        let mut transferred = 0;
        while transferred < total {
            transferred = (transferred + step).min(total);
            observer(UploadEvent::Progress { transferred, total });
        }

        let url = format!("memstore://{path}");
        debug!(path = %path, total, url = %url, "Upload complete");
        observer(UploadEvent::Done { url });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn record(name: &str) -> Value {
        json!({ "user": { "name": name }, "content": "hi" })
    }

    #[test]
    fn test_push_assigns_monotonic_timestamps() {
        let store = MemoryRealtimeStore::new();
        let a = store.push("messages/ch", record("a")).unwrap();
        let b = store.push("messages/ch", record("b")).unwrap();
        let c = store.push("messages/ch", record("c")).unwrap();
        assert!(a < b && b < c);
    }

    #[test]
    fn test_push_rejects_non_object() {
        let store = MemoryRealtimeStore::new();
        assert!(store.push("messages/ch", json!("bare string")).is_err());
    }

    #[test]
    fn test_added_subscription_replays_existing_children_in_order() {
        let store = MemoryRealtimeStore::new();
        for name in ["a", "b", "c"] {
            store.push("messages/ch", record(name)).unwrap();
        }

        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_cb = seen.clone();
        store
            .subscribe_child(
                "messages/ch",
                ChildEvent::Added,
                Arc::new(move |_key, value| {
                    let name = value["user"]["name"].as_str().unwrap_or("").to_string();
                    seen_cb.lock().unwrap().push(name);
                }),
            )
            .unwrap();

        store.push("messages/ch", record("d")).unwrap();
        assert_eq!(*seen.lock().unwrap(), ["a", "b", "c", "d"]);
    }

    #[test]
    fn test_removed_subscription_fires_on_remove_only() {
        let store = MemoryRealtimeStore::new();
        let removed = Arc::new(AtomicUsize::new(0));
        let removed_cb = removed.clone();
        store
            .subscribe_child(
                "typing/ch",
                ChildEvent::Removed,
                Arc::new(move |_key, _value| {
                    removed_cb.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .unwrap();

        store.set("typing/ch/u1", json!("Ada")).unwrap();
        assert_eq!(removed.load(Ordering::SeqCst), 0);
        store.remove("typing/ch/u1").unwrap();
        assert_eq!(removed.load(Ordering::SeqCst), 1);
        // Absent leaf: no event, no error.
        store.remove("typing/ch/u1").unwrap();
        assert_eq!(removed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unsubscribe_stops_delivery_and_is_idempotent() {
        let store = MemoryRealtimeStore::new();
        let count = Arc::new(AtomicUsize::new(0));
        let count_cb = count.clone();
        let handle = store
            .subscribe_child(
                "messages/ch",
                ChildEvent::Added,
                Arc::new(move |_k, _v| {
                    count_cb.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .unwrap();

        store.push("messages/ch", record("a")).unwrap();
        store.unsubscribe(&handle).unwrap();
        store.unsubscribe(&handle).unwrap();
        store.push("messages/ch", record("b")).unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(store.listener_count(), 0);
    }

    #[test]
    fn test_once_reads_leaf_and_collection() {
        let store = MemoryRealtimeStore::new();
        store.set("typing/ch/u1", json!("Ada")).unwrap();
        store.set("typing/ch/u2", json!("Grace")).unwrap();

        assert_eq!(store.once("typing/ch/u1").unwrap(), Some(json!("Ada")));
        let collection = store.once("typing/ch").unwrap().unwrap();
        assert_eq!(collection["u1"], "Ada");
        assert_eq!(collection["u2"], "Grace");
        assert_eq!(store.once("typing/other/u9").unwrap(), None);
    }

    #[test]
    fn test_disconnect_runs_registered_removals() {
        let store = MemoryRealtimeStore::new();
        store.set("typing/ch/u1", json!("Ada")).unwrap();
        store.on_disconnect_remove("typing/ch/u1").unwrap();
        store.on_disconnect_remove("typing/ch/u1").unwrap(); // deduplicated

        let states = Arc::new(Mutex::new(Vec::new()));
        let states_cb = states.clone();
        store
            .subscribe_connection(Arc::new(move |connected| {
                states_cb.lock().unwrap().push(connected);
            }))
            .unwrap();

        store.simulate_disconnect();
        assert_eq!(store.child_count("typing/ch"), 0);
        store.reconnect();
        // Initial state, disconnect, reconnect.
        assert_eq!(*states.lock().unwrap(), [true, false, true]);
    }

    #[test]
    fn test_fail_writes_rejects_every_write_kind() {
        let store = MemoryRealtimeStore::new();
        store.fail_writes(true);
        assert!(store.push("messages/ch", record("a")).is_err());
        assert!(store.set("typing/ch/u1", json!("Ada")).is_err());
        assert!(store.remove("typing/ch/u1").is_err());
        store.fail_writes(false);
        assert!(store.push("messages/ch", record("a")).is_ok());
    }

    #[test]
    fn test_upload_reports_progress_then_done() {
        let store = MemoryObjectStore::new();
        let events = Arc::new(Mutex::new(Vec::new()));
        let events_cb = events.clone();
        store
            .upload(
                "chat/public/x.jpg",
                Bytes::from_static(&[0u8; 100]),
                UploadMetadata::image_jpeg(),
                Arc::new(move |event| {
                    events_cb.lock().unwrap().push(event);
                }),
            )
            .unwrap();

        let events = events.lock().unwrap();
        assert_eq!(
            events.last(),
            Some(&UploadEvent::Done {
                url: "memstore://chat/public/x.jpg".to_string()
            })
        );
        let progress: Vec<u64> = events
            .iter()
            .filter_map(|e| match e {
                UploadEvent::Progress { transferred, .. } => Some(*transferred),
                _ => None,
            })
            .collect();
        assert_eq!(progress, [25, 50, 75, 100]);
        assert_eq!(
            store.content_type("chat/public/x.jpg").as_deref(),
            Some("image/jpeg")
        );
    }

    #[test]
    fn test_failed_upload_stores_nothing() {
        let store = MemoryObjectStore::new();
        store.fail_next_upload();
        let events = Arc::new(Mutex::new(Vec::new()));
        let events_cb = events.clone();
        store
            .upload(
                "chat/public/x.jpg",
                Bytes::from_static(b"data"),
                UploadMetadata::default(),
                Arc::new(move |event| {
                    events_cb.lock().unwrap().push(event);
                }),
            )
            .unwrap();

        assert!(matches!(
            events.lock().unwrap().as_slice(),
            [UploadEvent::Failed { .. }]
        ));
        assert!(store.object_paths().is_empty());

        // The failure hook is one-shot.
        store
            .upload(
                "chat/public/y.jpg",
                Bytes::from_static(b"data"),
                UploadMetadata::default(),
                Arc::new(|_| {}),
            )
            .unwrap();
        assert_eq!(store.object_paths(), ["chat/public/y.jpg"]);
    }
}
