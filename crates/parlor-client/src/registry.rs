//! Subscription bookkeeping.
//!
//! Every active subscription is recorded as a (channel, stream, event)
//! triple so it can be torn down exactly once. Registering a duplicate
//! triple is refused, which is what makes `MessageFeed::subscribe`
//! idempotent per channel: a double-registered callback would double-count
//! messages and corrupt the derived aggregates.

use parlor_backend::{ChildEvent, ListenerHandle};
use parlor_shared::ChannelId;
use tracing::debug;

/// Which of a channel's two streams a registration belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Messages,
    Typing,
}

struct Registration {
    channel: ChannelId,
    stream: StreamKind,
    event: ChildEvent,
    handle: ListenerHandle,
}

/// Records channel-scoped subscriptions for exactly-once teardown.
/// The connectivity listener is not channel-scoped and is tracked
/// separately by the feed.
#[derive(Default)]
pub struct ListenerRegistry {
    entries: Vec<Registration>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a registration already exists for this triple.
    pub fn contains(&self, channel: &ChannelId, stream: StreamKind, event: ChildEvent) -> bool {
        self.entries
            .iter()
            .any(|r| r.channel == *channel && r.stream == stream && r.event == event)
    }

    /// Record a subscription. Returns `false` (and drops the handle on the
    /// floor) if the triple is already registered; callers are expected to
    /// check [`contains`](Self::contains) before subscribing.
    pub fn insert(
        &mut self,
        channel: ChannelId,
        stream: StreamKind,
        event: ChildEvent,
        handle: ListenerHandle,
    ) -> bool {
        if self.contains(&channel, stream, event) {
            debug!(channel = %channel, stream = ?stream, event = ?event, "Duplicate registration suppressed");
            return false;
        }
        self.entries.push(Registration {
            channel,
            stream,
            event,
            handle,
        });
        true
    }

    /// Remove every registration, yielding each handle exactly once for
    /// cancellation.
    pub fn drain(&mut self) -> Vec<ListenerHandle> {
        self.entries.drain(..).map(|r| r.handle).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
