//! Channel message feed.
//!
//! Subscribes to one channel's message stream and typing-presence stream,
//! folds incoming records into an ordered in-memory view, and recomputes
//! derived statistics after every mutation. Also owns the starred-channel
//! toggle, which shares the channel/user identity and the one-shot read
//! performed on subscribe.
//!
//! The message list is append-only and unbounded for the session: this is
//! a display surface, not a storage engine, and the backend owns history.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use regex::{Regex, RegexBuilder};
use serde_json::Value;
use tracing::{debug, info, warn};

use parlor_backend::{
    ChildCallback, ChildEvent, ConnectedCallback, ListenerHandle, RealtimeStore,
};
use parlor_shared::{Channel, Message, TypingUser, UserId, UserRef};

use crate::config::ClientConfig;
use crate::error::Result;
use crate::registry::{ListenerRegistry, StreamKind};

/// Post count and avatar for one sender, keyed by display name in
/// [`MessageFeed::user_posts`]. Reported upward for aggregate display
/// elsewhere in the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserPosts {
    pub avatar: String,
    pub count: usize,
}

/// Invoked after every state mutation so the caller can recompute its
/// rendered view. Derived views are pure functions of feed state and safe
/// to read eagerly from the callback.
pub type ChangeNotifier = Arc<dyn Fn() + Send + Sync>;

struct FeedState {
    channel: Option<Channel>,
    messages: Vec<Message>,
    loading: bool,
    typing_users: Vec<TypingUser>,
    unique_user_label: String,
    user_posts: HashMap<String, UserPosts>,
    starred: bool,
    search_results: Vec<Message>,
    searching: bool,
    registry: ListenerRegistry,
    connection_listener: Option<ListenerHandle>,
    notifier: Option<ChangeNotifier>,
}

impl FeedState {
    fn new() -> Self {
        Self {
            channel: None,
            messages: Vec::new(),
            loading: true,
            typing_users: Vec::new(),
            unique_user_label: "0 Users".to_string(),
            user_posts: HashMap::new(),
            starred: false,
            search_results: Vec::new(),
            searching: false,
            registry: ListenerRegistry::new(),
            connection_listener: None,
            notifier: None,
        }
    }

    /// Reset everything channel-scoped ahead of a channel switch.
    fn reset_for_channel(&mut self, channel: Channel) {
        self.channel = Some(channel);
        self.messages.clear();
        self.loading = true;
        self.typing_users.clear();
        self.unique_user_label = "0 Users".to_string();
        self.user_posts.clear();
        self.starred = false;
        self.search_results.clear();
        self.searching = false;
    }
}

/// Aggregated, searchable view of one channel's message stream.
pub struct MessageFeed {
    store: Arc<dyn RealtimeStore>,
    user: UserRef,
    config: ClientConfig,
    state: Arc<Mutex<FeedState>>,
}

impl MessageFeed {
    pub fn new(store: Arc<dyn RealtimeStore>, user: UserRef) -> Self {
        Self::with_config(store, user, ClientConfig::default())
    }

    pub fn with_config(store: Arc<dyn RealtimeStore>, user: UserRef, config: ClientConfig) -> Self {
        Self {
            store,
            user,
            config,
            state: Arc::new(Mutex::new(FeedState::new())),
        }
    }

    // A poisoned lock still holds consistent data; keep serving.
    fn state(&self) -> MutexGuard<'_, FeedState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Install the "state changed, recompute derived views" notification.
    pub fn set_change_notifier(&self, notifier: ChangeNotifier) {
        self.state().notifier = Some(notifier);
    }

    /// Subscribe this feed to `channel`.
    ///
    /// Any prior channel's registrations are torn down first. Opens exactly
    /// one message-stream subscription and one typing add/remove pair, plus
    /// a one-shot read of the user's starred entry. Re-subscribing to the
    /// same channel is suppressed per-triple by the registry, so calling
    /// this twice never double-registers a callback.
    pub fn subscribe(&self, channel: &Channel) -> Result<()> {
        let switching = {
            let mut state = self.state();
            let switching = state.channel.as_ref().map(|c| &c.id) != Some(&channel.id);
            if switching {
                state.reset_for_channel(channel.clone());
            }
            switching
        };
        if switching {
            self.remove_channel_listeners();
            info!(channel = %channel.id, "Feed subscribing");
        }

        self.add_message_listener(channel)?;
        self.add_typing_listeners(channel)?;
        self.point_connection_listener(channel)?;
        self.load_star_state(channel);
        self.notify();
        Ok(())
    }

    /// Tear down every registered listener exactly once. Safe to call more
    /// than once; also runs on drop.
    pub fn detach(&self) {
        let (handles, connection) = {
            let mut state = self.state();
            (state.registry.drain(), state.connection_listener.take())
        };
        for handle in handles.iter().chain(connection.iter()) {
            if let Err(e) = self.store.unsubscribe(handle) {
                warn!(error = %e, "Failed to unsubscribe feed listener");
            }
        }
    }

    fn remove_channel_listeners(&self) {
        let handles = self.state().registry.drain();
        for handle in &handles {
            if let Err(e) = self.store.unsubscribe(handle) {
                warn!(error = %e, "Failed to unsubscribe channel listener");
            }
        }
    }

    fn add_message_listener(&self, channel: &Channel) -> Result<()> {
        if self
            .state()
            .registry
            .contains(&channel.id, StreamKind::Messages, ChildEvent::Added)
        {
            return Ok(());
        }

        let state = Arc::clone(&self.state);
        let callback: ChildCallback = Arc::new(move |key, value| {
            let message: Message = match serde_json::from_value(value.clone()) {
                Ok(m) => m,
                Err(e) => {
                    warn!(key, error = %e, "Dropping malformed message record");
                    return;
                }
            };
            let notifier = {
                let mut state = lock_state(&state);
                state.messages.push(message);
                state.loading = false;
                recompute_derived(&mut state);
                state.notifier.clone()
            };
            run_notifier(notifier);
        });

        let handle =
            self.store
                .subscribe_child(&channel.message_stream_path(), ChildEvent::Added, callback)?;
        self.state().registry.insert(
            channel.id.clone(),
            StreamKind::Messages,
            ChildEvent::Added,
            handle,
        );
        Ok(())
    }

    fn add_typing_listeners(&self, channel: &Channel) -> Result<()> {
        let typing_path = channel.typing_path();

        if !self
            .state()
            .registry
            .contains(&channel.id, StreamKind::Typing, ChildEvent::Added)
        {
            let state = Arc::clone(&self.state);
            let own_id = self.user.id.clone();
            let callback: ChildCallback = Arc::new(move |key, value| {
                // Our own typing signal is not news.
                if key == own_id.as_str() {
                    return;
                }
                let name = match value.as_str() {
                    Some(name) => name.to_string(),
                    None => {
                        warn!(key, "Dropping malformed typing entry");
                        return;
                    }
                };
                let notifier = {
                    let mut state = lock_state(&state);
                    if state.typing_users.iter().all(|t| t.id.as_str() != key) {
                        state.typing_users.push(TypingUser {
                            id: UserId::from(key),
                            name,
                        });
                    }
                    state.notifier.clone()
                };
                run_notifier(notifier);
            });
            let handle = self
                .store
                .subscribe_child(&typing_path, ChildEvent::Added, callback)?;
            self.state().registry.insert(
                channel.id.clone(),
                StreamKind::Typing,
                ChildEvent::Added,
                handle,
            );
        }

        if !self
            .state()
            .registry
            .contains(&channel.id, StreamKind::Typing, ChildEvent::Removed)
        {
            let state = Arc::clone(&self.state);
            let callback: ChildCallback = Arc::new(move |key, _value| {
                let notifier = {
                    let mut state = lock_state(&state);
                    state.typing_users.retain(|t| t.id.as_str() != key);
                    state.notifier.clone()
                };
                run_notifier(notifier);
            });
            let handle = self
                .store
                .subscribe_child(&typing_path, ChildEvent::Removed, callback)?;
            self.state().registry.insert(
                channel.id.clone(),
                StreamKind::Typing,
                ChildEvent::Removed,
                handle,
            );
        }

        Ok(())
    }

    /// Keep a single connectivity listener pointed at the current
    /// channel's typing entry: whenever the connection is (re)established,
    /// (re)install the server-side cleanup that clears this user's typing
    /// signal on an unclean disconnect.
    fn point_connection_listener(&self, channel: &Channel) -> Result<()> {
        let cleanup_path = channel.typing_entry_path(&self.user.id);
        let store = Arc::clone(&self.store);
        let callback: ConnectedCallback = Arc::new(move |connected| {
            if connected {
                if let Err(e) = store.on_disconnect_remove(&cleanup_path) {
                    warn!(error = %e, "Failed to install typing disconnect cleanup");
                }
            }
        });
        let handle = self.store.subscribe_connection(callback)?;
        let previous = self.state().connection_listener.replace(handle);
        if let Some(previous) = previous {
            if let Err(e) = self.store.unsubscribe(&previous) {
                warn!(error = %e, "Failed to unsubscribe stale connectivity listener");
            }
        }
        Ok(())
    }

    /// One-shot read of the user's starred list; the entry's existence is
    /// the star state. Read failures are logged and leave the flag unset.
    fn load_star_state(&self, channel: &Channel) {
        let starred = match self.store.once(&self.user.id.starred_path()) {
            Ok(Some(Value::Object(entries))) => entries.contains_key(channel.id.as_str()),
            Ok(_) => false,
            Err(e) => {
                warn!(channel = %channel.id, error = %e, "Failed to read starred channels");
                false
            }
        };
        self.state().starred = starred;
    }

    /// Flip the star flag optimistically, then persist. The write is
    /// fire-and-forget: a failure is logged and the local flag is not
    /// rolled back.
    pub fn toggle_star(&self) {
        let (channel, starred) = {
            let mut state = self.state();
            state.starred = !state.starred;
            (state.channel.clone(), state.starred)
        };
        self.notify();
        let Some(channel) = channel else {
            debug!("Star toggled with no subscribed channel");
            return;
        };

        if starred {
            let snapshot = match serde_json::to_value(channel.star_snapshot()) {
                Ok(value) => value,
                Err(e) => {
                    warn!(channel = %channel.id, error = %e, "Failed to encode star snapshot");
                    return;
                }
            };
            let entry = std::collections::BTreeMap::from([(channel.id.to_string(), snapshot)]);
            if let Err(e) = self.store.update(&self.user.id.starred_path(), entry) {
                warn!(channel = %channel.id, error = %e, "Failed to persist channel star");
            }
        } else if let Err(e) = self
            .store
            .remove(&channel.starred_entry_path(&self.user.id))
        {
            warn!(channel = %channel.id, error = %e, "Failed to remove channel star");
        }
    }

    /// Filter already-loaded messages by a case-insensitive match on text
    /// content or sender name. Purely local; never queries the backend and
    /// never mutates the message list. The searching flag stays set for
    /// the configured settle delay so fast queries do not flicker.
    pub async fn search(&self, term: &str) -> Vec<Message> {
        let matcher = Matcher::new(term);
        let results = {
            let mut state = self.state();
            state.searching = true;
            let results: Vec<Message> = state
                .messages
                .iter()
                .filter(|m| matcher.matches(m))
                .cloned()
                .collect();
            state.search_results = results.clone();
            results
        };
        self.notify();

        tokio::time::sleep(self.config.search_settle).await;
        self.state().searching = false;
        self.notify();
        results
    }

    fn notify(&self) {
        // Bind first so the state lock is released before the callback runs.
        let notifier = self.state().notifier.clone();
        run_notifier(notifier);
    }

    // ------------------------------------------------------------------
    // Derived views
    // ------------------------------------------------------------------

    pub fn messages(&self) -> Vec<Message> {
        self.state().messages.clone()
    }

    pub fn loading(&self) -> bool {
        self.state().loading
    }

    pub fn typing_users(&self) -> Vec<TypingUser> {
        self.state().typing_users.clone()
    }

    /// `"1 User"` when exactly one distinct sender name exists, else
    /// `"N Users"` (including `"0 Users"`).
    pub fn unique_user_label(&self) -> String {
        self.state().unique_user_label.clone()
    }

    pub fn user_posts(&self) -> HashMap<String, UserPosts> {
        self.state().user_posts.clone()
    }

    pub fn is_starred(&self) -> bool {
        self.state().starred
    }

    pub fn search_results(&self) -> Vec<Message> {
        self.state().search_results.clone()
    }

    pub fn searching(&self) -> bool {
        self.state().searching
    }

    /// `#name` / `@name` header label for the subscribed channel.
    pub fn channel_label(&self) -> Option<String> {
        self.state().channel.as_ref().map(Channel::display_name)
    }
}

impl Drop for MessageFeed {
    fn drop(&mut self) {
        self.detach();
    }
}

fn lock_state<'a>(state: &'a Arc<Mutex<FeedState>>) -> MutexGuard<'a, FeedState> {
    state.lock().unwrap_or_else(|e| e.into_inner())
}

fn run_notifier(notifier: Option<ChangeNotifier>) {
    if let Some(notifier) = notifier {
        notifier();
    }
}

/// Recompute the unique-user label and per-sender post counts from the
/// full message list.
fn recompute_derived(state: &mut FeedState) {
    let mut names: Vec<&str> = Vec::new();
    for message in &state.messages {
        if !names.contains(&message.user.name.as_str()) {
            names.push(&message.user.name);
        }
    }
    let plural = names.len() != 1;
    state.unique_user_label = format!("{} User{}", names.len(), if plural { "s" } else { "" });

    let mut posts: HashMap<String, UserPosts> = HashMap::new();
    for message in &state.messages {
        posts
            .entry(message.user.name.clone())
            .and_modify(|p| p.count += 1)
            .or_insert_with(|| UserPosts {
                avatar: message.user.avatar.clone(),
                count: 1,
            });
    }
    state.user_posts = posts;
}

/// Case-insensitive message matcher. A term that is not a valid regex
/// degrades to a substring match, so search itself can never fail.
enum Matcher {
    Pattern(Regex),
    Substring(String),
}

impl Matcher {
    fn new(term: &str) -> Self {
        match RegexBuilder::new(term).case_insensitive(true).build() {
            Ok(pattern) => Self::Pattern(pattern),
            Err(_) => Self::Substring(term.to_lowercase()),
        }
    }

    fn matches(&self, message: &Message) -> bool {
        match self {
            Self::Pattern(pattern) => {
                message
                    .body
                    .content()
                    .map(|c| pattern.is_match(c))
                    .unwrap_or(false)
                    || pattern.is_match(&message.user.name)
            }
            Self::Substring(needle) => {
                message
                    .body
                    .content()
                    .map(|c| c.to_lowercase().contains(needle))
                    .unwrap_or(false)
                    || message.user.name.to_lowercase().contains(needle)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parlor_backend::MemoryRealtimeStore;
    use parlor_shared::{ChannelId, CreatorRef, OutgoingMessage, Visibility};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn user(id: &str, name: &str) -> UserRef {
        UserRef {
            id: UserId::from(id),
            name: name.to_string(),
            avatar: format!("https://avatars/{id}.png"),
        }
    }

    fn channel(id: &str, visibility: Visibility) -> Channel {
        Channel {
            id: ChannelId::from(id),
            name: id.to_string(),
            details: "test channel".to_string(),
            created_by: CreatorRef {
                name: "Ada".to_string(),
                avatar: "https://avatars/ada.png".to_string(),
            },
            visibility,
        }
    }

    fn fast_config() -> ClientConfig {
        ClientConfig {
            search_settle: Duration::from_millis(1),
            ..ClientConfig::default()
        }
    }

    fn push_text(store: &MemoryRealtimeStore, ch: &Channel, from: &UserRef, text: &str) {
        let doc = OutgoingMessage::text(from.clone(), text).to_value().unwrap();
        store.push(&ch.message_stream_path(), doc).unwrap();
    }

    fn feed_on(store: &Arc<MemoryRealtimeStore>, viewer: &UserRef, ch: &Channel) -> MessageFeed {
        let store_dyn: Arc<dyn RealtimeStore> = store.clone();
        let feed = MessageFeed::with_config(store_dyn, viewer.clone(), fast_config());
        feed.subscribe(ch).unwrap();
        feed
    }

    #[test]
    fn test_unique_user_label_singular_and_plural() {
        let store = Arc::new(MemoryRealtimeStore::new());
        let viewer = user("u0", "Viewer");
        let ch = channel("general", Visibility::Public);
        let feed = feed_on(&store, &viewer, &ch);

        assert_eq!(feed.unique_user_label(), "0 Users");
        assert!(feed.loading());

        let ada = user("u1", "Ada");
        push_text(&store, &ch, &ada, "one");
        push_text(&store, &ch, &ada, "two");
        assert_eq!(feed.unique_user_label(), "1 User");
        assert!(!feed.loading());

        push_text(&store, &ch, &user("u2", "Grace"), "three");
        assert_eq!(feed.unique_user_label(), "2 Users");
    }

    #[test]
    fn test_user_posts_counts_and_avatars() {
        let store = Arc::new(MemoryRealtimeStore::new());
        let ch = channel("general", Visibility::Public);
        let feed = feed_on(&store, &user("u0", "Viewer"), &ch);

        let ada = user("u1", "Ada");
        push_text(&store, &ch, &ada, "one");
        push_text(&store, &ch, &ada, "two");
        push_text(&store, &ch, &user("u2", "Grace"), "three");

        let posts = feed.user_posts();
        assert_eq!(posts["Ada"].count, 2);
        assert_eq!(posts["Ada"].avatar, "https://avatars/u1.png");
        assert_eq!(posts["Grace"].count, 1);
    }

    #[test]
    fn test_replay_loads_existing_history_in_order() {
        let store = Arc::new(MemoryRealtimeStore::new());
        let ch = channel("general", Visibility::Public);
        let ada = user("u1", "Ada");
        for text in ["first", "second", "third"] {
            push_text(&store, &ch, &ada, text);
        }

        let feed = feed_on(&store, &user("u0", "Viewer"), &ch);
        let contents: Vec<String> = feed
            .messages()
            .iter()
            .map(|m| m.body.content().unwrap().to_string())
            .collect();
        assert_eq!(contents, ["first", "second", "third"]);
    }

    #[test]
    fn test_resubscribe_same_channel_does_not_duplicate_listeners() {
        let store = Arc::new(MemoryRealtimeStore::new());
        let ch = channel("general", Visibility::Public);
        let feed = feed_on(&store, &user("u0", "Viewer"), &ch);

        feed.subscribe(&ch).unwrap();
        // One message listener plus the typing add/remove pair.
        assert_eq!(store.listener_count(), 3);

        push_text(&store, &ch, &user("u1", "Ada"), "once");
        assert_eq!(feed.messages().len(), 1);
        assert_eq!(feed.user_posts()["Ada"].count, 1);
    }

    #[test]
    fn test_channel_switch_tears_down_and_resets() {
        let store = Arc::new(MemoryRealtimeStore::new());
        let general = channel("general", Visibility::Public);
        let random = channel("random", Visibility::Public);
        let feed = feed_on(&store, &user("u0", "Viewer"), &general);

        push_text(&store, &general, &user("u1", "Ada"), "in general");
        assert_eq!(feed.messages().len(), 1);

        feed.subscribe(&random).unwrap();
        assert_eq!(store.listener_count(), 3);
        assert!(feed.messages().is_empty());
        assert_eq!(feed.unique_user_label(), "0 Users");

        // Messages in the old channel no longer reach the feed.
        push_text(&store, &general, &user("u1", "Ada"), "still in general");
        assert!(feed.messages().is_empty());
        assert_eq!(feed.channel_label().as_deref(), Some("#random"));
    }

    #[test]
    fn test_typing_users_add_remove_and_self_filter() {
        let store = Arc::new(MemoryRealtimeStore::new());
        let ch = channel("general", Visibility::Public);
        let viewer = user("u0", "Viewer");
        let feed = feed_on(&store, &viewer, &ch);

        store
            .set(&ch.typing_entry_path(&UserId::from("u1")), json!("Ada"))
            .unwrap();
        store
            .set(&ch.typing_entry_path(&viewer.id), json!("Viewer"))
            .unwrap();
        let typing = feed.typing_users();
        assert_eq!(typing.len(), 1);
        assert_eq!(typing[0].name, "Ada");

        store
            .remove(&ch.typing_entry_path(&UserId::from("u1")))
            .unwrap();
        assert!(feed.typing_users().is_empty());
    }

    #[test]
    fn test_disconnect_clears_own_typing_signal() {
        let store = Arc::new(MemoryRealtimeStore::new());
        let ch = channel("general", Visibility::Public);
        let viewer = user("u0", "Viewer");
        let _feed = feed_on(&store, &viewer, &ch);

        store
            .set(&ch.typing_entry_path(&viewer.id), json!("Viewer"))
            .unwrap();
        store.simulate_disconnect();
        assert_eq!(store.child_count(&ch.typing_path()), 0);
    }

    #[test]
    fn test_toggle_star_persists_snapshot_then_removes_it() {
        let store = Arc::new(MemoryRealtimeStore::new());
        let ch = channel("general", Visibility::Public);
        let viewer = user("u0", "Viewer");
        let feed = feed_on(&store, &viewer, &ch);
        assert!(!feed.is_starred());

        feed.toggle_star();
        assert!(feed.is_starred());
        let entry = store
            .once(&ch.starred_entry_path(&viewer.id))
            .unwrap()
            .unwrap();
        assert_eq!(entry["name"], "general");
        assert_eq!(entry["createdBy"]["name"], "Ada");

        feed.toggle_star();
        assert!(!feed.is_starred());
        assert_eq!(store.once(&ch.starred_entry_path(&viewer.id)).unwrap(), None);
    }

    #[test]
    fn test_star_state_loaded_on_subscribe() {
        let store = Arc::new(MemoryRealtimeStore::new());
        let ch = channel("general", Visibility::Public);
        let viewer = user("u0", "Viewer");
        store
            .set(
                &ch.starred_entry_path(&viewer.id),
                serde_json::to_value(ch.star_snapshot()).unwrap(),
            )
            .unwrap();

        let feed = feed_on(&store, &viewer, &ch);
        assert!(feed.is_starred());
    }

    #[test]
    fn test_star_write_failure_does_not_roll_back_flag() {
        let store = Arc::new(MemoryRealtimeStore::new());
        let ch = channel("general", Visibility::Public);
        let feed = feed_on(&store, &user("u0", "Viewer"), &ch);

        store.fail_writes(true);
        feed.toggle_star();
        // Documented inconsistency window: local flag diverges.
        assert!(feed.is_starred());
        store.fail_writes(false);
        assert_eq!(
            store
                .once(&ch.starred_entry_path(&UserId::from("u0")))
                .unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_search_matches_content_and_sender_name() {
        let store = Arc::new(MemoryRealtimeStore::new());
        let ch = channel("general", Visibility::Public);
        let feed = feed_on(&store, &user("u0", "Viewer"), &ch);

        push_text(&store, &ch, &user("u1", "Ada"), "Shipping the release");
        push_text(&store, &ch, &user("u2", "Grace"), "lunch?");

        let results = feed.search("SHIP").await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].body.content(), Some("Shipping the release"));

        // Sender-name match.
        let results = feed.search("grace").await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].user.name, "Grace");
        assert!(!feed.searching());
    }

    #[tokio::test]
    async fn test_search_is_idempotent_and_non_mutating() {
        let store = Arc::new(MemoryRealtimeStore::new());
        let ch = channel("general", Visibility::Public);
        let feed = feed_on(&store, &user("u0", "Viewer"), &ch);
        push_text(&store, &ch, &user("u1", "Ada"), "alpha");
        push_text(&store, &ch, &user("u1", "Ada"), "beta");

        let before = feed.messages();
        let first = feed.search("alp").await;
        let second = feed.search("alp").await;
        assert_eq!(first, second);
        assert_eq!(feed.messages(), before);
    }

    #[tokio::test]
    async fn test_invalid_regex_degrades_to_substring() {
        let store = Arc::new(MemoryRealtimeStore::new());
        let ch = channel("general", Visibility::Public);
        let feed = feed_on(&store, &user("u0", "Viewer"), &ch);
        push_text(&store, &ch, &user("u1", "Ada"), "cost [estimate] attached");

        let results = feed.search("[estimate]").await;
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn test_detach_removes_all_listeners_once() {
        let store = Arc::new(MemoryRealtimeStore::new());
        let ch = channel("general", Visibility::Public);
        let feed = feed_on(&store, &user("u0", "Viewer"), &ch);
        assert_eq!(store.listener_count(), 3);
        assert_eq!(store.watcher_count(), 1);

        feed.detach();
        assert_eq!(store.listener_count(), 0);
        assert_eq!(store.watcher_count(), 0);
        feed.detach(); // second call is a no-op
        assert_eq!(store.listener_count(), 0);
    }

    #[test]
    fn test_change_notifier_fires_on_message_arrival() {
        let store = Arc::new(MemoryRealtimeStore::new());
        let ch = channel("general", Visibility::Public);
        let feed = feed_on(&store, &user("u0", "Viewer"), &ch);

        let fired = Arc::new(AtomicUsize::new(0));
        let fired_cb = fired.clone();
        feed.set_change_notifier(Arc::new(move || {
            fired_cb.fetch_add(1, Ordering::SeqCst);
        }));

        push_text(&store, &ch, &user("u1", "Ada"), "hello");
        assert!(fired.load(Ordering::SeqCst) >= 1);
    }

    #[test]
    fn test_malformed_record_is_dropped_not_fatal() {
        let store = Arc::new(MemoryRealtimeStore::new());
        let ch = channel("general", Visibility::Public);
        let feed = feed_on(&store, &user("u0", "Viewer"), &ch);

        store
            .push(&ch.message_stream_path(), json!({ "garbage": true }))
            .unwrap();
        push_text(&store, &ch, &user("u1", "Ada"), "still works");
        assert_eq!(feed.messages().len(), 1);
    }
}
