//! Message composition.
//!
//! Captures the draft, expands emoji shorthand at the insertion point,
//! writes messages to the channel's stream, maintains this user's typing
//! signal, and drives the attachment upload lifecycle. Text sends and
//! attachment sends go through the same push path, so both get the
//! server-assigned timestamp the feed's ordering relies on.

use std::sync::{Arc, Mutex, MutexGuard};

use bytes::Bytes;
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use parlor_backend::{
    BackendError, ObjectStore, RealtimeStore, UploadEvent, UploadMetadata, UploadObserver,
};
use parlor_shared::{emoji, Channel, OutgoingMessage, UserRef, Visibility};

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};

/// Attachment upload lifecycle. `Done` and `Error` are terminal and are
/// not auto-reset; a new [`MessageComposer::attach_file`] call re-enters
/// `Uploading`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UploadState {
    #[default]
    Idle,
    Uploading,
    Done,
    Error,
}

/// A key as reported by the input surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Enter,
    Char(char),
    Backspace,
}

/// One keystroke with its modifier state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyPress {
    pub key: Key,
    pub ctrl: bool,
}

impl KeyPress {
    /// Ctrl+Enter is the designated send shortcut.
    pub fn is_send_chord(&self) -> bool {
        self.ctrl && self.key == Key::Enter
    }
}

#[derive(Default)]
struct ComposerState {
    draft: String,
    sending: bool,
    errors: Vec<ClientError>,
    upload_state: UploadState,
    upload_percent: u8,
}

/// Builds and sends messages for one (channel, user) pair.
pub struct MessageComposer {
    store: Arc<dyn RealtimeStore>,
    storage: Arc<dyn ObjectStore>,
    user: UserRef,
    channel: Channel,
    config: ClientConfig,
    state: Arc<Mutex<ComposerState>>,
}

impl MessageComposer {
    pub fn new(
        store: Arc<dyn RealtimeStore>,
        storage: Arc<dyn ObjectStore>,
        user: UserRef,
        channel: Channel,
    ) -> Self {
        Self::with_config(store, storage, user, channel, ClientConfig::default())
    }

    pub fn with_config(
        store: Arc<dyn RealtimeStore>,
        storage: Arc<dyn ObjectStore>,
        user: UserRef,
        channel: Channel,
        config: ClientConfig,
    ) -> Self {
        Self {
            store,
            storage,
            user,
            channel,
            config,
            state: Arc::new(Mutex::new(ComposerState::default())),
        }
    }

    // A poisoned lock still holds consistent data; keep serving.
    fn state(&self) -> MutexGuard<'_, ComposerState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn draft(&self) -> String {
        self.state().draft.clone()
    }

    /// Replace the draft wholesale (the input surface owns text editing).
    pub fn update_draft(&self, text: impl Into<String>) {
        self.state().draft = text.into();
    }

    /// Append text to the draft, expanding any mapped `:emoji:` shorthand
    /// it contains. This is the emoji-picker insertion point; text typed
    /// through [`update_draft`](Self::update_draft) is not expanded.
    pub fn insert_text(&self, text: &str) {
        let expanded = emoji::expand(text);
        self.state().draft.push_str(&expanded);
    }

    /// Re-evaluate the typing signal. Runs on every keystroke,
    /// independently of (and more often than) [`send`](Self::send):
    /// a non-empty draft advertises this user's display name under the
    /// channel's typing path, an empty one retracts it.
    pub fn keystroke(&self) {
        let has_draft = !self.state().draft.is_empty();
        let path = self.channel.typing_entry_path(&self.user.id);
        let result = if has_draft {
            self.store.set(&path, Value::from(self.user.name.clone()))
        } else {
            self.store.remove(&path)
        };
        if let Err(e) = result {
            warn!(path = %path, error = %e, "Failed to update typing signal");
        }
    }

    /// Route a keystroke: the send chord triggers [`send`](Self::send),
    /// anything else updates the typing signal.
    pub fn handle_key(&self, press: KeyPress) -> Result<()> {
        if press.is_send_chord() {
            self.send()
        } else {
            self.keystroke();
            Ok(())
        }
    }

    /// Send the draft as a text message.
    ///
    /// An empty draft is a validation error and never reaches the backend.
    /// On success the draft, the error list, and this user's typing signal
    /// are all cleared. On write failure the draft stays intact so the
    /// user can retry.
    pub fn send(&self) -> Result<()> {
        let draft = {
            let mut state = self.state();
            if state.draft.is_empty() {
                let err = ClientError::message_required();
                state.errors.push(err.clone());
                return Err(err);
            }
            state.sending = true;
            state.draft.clone()
        };

        let outgoing = OutgoingMessage::text(self.user.clone(), draft);
        let pushed = outgoing
            .to_value()
            .map_err(|e| ClientError::Write(BackendError::from(e)))
            .and_then(|doc| {
                self.store
                    .push(&self.channel.message_stream_path(), doc)
                    .map_err(ClientError::from)
            });

        match pushed {
            Ok(timestamp) => {
                {
                    let mut state = self.state();
                    state.sending = false;
                    state.draft.clear();
                    state.errors.clear();
                }
                let typing_path = self.channel.typing_entry_path(&self.user.id);
                if let Err(e) = self.store.remove(&typing_path) {
                    warn!(path = %typing_path, error = %e, "Failed to clear typing signal");
                }
                info!(channel = %self.channel.id, timestamp, "Message sent");
                Ok(())
            }
            Err(err) => {
                let mut state = self.state();
                state.sending = false;
                state.errors.push(err.clone());
                Err(err)
            }
        }
    }

    /// Upload an attachment, then send it as an image message.
    ///
    /// The object path branches on channel visibility: private channels
    /// upload under a channel-scoped private prefix, public channels under
    /// the shared public prefix, with a generated unique filename either
    /// way. Progress is exposed as a rounded 0-100 percentage. Completion
    /// pushes an image message through the same stream as [`send`](Self::send)
    /// but leaves the draft untouched.
    pub fn attach_file(&self, data: Bytes, metadata: UploadMetadata) -> Result<()> {
        if data.len() > self.config.max_upload_size {
            let err = ClientError::Validation(format!(
                "file too large: {} bytes (max {})",
                data.len(),
                self.config.max_upload_size
            ));
            self.state().errors.push(err.clone());
            return Err(err);
        }

        let path = self.upload_path(&metadata);
        {
            let mut state = self.state();
            state.upload_state = UploadState::Uploading;
            state.upload_percent = 0;
        }
        debug!(path = %path, size = data.len(), "Starting attachment upload");

        let observer = self.upload_observer();
        if let Err(e) = self.storage.upload(&path, data, metadata, observer) {
            let err = ClientError::Upload(e.to_string());
            let mut state = self.state();
            state.upload_state = UploadState::Error;
            state.errors.push(err.clone());
            return Err(err);
        }
        Ok(())
    }

    fn upload_path(&self, metadata: &UploadMetadata) -> String {
        let extension = metadata
            .content_type
            .as_deref()
            .map(extension_for)
            .unwrap_or("jpg");
        let file_name = format!("{}.{extension}", Uuid::new_v4());
        match self.channel.visibility {
            Visibility::Private => format!(
                "{}/{}/{file_name}",
                self.config.private_upload_prefix, self.channel.id
            ),
            Visibility::Public => format!("{}/{file_name}", self.config.public_upload_prefix),
        }
    }

    fn upload_observer(&self) -> UploadObserver {
        let state = Arc::clone(&self.state);
        let store = Arc::clone(&self.store);
        let user = self.user.clone();
        let stream_path = self.channel.message_stream_path();

        Arc::new(move |event| match event {
            UploadEvent::Progress { transferred, total } => {
                let percent = if total == 0 {
                    100
                } else {
                    ((transferred as f64 / total as f64) * 100.0).round() as u8
                };
                lock_state(&state).upload_percent = percent.min(100);
            }
            UploadEvent::Done { url } => {
                let pushed = OutgoingMessage::image(user.clone(), url)
                    .to_value()
                    .map_err(BackendError::from)
                    .and_then(|doc| store.push(&stream_path, doc));
                let mut state = lock_state(&state);
                // The transfer itself succeeded either way, so the upload
                // is Done; a rejected send is surfaced as a write error.
                state.upload_state = UploadState::Done;
                match pushed {
                    Ok(timestamp) => {
                        info!(timestamp, "Attachment message sent");
                    }
                    Err(e) => {
                        warn!(error = %e, "Failed to send attachment message");
                        state.errors.push(ClientError::Write(e));
                    }
                }
            }
            UploadEvent::Failed { reason } => {
                warn!(reason = %reason, "Attachment upload failed");
                let mut state = lock_state(&state);
                state.upload_state = UploadState::Error;
                state.errors.push(ClientError::Upload(reason));
            }
        })
    }

    // ------------------------------------------------------------------
    // UI-facing state
    // ------------------------------------------------------------------

    pub fn sending(&self) -> bool {
        self.state().sending
    }

    /// Accumulated errors, oldest first.
    pub fn errors(&self) -> Vec<ClientError> {
        self.state().errors.clone()
    }

    pub fn upload_state(&self) -> UploadState {
        self.state().upload_state
    }

    /// Rounded upload progress, 0-100.
    pub fn upload_percent(&self) -> u8 {
        self.state().upload_percent
    }
}

fn lock_state<'a>(state: &'a Arc<Mutex<ComposerState>>) -> MutexGuard<'a, ComposerState> {
    state.lock().unwrap_or_else(|e| e.into_inner())
}

fn extension_for(content_type: &str) -> &'static str {
    match content_type {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        _ => "bin",
    }
}
