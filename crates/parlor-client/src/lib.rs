//! # parlor-client
//!
//! The chat client's three state containers:
//!
//! - [`MessageFeed`] subscribes to a channel's message and typing-presence
//!   streams, aggregates records into an ordered view with derived
//!   statistics, searches loaded history, and owns the starred-channel
//!   toggle.
//! - [`MessageComposer`] captures drafts, expands emoji shorthand, writes
//!   messages, reports typing presence, and drives the attachment upload
//!   lifecycle.
//! - [`ListenerRegistry`] guarantees exactly-once teardown of every
//!   subscription.
//!
//! All backend access goes through the trait objects in `parlor-backend`;
//! nothing here talks to a concrete service.

pub mod composer;
pub mod config;
pub mod error;
pub mod feed;
pub mod registry;

pub use composer::{Key, KeyPress, MessageComposer, UploadState};
pub use config::ClientConfig;
pub use error::{ClientError, Result};
pub use feed::{ChangeNotifier, MessageFeed, UserPosts};
pub use registry::{ListenerRegistry, StreamKind};
