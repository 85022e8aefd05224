//! # parlor-shared
//!
//! Domain types shared between the chat client components and the backend
//! contracts: identifiers, users, channels, message records, typing-presence
//! entries, starred-channel snapshots, the emoji shorthand table, and the
//! path layout used in the realtime store.

pub mod constants;
pub mod emoji;
pub mod message;
pub mod types;

pub use message::{Message, MessageBody, OutgoingMessage};
pub use types::{
    Channel, ChannelId, CreatorRef, StarredChannel, TypingUser, UserId, UserRef, Visibility,
};
