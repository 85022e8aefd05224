//! Message records as they travel through the realtime store.
//!
//! A message carries either text content or an image URL, never both and
//! never neither. The [`MessageBody`] enum makes that invariant
//! unrepresentable to violate; the untagged serde shape keeps the stored
//! document flat: `{ timestamp, user, content }` or `{ timestamp, user, image }`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::UserRef;

/// Exactly one of text content or an uploaded-media URL.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum MessageBody {
    Text { content: String },
    Image { image: String },
}

impl MessageBody {
    pub fn content(&self) -> Option<&str> {
        match self {
            MessageBody::Text { content } => Some(content),
            MessageBody::Image { .. } => None,
        }
    }

    pub fn image(&self) -> Option<&str> {
        match self {
            MessageBody::Text { .. } => None,
            MessageBody::Image { image } => Some(image),
        }
    }
}

/// A message as read back from the store. Immutable once written.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    /// Server-assigned write timestamp (milliseconds, monotonic per store).
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    pub user: UserRef,
    #[serde(flatten)]
    pub body: MessageBody,
}

/// A message as handed to the store for appending. The store assigns the
/// timestamp at write time, so the outgoing record does not carry one --
/// client clocks never enter feed ordering.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub user: UserRef,
    #[serde(flatten)]
    pub body: MessageBody,
}

impl OutgoingMessage {
    pub fn text(user: UserRef, content: impl Into<String>) -> Self {
        Self {
            user,
            body: MessageBody::Text {
                content: content.into(),
            },
        }
    }

    pub fn image(user: UserRef, url: impl Into<String>) -> Self {
        Self {
            user,
            body: MessageBody::Image { image: url.into() },
        }
    }

    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}
