use serde::{Deserialize, Serialize};

use crate::constants::{MESSAGES_PATH, PRIVATE_MESSAGES_PATH, TYPING_PATH, USERS_PATH};

/// Opaque user identifier supplied by the identity provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct UserId(pub String);

impl UserId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Store path of this user's starred-channel list.
    pub fn starred_path(&self) -> String {
        format!("{}/{}/starred", USERS_PATH, self.0)
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Opaque channel identifier. Channel selection is owned by the caller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ChannelId(pub String);

impl ChannelId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ChannelId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Snapshot of the sender embedded in every message record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserRef {
    pub id: UserId,
    /// Display name as shown next to messages.
    pub name: String,
    /// Avatar image URL.
    pub avatar: String,
}

/// Whether a channel's message stream is public or channel-member only.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Visibility {
    Public,
    Private,
}

/// Denormalized creator reference carried in channel metadata and in
/// starred-channel snapshots.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreatorRef {
    pub name: String,
    pub avatar: String,
}

/// A named conversation scope. Owns one message stream and one
/// typing-presence stream in the realtime store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Channel {
    pub id: ChannelId,
    pub name: String,
    pub details: String,
    pub created_by: CreatorRef,
    pub visibility: Visibility,
}

impl Channel {
    pub fn is_private(&self) -> bool {
        self.visibility == Visibility::Private
    }

    /// Store path of this channel's message stream. Private channels live
    /// under a separate root so their streams are never co-located with
    /// public ones.
    pub fn message_stream_path(&self) -> String {
        match self.visibility {
            Visibility::Public => format!("{}/{}", MESSAGES_PATH, self.id),
            Visibility::Private => format!("{}/{}", PRIVATE_MESSAGES_PATH, self.id),
        }
    }

    /// Store path of this channel's typing-presence collection.
    pub fn typing_path(&self) -> String {
        format!("{}/{}", TYPING_PATH, self.id)
    }

    /// Store path of one user's typing entry in this channel.
    pub fn typing_entry_path(&self, user: &UserId) -> String {
        format!("{}/{}/{}", TYPING_PATH, self.id, user)
    }

    /// Store path of this channel's entry in a user's starred list.
    pub fn starred_entry_path(&self, user: &UserId) -> String {
        format!("{}/{}", user.starred_path(), self.id)
    }

    /// Denormalized snapshot persisted when a user stars this channel.
    pub fn star_snapshot(&self) -> StarredChannel {
        StarredChannel {
            name: self.name.clone(),
            details: self.details.clone(),
            created_by: self.created_by.clone(),
        }
    }

    /// Label shown in the feed header: `#name` for public channels,
    /// `@name` for private ones.
    pub fn display_name(&self) -> String {
        let sigil = if self.is_private() { '@' } else { '#' };
        format!("{}{}", sigil, self.name)
    }
}

/// Snapshot of channel metadata stored under `users/{uid}/starred/{channel}`.
/// The existence of the entry *is* the star state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StarredChannel {
    pub name: String,
    pub details: String,
    pub created_by: CreatorRef,
}

/// One entry in the feed's "who is typing" list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TypingUser {
    pub id: UserId,
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel(visibility: Visibility) -> Channel {
        Channel {
            id: ChannelId::from("general"),
            name: "general".to_string(),
            details: "Anything goes".to_string(),
            created_by: CreatorRef {
                name: "Ada".to_string(),
                avatar: "https://avatars/ada.png".to_string(),
            },
            visibility,
        }
    }

    #[test]
    fn test_message_stream_path_by_visibility() {
        assert_eq!(
            channel(Visibility::Public).message_stream_path(),
            "messages/general"
        );
        assert_eq!(
            channel(Visibility::Private).message_stream_path(),
            "private_messages/general"
        );
    }

    #[test]
    fn test_typing_paths() {
        let ch = channel(Visibility::Public);
        assert_eq!(ch.typing_path(), "typing/general");
        assert_eq!(
            ch.typing_entry_path(&UserId::from("u1")),
            "typing/general/u1"
        );
    }

    #[test]
    fn test_starred_paths() {
        let user = UserId::from("u1");
        assert_eq!(user.starred_path(), "users/u1/starred");
        assert_eq!(
            channel(Visibility::Public).starred_entry_path(&user),
            "users/u1/starred/general"
        );
    }

    #[test]
    fn test_display_name_sigil() {
        assert_eq!(channel(Visibility::Public).display_name(), "#general");
        assert_eq!(channel(Visibility::Private).display_name(), "@general");
    }

    #[test]
    fn test_star_snapshot_serializes_camel_case() {
        let snapshot = channel(Visibility::Public).star_snapshot();
        let value = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(value["name"], "general");
        assert_eq!(value["createdBy"]["name"], "Ada");
    }
}
