/// Root path for public channel message streams.
pub const MESSAGES_PATH: &str = "messages";

/// Root path for private channel message streams.
pub const PRIVATE_MESSAGES_PATH: &str = "private_messages";

/// Root path for per-channel typing presence.
pub const TYPING_PATH: &str = "typing";

/// Root path for per-user records (starred channels live under here).
pub const USERS_PATH: &str = "users";

/// Object-storage prefix for attachments sent in public channels.
pub const PUBLIC_UPLOAD_PREFIX: &str = "chat/public";

/// Object-storage prefix for attachments sent in private channels
/// (the channel id is appended so private media stays channel-scoped).
pub const PRIVATE_UPLOAD_PREFIX: &str = "chat/private";

/// Minimum visible duration of the search spinner, in milliseconds.
/// Fast local searches would otherwise flash the loading state.
pub const DEFAULT_SEARCH_SETTLE_MS: u64 = 1000;

/// Maximum attachment size in bytes (10 MiB).
pub const MAX_UPLOAD_SIZE: usize = 10 * 1024 * 1024;
