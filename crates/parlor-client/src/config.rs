//! Client configuration loaded from environment variables.
//!
//! All settings have sensible defaults so components can be constructed
//! with zero configuration.

use std::time::Duration;

use parlor_shared::constants::{
    DEFAULT_SEARCH_SETTLE_MS, MAX_UPLOAD_SIZE, PRIVATE_UPLOAD_PREFIX, PUBLIC_UPLOAD_PREFIX,
};

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Minimum visible duration of the search loading state. Results are
    /// computed immediately; this delay only prevents UI flicker on fast
    /// queries.
    /// Env: `PARLOR_SEARCH_SETTLE_MS`
    /// Default: `1000`
    pub search_settle: Duration,

    /// Maximum attachment size in bytes.
    /// Env: `PARLOR_MAX_UPLOAD_SIZE`
    /// Default: 10 MiB
    pub max_upload_size: usize,

    /// Object-storage prefix for public-channel attachments.
    /// Env: `PARLOR_PUBLIC_UPLOAD_PREFIX`
    /// Default: `chat/public`
    pub public_upload_prefix: String,

    /// Object-storage prefix for private-channel attachments; the channel
    /// id is appended below this.
    /// Env: `PARLOR_PRIVATE_UPLOAD_PREFIX`
    /// Default: `chat/private`
    pub private_upload_prefix: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            search_settle: Duration::from_millis(DEFAULT_SEARCH_SETTLE_MS),
            max_upload_size: MAX_UPLOAD_SIZE,
            public_upload_prefix: PUBLIC_UPLOAD_PREFIX.to_string(),
            private_upload_prefix: PRIVATE_UPLOAD_PREFIX.to_string(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("PARLOR_SEARCH_SETTLE_MS") {
            if let Ok(ms) = val.parse::<u64>() {
                config.search_settle = Duration::from_millis(ms);
            } else {
                tracing::warn!(value = %val, "Invalid PARLOR_SEARCH_SETTLE_MS, using default");
            }
        }

        if let Ok(val) = std::env::var("PARLOR_MAX_UPLOAD_SIZE") {
            if let Ok(bytes) = val.parse::<usize>() {
                config.max_upload_size = bytes;
            } else {
                tracing::warn!(value = %val, "Invalid PARLOR_MAX_UPLOAD_SIZE, using default");
            }
        }

        if let Ok(prefix) = std::env::var("PARLOR_PUBLIC_UPLOAD_PREFIX") {
            config.public_upload_prefix = prefix;
        }

        if let Ok(prefix) = std::env::var("PARLOR_PRIVATE_UPLOAD_PREFIX") {
            config.private_upload_prefix = prefix;
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.search_settle, Duration::from_millis(1000));
        assert_eq!(config.public_upload_prefix, "chat/public");
        assert_eq!(config.private_upload_prefix, "chat/private");
        assert_eq!(config.max_upload_size, 10 * 1024 * 1024);
    }
}
