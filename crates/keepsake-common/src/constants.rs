//! Shared constants for Keepsake components.

/// Default Redis connection URL
pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";

/// Default Vault HTTP listen address
pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:5000";

/// Maximum capsule content length, in characters
pub const MAX_CONTENT_CHARS: usize = 3000;

/// Minimum accepted password length
pub const MIN_PASSWORD_CHARS: usize = 6;

/// Default bearer token validity (7 days)
pub const DEFAULT_TOKEN_TTL_SECS: u64 = 7 * 24 * 60 * 60;

/// Default judgment oracle call timeout
pub const DEFAULT_ORACLE_TIMEOUT_SECS: u64 = 30;

/// Default unlock attempts allowed per user per minute
pub const DEFAULT_MAX_UNLOCKS_PER_MINUTE: u32 = 10;

/// Hint reported once a wrong answer finds no hint to show
pub const NO_MORE_HINTS: &str = "No more hints available";

/// postsCompleted threshold for the intermediate tier
pub const INTERMEDIATE_THRESHOLD: u32 = 25;

/// postsCompleted threshold for the advanced tier
pub const ADVANCED_THRESHOLD: u32 = 100;

/// Redis key prefixes
pub mod redis_keys {
    /// Capsule record: capsule:{capsule_id}
    pub const CAPSULE_PREFIX: &str = "capsule:";

    /// Owner index (sorted set by creation time): capsules:owner:{user_id}
    pub const OWNER_INDEX_PREFIX: &str = "capsules:owner:";

    /// User record: user:{user_id}
    pub const USER_PREFIX: &str = "user:";

    /// Email to user id: user:email:{email}
    pub const USER_EMAIL_PREFIX: &str = "user:email:";

    /// Unlock rate limit counters: ratelimit:unlock:{user_id}
    pub const UNLOCK_RATELIMIT_PREFIX: &str = "ratelimit:unlock:";
}

/// HTTP header names
pub mod headers {
    /// Prefix of a bearer credential
    pub const BEARER_PREFIX: &str = "Bearer ";
}
