//! Capsule and user persistence.
//!
//! Both stores version every record. `update` is a compare-and-swap on the
//! single record: it writes only if the stored version still equals the
//! version carried by the caller, then bumps it. Unrelated records never
//! contend with each other.

mod memory;
mod rate_limit;
mod redis_store;

pub use memory::{MemoryCapsuleStore, MemoryUserStore};
pub use rate_limit::{MemoryUnlockLimiter, RedisUnlockLimiter, UnlockLimiter};
pub use redis_store::{RedisCapsuleStore, RedisUserStore};

use async_trait::async_trait;
use keepsake_common::{Capsule, CapsuleSummary, Result, UserRecord};

/// Capsule records and their mutable unlock state
#[async_trait]
pub trait CapsuleStore: Send + Sync {
    /// Persist a new capsule, returning its id
    async fn create(&self, capsule: &Capsule) -> Result<String>;

    async fn get_by_id(&self, id: &str) -> Result<Option<Capsule>>;

    /// Compare-and-swap write. Returns false if the record changed (or
    /// vanished) since `capsule.version` was read.
    async fn update(&self, capsule: &Capsule) -> Result<bool>;

    /// Owner's capsules, newest first, without content
    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<CapsuleSummary>>;

    /// Returns false if there was nothing to delete
    async fn delete(&self, id: &str) -> Result<bool>;

    /// Backend liveness
    async fn ping(&self) -> Result<()>;
}

/// User accounts and progression profiles
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with `Conflict` if the email is already registered
    async fn create(&self, user: &UserRecord) -> Result<()>;

    async fn get_by_id(&self, id: &str) -> Result<Option<UserRecord>>;

    async fn get_by_email(&self, email: &str) -> Result<Option<UserRecord>>;

    /// Compare-and-swap write, same contract as `CapsuleStore::update`
    async fn update(&self, user: &UserRecord) -> Result<bool>;
}

/// Emails are matched case-insensitively
pub fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}
