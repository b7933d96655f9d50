//! Redis-backed stores.
//!
//! Records are JSON strings. Updates go through a Lua compare-and-swap on
//! the record's `version` field, so concurrent writers to the same key are
//! serialized by Redis while different keys proceed independently.

use async_trait::async_trait;
use keepsake_common::constants::redis_keys::{
    CAPSULE_PREFIX, OWNER_INDEX_PREFIX, USER_EMAIL_PREFIX, USER_PREFIX,
};
use keepsake_common::{Capsule, CapsuleSummary, KeepsakeError, Result, UserRecord};
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use serde::Serialize;

use super::{CapsuleStore, UserStore, normalize_email};

/// KEYS[1] = record key, ARGV[1] = expected version, ARGV[2] = new JSON
const COMPARE_AND_SWAP: &str = r#"
local current = redis.call('GET', KEYS[1])
if not current then
    return 0
end
local stored = cjson.decode(current)
if tonumber(stored['version'] or 0) ~= tonumber(ARGV[1]) then
    return 0
end
redis.call('SET', KEYS[1], ARGV[2])
return 1
"#;

fn store_err(err: redis::RedisError) -> KeepsakeError {
    KeepsakeError::Store(err.to_string())
}

fn capsule_key(id: &str) -> String {
    format!("{}{}", CAPSULE_PREFIX, id)
}

fn owner_key(owner_id: &str) -> String {
    format!("{}{}", OWNER_INDEX_PREFIX, owner_id)
}

fn user_key(id: &str) -> String {
    format!("{}{}", USER_PREFIX, id)
}

fn email_key(email: &str) -> String {
    format!("{}{}", USER_EMAIL_PREFIX, normalize_email(email))
}

/// Run the CAS script for a record whose in-hand copy has `version`
async fn compare_and_swap<T: Serialize>(
    redis: &ConnectionManager,
    key: &str,
    expected_version: u64,
    next: &T,
) -> Result<bool> {
    let mut conn = redis.clone();
    let data = serde_json::to_string(next)?;
    let swapped: i32 = redis::Script::new(COMPARE_AND_SWAP)
        .key(key)
        .arg(expected_version)
        .arg(data)
        .invoke_async(&mut conn)
        .await
        .map_err(store_err)?;
    Ok(swapped == 1)
}

/// Capsule store on Redis
pub struct RedisCapsuleStore {
    redis: ConnectionManager,
}

impl RedisCapsuleStore {
    pub fn new(redis: ConnectionManager) -> Self {
        Self { redis }
    }
}

#[async_trait]
impl CapsuleStore for RedisCapsuleStore {
    async fn create(&self, capsule: &Capsule) -> Result<String> {
        let mut conn = self.redis.clone();
        let data = serde_json::to_string(capsule)?;

        let _: () = redis::pipe()
            .atomic()
            .set(capsule_key(&capsule.id), data)
            .ignore()
            .zadd(
                owner_key(&capsule.owner_id),
                &capsule.id,
                capsule.created_at.timestamp_millis(),
            )
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(store_err)?;

        tracing::debug!(capsule_id = %capsule.id, owner_id = %capsule.owner_id, "Capsule stored");
        Ok(capsule.id.clone())
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Capsule>> {
        let mut conn = self.redis.clone();
        let data: Option<String> = conn.get(capsule_key(id)).await.map_err(store_err)?;

        match data {
            Some(d) => Ok(Some(serde_json::from_str(&d)?)),
            None => Ok(None),
        }
    }

    async fn update(&self, capsule: &Capsule) -> Result<bool> {
        let mut next = capsule.clone();
        next.version += 1;
        compare_and_swap(&self.redis, &capsule_key(&capsule.id), capsule.version, &next).await
    }

    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<CapsuleSummary>> {
        let mut conn = self.redis.clone();
        let ids: Vec<String> = conn
            .zrevrange(owner_key(owner_id), 0, -1)
            .await
            .map_err(store_err)?;

        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let keys: Vec<String> = ids.iter().map(|id| capsule_key(id)).collect();
        let records: Vec<Option<String>> = conn.mget(keys).await.map_err(store_err)?;

        let mut summaries = Vec::with_capacity(records.len());
        for data in records.into_iter().flatten() {
            let capsule: Capsule = serde_json::from_str(&data)?;
            summaries.push(capsule.summary());
        }
        Ok(summaries)
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let Some(capsule) = self.get_by_id(id).await? else {
            return Ok(false);
        };

        let mut conn = self.redis.clone();
        let (removed,): (i64,) = redis::pipe()
            .atomic()
            .del(capsule_key(id))
            .zrem(owner_key(&capsule.owner_id), id)
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(store_err)?;

        Ok(removed > 0)
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.redis.clone();
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(store_err)?;
        Ok(())
    }
}

/// User store on Redis
pub struct RedisUserStore {
    redis: ConnectionManager,
}

impl RedisUserStore {
    pub fn new(redis: ConnectionManager) -> Self {
        Self { redis }
    }
}

#[async_trait]
impl UserStore for RedisUserStore {
    async fn create(&self, user: &UserRecord) -> Result<()> {
        let mut conn = self.redis.clone();

        // Claim the email first; the claim is the uniqueness check
        let claimed: bool = conn
            .set_nx(email_key(&user.email), &user.id)
            .await
            .map_err(store_err)?;
        if !claimed {
            return Err(KeepsakeError::Conflict("User already exists".to_string()));
        }

        let data = serde_json::to_string(user)?;
        if let Err(e) = conn.set::<_, _, ()>(user_key(&user.id), data).await {
            let _: std::result::Result<(), _> = conn.del(email_key(&user.email)).await;
            return Err(store_err(e));
        }

        Ok(())
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<UserRecord>> {
        let mut conn = self.redis.clone();
        let data: Option<String> = conn.get(user_key(id)).await.map_err(store_err)?;

        match data {
            Some(d) => Ok(Some(serde_json::from_str(&d)?)),
            None => Ok(None),
        }
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
        let mut conn = self.redis.clone();
        let id: Option<String> = conn.get(email_key(email)).await.map_err(store_err)?;

        match id {
            Some(id) => self.get_by_id(&id).await,
            None => Ok(None),
        }
    }

    async fn update(&self, user: &UserRecord) -> Result<bool> {
        let mut next = user.clone();
        next.version += 1;
        compare_and_swap(&self.redis, &user_key(&user.id), user.version, &next).await
    }
}
