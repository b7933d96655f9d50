//! In-process stores for development and tests.

use std::collections::HashMap;

use async_trait::async_trait;
use keepsake_common::{Capsule, CapsuleSummary, KeepsakeError, Result, UserRecord};
use tokio::sync::RwLock;

use super::{CapsuleStore, UserStore, normalize_email};

/// Capsule store held in memory
#[derive(Default)]
pub struct MemoryCapsuleStore {
    capsules: RwLock<HashMap<String, Capsule>>,
}

impl MemoryCapsuleStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CapsuleStore for MemoryCapsuleStore {
    async fn create(&self, capsule: &Capsule) -> Result<String> {
        let mut capsules = self.capsules.write().await;
        if capsules.contains_key(&capsule.id) {
            return Err(KeepsakeError::Store(format!("Duplicate capsule id {}", capsule.id)));
        }
        capsules.insert(capsule.id.clone(), capsule.clone());
        Ok(capsule.id.clone())
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Capsule>> {
        Ok(self.capsules.read().await.get(id).cloned())
    }

    async fn update(&self, capsule: &Capsule) -> Result<bool> {
        let mut capsules = self.capsules.write().await;
        match capsules.get_mut(&capsule.id) {
            Some(stored) if stored.version == capsule.version => {
                *stored = capsule.clone();
                stored.version += 1;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<CapsuleSummary>> {
        let capsules = self.capsules.read().await;
        let mut owned: Vec<&Capsule> = capsules.values().filter(|c| c.is_owned_by(owner_id)).collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(owned.into_iter().map(Capsule::summary).collect())
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        Ok(self.capsules.write().await.remove(id).is_some())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

/// User store held in memory
#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<String, UserRecord>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create(&self, user: &UserRecord) -> Result<()> {
        let mut users = self.users.write().await;
        let email = normalize_email(&user.email);
        if users.values().any(|u| normalize_email(&u.email) == email) {
            return Err(KeepsakeError::Conflict("User already exists".to_string()));
        }
        users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<UserRecord>> {
        Ok(self.users.read().await.get(id).cloned())
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
        let email = normalize_email(email);
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| normalize_email(&u.email) == email)
            .cloned())
    }

    async fn update(&self, user: &UserRecord) -> Result<bool> {
        let mut users = self.users.write().await;
        match users.get_mut(&user.id) {
            Some(stored) if stored.version == user.version => {
                *stored = user.clone();
                stored.version += 1;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
