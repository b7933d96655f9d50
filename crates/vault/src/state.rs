//! Application state and shared resources.

use anyhow::{Context, Result};
use redis::aio::ConnectionManager;
use std::sync::Arc;
use std::time::Duration;

use crate::auth::JwtService;
use crate::config::{AppConfig, StorageBackend};
use crate::engine::{CapsuleService, EngineSettings};
use crate::oracle::{
    AnswerVerifier, ContentValidator, JudgmentOracle, OpenAiOracle, OracleAnswerVerifier,
    OracleContentValidator, OraclePuzzleGenerator, PuzzleGenerator,
};
use crate::store::{
    CapsuleStore, MemoryCapsuleStore, MemoryUnlockLimiter, MemoryUserStore, RedisCapsuleStore,
    RedisUnlockLimiter, RedisUserStore, UnlockLimiter, UserStore,
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Capsule lifecycle engine
    pub capsules: Arc<CapsuleService>,

    /// User accounts
    pub users: Arc<dyn UserStore>,

    /// Capsule store, for readiness checks
    pub capsule_store: Arc<dyn CapsuleStore>,

    /// Token issuer/validator
    pub jwt: Arc<JwtService>,

    /// Unlock attempt limiter
    pub unlock_limiter: Arc<dyn UnlockLimiter>,
}

/// Oracle-facing collaborators of the engine
pub struct Judges {
    pub validator: Arc<dyn ContentValidator>,
    pub generator: Arc<dyn PuzzleGenerator>,
    pub verifier: Arc<dyn AnswerVerifier>,
}

impl Judges {
    /// All three contracts answered by one oracle
    pub fn from_oracle(oracle: Arc<dyn JudgmentOracle>) -> Self {
        Self {
            validator: Arc::new(OracleContentValidator::new(oracle.clone())),
            generator: Arc::new(OraclePuzzleGenerator::new(oracle.clone())),
            verifier: Arc::new(OracleAnswerVerifier::new(oracle)),
        }
    }
}

impl AppState {
    /// Create application state, connecting to the configured backend
    pub async fn new(config: AppConfig) -> Result<Self> {
        let oracle = OpenAiOracle::new(
            config.oracle.api_url.clone(),
            config.oracle.api_key.clone(),
            config.oracle.model.clone(),
            // The engine applies its own deadline; this only bounds the socket
            Duration::from_secs(config.oracle.timeout_secs.saturating_add(5)),
        )
        .context("Failed to create oracle client")?;
        let judges = Judges::from_oracle(Arc::new(oracle));

        let max_unlocks = config.rate_limit.max_unlocks_per_minute;
        let capsules: Arc<dyn CapsuleStore>;
        let users: Arc<dyn UserStore>;
        let limiter: Arc<dyn UnlockLimiter>;
        match config.storage {
            StorageBackend::Redis => {
                // Connection manager handles reconnection
                let client = redis::Client::open(config.redis_url.as_str())
                    .context("Failed to create Redis client")?;
                let redis = ConnectionManager::new(client)
                    .await
                    .context("Failed to connect to Redis")?;
                tracing::info!(redis_url = %config.redis_url, "Redis connected");

                capsules = Arc::new(RedisCapsuleStore::new(redis.clone()));
                users = Arc::new(RedisUserStore::new(redis.clone()));
                limiter = Arc::new(RedisUnlockLimiter::new(redis, max_unlocks));
            }
            StorageBackend::Memory => {
                tracing::warn!("Using in-memory storage; data will not survive a restart");
                capsules = Arc::new(MemoryCapsuleStore::new());
                users = Arc::new(MemoryUserStore::new());
                limiter = Arc::new(MemoryUnlockLimiter::new(max_unlocks));
            }
        }

        Self::from_parts(&config, capsules, users, limiter, judges)
    }

    /// Assemble state from already-built collaborators
    pub fn from_parts(
        config: &AppConfig,
        capsule_store: Arc<dyn CapsuleStore>,
        users: Arc<dyn UserStore>,
        unlock_limiter: Arc<dyn UnlockLimiter>,
        judges: Judges,
    ) -> Result<Self> {
        let jwt = JwtService::new(config.auth.jwt_secret.clone(), config.auth.token_ttl_secs)
            .context("Invalid auth configuration")?;

        let capsules = CapsuleService::new(
            capsule_store.clone(),
            users.clone(),
            judges.validator,
            judges.generator,
            judges.verifier,
            EngineSettings {
                oracle_timeout: Duration::from_secs(config.oracle.timeout_secs),
                validation_retries: config.oracle.validation_retries,
            },
        );

        Ok(Self {
            capsules: Arc::new(capsules),
            users,
            capsule_store,
            jwt: Arc::new(jwt),
            unlock_limiter,
        })
    }
}
