//! Configuration management for Vault.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use keepsake_common::constants::{
    DEFAULT_LISTEN_ADDR, DEFAULT_MAX_UNLOCKS_PER_MINUTE, DEFAULT_ORACLE_TIMEOUT_SECS,
    DEFAULT_REDIS_URL, DEFAULT_TOKEN_TTL_SECS,
};

/// Where capsules and users are kept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Redis,
    /// In-process only; everything is lost on restart
    Memory,
}

impl Default for StorageBackend {
    fn default() -> Self {
        Self::Redis
    }
}

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Redis connection URL
    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    /// HTTP listen address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Storage backend
    #[serde(default)]
    pub storage: StorageBackend,

    /// Token configuration
    #[serde(default)]
    pub auth: AuthConfig,

    /// Judgment oracle configuration
    #[serde(default)]
    pub oracle: OracleConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

/// Bearer token configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// HS256 signing secret (at least 32 characters)
    #[serde(default)]
    pub jwt_secret: String,

    /// Token validity in seconds
    #[serde(default = "default_token_ttl")]
    pub token_ttl_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            token_ttl_secs: default_token_ttl(),
        }
    }
}

/// Judgment oracle configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OracleConfig {
    /// Chat completions endpoint
    #[serde(default = "default_oracle_url")]
    pub api_url: String,

    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_oracle_model")]
    pub model: String,

    /// Deadline for each oracle call
    #[serde(default = "default_oracle_timeout")]
    pub timeout_secs: u64,

    /// Extra attempts when content validation fails on the oracle side
    #[serde(default = "default_validation_retries")]
    pub validation_retries: u32,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            api_url: default_oracle_url(),
            api_key: String::new(),
            model: default_oracle_model(),
            timeout_secs: default_oracle_timeout(),
            validation_retries: default_validation_retries(),
        }
    }
}

/// Rate limiting configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    /// Maximum unlock attempts per minute per user
    #[serde(default = "default_max_unlocks")]
    pub max_unlocks_per_minute: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_unlocks_per_minute: default_max_unlocks(),
        }
    }
}

// Default value functions
fn default_redis_url() -> String { DEFAULT_REDIS_URL.to_string() }
fn default_listen_addr() -> String { DEFAULT_LISTEN_ADDR.to_string() }
fn default_token_ttl() -> u64 { DEFAULT_TOKEN_TTL_SECS }
fn default_oracle_url() -> String { "https://api.openai.com/v1/chat/completions".to_string() }
fn default_oracle_model() -> String { "gpt-4o-mini".to_string() }
fn default_oracle_timeout() -> u64 { DEFAULT_ORACLE_TIMEOUT_SECS }
fn default_validation_retries() -> u32 { 1 }
fn default_max_unlocks() -> u32 { DEFAULT_MAX_UNLOCKS_PER_MINUTE }

impl AppConfig {
    /// Load configuration from file, with CLI/env overrides
    pub fn load(config_path: &str, args: &super::Args) -> Result<Self> {
        let mut config = if Path::new(config_path).exists() {
            let settings = config::Config::builder()
                .add_source(config::File::with_name(config_path))
                .build()
                .context("Failed to load config file")?;

            settings
                .try_deserialize()
                .context("Failed to parse config")?
        } else {
            // Use defaults if config file doesn't exist
            tracing::warn!(path = %config_path, "Config file not found, using defaults");
            Self::default()
        };

        // Apply CLI overrides
        if let Some(ref redis_url) = args.redis_url {
            config.redis_url = redis_url.clone();
        }
        if let Some(ref listen) = args.listen {
            config.listen_addr = listen.clone();
        }
        if let Some(ref secret) = args.jwt_secret {
            config.auth.jwt_secret = secret.clone();
        }
        if let Some(ref key) = args.oracle_api_key {
            config.oracle.api_key = key.clone();
        }
        if args.memory {
            config.storage = StorageBackend::Memory;
        }

        if config.oracle.api_key.is_empty() {
            tracing::warn!("No oracle API key configured; capsule creation and unlocks will fail");
        }

        Ok(config)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            redis_url: default_redis_url(),
            listen_addr: default_listen_addr(),
            storage: StorageBackend::default(),
            auth: AuthConfig::default(),
            oracle: OracleConfig::default(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}
