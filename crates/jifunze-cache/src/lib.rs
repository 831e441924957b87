//! # Jifunze Cache
//!
//! Redis utilities for the Jifunze API: a managed Redis connection and the
//! [`RedisRevocationStore`] used when several API instances must agree on
//! which session tokens have been revoked.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use jifunze_auth::TokenService;
//! use jifunze_cache::{CacheConfig, RedisRevocationStore};
//!
//! let store = RedisRevocationStore::connect(CacheConfig::from_env()).await?;
//! let tokens = TokenService::new(jwt_config, Arc::new(store));
//! ```

pub mod config;
pub mod redis;
pub mod revocation;

pub use config::CacheConfig;
pub use crate::redis::{CacheError, RedisCache};
pub use revocation::RedisRevocationStore;
