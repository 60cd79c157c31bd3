//! TTL-keyed session store.
//!
//! Every stateful record of the issuance protocol lives behind [`SessionStore`] under a
//! namespaced key (`prefix:id`). Two backends are provided:
//!
//! - [`MemoryStore`] - process-local, for single-instance deployments and tests
//! - [`RedisStore`] - networked, shared between instances
//!
//! Typed access goes through [`RecordStore`], which binds a record kind to its key prefix
//! and expiry policy.

mod memory;
mod record;
mod redis_store;

pub use memory::MemoryStore;
pub use record::{Record, RecordStore};
pub use redis_store::RedisStore;

use crate::config::{StoreBackend, StoreConfig};
use crate::error::StoreError;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Atomic per-key operations over string values with optional expiry.
///
/// A `ttl` of `None` stores the value without expiry.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<(), StoreError>;

    /// Store `value` only when `key` holds no live value. Returns whether it was stored.
    async fn insert_if_absent(
        &self,
        key: &str,
        value: String,
        ttl: Option<Duration>,
    ) -> Result<bool, StoreError>;

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Returns whether a live value was removed.
    async fn delete(&self, key: &str) -> Result<bool, StoreError>;

    /// Atomically read and remove `key`. At most one concurrent caller observes the value.
    async fn take(&self, key: &str) -> Result<Option<String>, StoreError>;
}

/// Build the namespaced key for `id` under `prefix`.
pub fn namespaced(prefix: &str, id: &str) -> String {
    format!("{prefix}:{id}")
}

/// Open the backend selected by configuration.
pub async fn connect(config: &StoreConfig) -> Result<Arc<dyn SessionStore>, StoreError> {
    match (config.backend, config.redis_url.as_deref()) {
        (StoreBackend::Memory, _) => Ok(Arc::new(MemoryStore::new())),
        (StoreBackend::Redis, Some(url)) => Ok(Arc::new(RedisStore::connect(url).await?)),
        (StoreBackend::Redis, None) => Err(StoreError::Backend(
            "store.redis_url is required for the redis backend".into(),
        )),
    }
}
