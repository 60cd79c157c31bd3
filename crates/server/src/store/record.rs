use super::{SessionStore, namespaced};
use crate::error::StoreError;
use serde::{Serialize, de::DeserializeOwned};
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

/// A record kind persisted as JSON under its own key prefix.
pub trait Record: Serialize + DeserializeOwned + Send + Sync {
    const PREFIX: &'static str;
}

/// Typed view of a [`SessionStore`] for one record kind.
///
/// The store instance carries the kind's expiry policy; `None` means records never expire.
pub struct RecordStore<R> {
    store: Arc<dyn SessionStore>,
    ttl: Option<Duration>,
    _record: PhantomData<fn() -> R>,
}

impl<R> Clone for RecordStore<R> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            ttl: self.ttl,
            _record: PhantomData,
        }
    }
}

impl<R: Record> RecordStore<R> {
    pub fn new(store: Arc<dyn SessionStore>, ttl: Option<Duration>) -> Self {
        Self {
            store,
            ttl,
            _record: PhantomData,
        }
    }

    pub async fn save(&self, id: &str, record: &R) -> Result<(), StoreError> {
        self.save_with_ttl(id, record, self.ttl).await
    }

    pub async fn save_with_ttl(
        &self,
        id: &str,
        record: &R,
        ttl: Option<Duration>,
    ) -> Result<(), StoreError> {
        let json = serde_json::to_string(record)?;
        self.store.set(&namespaced(R::PREFIX, id), json, ttl).await
    }

    pub async fn insert_if_absent(&self, id: &str, record: &R) -> Result<bool, StoreError> {
        let json = serde_json::to_string(record)?;
        self.store
            .insert_if_absent(&namespaced(R::PREFIX, id), json, self.ttl)
            .await
    }

    pub async fn get(&self, id: &str) -> Result<Option<R>, StoreError> {
        match self.store.get(&namespaced(R::PREFIX, id)).await? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// Atomically fetch and remove the record.
    pub async fn take(&self, id: &str) -> Result<Option<R>, StoreError> {
        match self.store.take(&namespaced(R::PREFIX, id)).await? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    pub async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        self.store.delete(&namespaced(R::PREFIX, id)).await
    }
}
