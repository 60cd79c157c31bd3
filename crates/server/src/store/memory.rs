use super::SessionStore;
use crate::error::StoreError;
use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Clone)]
struct StoreEntry {
    value: String,
    expires_at: Option<Instant>,
}

impl StoreEntry {
    fn new(value: String, ttl: Option<Duration>) -> Self {
        Self {
            value,
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
        }
    }

    fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => Instant::now() >= expires_at,
            None => false,
        }
    }
}

/// In-process [`SessionStore`] built on a sharded concurrent map.
///
/// Expired entries are invisible to readers immediately and are swept lazily.
#[derive(Clone)]
pub struct MemoryStore {
    entries: Arc<DashMap<String, StoreEntry>>,
    last_cleanup: Arc<std::sync::Mutex<Instant>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            last_cleanup: Arc::new(std::sync::Mutex::new(Instant::now())),
        }
    }

    /// Perform lazy cleanup if enough time has passed
    fn maybe_cleanup(&self) {
        const CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

        if let Ok(mut last_cleanup) = self.last_cleanup.try_lock()
            && last_cleanup.elapsed() >= CLEANUP_INTERVAL
        {
            *last_cleanup = Instant::now();
            drop(last_cleanup); // Release lock before cleanup

            self.entries.retain(|_, entry| !entry.is_expired());
        }
    }

    /// Number of stored entries, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<(), StoreError> {
        self.maybe_cleanup();
        self.entries
            .insert(key.to_string(), StoreEntry::new(value, ttl));
        Ok(())
    }

    async fn insert_if_absent(
        &self,
        key: &str,
        value: String,
        ttl: Option<Duration>,
    ) -> Result<bool, StoreError> {
        self.maybe_cleanup();
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().is_expired() {
                    occupied.insert(StoreEntry::new(value, ttl));
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(StoreEntry::new(value, ttl));
                Ok(true)
            }
        }
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.maybe_cleanup();
        Ok(self.entries.get(key).and_then(|entry| {
            if entry.is_expired() {
                None
            } else {
                Some(entry.value.clone())
            }
        }))
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self
            .entries
            .remove(key)
            .is_some_and(|(_, entry)| !entry.is_expired()))
    }

    async fn take(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self
            .entries
            .remove(key)
            .filter(|(_, entry)| !entry.is_expired())
            .map(|(_, entry)| entry.value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_get_delete() {
        let store = MemoryStore::new();
        store.set("k:1", "v".into(), None).await.unwrap();
        assert_eq!(store.get("k:1").await.unwrap().as_deref(), Some("v"));
        assert!(store.delete("k:1").await.unwrap());
        assert!(!store.delete("k:1").await.unwrap());
        assert_eq!(store.get("k:1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn expired_entries_are_invisible() {
        let store = MemoryStore::new();
        store
            .set("k:short", "v".into(), Some(Duration::from_millis(20)))
            .await
            .unwrap();
        store
            .set("k:long", "v".into(), Some(Duration::from_secs(60)))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(store.get("k:short").await.unwrap(), None);
        assert_eq!(store.take("k:short").await.unwrap(), None);
        assert!(store.get("k:long").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn take_is_single_use() {
        let store = MemoryStore::new();
        store.set("code:x", "payload".into(), None).await.unwrap();
        assert_eq!(
            store.take("code:x").await.unwrap().as_deref(),
            Some("payload")
        );
        assert_eq!(store.take("code:x").await.unwrap(), None);
    }

    #[tokio::test]
    async fn concurrent_take_has_one_winner() {
        let store = MemoryStore::new();
        store.set("code:race", "v".into(), None).await.unwrap();

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.take("code:race").await.unwrap() })
            })
            .collect();

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap().is_some() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn insert_if_absent_respects_live_and_expired_values() {
        let store = MemoryStore::new();
        assert!(store.insert_if_absent("u", "a".into(), None).await.unwrap());
        assert!(!store.insert_if_absent("u", "b".into(), None).await.unwrap());
        assert_eq!(store.get("u").await.unwrap().as_deref(), Some("a"));

        store
            .set("t", "old".into(), Some(Duration::from_millis(10)))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(store.insert_if_absent("t", "new".into(), None).await.unwrap());
        assert_eq!(store.get("t").await.unwrap().as_deref(), Some("new"));
    }
}
