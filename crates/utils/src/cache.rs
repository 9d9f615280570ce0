//! A small TTL cache, in the shape of the teacher's `utils::cache::CacheWithTtl`.
//! Used by `llm-router` for the provider health cache and by `store` backends
//! for presigned-URL bookkeeping.

use std::{
    collections::HashMap,
    hash::Hash,
    time::{Duration, Instant},
};

use parking_lot::RwLock;

pub struct CacheWithTtl<K, V> {
    entries: RwLock<HashMap<K, (V, Instant)>>,
}

impl<K, V> Default for CacheWithTtl<K, V> {
    fn default() -> Self {
        CacheWithTtl {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl<K, V> CacheWithTtl<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let entries = self.entries.read();
        entries.get(key).and_then(|(value, expires_at)| {
            if Instant::now() < *expires_at {
                Some(value.clone())
            } else {
                None
            }
        })
    }

    pub fn insert_with_ttl(&self, key: K, value: V, ttl: Duration) {
        self.entries.write().insert(key, (value, Instant::now() + ttl));
    }

    pub fn remove(&self, key: &K) {
        self.entries.write().remove(key);
    }

    /// Drops every entry whose TTL has elapsed. Intended for a periodic
    /// background sweep rather than being called on every access.
    pub fn purge_expired(&self) {
        let now = Instant::now();
        self.entries.write().retain(|_, (_, expires_at)| *expires_at > now);
    }
}
