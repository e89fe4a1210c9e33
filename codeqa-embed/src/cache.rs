//! In-memory embedding cache keyed by content hash

use crate::Embedding;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Entry limit used by [`EmbeddingCache::new`]
pub const DEFAULT_CACHE_MAX_ENTRIES: usize = 100_000;

type Entries = HashMap<[u8; 32], Arc<Embedding>>;

/// Process-lifetime cache of embeddings.
///
/// Keys are `blake3(provider_name || 0 || text)`, so the same text embedded by
/// two different providers never collides. Nothing is written to disk.
///
/// Entries live until [`clear`](Self::clear) or drop. Once `max_entries` is
/// reached new texts are still embedded but no longer stored.
#[derive(Debug)]
pub struct EmbeddingCache {
    entries: RwLock<Entries>,
    max_entries: usize,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl Default for EmbeddingCache {
    fn default() -> Self {
        Self::with_max_entries(DEFAULT_CACHE_MAX_ENTRIES)
    }
}

/// Snapshot of cache counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

impl EmbeddingCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_entries(max_entries: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            max_entries,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    // A panic while holding the lock cannot leave a half-written entry, so
    // poisoned maps are still usable.
    fn read(&self) -> RwLockReadGuard<'_, Entries> {
        self.entries.read().unwrap_or_else(|poisoned| {
            tracing::warn!("Embedding cache lock was poisoned, continuing");
            poisoned.into_inner()
        })
    }

    fn write(&self) -> RwLockWriteGuard<'_, Entries> {
        self.entries.write().unwrap_or_else(|poisoned| {
            tracing::warn!("Embedding cache lock was poisoned, continuing");
            poisoned.into_inner()
        })
    }

    /// Content hash used as the cache key
    pub fn key(provider_name: &str, text: &str) -> [u8; 32] {
        let mut hasher = blake3::Hasher::new();
        hasher.update(provider_name.as_bytes());
        hasher.update(&[0]);
        hasher.update(text.as_bytes());
        *hasher.finalize().as_bytes()
    }

    /// Look up an embedding, counting the hit or miss
    pub fn get(&self, provider_name: &str, text: &str) -> Option<Arc<Embedding>> {
        let key = Self::key(provider_name, text);
        let found = self.read().get(&key).cloned();

        match found {
            Some(embedding) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(embedding)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub fn insert(&self, provider_name: &str, text: &str, embedding: Arc<Embedding>) {
        let key = Self::key(provider_name, text);
        let mut entries = self.write();
        if entries.len() >= self.max_entries && !entries.contains_key(&key) {
            tracing::debug!("Embedding cache full ({} entries), not storing", entries.len());
            return;
        }
        entries.insert(key, embedding);
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.write().clear();
        tracing::debug!("Embedding cache cleared");
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}
