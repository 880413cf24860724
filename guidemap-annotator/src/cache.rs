// Copyright 2025 Guidemap Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Durable cache of annotated concepts
//!
//! A bounded `moka` cache (TinyLFU admission, frequency based eviction)
//! backed by a checksummed snapshot file. The snapshot is read once at
//! [`ConceptCache::open`]; a corrupt snapshot fails the open instead of
//! starting empty. Entries are written back by [`ConceptCache::flush`] or
//! [`ConceptCache::close`].
//!
//! # Staleness
//!
//! The key is `(cui, role, guideline_id)` only. Flags computed under the
//! first query that touches a key are returned for every later query with the
//! same guideline, whatever its filter lists.

use guidemap_core::{AnnotatedConcept, ConceptRole, Result};
use guidemap_thesaurus::{read_snapshot, write_snapshot};
use moka::sync::Cache;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

const CONCEPT_CACHE_MAGIC: &[u8; 8] = b"GMCCACH1";

/// Cache key of one annotated concept
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConceptCacheKey {
    pub cui: String,
    pub role: ConceptRole,
    pub guideline_id: Option<String>,
}

impl ConceptCacheKey {
    pub fn new(cui: &str, role: ConceptRole, guideline_id: Option<&str>) -> Self {
        Self {
            cui: cui.to_string(),
            role,
            guideline_id: guideline_id.map(String::from),
        }
    }
}

impl fmt::Display for ConceptCacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.guideline_id {
            Some(guideline) => write!(f, "{}-{}-{}", self.cui, self.role, guideline),
            None => write!(f, "{}-{}", self.cui, self.role),
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    pub entry_count: u64,
}

/// Concept cache with an explicit open / flush / close lifecycle
pub struct ConceptCache {
    cache: Cache<ConceptCacheKey, Arc<AnnotatedConcept>>,
    path: Option<PathBuf>,
    hits: AtomicU64,
    misses: AtomicU64,
    dirty: AtomicBool,
    flush_lock: Mutex<()>,
}

impl ConceptCache {
    fn with_capacity(capacity: u64, path: Option<PathBuf>) -> Self {
        Self {
            cache: Cache::builder().max_capacity(capacity).build(),
            path,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            dirty: AtomicBool::new(false),
            flush_lock: Mutex::new(()),
        }
    }

    /// Cache without a backing file
    pub fn in_memory(capacity: u64) -> Self {
        Self::with_capacity(capacity, None)
    }

    /// Open the cache persisted at `path`, or start empty if there is none
    ///
    /// Fails if the snapshot exists but cannot be read or validated, or if
    /// its directory cannot be created.
    pub fn open(path: impl AsRef<Path>, capacity: u64) -> Result<Self> {
        let path = path.as_ref();
        let cache = Self::with_capacity(capacity, Some(path.to_path_buf()));

        if path.exists() {
            let entries: Vec<(ConceptCacheKey, AnnotatedConcept)> =
                read_snapshot(path, CONCEPT_CACHE_MAGIC)?;
            let count = entries.len();
            for (key, concept) in entries {
                cache.cache.insert(key, Arc::new(concept));
            }
            info!("Loaded {} cached concepts from {:?}", count, path);
        } else {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            info!("No concept cache at {:?}, starting empty", path);
        }
        Ok(cache)
    }

    pub fn get(&self, key: &ConceptCacheKey) -> Option<Arc<AnnotatedConcept>> {
        match self.cache.get(key) {
            Some(concept) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(concept)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub fn insert(&self, key: ConceptCacheKey, concept: Arc<AnnotatedConcept>) {
        self.cache.insert(key, concept);
        self.dirty.store(true, Ordering::Release);
    }

    /// Cached concept for `key`, computing and storing it on a miss
    ///
    /// Concurrent callers for the same key compute it once.
    pub fn get_or_insert_with<F>(&self, key: ConceptCacheKey, init: F) -> Arc<AnnotatedConcept>
    where
        F: FnOnce() -> AnnotatedConcept,
    {
        let entry = self.cache.entry(key).or_insert_with(|| Arc::new(init()));
        if entry.is_fresh() {
            self.misses.fetch_add(1, Ordering::Relaxed);
            self.dirty.store(true, Ordering::Release);
        } else {
            self.hits.fetch_add(1, Ordering::Relaxed);
        }
        entry.into_value()
    }

    /// Write all entries to the backing file; no-op for in-memory caches
    pub fn flush(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let _guard = self.flush_lock.lock();

        self.cache.run_pending_tasks();
        let entries: Vec<(ConceptCacheKey, AnnotatedConcept)> = self
            .cache
            .iter()
            .map(|(key, concept)| ((*key).clone(), (*concept).clone()))
            .collect();

        write_snapshot(path, CONCEPT_CACHE_MAGIC, &entries)?;
        self.dirty.store(false, Ordering::Release);
        info!("Flushed {} cached concepts to {:?}", entries.len(), path);
        Ok(())
    }

    /// Flush and release the cache
    pub fn close(self) -> Result<()> {
        self.flush()
    }

    pub fn len(&self) -> u64 {
        self.cache.run_pending_tasks();
        self.cache.entry_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;

        CacheStats {
            hits,
            misses,
            hit_rate: if total > 0 {
                hits as f64 / total as f64
            } else {
                0.0
            },
            entry_count: self.len(),
        }
    }
}

impl Drop for ConceptCache {
    fn drop(&mut self) {
        if self.path.is_some() && self.dirty.load(Ordering::Acquire) {
            warn!(
                "Concept cache {:?} dropped with unflushed entries; call close() at shutdown",
                self.path
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use guidemap_core::GuidemapError;
    use tempfile::tempdir;

    fn key(cui: &str) -> ConceptCacheKey {
        ConceptCacheKey::new(cui, ConceptRole::Intervention, Some("G1"))
    }

    #[test]
    fn test_key_display() {
        assert_eq!(key("C1").to_string(), "C1-intervention-G1");
        assert_eq!(
            ConceptCacheKey::new("C1", ConceptRole::Population, None).to_string(),
            "C1-population"
        );
    }

    #[test]
    fn test_get_or_insert_counts_hits_and_misses() {
        let cache = ConceptCache::in_memory(100);
        let first = cache.get_or_insert_with(key("C1"), || AnnotatedConcept::new("C1"));
        let second = cache.get_or_insert_with(key("C1"), || panic!("must not recompute"));

        assert!(Arc::ptr_eq(&first, &second));
        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.entry_count, 1);
    }

    #[test]
    fn test_stays_within_capacity() {
        let cache = ConceptCache::in_memory(10);
        for i in 0..100 {
            let cui = format!("C{i}");
            cache.insert(key(&cui), Arc::new(AnnotatedConcept::new(cui.as_str())));
        }
        let len = cache.len();
        assert!(len > 0);
        assert!(len <= 10, "cache holds {len} concepts");
        assert_eq!(cache.stats().entry_count, len);
    }

    #[test]
    fn test_close_then_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache").join("concepts.cache");

        let cache = ConceptCache::open(&path, 100).unwrap();
        let mut concept = AnnotatedConcept::new("C1");
        concept.is_known = Some(true);
        cache.insert(key("C1"), Arc::new(concept));
        cache.close().unwrap();

        let reopened = ConceptCache::open(&path, 100).unwrap();
        let cached = reopened.get(&key("C1")).unwrap();
        assert_eq!(cached.is_known, Some(true));
        assert!(reopened.get(&key("C2")).is_none());
    }

    #[test]
    fn test_corrupt_file_fails_open() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("concepts.cache");
        std::fs::write(&path, b"not a concept cache at all, just some bytes here").unwrap();

        assert!(matches!(
            ConceptCache::open(&path, 100),
            Err(GuidemapError::CacheCorrupted { .. })
        ));
    }
}
