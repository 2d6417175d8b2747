//! # Invocation State Cache
//!
//! A read-through cache plus write buffer scoped to ONE invocation.
//!
//! ## Problem
//!
//! An engine operation reads the same keys repeatedly (an account is read
//! by the balance check, by the debit and by the log append) and must see
//! its own writes immediately, while nothing it writes may become visible
//! to anyone else unless the whole invocation succeeds.
//!
//! ## Solution
//!
//! - Writes land in an ordered buffer (`None` marks a delete).
//! - Reads consult the buffer first, then a bounded LRU of store reads.
//! - `commit` turns the buffer into one atomic batch. Dropping the cache
//!   without committing discards every write.
//!
//! The cache never outlives its invocation, so it can never serve a value
//! that another invocation has since replaced.

use lru::LruCache;
use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use tracing::debug;

use crate::domain::{in_range, WorldStateError};
use crate::ports::{BatchOperation, WorldState};

/// Default number of store reads remembered per invocation.
pub const DEFAULT_READ_CACHE_CAPACITY: usize = 1024;

/// Per-invocation view over a [`WorldState`].
pub struct StateCache<'a, S: WorldState> {
    store: &'a mut S,
    reads: LruCache<Vec<u8>, Option<Vec<u8>>>,
    writes: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
    store_reads: u64,
    cache_hits: u64,
}

impl<'a, S: WorldState> StateCache<'a, S> {
    /// Create a cache with the default read capacity.
    pub fn new(store: &'a mut S) -> Self {
        Self::with_capacity(store, DEFAULT_READ_CACHE_CAPACITY)
    }

    /// Create with custom read capacity.
    pub fn with_capacity(store: &'a mut S, capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            store,
            reads: LruCache::new(cap),
            writes: BTreeMap::new(),
            store_reads: 0,
            cache_hits: 0,
        }
    }

    /// Read a key, seeing this invocation's own writes first.
    pub fn get(&mut self, key: &[u8]) -> Result<Option<Vec<u8>>, WorldStateError> {
        if let Some(buffered) = self.writes.get(key) {
            self.cache_hits += 1;
            return Ok(buffered.clone());
        }
        if let Some(cached) = self.reads.get(key) {
            self.cache_hits += 1;
            return Ok(cached.clone());
        }

        let value = self.store.get(key)?;
        self.store_reads += 1;
        self.reads.put(key.to_vec(), value.clone());
        Ok(value)
    }

    /// Buffer a write.
    pub fn put(&mut self, key: &[u8], value: Vec<u8>) {
        self.reads.pop(key);
        self.writes.insert(key.to_vec(), Some(value));
    }

    /// Buffer a delete.
    pub fn delete(&mut self, key: &[u8]) {
        self.reads.pop(key);
        self.writes.insert(key.to_vec(), None);
    }

    /// Ordered scan of `[start, end)` merged with buffered writes.
    pub fn range_scan(
        &mut self,
        start: &[u8],
        end: Option<&[u8]>,
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>, WorldStateError> {
        let mut merged: BTreeMap<Vec<u8>, Vec<u8>> =
            self.store.range_scan(start, end)?.into_iter().collect();
        self.store_reads += 1;

        for (key, value) in self.writes.range(start.to_vec()..) {
            if !in_range(key, start, end) {
                break;
            }
            match value {
                Some(value) => {
                    merged.insert(key.clone(), value.clone());
                }
                None => {
                    merged.remove(key);
                }
            }
        }

        Ok(merged.into_iter().collect())
    }

    /// Number of buffered writes (puts and deletes).
    pub fn pending_writes(&self) -> usize {
        self.writes.len()
    }

    /// Flush every buffered write to the store in one atomic batch.
    ///
    /// Returns the number of operations written.
    pub fn commit(self) -> Result<usize, WorldStateError> {
        let operations: Vec<BatchOperation> = self
            .writes
            .into_iter()
            .map(|(key, value)| match value {
                Some(value) => BatchOperation::put(key, value),
                None => BatchOperation::delete(key),
            })
            .collect();
        let count = operations.len();

        if count > 0 {
            self.store.atomic_batch_write(operations)?;
        }
        debug!(
            writes = count,
            store_reads = self.store_reads,
            cache_hits = self.cache_hits,
            "Committed invocation write set"
        );
        Ok(count)
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            cached_reads: self.reads.len(),
            capacity: self.reads.cap().get(),
            pending_writes: self.writes.len(),
            store_reads: self.store_reads,
            cache_hits: self.cache_hits,
        }
    }
}

/// Cache statistics for monitoring.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheStats {
    pub cached_reads: usize,
    pub capacity: usize,
    pub pending_writes: usize,
    pub store_reads: u64,
    pub cache_hits: u64,
}
