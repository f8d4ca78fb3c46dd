use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::result::ChunkedResult;

/// Cap on retained tombstones; the map is cleared wholesale past this, the
/// same bounded-dedup scheme the write path uses for operation ids.
const MAX_TOMBSTONES: usize = 10_000;

/// Outcome of a chunk lookup. `Expired` and `Unknown` map one-to-one onto
/// the wire statuses `UID_EXPIRED` and `UID_UNKNOWN`; an out-of-range index
/// on a live UID is the caller's bug.
pub enum ChunkLookup {
    Hit(Arc<ChunkedResult>),
    OutOfRange(Arc<ChunkedResult>),
    Expired,
    Unknown,
}

/// Thread-safe UID -> chunked result map with TTL eviction.
pub struct ResultCache {
    entries: DashMap<String, Arc<ChunkedResult>>,
    tombstones: DashMap<String, ()>,
    ttl: Duration,
}

impl ResultCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            tombstones: DashMap::new(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn put(&self, result: ChunkedResult) {
        self.entries
            .insert(result.uid.clone(), Arc::new(result));
    }

    /// Fetches a live result. An entry past its TTL is unlinked on the spot
    /// and reported as absent even if the evictor has not run yet.
    pub fn get(&self, uid: &str) -> Option<Arc<ChunkedResult>> {
        let now = Instant::now();
        let result = self.entries.get(uid).map(|entry| entry.value().clone())?;
        if result.is_expired(now) {
            self.bury(uid);
            return None;
        }
        Some(result)
    }

    /// Resolves a chunk request against the cache. The returned result
    /// carries an `Arc`, so a concurrent eviction cannot pull the rows out
    /// from under the caller.
    pub fn lookup_chunk(&self, uid: &str, index: u32) -> ChunkLookup {
        match self.get(uid) {
            Some(result) => {
                if result.chunk(index).is_some() {
                    ChunkLookup::Hit(result)
                } else {
                    ChunkLookup::OutOfRange(result)
                }
            }
            None if self.tombstones.contains_key(uid) => ChunkLookup::Expired,
            None => ChunkLookup::Unknown,
        }
    }

    /// Unlinks every expired entry. Called from the background eviction
    /// loop; safe to run concurrently with readers.
    pub fn evict_expired(&self) -> usize {
        let now = Instant::now();
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|entry| entry.value().is_expired(now))
            .map(|entry| entry.key().clone())
            .collect();

        for uid in &expired {
            self.bury(uid);
        }
        expired.len()
    }

    fn bury(&self, uid: &str) {
        self.entries.remove(uid);
        if self.tombstones.len() >= MAX_TOMBSTONES {
            self.tombstones.clear();
        }
        self.tombstones.insert(uid.to_string(), ());
    }
}
