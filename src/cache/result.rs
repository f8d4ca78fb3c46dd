use std::time::{Duration, Instant};

use crate::data::types::Measurement;

/// A published query result: rows frozen at merge time, addressed in
/// fixed-size chunks. An empty result still has exactly one (empty) chunk so
/// callers always have something to fetch.
pub struct ChunkedResult {
    pub uid: String,
    rows: Vec<Measurement>,
    pub chunk_size: usize,
    pub total_chunks: u32,
    pub created_at: Instant,
    pub ttl: Duration,
    pub hops: Vec<String>,
}

/// Borrowed view of one chunk.
pub struct Chunk<'a> {
    pub index: u32,
    pub rows: &'a [Measurement],
    pub is_last: bool,
    pub total_chunks: u32,
}

impl ChunkedResult {
    pub fn new(
        uid: String,
        rows: Vec<Measurement>,
        chunk_size: usize,
        ttl: Duration,
        hops: Vec<String>,
    ) -> Self {
        let chunk_size = chunk_size.max(1);
        let total_chunks = (rows.len().div_ceil(chunk_size)).max(1) as u32;
        Self {
            uid,
            rows,
            chunk_size,
            total_chunks,
            created_at: Instant::now(),
            ttl,
            hops,
        }
    }

    pub fn total_records(&self) -> u32 {
        self.rows.len() as u32
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now.duration_since(self.created_at) >= self.ttl
    }

    /// Returns the chunk at `index`, or `None` when the index is outside
    /// `[0, total_chunks)`.
    pub fn chunk(&self, index: u32) -> Option<Chunk<'_>> {
        if index >= self.total_chunks {
            return None;
        }
        // For an empty result this is the one empty chunk: 0..0.
        let start = index as usize * self.chunk_size;
        let end = (start + self.chunk_size).min(self.rows.len());
        Some(Chunk {
            index,
            rows: &self.rows[start..end],
            is_last: index + 1 == self.total_chunks,
            total_chunks: self.total_chunks,
        })
    }
}
