use std::time::Instant;

use crate::data::types::{Comparator, Measurement};

/// In-flight query record, exclusively owned by the orchestrator handling
/// it. `hops` carries every node that has accepted the query; it is both
/// the loop guard and the trace returned to the caller.
#[derive(Debug, Clone)]
pub struct QueryRecord {
    pub uid: String,
    pub field: String,
    pub comparator: Comparator,
    pub threshold: f64,
    pub limit: u32,
    pub hops: Vec<String>,
    pub deadline: Instant,
}

/// What one downstream neighbor contributed. Ordered by declaration order
/// in the merge regardless of completion order.
#[derive(Debug, Clone)]
pub struct NeighborPartial {
    pub neighbor_id: String,
    pub rows: Vec<Measurement>,
    /// The hops trace the neighbor returned; empty on failure.
    pub hops: Vec<String>,
    /// Transport failure or deadline cancellation. Degrades to zero rows
    /// and a failure marker in the merged trace.
    pub failed: bool,
}

impl NeighborPartial {
    pub fn failure(neighbor_id: String) -> Self {
        Self {
            neighbor_id,
            rows: Vec::new(),
            hops: Vec::new(),
            failed: true,
        }
    }
}

/// Splits `limit` into `count` shares: equal division with the remainder
/// handed out one row at a time in declaration order. Shares may be zero
/// when `limit < count`; callers skip those neighbors entirely.
pub fn split_limit(limit: u32, count: usize) -> Vec<u32> {
    if count == 0 {
        return Vec::new();
    }
    let base = limit / count as u32;
    let remainder = (limit % count as u32) as usize;
    (0..count)
        .map(|i| base + u32::from(i < remainder))
        .collect()
}

/// Marker appended to the hops trace for a downstream that failed.
pub fn failure_marker(neighbor_id: &str) -> String {
    format!("{neighbor_id}!")
}
