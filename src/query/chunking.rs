use crate::config::types::ChunkingKind;

/// Ceiling for adaptive chunk growth.
const MAX_CHUNK: usize = 1000;
/// Query-based sizing never exceeds this.
const QUERY_BASED_CAP: usize = 500;

/// Chunk sizing policy, resolved once at startup and passed by value into
/// the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkingStrategy {
    /// Always the configured base size.
    Fixed { size: usize },
    /// Grows with the result: tiny results get small chunks, large results
    /// get up to `MAX_CHUNK`.
    Adaptive { base: usize },
    /// Sized from the requested limit so a caller drains a typical result
    /// in about ten fetches, clamped to `[base, 500]`.
    QueryBased { base: usize },
}

impl ChunkingStrategy {
    pub fn from_config(kind: ChunkingKind, base_size: usize) -> Self {
        let base = base_size.max(1);
        match kind {
            ChunkingKind::Fixed => ChunkingStrategy::Fixed { size: base },
            ChunkingKind::Adaptive => ChunkingStrategy::Adaptive { base },
            ChunkingKind::QueryBased => ChunkingStrategy::QueryBased { base },
        }
    }

    pub fn chunk_size(self, total_records: usize, limit: u32) -> usize {
        let size = match self {
            ChunkingStrategy::Fixed { size } => size,
            ChunkingStrategy::Adaptive { base } => {
                if total_records < 100 {
                    50
                } else if total_records < 500 {
                    base
                } else if total_records < 2000 {
                    (base * 2).min(MAX_CHUNK)
                } else {
                    MAX_CHUNK
                }
            }
            ChunkingStrategy::QueryBased { base } => {
                let lo = base.min(QUERY_BASED_CAP);
                ((limit / 10) as usize).clamp(lo, QUERY_BASED_CAP)
            }
        };
        size.max(1)
    }
}
