//! Overlay Wire Protocol
//!
//! Endpoint paths and Data Transfer Objects for the three operations every
//! node serves. These shapes are the contract between nodes (internal
//! forwards, chunk draining, load probing) and between the leader and its
//! clients; they are serialized as JSON over HTTP.

use serde::{Deserialize, Serialize};

use crate::config::types::{Role, Team};
use crate::data::types::Comparator;

// --- API Endpoints ---

/// Query execution. Clients post here with `uid`/`hops` unset; internal
/// forwards carry both.
pub const ENDPOINT_QUERY: &str = "/query";
/// Chunk retrieval: `GET /chunk/:uid/:index`.
pub const ENDPOINT_CHUNK: &str = "/chunk";
/// Node metrics, also serving as the load probe for capacity forwarding.
pub const ENDPOINT_METRICS: &str = "/metrics";

// --- Statuses ---

/// Outcome classification carried on every response.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Ok,
    /// Admission refused at the receiving node; retry later.
    CapacityExhausted,
    /// Chunk requested after the result's TTL elapsed.
    UidExpired,
    /// Chunk requested for a UID this node never published.
    UidUnknown,
    /// The node was already in the query's hops; empty result, no error.
    LoopSuppressed,
    /// Transport failure talking to a neighbor, after retry.
    NeighborUnreachable,
    /// A bug surfaced at the transport boundary. Not retryable.
    InternalError,
}

// --- Data Transfer Objects ---

/// A filter query. `uid` and `hops` are empty on the client edge and
/// populated on internal forwards: the originating leader assigns the UID
/// once and every hop appends itself before forwarding further.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    /// Parameter name the filter applies to, e.g. "PM2.5".
    pub field: String,
    pub comparator: Comparator,
    pub threshold: f64,
    /// Maximum rows in the merged result. Clamped to the configured ceiling.
    pub limit: u32,
    #[serde(default)]
    pub uid: String,
    #[serde(default)]
    pub hops: Vec<String>,
}

/// Metadata of a published result. Rows are fetched separately via chunks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    /// Empty when `status` is not `OK`.
    pub uid: String,
    pub total_chunks: u32,
    pub total_records: u32,
    pub hops: Vec<String>,
    pub status: Status,
}

/// One chunk of a published result. `data` is a JSON-encoded row batch;
/// the orchestrator treats it as opaque bytes that round-trip rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkResponse {
    pub uid: String,
    pub index: u32,
    pub total_chunks: u32,
    pub data: String,
    pub is_last: bool,
    pub status: Status,
}

/// Node self-description. `max_capacity` lets a polling neighbor compute
/// the load ratio the capacity strategy sorts by; `queue_size` is always 0
/// in this design (admission rejects instead of queueing).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsResponse {
    pub process_id: String,
    pub role: Role,
    pub team: Team,
    pub active_requests: u64,
    pub max_capacity: u64,
    pub queue_size: u32,
    pub avg_processing_time_ms: f64,
    pub data_files_loaded: u64,
    pub is_healthy: bool,
}
