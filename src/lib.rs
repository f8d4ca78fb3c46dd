//! Distributed Query Overlay Library
//!
//! This library crate defines the core modules of a small query overlay: a
//! fixed set of processes arranged into two teams under a leader -> team
//! leader -> worker hierarchy. A filter query enters at the leader, fans out
//! along the overlay edges, is executed against each node's local data shard,
//! and the merged result is published as a chunked, TTL-cached record that
//! callers drain chunk by chunk.
//!
//! ## Architecture Modules
//! The system is composed of seven loosely coupled subsystems:
//!
//! - **`config`**: The static overlay document. Describes every process
//!   (identity, role, team, neighbors, date bounds) plus the strategy
//!   selectors, and refuses to start on a malformed topology.
//! - **`metrics`**: Counters and rolling duration statistics exposed through
//!   the `GetMetrics` endpoint.
//! - **`data`**: The in-memory shard. Loads the node's date-range slice of
//!   CSV measurement files at startup and serves filtered scans.
//! - **`cache`**: The result layer. Holds chunked query results keyed by UID
//!   with TTL eviction.
//! - **`admission`**: Concurrency gatekeeping. Per-team budgets enforced by a
//!   pluggable fairness strategy; rejection is the only backpressure.
//! - **`query`**: The orchestrator. Runs one query end to end: loop check,
//!   local scan, downstream fan-out, merge, chunk, publish.
//! - **`transport`**: The HTTP surface. Wire DTOs, axum handlers, and the
//!   lazy per-neighbor client registry.

pub mod admission;
pub mod cache;
pub mod config;
pub mod data;
pub mod metrics;
pub mod query;
pub mod transport;
