//! Transport Module
//!
//! The HTTP surface of a node and its client side.
//!
//! ## Submodules
//! - **`protocol`**: endpoint paths and the wire DTOs for the three
//!   operations every node serves: `Query`, `GetChunk`, `GetMetrics`.
//! - **`handlers`**: axum endpoints bridging HTTP to the orchestrator.
//!   Unexpected failures are mapped to `INTERNAL_ERROR` here; no request
//!   ever takes the process down.
//! - **`neighbors`**: lazy per-neighbor clients over a shared HTTP
//!   connection pool, with one transparent retry per call, per-call
//!   deadlines, and the cached load snapshots the capacity strategy reads.

pub mod handlers;
pub mod neighbors;
pub mod protocol;

#[cfg(test)]
mod tests;
