//! Query Orchestration Module
//!
//! Executes one query end to end for this node, in a fixed order: loop
//! check, local shard scan, downstream selection against the roster, limit
//! splitting, strategy-driven forwarding, deterministic merge, chunking,
//! publication to the result cache.
//!
//! Downstream trouble never fails a query here: an unreachable or saturated
//! neighbor degrades to an empty partial (recorded in the hops trace) and
//! the query still publishes. Only admission refusal at *this* node is
//! surfaced to the caller.
//!
//! ## Submodules
//! - **`types`**: the in-flight query record, partial results, limit split.
//! - **`chunking`**: fixed / adaptive / query-based chunk sizing.
//! - **`forwarding`**: round-robin / parallel / capacity fan-out.
//! - **`orchestrator`**: the facade gluing admission, data, neighbors,
//!   cache, and metrics together; the transport handlers delegate to it.

pub mod chunking;
pub mod forwarding;
pub mod orchestrator;
pub mod types;
