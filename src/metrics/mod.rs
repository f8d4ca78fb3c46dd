//! Metrics Module
//!
//! Cumulative counters and rolling duration statistics for one node,
//! exposed verbatim through the `GetMetrics` endpoint and consumed by
//! neighbors running the capacity forwarding strategy.
//!
//! Counters use atomic increments; rolling averages take a short lock.
//! Dropping an individual sample under contention is acceptable, corrupting
//! the aggregate is not.

pub mod tracker;
