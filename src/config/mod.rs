//! Overlay Configuration Module
//!
//! Loads and validates the static overlay document: the set of processes
//! (identity, role, team, network address, declared neighbors, optional date
//! bounds) plus the strategy selectors and concurrency limits.
//!
//! ## Guarantees after a successful load
//! - Every neighbor reference resolves to a declared process and every link
//!   is symmetric (if A lists B, B lists A).
//! - Exactly one leader exists, and each team has exactly one team leader.
//! - Every worker carries `date_bounds`; same-team shards never overlap.
//!
//! A document violating any of these refuses to start the node. Validation
//! happens once; the rest of the system treats the configuration as
//! immutable truth.

pub mod loader;
pub mod types;
