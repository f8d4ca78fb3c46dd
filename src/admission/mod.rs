//! Admission Control Module
//!
//! Decides whether a new query may enter this node and reserves capacity if
//! so. There is no queue and no waiting: admission is an immediate
//! accept/reject, and rejection (`CAPACITY_EXHAUSTED`) is the system's only
//! backpressure mechanism.
//!
//! ## Core Concepts
//! - **Ledger**: active counts, total and per team, guarded by a short
//!   mutex so the check-and-increment is atomic.
//! - **Token**: an RAII handle for one reserved slot. Release is idempotent
//!   and also runs on drop, so every exit path — completion, loop
//!   suppression, cancellation, panic unwinding — restores the counters
//!   exactly once.
//! - **Fairness strategy**: how the total budget is shared between teams
//!   (strict / weighted / hybrid), selected once at startup.

pub mod controller;
pub mod fairness;
