use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use super::fairness::{FairnessStrategy, LedgerCounts};
use crate::config::types::Team;

/// Counters plus limits, exported for metrics and routing hints.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdmissionSnapshot {
    pub active_total: usize,
    pub active_green: usize,
    pub active_pink: usize,
    pub max_total: usize,
    pub max_per_team: usize,
    pub system_load: f64,
}

/// Shared ledger. Tokens keep it alive so a release can outlive the
/// controller handle that issued it.
struct Ledger {
    counts: Mutex<LedgerCounts>,
    strategy: FairnessStrategy,
    max_total: usize,
    max_per_team: usize,
}

impl Ledger {
    fn release(&self, team: Team) {
        let mut counts = self.counts.lock().expect("admission ledger poisoned");
        match team {
            Team::Green => counts.active_green = counts.active_green.saturating_sub(1),
            Team::Pink => counts.active_pink = counts.active_pink.saturating_sub(1),
        }
    }
}

/// Gate for inbound query work. `admit` is an atomic check-and-increment
/// under a short lock; there is deliberately no wait path.
pub struct AdmissionController {
    ledger: Arc<Ledger>,
}

impl AdmissionController {
    pub fn new(strategy: FairnessStrategy, max_total: usize, max_per_team: usize) -> Arc<Self> {
        Arc::new(Self {
            ledger: Arc::new(Ledger {
                counts: Mutex::new(LedgerCounts {
                    active_green: 0,
                    active_pink: 0,
                }),
                strategy,
                max_total,
                max_per_team,
            }),
        })
    }

    /// Reserves one slot for `team`, or returns `None` when the fairness
    /// strategy refuses. Counters are untouched on rejection.
    pub fn admit(&self, team: Team) -> Option<AdmissionToken> {
        let mut counts = self
            .ledger
            .counts
            .lock()
            .expect("admission ledger poisoned");
        if !self.ledger.strategy.should_admit(
            team,
            *counts,
            self.ledger.max_total,
            self.ledger.max_per_team,
        ) {
            return None;
        }
        match team {
            Team::Green => counts.active_green += 1,
            Team::Pink => counts.active_pink += 1,
        }
        Some(AdmissionToken {
            ledger: self.ledger.clone(),
            team,
            released: AtomicBool::new(false),
        })
    }

    pub fn snapshot(&self) -> AdmissionSnapshot {
        let counts = self
            .ledger
            .counts
            .lock()
            .expect("admission ledger poisoned");
        let active_total = counts.total();
        AdmissionSnapshot {
            active_total,
            active_green: counts.active_green,
            active_pink: counts.active_pink,
            max_total: self.ledger.max_total,
            max_per_team: self.ledger.max_per_team,
            system_load: if self.ledger.max_total > 0 {
                active_total as f64 / self.ledger.max_total as f64
            } else {
                0.0
            },
        }
    }

    /// Spare total capacity remains. Feeds the `is_healthy` metrics field.
    pub fn has_headroom(&self) -> bool {
        let counts = self
            .ledger
            .counts
            .lock()
            .expect("admission ledger poisoned");
        counts.total() < self.ledger.max_total
    }
}

/// One reserved concurrency slot. Dropping the token releases the slot;
/// calling `release` earlier is equivalent and safe to combine with drop.
pub struct AdmissionToken {
    ledger: Arc<Ledger>,
    team: Team,
    released: AtomicBool,
}

impl AdmissionToken {
    pub fn team(&self) -> Team {
        self.team
    }

    pub fn release(&self) {
        if !self.released.swap(true, Ordering::AcqRel) {
            self.ledger.release(self.team);
        }
    }
}

impl Drop for AdmissionToken {
    fn drop(&mut self) {
        self.release();
    }
}
