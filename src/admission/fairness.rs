use crate::config::types::{FairnessKind, Team};

/// Load past which the hybrid strategy stops granting weighted slack.
const HYBRID_HIGH_LOAD: f64 = 0.8;

/// Active-count view the fairness decision runs against. Snapshot of the
/// ledger taken under its lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerCounts {
    pub active_green: usize,
    pub active_pink: usize,
}

impl LedgerCounts {
    pub fn total(&self) -> usize {
        self.active_green + self.active_pink
    }

    pub fn for_team(&self, team: Team) -> usize {
        match team {
            Team::Green => self.active_green,
            Team::Pink => self.active_pink,
        }
    }
}

/// Policy deciding how the concurrency budget is shared across teams.
/// Resolved once at startup from the configuration selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FairnessStrategy {
    /// Hard per-team and total caps.
    Strict,
    /// A team may borrow headroom left idle by the other team: the per-team
    /// cap stretches by `slack = max(0, 1 - other_team_load)`, still bounded
    /// by the total cap.
    Weighted,
    /// Weighted while total load is at or below 0.8, strict above.
    Hybrid,
}

impl From<FairnessKind> for FairnessStrategy {
    fn from(kind: FairnessKind) -> Self {
        match kind {
            FairnessKind::Strict => FairnessStrategy::Strict,
            FairnessKind::Weighted => FairnessStrategy::Weighted,
            FairnessKind::Hybrid => FairnessStrategy::Hybrid,
        }
    }
}

impl FairnessStrategy {
    pub fn should_admit(
        self,
        team: Team,
        counts: LedgerCounts,
        max_total: usize,
        max_per_team: usize,
    ) -> bool {
        if counts.total() >= max_total {
            return false;
        }
        match self {
            FairnessStrategy::Strict => counts.for_team(team) < max_per_team,
            FairnessStrategy::Weighted => {
                let other_load = counts.for_team(team.other()) as f64 / max_per_team as f64;
                let slack = (1.0 - other_load).max(0.0);
                (counts.for_team(team) as f64) < max_per_team as f64 * (1.0 + slack)
            }
            FairnessStrategy::Hybrid => {
                let system_load = counts.total() as f64 / max_total as f64;
                let effective = if system_load > HYBRID_HIGH_LOAD {
                    FairnessStrategy::Strict
                } else {
                    FairnessStrategy::Weighted
                };
                effective.should_admit(team, counts, max_total, max_per_team)
            }
        }
    }
}
