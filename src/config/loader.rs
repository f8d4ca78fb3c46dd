use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use super::types::{Limits, NodeId, NodeSpec, Role, StrategiesConfig, Team};

/// Raw shape of the JSON document on disk.
#[derive(Debug, Deserialize)]
struct RawConfig {
    strategies: StrategiesConfig,
    #[serde(default)]
    limits: Limits,
    processes: HashMap<String, NodeSpec>,
}

/// Validated overlay configuration. Construction is the only place topology
/// rules are checked; everything downstream can rely on them.
#[derive(Debug)]
pub struct OverlayConfig {
    pub strategies: StrategiesConfig,
    pub limits: Limits,
    processes: HashMap<String, NodeSpec>,
}

impl OverlayConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let payload = std::fs::read_to_string(path)
            .with_context(|| format!("config file not found: {}", path.display()))?;
        let raw: RawConfig = serde_json::from_str(&payload)
            .with_context(|| format!("malformed config document: {}", path.display()))?;
        Self::from_parts(raw.strategies, raw.limits, raw.processes)
    }

    /// Builds a config from already-parsed parts. Split out of `load` so
    /// tests can exercise validation without touching the filesystem.
    pub fn from_parts(
        strategies: StrategiesConfig,
        limits: Limits,
        processes: HashMap<String, NodeSpec>,
    ) -> Result<Self> {
        let config = Self {
            strategies,
            limits,
            processes,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn get(&self, id: &str) -> Result<&NodeSpec> {
        self.processes
            .get(id)
            .with_context(|| format!("process '{id}' is not defined in the configuration"))
    }

    /// Declared neighbors of a process, in declaration order.
    pub fn neighbors_of(&self, id: &str) -> Result<Vec<NodeSpec>> {
        let spec = self.get(id)?;
        spec.neighbors
            .iter()
            .map(|nid| self.get(nid.as_str()).cloned())
            .collect()
    }

    /// The downstream roster of a node: declared neighbors with a strictly
    /// lower role, restricted to the node's own team below the leader level.
    /// The leader's roster is both team leaders; a team leader's roster is
    /// its team's workers; a worker has none.
    pub fn downstream_of(&self, spec: &NodeSpec) -> Result<Vec<NodeSpec>> {
        let neighbors = self.neighbors_of(spec.id.as_str())?;
        let roster = match spec.role {
            Role::Leader => neighbors
                .into_iter()
                .filter(|n| n.role == Role::TeamLeader)
                .collect(),
            Role::TeamLeader => neighbors
                .into_iter()
                .filter(|n| n.team == spec.team && n.role == Role::Worker)
                .collect(),
            Role::Worker => Vec::new(),
        };
        Ok(roster)
    }

    pub fn process_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.processes.keys().cloned().collect();
        ids.sort();
        ids
    }

    fn validate(&self) -> Result<()> {
        if self.processes.is_empty() {
            bail!("configuration must include at least one process definition");
        }
        if self.limits.result_ttl_secs < 60 {
            bail!(
                "result_ttl_secs must be at least 60, got {}",
                self.limits.result_ttl_secs
            );
        }
        if self.limits.max_total == 0 || self.limits.max_per_team == 0 {
            bail!("admission limits must be positive");
        }

        for (key, spec) in &self.processes {
            if key != spec.id.as_str() {
                bail!("process key '{}' does not match id '{}'", key, spec.id);
            }
            for neighbor in &spec.neighbors {
                let other = self
                    .processes
                    .get(neighbor.as_str())
                    .with_context(|| {
                        format!("process '{}' lists undeclared neighbor '{}'", spec.id, neighbor)
                    })?;
                if !other.neighbors.contains(&spec.id) {
                    bail!(
                        "asymmetric link: '{}' lists '{}' but not vice versa",
                        spec.id,
                        neighbor
                    );
                }
            }
            if spec.role == Role::Worker && !spec.owns_data() {
                bail!(
                    "worker '{}' has no date_bounds; data-owning roles must declare a shard",
                    spec.id
                );
            }
            if let Some([start, end]) = &spec.date_bounds {
                validate_date(&spec.id, start)?;
                validate_date(&spec.id, end)?;
                if start > end {
                    bail!("process '{}' has inverted date_bounds {start}..{end}", spec.id);
                }
            }
        }

        let leaders = self.count_role(Role::Leader, None);
        if leaders != 1 {
            bail!("exactly one leader required, found {leaders}");
        }
        for team in [Team::Green, Team::Pink] {
            let team_leaders = self.count_role(Role::TeamLeader, Some(team));
            if team_leaders != 1 {
                bail!("team {team} must have exactly one team leader, found {team_leaders}");
            }
        }

        self.validate_shard_disjointness()?;
        Ok(())
    }

    fn count_role(&self, role: Role, team: Option<Team>) -> usize {
        self.processes
            .values()
            .filter(|spec| spec.role == role && team.is_none_or(|t| spec.team == t))
            .count()
    }

    /// Same-team shards must not overlap: the team's range is partitioned,
    /// never replicated.
    fn validate_shard_disjointness(&self) -> Result<()> {
        for team in [Team::Green, Team::Pink] {
            let mut bounds: Vec<(&NodeId, &String, &String)> = self
                .processes
                .values()
                .filter(|spec| spec.team == team)
                .filter_map(|spec| {
                    spec.date_bounds
                        .as_ref()
                        .map(|[start, end]| (&spec.id, start, end))
                })
                .collect();
            bounds.sort_by(|a, b| a.1.cmp(b.1));
            for pair in bounds.windows(2) {
                let (prev_id, _, prev_end) = pair[0];
                let (next_id, next_start, _) = pair[1];
                if next_start <= prev_end {
                    bail!(
                        "team {team} shards overlap: '{prev_id}' ends {prev_end}, '{next_id}' starts {next_start}"
                    );
                }
            }
        }
        Ok(())
    }
}

fn validate_date(id: &NodeId, date: &str) -> Result<()> {
    if date.len() != 8 || !date.bytes().all(|b| b.is_ascii_digit()) {
        bail!("process '{id}' has malformed date '{date}', expected YYYYMMDD");
    }
    Ok(())
}
