use serde::{Deserialize, Serialize};

/// Identifier of a process in the overlay (a single letter in the shipped
/// configurations, e.g. "A").
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Position of a process in the overlay hierarchy. Determines the downstream
/// roster: a leader forwards to team leaders, a team leader to its team's
/// workers, a worker to nobody.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Leader,
    TeamLeader,
    Worker,
}

/// Team membership. Each team jointly owns a disjoint date range of the
/// dataset; admission budgets are tracked per team.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Team {
    Green,
    Pink,
}

impl Team {
    pub fn other(self) -> Team {
        match self {
            Team::Green => Team::Pink,
            Team::Pink => Team::Green,
        }
    }
}

impl std::fmt::Display for Team {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Team::Green => f.write_str("green"),
            Team::Pink => f.write_str("pink"),
        }
    }
}

/// Immutable description of one configured process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSpec {
    pub id: NodeId,
    pub role: Role,
    pub team: Team,
    pub host: String,
    pub port: u16,
    /// Declared neighbor ids. The declaration order is load-bearing: it fixes
    /// forwarding order, limit-split remainders, and merge order.
    pub neighbors: Vec<NodeId>,
    /// Inclusive YYYYMMDD bounds of the shard this node owns. Absent for
    /// pure routers.
    #[serde(default)]
    pub date_bounds: Option<[String; 2]>,
}

impl NodeSpec {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn owns_data(&self) -> bool {
        self.date_bounds.is_some()
    }
}

/// Forwarding strategy selector.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ForwardingKind {
    RoundRobin,
    Parallel,
    Capacity,
}

/// Chunking strategy selector.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChunkingKind {
    Fixed,
    Adaptive,
    QueryBased,
}

/// Fairness strategy selector.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FairnessKind {
    Strict,
    Weighted,
    Hybrid,
}

/// Strategy selectors, resolved once at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategiesConfig {
    pub forwarding: ForwardingKind,
    /// Upgrades `round_robin` to concurrent issue while keeping its
    /// declared-order merge. `parallel` and `capacity` are always concurrent.
    #[serde(default)]
    pub async_forwarding: bool,
    pub chunking: ChunkingKind,
    pub fairness: FairnessKind,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

fn default_chunk_size() -> usize {
    200
}

/// Concurrency and sizing knobs shared by every node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Limits {
    #[serde(default = "default_max_total")]
    pub max_total: usize,
    #[serde(default = "default_max_per_team")]
    pub max_per_team: usize,
    /// Upper clamp applied to every incoming row limit.
    #[serde(default = "default_limit")]
    pub default_limit: u32,
    /// Deadline budget for a single query, local work plus fan-out.
    #[serde(default = "default_query_timeout_ms")]
    pub query_timeout_ms: u64,
    #[serde(default = "default_result_ttl_secs")]
    pub result_ttl_secs: u64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_total: default_max_total(),
            max_per_team: default_max_per_team(),
            default_limit: default_limit(),
            query_timeout_ms: default_query_timeout_ms(),
            result_ttl_secs: default_result_ttl_secs(),
        }
    }
}

fn default_max_total() -> usize {
    16
}

fn default_max_per_team() -> usize {
    8
}

fn default_limit() -> u32 {
    2000
}

fn default_query_timeout_ms() -> u64 {
    10_000
}

fn default_result_ttl_secs() -> u64 {
    300
}
