use anyhow::{Context, Result, bail};
use dashmap::DashMap;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::protocol::{
    ChunkResponse, ENDPOINT_CHUNK, ENDPOINT_METRICS, ENDPOINT_QUERY, MetricsResponse,
    QueryRequest, QueryResponse, Status,
};
use crate::config::types::NodeSpec;
use crate::data::types::Measurement;
use crate::query::types::{NeighborPartial, QueryRecord};

/// One transparent retry per call.
const CALL_ATTEMPTS: usize = 2;
/// Ceiling on any single neighbor call, even with deadline budget left.
const MAX_CALL_TIMEOUT: Duration = Duration::from_secs(5);

/// Most recently observed load of a neighbor, fed by the background metrics
/// probe. Staleness is tolerated by design.
#[derive(Debug, Clone, Copy)]
struct LoadHint {
    active: u64,
    max: u64,
}

/// Typed client for one neighbor. Created lazily on first use and reused;
/// the underlying connection pool is shared across all clients.
pub struct NeighborClient {
    spec: NodeSpec,
    http: reqwest::Client,
}

impl NeighborClient {
    fn new(spec: NodeSpec, http: reqwest::Client) -> Self {
        Self { spec, http }
    }

    pub fn id(&self) -> &str {
        self.spec.id.as_str()
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.spec.address(), path)
    }

    pub async fn query(&self, request: &QueryRequest, timeout: Duration) -> Result<QueryResponse> {
        self.post_json(ENDPOINT_QUERY, request, timeout).await
    }

    pub async fn get_chunk(&self, uid: &str, index: u32, timeout: Duration) -> Result<ChunkResponse> {
        self.get_json(&format!("{ENDPOINT_CHUNK}/{uid}/{index}"), timeout)
            .await
    }

    pub async fn get_metrics(&self, timeout: Duration) -> Result<MetricsResponse> {
        self.get_json(ENDPOINT_METRICS, timeout).await
    }

    /// POST with bounded retry: connection-level failures are retried once
    /// with backoff and jitter; an HTTP response of any status is final and
    /// its body is decoded (nodes report outcomes in the `status` field,
    /// not via HTTP codes alone).
    async fn post_json<T: Serialize, R: DeserializeOwned>(
        &self,
        path: &str,
        payload: &T,
        timeout: Duration,
    ) -> Result<R> {
        let mut delay_ms = 150u64;
        for attempt in 0..CALL_ATTEMPTS {
            let response = self
                .http
                .post(self.url(path))
                .json(payload)
                .timeout(timeout)
                .send()
                .await;

            match response {
                Ok(resp) => {
                    return resp
                        .json()
                        .await
                        .with_context(|| format!("bad response body from {}", self.spec.id));
                }
                Err(e) => {
                    if attempt + 1 == CALL_ATTEMPTS {
                        return Err(anyhow::anyhow!(e))
                            .with_context(|| format!("neighbor {} unreachable", self.spec.id));
                    }
                    let jitter = rand::random::<u64>() % 50;
                    tokio::time::sleep(Duration::from_millis(delay_ms + jitter)).await;
                    delay_ms = (delay_ms * 2).min(1200);
                }
            }
        }
        bail!("retry attempts exhausted for {}", self.spec.id)
    }

    async fn get_json<R: DeserializeOwned>(&self, path: &str, timeout: Duration) -> Result<R> {
        let mut delay_ms = 150u64;
        for attempt in 0..CALL_ATTEMPTS {
            let response = self.http.get(self.url(path)).timeout(timeout).send().await;

            match response {
                Ok(resp) => {
                    return resp
                        .json()
                        .await
                        .with_context(|| format!("bad response body from {}", self.spec.id));
                }
                Err(e) => {
                    if attempt + 1 == CALL_ATTEMPTS {
                        return Err(anyhow::anyhow!(e))
                            .with_context(|| format!("neighbor {} unreachable", self.spec.id));
                    }
                    let jitter = rand::random::<u64>() % 50;
                    tokio::time::sleep(Duration::from_millis(delay_ms + jitter)).await;
                    delay_ms = (delay_ms * 2).min(1200);
                }
            }
        }
        bail!("retry attempts exhausted for {}", self.spec.id)
    }
}

/// Lazily opened, reused typed clients for this node's declared neighbors,
/// plus the cached load snapshots the capacity strategy sorts by. The
/// registry never buffers or reorders requests.
pub struct NeighborRegistry {
    specs: HashMap<String, NodeSpec>,
    clients: DashMap<String, Arc<NeighborClient>>,
    loads: DashMap<String, LoadHint>,
    http: reqwest::Client,
}

impl NeighborRegistry {
    pub fn new(neighbors: Vec<NodeSpec>) -> Arc<Self> {
        let specs = neighbors
            .into_iter()
            .map(|spec| (spec.id.to_string(), spec))
            .collect();
        Arc::new(Self {
            specs,
            clients: DashMap::new(),
            loads: DashMap::new(),
            http: reqwest::Client::new(),
        })
    }

    pub fn neighbor_ids(&self) -> Vec<String> {
        self.specs.keys().cloned().collect()
    }

    pub fn client(&self, neighbor_id: &str) -> Result<Arc<NeighborClient>> {
        if let Some(client) = self.clients.get(neighbor_id) {
            return Ok(client.value().clone());
        }
        let spec = self
            .specs
            .get(neighbor_id)
            .with_context(|| format!("'{neighbor_id}' is not a declared neighbor"))?;
        let client = Arc::new(NeighborClient::new(spec.clone(), self.http.clone()));
        self.clients
            .insert(neighbor_id.to_string(), client.clone());
        Ok(client)
    }

    /// Most recent load ratio for a neighbor, 0.0 when never observed.
    pub fn load_hint(&self, neighbor_id: &str) -> f64 {
        self.loads
            .get(neighbor_id)
            .map(|hint| hint.active as f64 / hint.max.max(1) as f64)
            .unwrap_or(0.0)
    }

    /// Polls every neighbor's metrics and refreshes the load snapshots.
    /// A probe failure keeps the previous observation.
    pub async fn refresh_load_hints(&self) {
        for id in self.specs.keys() {
            let Ok(client) = self.client(id) else { continue };
            match client.get_metrics(Duration::from_millis(1500)).await {
                Ok(metrics) => {
                    self.loads.insert(
                        id.clone(),
                        LoadHint {
                            active: metrics.active_requests,
                            max: metrics.max_capacity,
                        },
                    );
                }
                Err(e) => {
                    tracing::debug!("load probe for {} failed: {}", id, e);
                }
            }
        }
    }

    /// Sends one sub-query and drains the neighbor's chunks into rows.
    ///
    /// A saturated or already-visited neighbor is a clean zero-row partial.
    /// Transport failure after retry is an error the forwarding layer turns
    /// into a failure marker; a failure halfway through chunk draining
    /// keeps the rows already fetched and flags the partial.
    pub async fn query_and_drain(
        &self,
        neighbor_id: &str,
        query: &QueryRecord,
        sub_limit: u32,
    ) -> Result<NeighborPartial> {
        let client = self.client(neighbor_id)?;

        let request = QueryRequest {
            field: query.field.clone(),
            comparator: query.comparator,
            threshold: query.threshold,
            limit: sub_limit,
            uid: query.uid.clone(),
            hops: query.hops.clone(),
        };

        let response = client
            .query(&request, self.call_timeout(query.deadline)?)
            .await?;

        match response.status {
            Status::Ok => {}
            Status::LoopSuppressed | Status::CapacityExhausted => {
                return Ok(NeighborPartial {
                    neighbor_id: neighbor_id.to_string(),
                    rows: Vec::new(),
                    hops: response.hops,
                    failed: false,
                });
            }
            other => {
                tracing::warn!("neighbor {} answered {:?}", neighbor_id, other);
                return Ok(NeighborPartial::failure(neighbor_id.to_string()));
            }
        }

        let mut rows: Vec<Measurement> = Vec::new();
        let mut failed = false;
        for index in 0..response.total_chunks {
            if rows.len() >= sub_limit as usize {
                break;
            }
            let timeout = match self.call_timeout(query.deadline) {
                Ok(t) => t,
                Err(_) => {
                    failed = true;
                    break;
                }
            };
            let chunk = match client.get_chunk(&response.uid, index, timeout).await {
                Ok(chunk) if chunk.status == Status::Ok => chunk,
                Ok(chunk) => {
                    tracing::warn!(
                        "chunk {}/{} from {} answered {:?}",
                        response.uid,
                        index,
                        neighbor_id,
                        chunk.status
                    );
                    failed = true;
                    break;
                }
                Err(e) => {
                    tracing::warn!("chunk fetch from {} failed: {}", neighbor_id, e);
                    failed = true;
                    break;
                }
            };

            match serde_json::from_str::<Vec<Measurement>>(&chunk.data) {
                Ok(batch) => {
                    let room = sub_limit as usize - rows.len();
                    rows.extend(batch.into_iter().take(room));
                }
                Err(e) => {
                    tracing::warn!("undecodable chunk from {}: {}", neighbor_id, e);
                    failed = true;
                    break;
                }
            }
            if chunk.is_last {
                break;
            }
        }

        Ok(NeighborPartial {
            neighbor_id: neighbor_id.to_string(),
            rows,
            hops: response.hops,
            failed,
        })
    }

    /// Per-call timeout derived from the query deadline, capped. An already
    /// expired deadline is an error so callers do not issue doomed calls.
    fn call_timeout(&self, deadline: Instant) -> Result<Duration> {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            bail!("query deadline exhausted");
        }
        Ok(remaining.min(MAX_CALL_TIMEOUT))
    }
}
