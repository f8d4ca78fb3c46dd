use std::sync::Arc;
use std::time::{Duration, Instant};

use super::chunking::ChunkingStrategy;
use super::forwarding::{ForwardTarget, ForwardingStrategy, forward};
use super::types::{QueryRecord, failure_marker, split_limit};
use crate::admission::controller::AdmissionController;
use crate::cache::result::ChunkedResult;
use crate::cache::store::{ChunkLookup, ResultCache};
use crate::config::types::{NodeSpec, Role};
use crate::data::store::DataStore;
use crate::data::types::Measurement;
use crate::metrics::tracker::MetricsTracker;
use crate::transport::neighbors::NeighborRegistry;
use crate::transport::protocol::{ChunkResponse, MetricsResponse, QueryRequest, QueryResponse, Status};

/// Executes queries end to end for this node and answers chunk and metrics
/// requests. The transport handlers delegate to this facade; it owns the
/// wiring between admission, the local shard, the neighbor registry, the
/// result cache, and metrics.
pub struct QueryOrchestrator {
    node: NodeSpec,
    /// Downstream roster in declaration order; fixed at startup.
    downstream: Vec<NodeSpec>,
    store: Option<DataStore>,
    cache: Arc<ResultCache>,
    admission: Arc<AdmissionController>,
    registry: Arc<NeighborRegistry>,
    metrics: Arc<MetricsTracker>,
    forwarding: ForwardingStrategy,
    chunking: ChunkingStrategy,
    default_limit: u32,
    query_timeout: Duration,
}

impl QueryOrchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        node: NodeSpec,
        downstream: Vec<NodeSpec>,
        store: Option<DataStore>,
        cache: Arc<ResultCache>,
        admission: Arc<AdmissionController>,
        registry: Arc<NeighborRegistry>,
        metrics: Arc<MetricsTracker>,
        forwarding: ForwardingStrategy,
        chunking: ChunkingStrategy,
        default_limit: u32,
        query_timeout: Duration,
    ) -> Arc<Self> {
        if let Some(store) = &store {
            metrics.set_data_files_loaded(store.files_loaded() as u64);
        }
        Arc::new(Self {
            node,
            downstream,
            store,
            cache,
            admission,
            registry,
            metrics,
            forwarding,
            chunking,
            default_limit,
            query_timeout,
        })
    }

    /// Runs one query through the full pipeline. Never returns an error:
    /// downstream trouble degrades to partial results, and only admission
    /// refusal at this node surfaces as a non-`OK` terminal status.
    pub async fn execute_query(&self, request: QueryRequest) -> QueryResponse {
        let Some(token) = self.admission.admit(self.node.team) else {
            self.metrics.record_rejected();
            tracing::warn!(
                "[Orchestrator] {} rejected query for team {}: capacity exhausted",
                self.node.id,
                self.node.team
            );
            return QueryResponse {
                uid: String::new(),
                total_chunks: 0,
                total_records: 0,
                hops: request.hops,
                status: Status::CapacityExhausted,
            };
        };
        self.metrics.record_admitted();

        // Already accepted once; answer empty without touching the trace.
        if request.hops.iter().any(|hop| hop == self.node.id.as_str()) {
            return QueryResponse {
                uid: String::new(),
                total_chunks: 0,
                total_records: 0,
                hops: request.hops,
                status: Status::LoopSuppressed,
            };
        }

        let started = Instant::now();
        let query = self.build_record(request);
        let response = self.run(query, started).await;
        // Explicit for the reader; the token also releases on drop.
        token.release();
        response
    }

    /// Turns the wire request into the in-flight record: assigns the UID on
    /// first admission (the origin), clamps the limit, derives the deadline.
    fn build_record(&self, request: QueryRequest) -> QueryRecord {
        let uid = if request.uid.is_empty() {
            uuid::Uuid::new_v4().to_string()
        } else {
            request.uid
        };
        QueryRecord {
            uid,
            field: request.field,
            comparator: request.comparator,
            threshold: request.threshold,
            limit: request.limit.min(self.default_limit),
            hops: request.hops,
            deadline: Instant::now() + self.query_timeout,
        }
    }

    async fn run(&self, mut query: QueryRecord, started: Instant) -> QueryResponse {
        query.hops.push(self.node.id.to_string());

        let local_rows = self.scan_local(&query);

        let eligible: Vec<&NodeSpec> = self
            .downstream
            .iter()
            .filter(|spec| !query.hops.iter().any(|hop| hop == spec.id.as_str()))
            .collect();
        let allocations = split_limit(query.limit, eligible.len());
        let targets: Vec<ForwardTarget> = eligible
            .iter()
            .zip(&allocations)
            .filter(|(_, share)| **share > 0)
            .map(|(spec, share)| ForwardTarget {
                id: spec.id.to_string(),
                sub_limit: *share,
            })
            .collect();

        for target in &targets {
            tracing::debug!(
                "[Orchestrator] {} forwarding {} to {}, sub_limit={}",
                self.node.id,
                uid_prefix(&query.uid),
                target.id,
                target.sub_limit
            );
        }

        let partials = forward(self.forwarding, &self.registry, targets, &query).await;

        // Merge: local rows first, then downstream contributions in
        // declaration order. The trace absorbs each partial's novel hops,
        // or a failure marker.
        let mut merged = local_rows;
        for partial in &partials {
            if partial.failed {
                query.hops.push(failure_marker(&partial.neighbor_id));
                continue;
            }
            for hop in &partial.hops {
                if !query.hops.contains(hop) {
                    query.hops.push(hop.clone());
                }
            }
        }
        for partial in partials {
            merged.extend(partial.rows);
        }
        merged.truncate(query.limit as usize);

        let chunk_size = self.chunking.chunk_size(merged.len(), query.limit);
        let result = ChunkedResult::new(
            query.uid.clone(),
            merged,
            chunk_size,
            self.cache.ttl(),
            query.hops.clone(),
        );
        let total_chunks = result.total_chunks;
        let total_records = result.total_records();
        self.cache.put(result);

        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        self.metrics.record_completion(elapsed_ms);

        if self.node.role == Role::Leader {
            tracing::info!(
                "[Orchestrator] {} coordinated query {}: {} records aggregated, {:.1}ms, filter {} {} {}",
                self.node.id,
                uid_prefix(&query.uid),
                total_records,
                elapsed_ms,
                query.field,
                query.comparator,
                query.threshold
            );
        } else {
            tracing::info!(
                "[Orchestrator] {} query {}: {} records, {:.1}ms",
                self.node.id,
                uid_prefix(&query.uid),
                total_records,
                elapsed_ms
            );
        }

        QueryResponse {
            uid: query.uid,
            total_chunks,
            total_records,
            hops: query.hops,
            status: Status::Ok,
        }
    }

    fn scan_local(&self, query: &QueryRecord) -> Vec<Measurement> {
        let Some(store) = &self.store else {
            return Vec::new();
        };
        let scan_started = Instant::now();
        let rows = store.scan(
            &query.field,
            query.comparator,
            query.threshold,
            query.limit as usize,
        );
        self.metrics
            .record_scan(scan_started.elapsed().as_secs_f64() * 1000.0);
        if !rows.is_empty() {
            tracing::debug!(
                "[Orchestrator] {} local scan: {} of {} rows matched",
                self.node.id,
                rows.len(),
                store.records_loaded()
            );
        }
        rows
    }

    /// Resolves one chunk of a published result. Errors are returned
    /// verbatim in the `status` field; an out-of-range index on a live UID
    /// is a caller bug and maps to `INTERNAL_ERROR`.
    pub fn get_chunk(&self, uid: &str, index: u32) -> ChunkResponse {
        let response = self.lookup_chunk_response(uid, index);
        if response.status == Status::InternalError {
            self.metrics.record_failure();
        }
        response
    }

    fn lookup_chunk_response(&self, uid: &str, index: u32) -> ChunkResponse {
        match self.cache.lookup_chunk(uid, index) {
            ChunkLookup::Hit(result) => match result.chunk(index) {
                Some(chunk) => match serde_json::to_string(chunk.rows) {
                    Ok(data) => ChunkResponse {
                        uid: uid.to_string(),
                        index,
                        total_chunks: chunk.total_chunks,
                        data,
                        is_last: chunk.is_last,
                        status: Status::Ok,
                    },
                    Err(e) => {
                        tracing::error!("chunk serialization failed for {}: {}", uid, e);
                        empty_chunk(uid, index, chunk.total_chunks, Status::InternalError)
                    }
                },
                None => empty_chunk(uid, index, result.total_chunks, Status::InternalError),
            },
            ChunkLookup::OutOfRange(result) => {
                empty_chunk(uid, index, result.total_chunks, Status::InternalError)
            }
            ChunkLookup::Expired => empty_chunk(uid, index, 0, Status::UidExpired),
            ChunkLookup::Unknown => empty_chunk(uid, index, 0, Status::UidUnknown),
        }
    }

    /// Counts a request that blew up at the transport boundary. The
    /// handlers call this when they map a panic to `INTERNAL_ERROR`.
    pub fn record_transport_failure(&self) {
        self.metrics.record_failure();
    }

    pub fn build_metrics_response(&self) -> MetricsResponse {
        let admission = self.admission.snapshot();
        let stats = self.metrics.snapshot();
        MetricsResponse {
            process_id: self.node.id.to_string(),
            role: self.node.role,
            team: self.node.team,
            active_requests: admission.active_total as u64,
            max_capacity: admission.max_total as u64,
            queue_size: 0,
            avg_processing_time_ms: stats.avg_query_ms,
            data_files_loaded: stats.data_files_loaded,
            is_healthy: self.admission.has_headroom(),
        }
    }
}

/// Short uid form for log lines. Forwarded uids are caller-supplied, so
/// the cut respects char boundaries instead of trusting the byte count.
fn uid_prefix(uid: &str) -> &str {
    let mut end = uid.len().min(8);
    while !uid.is_char_boundary(end) {
        end -= 1;
    }
    &uid[..end]
}

fn empty_chunk(uid: &str, index: u32, total_chunks: u32, status: Status) -> ChunkResponse {
    ChunkResponse {
        uid: uid.to_string(),
        index,
        total_chunks,
        data: "[]".to_string(),
        is_last: true,
        status,
    }
}
