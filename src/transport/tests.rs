#[cfg(test)]
mod tests {
    use crate::admission::controller::AdmissionController;
    use crate::admission::fairness::FairnessStrategy;
    use crate::cache::store::ResultCache;
    use crate::config::types::{NodeId, NodeSpec, Role, Team};
    use crate::data::types::{Comparator, Measurement};
    use crate::metrics::tracker::MetricsTracker;
    use crate::query::chunking::ChunkingStrategy;
    use crate::query::forwarding::ForwardingStrategy;
    use crate::query::orchestrator::QueryOrchestrator;
    use crate::transport::handlers::{handle_get_chunk, handle_query};
    use crate::transport::neighbors::NeighborRegistry;
    use crate::transport::protocol::{
        ChunkResponse, MetricsResponse, QueryRequest, QueryResponse, Status,
    };
    use axum::extract::{Extension, Path};
    use axum::http::StatusCode;
    use std::sync::Arc;
    use std::time::Duration;

    // NOTE: handler round-trips over real sockets are exercised by the
    // running overlay; these tests pin down the wire shapes peers rely on.

    // ============================================================
    // STATUS ENCODING
    // ============================================================

    #[test]
    fn test_status_wire_strings() {
        assert_eq!(serde_json::to_string(&Status::Ok).unwrap(), "\"OK\"");
        assert_eq!(
            serde_json::to_string(&Status::CapacityExhausted).unwrap(),
            "\"CAPACITY_EXHAUSTED\""
        );
        assert_eq!(
            serde_json::to_string(&Status::LoopSuppressed).unwrap(),
            "\"LOOP_SUPPRESSED\""
        );
        assert_eq!(
            serde_json::to_string(&Status::UidExpired).unwrap(),
            "\"UID_EXPIRED\""
        );
        assert_eq!(
            serde_json::to_string(&Status::UidUnknown).unwrap(),
            "\"UID_UNKNOWN\""
        );
        assert_eq!(
            serde_json::to_string(&Status::NeighborUnreachable).unwrap(),
            "\"NEIGHBOR_UNREACHABLE\""
        );
        assert_eq!(
            serde_json::to_string(&Status::InternalError).unwrap(),
            "\"INTERNAL_ERROR\""
        );
    }

    #[test]
    fn test_comparator_wire_symbols() {
        assert_eq!(serde_json::to_string(&Comparator::Lt).unwrap(), "\"<\"");
        assert_eq!(serde_json::to_string(&Comparator::Le).unwrap(), "\"<=\"");
        assert_eq!(serde_json::to_string(&Comparator::Eq).unwrap(), "\"=\"");
        assert_eq!(serde_json::to_string(&Comparator::Ge).unwrap(), "\">=\"");
        assert_eq!(serde_json::to_string(&Comparator::Gt).unwrap(), "\">\"");

        let parsed: Comparator = serde_json::from_str("\">=\"").unwrap();
        assert_eq!(parsed, Comparator::Ge);
    }

    // ============================================================
    // REQUEST / RESPONSE SHAPES
    // ============================================================

    #[test]
    fn test_client_query_omits_uid_and_hops() {
        // Exactly what the CLI client sends: no uid, no hops.
        let json = r#"{"field":"PM2.5","comparator":">","threshold":35.0,"limit":5}"#;
        let request: QueryRequest = serde_json::from_str(json).unwrap();

        assert_eq!(request.field, "PM2.5");
        assert_eq!(request.comparator, Comparator::Gt);
        assert_eq!(request.limit, 5);
        assert!(request.uid.is_empty());
        assert!(request.hops.is_empty());
    }

    #[test]
    fn test_internal_forward_round_trips() {
        let request = QueryRequest {
            field: "OZONE".to_string(),
            comparator: Comparator::Le,
            threshold: 0.07,
            limit: 42,
            uid: "uid-1".to_string(),
            hops: vec!["A".to_string(), "B".to_string()],
        };

        let json = serde_json::to_string(&request).unwrap();
        let parsed: QueryRequest = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.uid, "uid-1");
        assert_eq!(parsed.hops, vec!["A", "B"]);
        assert_eq!(parsed.threshold, 0.07);
    }

    #[test]
    fn test_query_response_round_trips() {
        let response = QueryResponse {
            uid: "uid-1".to_string(),
            total_chunks: 6,
            total_records: 1050,
            hops: vec!["A".to_string(), "B".to_string(), "C".to_string()],
            status: Status::Ok,
        };

        let json = serde_json::to_string(&response).unwrap();
        let parsed: QueryResponse = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.total_chunks, 6);
        assert_eq!(parsed.total_records, 1050);
        assert_eq!(parsed.status, Status::Ok);
    }

    #[test]
    fn test_chunk_data_round_trips_rows_losslessly() {
        let rows = vec![Measurement {
            latitude: 34.0522,
            longitude: -118.2437,
            timestamp: "2020-08-15T01:00".to_string(),
            parameter: "PM2.5".to_string(),
            value: 41.5,
            unit: "UG/M3".to_string(),
            aqi: 115,
            site_name: "Reseda, CA".to_string(),
            date: "20200815".to_string(),
        }];

        let response = ChunkResponse {
            uid: "uid-1".to_string(),
            index: 0,
            total_chunks: 1,
            data: serde_json::to_string(&rows).unwrap(),
            is_last: true,
            status: Status::Ok,
        };

        let wire = serde_json::to_string(&response).unwrap();
        let parsed: ChunkResponse = serde_json::from_str(&wire).unwrap();
        let decoded: Vec<Measurement> = serde_json::from_str(&parsed.data).unwrap();

        assert_eq!(decoded, rows);
    }

    #[test]
    fn test_metrics_response_encoding() {
        let response = MetricsResponse {
            process_id: "E".to_string(),
            role: Role::TeamLeader,
            team: Team::Pink,
            active_requests: 3,
            max_capacity: 16,
            queue_size: 0,
            avg_processing_time_ms: 12.5,
            data_files_loaded: 9,
            is_healthy: true,
        };

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"role\":\"team_leader\""));
        assert!(json.contains("\"team\":\"pink\""));
        assert!(json.contains("\"queue_size\":0"));

        let parsed: MetricsResponse = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.role, Role::TeamLeader);
        assert_eq!(parsed.active_requests, 3);
    }

    // ============================================================
    // NEIGHBOR REGISTRY
    // ============================================================

    fn neighbor(id: &str, port: u16) -> NodeSpec {
        NodeSpec {
            id: NodeId(id.to_string()),
            role: Role::Worker,
            team: Team::Green,
            host: "127.0.0.1".to_string(),
            port,
            neighbors: Vec::new(),
            date_bounds: None,
        }
    }

    #[test]
    fn test_registry_rejects_undeclared_neighbor() {
        let registry = NeighborRegistry::new(vec![neighbor("C", 50053)]);
        assert!(registry.client("C").is_ok());
        assert!(registry.client("Z").is_err());
    }

    #[test]
    fn test_registry_reuses_lazily_created_client() {
        let registry = NeighborRegistry::new(vec![neighbor("C", 50053)]);
        let first = registry.client("C").unwrap();
        let second = registry.client("C").unwrap();
        assert!(std::sync::Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_load_hint_defaults_to_idle() {
        let registry = NeighborRegistry::new(vec![neighbor("C", 50053)]);
        assert_eq!(registry.load_hint("C"), 0.0);
        assert_eq!(registry.load_hint("unknown"), 0.0);
    }

    // ============================================================
    // HANDLER STATUS MAPPING
    // ============================================================

    /// A standalone worker with no downstream, enough to drive the
    /// handlers in-process.
    fn orchestrator_fixture() -> Arc<QueryOrchestrator> {
        let spec = NodeSpec {
            id: NodeId("C".to_string()),
            role: Role::Worker,
            team: Team::Green,
            host: "127.0.0.1".to_string(),
            port: 1,
            neighbors: Vec::new(),
            date_bounds: None,
        };
        QueryOrchestrator::new(
            spec,
            Vec::new(),
            None,
            Arc::new(ResultCache::new(Duration::from_secs(60))),
            AdmissionController::new(FairnessStrategy::Strict, 16, 8),
            NeighborRegistry::new(Vec::new()),
            Arc::new(MetricsTracker::new()),
            ForwardingStrategy::RoundRobin { concurrent: false },
            ChunkingStrategy::Fixed { size: 200 },
            2000,
            Duration::from_secs(10),
        )
    }

    #[tokio::test]
    async fn test_query_handler_ok_and_loop_map_to_200() {
        let orchestrator = orchestrator_fixture();

        let request = QueryRequest {
            field: "PM2.5".to_string(),
            comparator: Comparator::Gt,
            threshold: 35.0,
            limit: 5,
            uid: String::new(),
            hops: Vec::new(),
        };
        let (code, body) = handle_query(Extension(orchestrator.clone()), axum::Json(request)).await;
        assert_eq!(code, StatusCode::OK);
        assert_eq!(body.0.status, Status::Ok);

        let looped = QueryRequest {
            field: "PM2.5".to_string(),
            comparator: Comparator::Gt,
            threshold: 35.0,
            limit: 5,
            uid: "uid-1".to_string(),
            hops: vec!["A".to_string(), "C".to_string()],
        };
        let (code, body) = handle_query(Extension(orchestrator), axum::Json(looped)).await;
        assert_eq!(code, StatusCode::OK);
        assert_eq!(body.0.status, Status::LoopSuppressed);
    }

    #[tokio::test]
    async fn test_chunk_handler_maps_unknown_uid_to_404() {
        let orchestrator = orchestrator_fixture();

        let (code, body) = handle_get_chunk(
            Extension(orchestrator),
            Path(("never-published".to_string(), 0)),
        )
        .await;

        assert_eq!(code, StatusCode::NOT_FOUND);
        assert_eq!(body.0.status, Status::UidUnknown);
        assert_eq!(body.0.data, "[]");
    }

    #[tokio::test]
    async fn test_chunk_handler_maps_internal_error_to_500() {
        let orchestrator = orchestrator_fixture();

        let request = QueryRequest {
            field: "PM2.5".to_string(),
            comparator: Comparator::Gt,
            threshold: 35.0,
            limit: 5,
            uid: String::new(),
            hops: Vec::new(),
        };
        let (_, body) = handle_query(Extension(orchestrator.clone()), axum::Json(request)).await;
        let uid = body.0.uid.clone();

        // Out of range on a live uid: caller bug, INTERNAL_ERROR, HTTP 500.
        let (code, chunk) =
            handle_get_chunk(Extension(orchestrator), Path((uid, 9))).await;
        assert_eq!(code, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(chunk.0.status, Status::InternalError);
    }
}
