//! Transport API Handlers
//!
//! HTTP endpoints bridging axum to the orchestrator facade. The body always
//! carries the outcome in its `status` field; HTTP codes mirror it for
//! observability but peers decode the body regardless of code.
//!
//! This is also the boundary where unexpected panics stop: a panic inside
//! the orchestrator is caught here, counted as a failure, and mapped to an
//! `INTERNAL_ERROR` response instead of tearing down the connection. No
//! request error takes the process down.

use axum::{
    Json,
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use super::protocol::{ChunkResponse, QueryRequest, QueryResponse, Status};
use crate::query::orchestrator::QueryOrchestrator;

pub async fn handle_query(
    Extension(orchestrator): Extension<Arc<QueryOrchestrator>>,
    Json(request): Json<QueryRequest>,
) -> (StatusCode, Json<QueryResponse>) {
    let hops = request.hops.clone();

    // Run the query in its own task so a panic unwinds that task alone
    // (releasing its admission token on the way) and surfaces here as a
    // join error instead of killing the connection.
    let worker = orchestrator.clone();
    let outcome = tokio::spawn(async move { worker.execute_query(request).await }).await;

    let response = match outcome {
        Ok(response) => response,
        Err(e) => {
            tracing::error!("query handler panicked: {}", e);
            orchestrator.record_transport_failure();
            QueryResponse {
                uid: String::new(),
                total_chunks: 0,
                total_records: 0,
                hops,
                status: Status::InternalError,
            }
        }
    };

    let code = match response.status {
        Status::Ok | Status::LoopSuppressed => StatusCode::OK,
        Status::CapacityExhausted => StatusCode::TOO_MANY_REQUESTS,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (code, Json(response))
}

pub async fn handle_get_chunk(
    Extension(orchestrator): Extension<Arc<QueryOrchestrator>>,
    Path((uid, index)): Path<(String, u32)>,
) -> (StatusCode, Json<ChunkResponse>) {
    let response =
        match std::panic::catch_unwind(AssertUnwindSafe(|| orchestrator.get_chunk(&uid, index))) {
            Ok(response) => response,
            Err(_) => {
                tracing::error!("chunk handler panicked for {}/{}", uid, index);
                orchestrator.record_transport_failure();
                ChunkResponse {
                    uid: uid.clone(),
                    index,
                    total_chunks: 0,
                    data: "[]".to_string(),
                    is_last: true,
                    status: Status::InternalError,
                }
            }
        };

    let code = match response.status {
        Status::Ok => StatusCode::OK,
        Status::UidUnknown => StatusCode::NOT_FOUND,
        Status::UidExpired => StatusCode::GONE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (code, Json(response))
}

pub async fn handle_get_metrics(
    Extension(orchestrator): Extension<Arc<QueryOrchestrator>>,
) -> Response {
    match std::panic::catch_unwind(AssertUnwindSafe(|| orchestrator.build_metrics_response())) {
        Ok(metrics) => Json(metrics).into_response(),
        Err(_) => {
            tracing::error!("metrics handler panicked");
            orchestrator.record_transport_failure();
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "status": Status::InternalError })),
            )
                .into_response()
        }
    }
}
