use axum::{
    Router,
    extract::Extension,
    routing::{get, post},
};
use query_overlay::admission::controller::AdmissionController;
use query_overlay::cache::store::ResultCache;
use query_overlay::config::loader::OverlayConfig;
use query_overlay::config::types::ForwardingKind;
use query_overlay::data::store::DataStore;
use query_overlay::metrics::tracker::MetricsTracker;
use query_overlay::query::chunking::ChunkingStrategy;
use query_overlay::query::forwarding::ForwardingStrategy;
use query_overlay::query::orchestrator::QueryOrchestrator;
use query_overlay::transport::handlers::{handle_get_chunk, handle_get_metrics, handle_query};
use query_overlay::transport::neighbors::NeighborRegistry;
use query_overlay::transport::protocol::{ENDPOINT_CHUNK, ENDPOINT_METRICS, ENDPOINT_QUERY};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

const CACHE_EVICTION_INTERVAL: Duration = Duration::from_secs(5);
const LOAD_PROBE_INTERVAL: Duration = Duration::from_secs(2);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args: Vec<String> = std::env::args().collect();

    let mut config_path: Option<PathBuf> = None;
    let mut process_id: Option<String> = None;
    let mut dataset_root = PathBuf::from("datasets/2020-fire/data");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                config_path = Some(PathBuf::from(&args[i + 1]));
                i += 2;
            }
            "--id" => {
                process_id = Some(args[i + 1].clone());
                i += 2;
            }
            "--dataset-root" => {
                dataset_root = PathBuf::from(&args[i + 1]);
                i += 2;
            }
            _ => {
                i += 1;
            }
        }
    }

    let (Some(config_path), Some(process_id)) = (config_path, process_id) else {
        eprintln!(
            "Usage: {} --config <overlay.json> --id <A..F> [--dataset-root <path>]",
            args[0]
        );
        eprintln!(
            "Example: {} --config config/single_host.json --id A",
            args[0]
        );
        std::process::exit(1);
    };

    let config = OverlayConfig::load(&config_path)?;
    let node = config.get(&process_id)?.clone();
    let downstream = config.downstream_of(&node)?;
    let neighbors = config.neighbors_of(&process_id)?;

    tracing::info!(
        "[Overlay] {} ({:?}/{}) starting on {}, neighbors {:?}",
        node.id,
        node.role,
        node.team,
        node.address(),
        node.neighbors
    );

    // Components, leaves first: metrics, data, cache, neighbors, admission,
    // orchestrator, transport.
    let metrics = Arc::new(MetricsTracker::new());

    let store = if node.owns_data() {
        let store = DataStore::load(&node, &dataset_root)?;
        Some(store)
    } else {
        tracing::info!("[Overlay] {} owns no shard (pure router)", node.id);
        None
    };

    let cache = Arc::new(ResultCache::new(Duration::from_secs(
        config.limits.result_ttl_secs,
    )));
    let registry = NeighborRegistry::new(neighbors);
    let admission = AdmissionController::new(
        config.strategies.fairness.into(),
        config.limits.max_total,
        config.limits.max_per_team,
    );

    let orchestrator = QueryOrchestrator::new(
        node.clone(),
        downstream,
        store,
        cache.clone(),
        admission,
        registry.clone(),
        metrics,
        ForwardingStrategy::from_config(&config.strategies),
        ChunkingStrategy::from_config(config.strategies.chunking, config.strategies.chunk_size),
        config.limits.default_limit,
        Duration::from_millis(config.limits.query_timeout_ms),
    );

    // Background eviction of expired results.
    let eviction_cache = cache.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(CACHE_EVICTION_INTERVAL);
        loop {
            interval.tick().await;
            let evicted = eviction_cache.evict_expired();
            if evicted > 0 {
                tracing::debug!("evicted {} expired results", evicted);
            }
        }
    });

    // The capacity strategy routes on observed neighbor load; keep the
    // snapshots warm. Other strategies never read them.
    if config.strategies.forwarding == ForwardingKind::Capacity {
        let probe_registry = registry.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(LOAD_PROBE_INTERVAL);
            loop {
                interval.tick().await;
                probe_registry.refresh_load_hints().await;
            }
        });
    }

    let app = Router::new()
        .route(ENDPOINT_QUERY, post(handle_query))
        .route(
            &format!("{ENDPOINT_CHUNK}/:uid/:index"),
            get(handle_get_chunk),
        )
        .route(ENDPOINT_METRICS, get(handle_get_metrics))
        .layer(Extension(orchestrator));

    let bind_addr = format!("0.0.0.0:{}", node.port);
    tracing::info!("[Overlay] {} listening on {}", node.id, bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
