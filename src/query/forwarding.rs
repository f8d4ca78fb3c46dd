use std::sync::Arc;
use tokio::task::JoinSet;

use super::types::{NeighborPartial, QueryRecord};
use crate::config::types::{ForwardingKind, StrategiesConfig};
use crate::transport::neighbors::NeighborRegistry;

/// Fan-out policy over the eligible downstream set. Resolved once at
/// startup and passed by value into the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForwardingStrategy {
    /// Declared order. Blocking by default; `concurrent` (the
    /// `async_forwarding` knob) issues all calls at once while keeping the
    /// declared-order merge.
    RoundRobin { concurrent: bool },
    /// All sub-queries at once, bounded by the query deadline.
    Parallel,
    /// Like parallel, but issues in ascending order of the most recently
    /// observed neighbor load (ties keep declaration order).
    Capacity,
}

impl ForwardingStrategy {
    pub fn from_config(strategies: &StrategiesConfig) -> Self {
        match strategies.forwarding {
            ForwardingKind::RoundRobin => ForwardingStrategy::RoundRobin {
                concurrent: strategies.async_forwarding,
            },
            ForwardingKind::Parallel => ForwardingStrategy::Parallel,
            ForwardingKind::Capacity => ForwardingStrategy::Capacity,
        }
    }
}

/// One downstream call to make: neighbor id plus its share of the limit.
/// Built by the orchestrator in declaration order.
#[derive(Debug, Clone)]
pub struct ForwardTarget {
    pub id: String,
    pub sub_limit: u32,
}

/// Executes the fan-out and returns one partial per target, in the same
/// order the targets were given (declaration order), regardless of
/// completion order. A failed or cancelled call yields a failure partial,
/// never an error: the merge degrades, the query does not fail.
pub async fn forward(
    strategy: ForwardingStrategy,
    registry: &Arc<NeighborRegistry>,
    targets: Vec<ForwardTarget>,
    query: &QueryRecord,
) -> Vec<NeighborPartial> {
    if targets.is_empty() {
        return Vec::new();
    }
    match strategy {
        ForwardingStrategy::RoundRobin { concurrent: false } => {
            forward_sequential(registry, targets, query).await
        }
        ForwardingStrategy::RoundRobin { concurrent: true } | ForwardingStrategy::Parallel => {
            let issue_order: Vec<(usize, ForwardTarget)> =
                targets.iter().cloned().enumerate().collect();
            forward_concurrent(registry, targets, issue_order, query).await
        }
        ForwardingStrategy::Capacity => {
            let mut issue_order: Vec<(usize, ForwardTarget)> =
                targets.iter().cloned().enumerate().collect();
            // Stale hints are fine; a missing snapshot sorts as idle. The
            // sort is stable, so equal loads keep declaration order.
            issue_order.sort_by(|a, b| {
                registry
                    .load_hint(&a.1.id)
                    .total_cmp(&registry.load_hint(&b.1.id))
            });
            forward_concurrent(registry, targets, issue_order, query).await
        }
    }
}

async fn forward_sequential(
    registry: &Arc<NeighborRegistry>,
    targets: Vec<ForwardTarget>,
    query: &QueryRecord,
) -> Vec<NeighborPartial> {
    let mut partials = Vec::with_capacity(targets.len());
    for target in targets {
        match registry
            .query_and_drain(&target.id, query, target.sub_limit)
            .await
        {
            Ok(partial) => partials.push(partial),
            Err(e) => {
                tracing::warn!("forwarding to {} failed: {}", target.id, e);
                partials.push(NeighborPartial::failure(target.id));
            }
        }
    }
    partials
}

/// Issues every call as its own task and reassembles results by slot. On
/// deadline expiry the still-pending calls are aborted; partials that
/// already arrived are kept.
async fn forward_concurrent(
    registry: &Arc<NeighborRegistry>,
    targets: Vec<ForwardTarget>,
    issue_order: Vec<(usize, ForwardTarget)>,
    query: &QueryRecord,
) -> Vec<NeighborPartial> {
    let mut slots: Vec<Option<NeighborPartial>> = targets.iter().map(|_| None).collect();

    let mut calls = JoinSet::new();
    for (slot, target) in issue_order {
        let registry = registry.clone();
        let query = query.clone();
        calls.spawn(async move {
            let outcome = registry
                .query_and_drain(&target.id, &query, target.sub_limit)
                .await;
            (slot, target.id, outcome)
        });
    }

    let deadline = tokio::time::Instant::from_std(query.deadline);
    loop {
        match tokio::time::timeout_at(deadline, calls.join_next()).await {
            Ok(Some(Ok((slot, _, Ok(partial))))) => slots[slot] = Some(partial),
            Ok(Some(Ok((slot, id, Err(e))))) => {
                tracing::warn!("forwarding to {} failed: {}", id, e);
                slots[slot] = Some(NeighborPartial::failure(id));
            }
            Ok(Some(Err(e))) => {
                tracing::warn!("forwarding task aborted: {}", e);
            }
            Ok(None) => break,
            Err(_) => {
                tracing::warn!(
                    "query {} deadline expired with {} downstream calls pending",
                    query.uid,
                    calls.len()
                );
                calls.abort_all();
                break;
            }
        }
    }

    slots
        .into_iter()
        .zip(targets)
        .map(|(slot, target)| slot.unwrap_or_else(|| NeighborPartial::failure(target.id)))
        .collect()
}
