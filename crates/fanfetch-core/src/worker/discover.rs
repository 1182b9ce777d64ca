//! Startup probing: turn ssh targets into a [`CapacityModel`] and size the resource.

use std::sync::Arc;

use tokio::task::JoinSet;

use crate::config::FanfetchConfig;
use crate::planner::PlanningError;
use crate::remote::{FetchRequest, RemoteExecutor};

use super::{CapacityModel, RemoteWorker};

/// Parameters for worker discovery.
#[derive(Debug, Clone, Copy)]
pub struct DiscoveryOptions {
    /// Concurrency limit given to every worker.
    pub concurrency: usize,
    /// Free space assumed when a worker's `df` cannot be read.
    pub assumed_free_bytes: u64,
    /// Bytes subtracted from measured free space.
    pub reserve_bytes: u64,
}

impl DiscoveryOptions {
    pub fn from_config(cfg: &FanfetchConfig) -> Self {
        Self {
            concurrency: cfg.concurrency_per_worker.max(1),
            assumed_free_bytes: cfg.assumed_free_bytes,
            reserve_bytes: cfg.free_space_reserve_bytes,
        }
    }
}

/// Probes every target concurrently for a fetch tool and free space.
///
/// Any target without curl or wget (or unreachable) aborts discovery: nothing
/// has been started remotely yet, so failing fast loses nothing. Free-space
/// failures only downgrade the worker to `assumed_free_bytes`.
pub async fn discover_workers<E: RemoteExecutor>(
    executor: &Arc<E>,
    targets: &[String],
    opts: &DiscoveryOptions,
) -> Result<CapacityModel, PlanningError> {
    if targets.is_empty() {
        return Err(PlanningError::NoWorkers);
    }

    let mut probes = JoinSet::new();
    for (index, target) in targets.iter().enumerate() {
        let executor = Arc::clone(executor);
        let target = target.clone();
        let opts = *opts;
        probes.spawn(async move { (index, probe_one(&*executor, target, &opts).await) });
    }

    let mut found: Vec<Option<RemoteWorker>> = vec![None; targets.len()];
    while let Some(joined) = probes.join_next().await {
        let (index, res) = joined.map_err(|e| PlanningError::ProbeFailed {
            target: "?".to_string(),
            reason: format!("probe task join: {}", e),
        })?;
        found[index] = Some(res?);
    }

    let workers: Vec<RemoteWorker> = found.into_iter().flatten().collect();
    for w in &workers {
        tracing::info!(
            target = %w.target,
            tool = %w.tool,
            budget = w.budget_bytes,
            concurrency = w.concurrency,
            "worker ready"
        );
    }
    Ok(CapacityModel::new(workers))
}

async fn probe_one<E: RemoteExecutor>(
    executor: &E,
    target: String,
    opts: &DiscoveryOptions,
) -> Result<RemoteWorker, PlanningError> {
    let tool = match executor.probe_tool(&target).await {
        Ok(Some(tool)) => tool,
        Ok(None) => return Err(PlanningError::NoRangeTool { target }),
        Err(e) => {
            return Err(PlanningError::ProbeFailed {
                target,
                reason: format!("{:#}", e),
            })
        }
    };

    let budget = match executor.free_space(&target).await {
        Ok(free) => free.saturating_sub(opts.reserve_bytes),
        Err(e) => {
            tracing::warn!(
                target = %target,
                error = %format!("{:#}", e),
                "unable to determine free space, assuming {} MB",
                opts.assumed_free_bytes / 1_000_000
            );
            opts.assumed_free_bytes
        }
    };

    Ok(RemoteWorker::new(target, tool, budget, opts.concurrency))
}

/// Asks the first worker for the resource's `Content-Length`.
pub async fn probe_resource_size<E: RemoteExecutor>(
    executor: &E,
    model: &CapacityModel,
    request: &FetchRequest,
) -> Result<u64, PlanningError> {
    let (_, first) = model.iter().next().ok_or(PlanningError::NoWorkers)?;
    tracing::info!(target = %first.target, url = %request.url, "probing resource size");
    let size = executor
        .resource_size(&first.target, first.tool, request)
        .await
        .map_err(|e| PlanningError::SizeUnknown(format!("{:#}", e)))?;
    if size == 0 {
        return Err(PlanningError::EmptyResource);
    }
    tracing::info!(size, "resource size");
    Ok(size)
}
