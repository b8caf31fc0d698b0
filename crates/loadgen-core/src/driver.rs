use crate::attempt_log::{AttemptLog, AttemptRecord, AttemptStatus};
use crate::config::RunConfig;
use crate::executor::RequestExecutor;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

// Upper bound on up-front reservations; counts come straight from user input.
const PREALLOC_LIMIT: u64 = 1024;

/// Everything one worker observed. Latencies are in completion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkerResult {
    pub worker: u64,
    pub success_count: u64,
    pub failures: u64,
    pub latencies: Vec<f64>,
}

/// Raw material for aggregation, produced once every worker has finished.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub workers: Vec<WorkerResult>,
    pub attempted: u64,
    pub elapsed: Duration,
}

/// Run `config.workers` concurrent workers, each issuing
/// `config.ops_per_worker` sequential requests, and wait for all of them.
pub async fn run_workload(
    config: &RunConfig,
    executor: Arc<dyn RequestExecutor>,
    log: Arc<AttemptLog>,
) -> Result<RunOutcome> {
    info!(
        "Starting {} workers x {} ops using {} executor",
        config.workers,
        config.ops_per_worker,
        executor.name()
    );

    let start_time = Instant::now();
    let mut handles = Vec::with_capacity(config.workers.min(PREALLOC_LIMIT) as usize);
    for worker in 0..config.workers {
        let executor = executor.clone();
        let log = log.clone();
        let ops = config.ops_per_worker;
        handles.push(tokio::spawn(async move {
            run_worker(worker, ops, executor.as_ref(), &log).await
        }));
    }

    let mut workers = Vec::with_capacity(handles.len());
    for handle in handles {
        workers.push(handle.await?);
    }
    let elapsed = start_time.elapsed();

    info!("All workers finished in {}ms", elapsed.as_millis());

    Ok(RunOutcome {
        workers,
        attempted: config.total_operations(),
        elapsed,
    })
}

/// One worker's sequential request loop. A failed request is logged and
/// counted, then the loop moves on to the next operation.
pub async fn run_worker(
    worker: u64,
    ops: u64,
    executor: &dyn RequestExecutor,
    log: &AttemptLog,
) -> WorkerResult {
    let mut result = WorkerResult {
        worker,
        latencies: Vec::with_capacity(ops.min(PREALLOC_LIMIT) as usize),
        ..Default::default()
    };

    for operation in 0..ops {
        let record = match executor.execute().await {
            Ok(outcome) => {
                debug!(
                    "worker={} op={} status={} latency={:.2}ms",
                    worker, operation, outcome.status, outcome.latency_ms
                );
                result.latencies.push(outcome.latency_ms);
                if outcome.success {
                    result.success_count += 1;
                }
                AttemptRecord {
                    worker,
                    operation,
                    status: AttemptStatus::Completed(outcome.status),
                    latency_ms: outcome.latency_ms,
                }
            }
            Err(e) => {
                warn!("HTTP request error: worker={} op={}: {}", worker, operation, e);
                result.failures += 1;
                AttemptRecord {
                    worker,
                    operation,
                    status: AttemptStatus::Failed,
                    latency_ms: e.elapsed_ms(),
                }
            }
        };

        if let Err(e) = log.append(&record).await {
            warn!("Failed to append to attempt log: {}", e);
        }
    }

    result
}
