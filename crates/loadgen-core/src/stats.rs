use crate::driver::{RunOutcome, WorkerResult};
use crate::error::StatsError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Summary statistics for one run. Built once every worker has finished.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateStats {
    /// Attempted operations, whether or not they produced a response.
    pub total_requests: u64,
    pub success_count: u64,
    /// Requests that returned a response (any status).
    pub completed: u64,
    pub failed: u64,
    /// All latency samples in ms, ascending.
    pub latencies: Vec<f64>,
    pub mean_ms: f64,
    pub median_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
    pub duration: Duration,
    /// Attempted operations per second of wall-clock time.
    pub throughput: f64,
}

impl AggregateStats {
    pub fn from_outcome(outcome: &RunOutcome) -> Result<Self, StatsError> {
        Self::compute(&outcome.workers, outcome.attempted, outcome.elapsed)
    }

    pub fn compute(
        workers: &[WorkerResult],
        attempted: u64,
        duration: Duration,
    ) -> Result<Self, StatsError> {
        let mut latencies: Vec<f64> = workers
            .iter()
            .flat_map(|w| w.latencies.iter().copied())
            .collect();
        latencies.sort_by(f64::total_cmp);

        let mean_ms = mean(&latencies)?;
        let median_ms = median(&latencies)?;
        let p95_ms = percentile(&latencies, 95.0)?;
        let p99_ms = percentile(&latencies, 99.0)?;

        let completed = latencies.len() as u64;
        let secs = duration.as_secs_f64();
        let throughput = if secs > 0.0 {
            attempted as f64 / secs
        } else {
            0.0
        };

        Ok(Self {
            total_requests: attempted,
            success_count: workers.iter().map(|w| w.success_count).sum(),
            completed,
            failed: attempted.saturating_sub(completed),
            latencies,
            mean_ms,
            median_ms,
            p95_ms,
            p99_ms,
            duration,
            throughput,
        })
    }
}

pub fn mean(values: &[f64]) -> Result<f64, StatsError> {
    if values.is_empty() {
        return Err(StatsError::InsufficientData);
    }
    Ok(values.iter().sum::<f64>() / values.len() as f64)
}

/// Median of an ascending slice; even lengths average the two middle samples.
pub fn median(sorted: &[f64]) -> Result<f64, StatsError> {
    let len = sorted.len();
    if len == 0 {
        return Err(StatsError::InsufficientData);
    }
    let mid = len / 2;
    if len % 2 == 0 {
        Ok((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Ok(sorted[mid])
    }
}

/// Nearest-rank percentile of an ascending slice: the sample at zero-based
/// index `ceil(p / 100 * len) - 1`, clamped to the slice.
///
/// No interpolation between samples. With few samples the high percentiles
/// collapse onto the maximum (p95 and p99 are equal below 20 samples).
pub fn percentile(sorted: &[f64], p: f64) -> Result<f64, StatsError> {
    if sorted.is_empty() {
        return Err(StatsError::InsufficientData);
    }
    // p * len first keeps exact ranks exact (95 * 100 / 100, not 0.95 * 100).
    let rank = (p * sorted.len() as f64 / 100.0).ceil() as usize;
    let index = rank.saturating_sub(1).min(sorted.len() - 1);
    Ok(sorted[index])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn worker(idx: u64, latencies: &[f64], success_count: u64) -> WorkerResult {
        WorkerResult {
            worker: idx,
            success_count,
            failures: 0,
            latencies: latencies.to_vec(),
        }
    }

    #[test]
    fn test_median() {
        assert_eq!(median(&[10.0, 20.0, 30.0, 40.0]).unwrap(), 25.0);
        assert_eq!(median(&[10.0, 20.0, 30.0]).unwrap(), 20.0);
        assert_eq!(median(&[7.0]).unwrap(), 7.0);
    }

    #[test]
    fn test_percentile_nearest_rank() {
        let data: Vec<f64> = (1..=100).map(f64::from).collect();
        assert_eq!(percentile(&data, 95.0).unwrap(), 95.0);
        assert_eq!(percentile(&data, 99.0).unwrap(), 99.0);
        assert_eq!(percentile(&data, 100.0).unwrap(), 100.0);
        assert_eq!(percentile(&data, 0.0).unwrap(), 1.0);
    }

    #[test]
    fn test_percentile_small_samples_collapse_to_max() {
        let data = [10.0, 20.0, 30.0];
        assert_eq!(percentile(&data, 95.0).unwrap(), 30.0);
        assert_eq!(percentile(&data, 99.0).unwrap(), 30.0);
        assert_eq!(percentile(&[5.0], 95.0).unwrap(), 5.0);
    }

    #[test]
    fn test_empty_input_is_insufficient_data() {
        assert_eq!(mean(&[]), Err(StatsError::InsufficientData));
        assert_eq!(median(&[]), Err(StatsError::InsufficientData));
        assert_eq!(percentile(&[], 95.0), Err(StatsError::InsufficientData));

        let workers = vec![worker(0, &[], 0), worker(1, &[], 0)];
        assert_eq!(
            AggregateStats::compute(&workers, 6, Duration::from_secs(1)),
            Err(StatsError::InsufficientData)
        );
    }

    #[test]
    fn test_compute_merges_workers() {
        let workers = vec![
            worker(0, &[10.0, 20.0, 30.0], 3),
            worker(1, &[35.0, 15.0, 25.0], 2),
        ];
        let stats = AggregateStats::compute(&workers, 6, Duration::from_secs(2)).unwrap();

        assert_eq!(stats.latencies, vec![10.0, 15.0, 20.0, 25.0, 30.0, 35.0]);
        assert_eq!(stats.median_ms, 22.5);
        assert_eq!(stats.mean_ms, 22.5);
        assert_eq!(stats.p95_ms, 35.0);
        assert_eq!(stats.total_requests, 6);
        assert_eq!(stats.success_count, 5);
        assert_eq!(stats.completed, 6);
        assert_eq!(stats.failed, 0);
        assert_eq!(stats.throughput, 3.0);
    }

    #[test]
    fn test_throughput_counts_attempts_not_samples() {
        // 10 attempted, only 4 completed.
        let workers = vec![worker(0, &[1.0, 2.0], 2), worker(1, &[3.0, 4.0], 1)];
        let stats = AggregateStats::compute(&workers, 10, Duration::from_millis(500)).unwrap();

        assert_eq!(stats.throughput, 20.0);
        assert_eq!(stats.failed, 6);
        let reconstructed = stats.throughput * stats.duration.as_secs_f64();
        assert!((reconstructed - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_duration_throughput() {
        let workers = vec![worker(0, &[1.0], 1)];
        let stats = AggregateStats::compute(&workers, 1, Duration::ZERO).unwrap();
        assert_eq!(stats.throughput, 0.0);
    }

    #[test]
    fn test_from_outcome() {
        let outcome = RunOutcome {
            workers: vec![worker(0, &[4.0, 2.0], 2)],
            attempted: 2,
            elapsed: Duration::from_secs(1),
        };
        let stats = AggregateStats::from_outcome(&outcome).unwrap();
        assert_eq!(stats.latencies, vec![2.0, 4.0]);
        assert_eq!(stats.mean_ms, 3.0);
    }
}
