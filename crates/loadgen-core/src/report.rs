use crate::config::RunConfig;
use crate::environment::EnvironmentDescriptor;
use crate::error::ReportError;
use crate::stats::AggregateStats;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// One presentation-ready statistic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metric {
    pub name: String,
    /// Always rendered with two decimals.
    pub value: String,
    pub unit: String,
}

impl Metric {
    fn new(name: &str, value: f64, unit: &str) -> Self {
        Self {
            name: name.to_string(),
            value: format!("{value:.2}"),
            unit: unit.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parametrization {
    pub protocol: String,
    pub host: String,
    pub port: u16,
    pub func: String,
    pub threads: u64,
    pub ops: u64,
    pub timeout_ms: Option<u64>,
    pub agent_reuse: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BenchInfo {
    pub execution_time: String,
    pub parametrization: Parametrization,
    pub other_info: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub date: DateTime<Utc>,
    pub bench_info: BenchInfo,
    pub results: Vec<Metric>,
}

impl Report {
    pub fn new(config: &RunConfig, stats: &AggregateStats, env: &EnvironmentDescriptor) -> Self {
        Self::at(Utc::now(), config, stats, env)
    }

    pub fn at(
        date: DateTime<Utc>,
        config: &RunConfig,
        stats: &AggregateStats,
        env: &EnvironmentDescriptor,
    ) -> Self {
        let parametrization = Parametrization {
            protocol: format!("{}:", config.scheme),
            host: config.host.clone(),
            port: config.port,
            func: config.path.clone(),
            threads: config.workers,
            ops: config.ops_per_worker,
            timeout_ms: config.timeout.map(|t| t.as_millis() as u64),
            agent_reuse: config.connection_reuse,
        };

        Self {
            date,
            bench_info: BenchInfo {
                execution_time: format_duration(stats.duration),
                parametrization,
                other_info: format!("edge-server: {}", env.label),
            },
            results: vec![
                Metric::new("avg latency", stats.mean_ms, "ms"),
                Metric::new("throughput", stats.throughput, "ops/s"),
                Metric::new("95th percentile latency", stats.p95_ms, "ms"),
                Metric::new("99th percentile latency", stats.p99_ms, "ms"),
                Metric::new("median latency", stats.median_ms, "ms"),
            ],
        }
    }

    /// Serialize to `path` via a sibling temp file and a rename, so readers
    /// see either the old file or the complete new one.
    pub fn write_atomic(&self, path: impl AsRef<Path>) -> Result<(), ReportError> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| ReportError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let tmp = tmp_path(path);
        std::fs::write(&tmp, json).map_err(|source| ReportError::Write {
            path: tmp.clone(),
            source,
        })?;
        std::fs::rename(&tmp, path).map_err(|source| {
            let _ = std::fs::remove_file(&tmp);
            ReportError::Write {
                path: path.to_path_buf(),
                source,
            }
        })
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "report".into());
    name.push(".tmp");
    path.with_file_name(name)
}

/// `Xm YYs`, rounded to the nearest whole second.
pub fn format_duration(duration: Duration) -> String {
    let total_secs = (duration.as_millis() + 500) / 1000;
    format!("{}m {:02}s", total_secs / 60, total_secs % 60)
}
