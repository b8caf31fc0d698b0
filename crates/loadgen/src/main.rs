use anyhow::{Context, Result};
use clap::Parser;
use loadgen_core::{
    run_workload, AggregateStats, AttemptLog, EnvironmentDescriptor, HttpExecutor, MockExecutor,
    Report, RequestExecutor, RunConfig, Scheme, Settings,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "loadgen")]
#[command(about = "HTTP load generator - concurrent request streams against a single endpoint")]
struct Args {
    /// Optional TOML configuration file; flags below override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Target host (required here or in the config file)
    #[arg(long)]
    host: Option<String>,

    /// Target path, e.g. /function/hello (required here or in the config file)
    #[arg(long)]
    function: Option<String>,

    /// Target port [default: 8000]
    #[arg(long)]
    port: Option<u16>,

    /// Number of concurrent workers [default: 1]
    #[arg(long)]
    threads: Option<u64>,

    /// Sequential operations per worker [default: 1]
    #[arg(long)]
    ops: Option<u64>,

    /// Let a worker reuse connections between its requests
    #[arg(long)]
    agent_reuse: bool,

    /// Per-request timeout in milliseconds [default: none]
    #[arg(long)]
    timeout: Option<u64>,

    /// Use https instead of plain http
    #[arg(long)]
    https: bool,

    /// Validate the target's TLS certificate (off by default)
    #[arg(long)]
    verify_certs: bool,

    /// Append-only per-attempt log [default: log.txt]
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// JSON report path [default: results.json]
    #[arg(long)]
    output: Option<PathBuf>,

    /// KEY=VALUE file naming the machine under test [default: ../machine_type/infra.txt]
    #[arg(long)]
    env_file: Option<PathBuf>,

    /// Execution mode: http or mock
    #[arg(long, default_value = "http")]
    mode: String,

    /// Simulated latency for mock mode
    #[arg(long, default_value = "5")]
    mock_delay_ms: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut settings = match &args.config {
        Some(path) => Settings::from_file(path)
            .with_context(|| format!("Failed to load config from {:?}", path))?,
        None => Settings::default(),
    };
    apply_overrides(&mut settings, &args);

    let output = settings.output.clone();
    let config = settings.into_run_config().context("Invalid configuration")?;

    let executor: Arc<dyn RequestExecutor> = match args.mode.as_str() {
        "mock" => Arc::new(MockExecutor::new(args.mock_delay_ms)),
        "http" => Arc::new(
            HttpExecutor::new(config.target_url()?, &config.transport())
                .context("Failed to create HTTP executor")?,
        ),
        _ => anyhow::bail!("Invalid mode: {}, must be 'http' or 'mock'", args.mode),
    };

    let environment = EnvironmentDescriptor::from_file(&output.environment_path)
        .context("Failed to load environment descriptor")?;

    info!("Target: {}", config.target_url()?);
    info!("Environment: {}={}", environment.key, environment.label);
    if config.scheme == Scheme::Https && config.accept_invalid_certs {
        warn!("TLS certificate validation is disabled for this run (use --verify-certs)");
    }

    let log = match AttemptLog::open(&output.log_path).await {
        Ok(log) => log,
        Err(e) => {
            warn!(
                "Cannot open attempt log {:?}, continuing without it: {}",
                output.log_path, e
            );
            AttemptLog::disabled()
        }
    };

    if let Some(path) = log.path() {
        info!("Appending attempts to {:?}", path);
    }

    let outcome = run_workload(&config, executor, Arc::new(log)).await?;

    let stats = AggregateStats::from_outcome(&outcome).with_context(|| {
        format!(
            "No statistics for this run: all {} attempted requests failed",
            outcome.attempted
        )
    })?;

    let report = Report::new(&config, &stats, &environment);
    report
        .write_atomic(&output.report_path)
        .context("Failed to write report")?;

    info!("Results written to {:?}", output.report_path);
    print_summary(&config, &stats, &report);

    Ok(())
}

fn apply_overrides(settings: &mut Settings, args: &Args) {
    if let Some(host) = &args.host {
        settings.target.host = Some(host.clone());
    }
    if let Some(function) = &args.function {
        settings.target.path = Some(function.clone());
    }
    if let Some(port) = args.port {
        settings.target.port = port;
    }
    if let Some(timeout) = args.timeout {
        settings.target.timeout_ms = Some(timeout);
    }
    if args.https {
        settings.target.scheme = "https".to_string();
    }
    if args.verify_certs {
        settings.target.verify_certs = true;
    }
    if let Some(threads) = args.threads {
        settings.workload.workers = threads;
    }
    if let Some(ops) = args.ops {
        settings.workload.ops_per_worker = ops;
    }
    if args.agent_reuse {
        settings.workload.connection_reuse = true;
    }
    if let Some(path) = &args.log_file {
        settings.output.log_path = path.clone();
    }
    if let Some(path) = &args.output {
        settings.output.report_path = path.clone();
    }
    if let Some(path) = &args.env_file {
        settings.output.environment_path = path.clone();
    }
}

fn print_summary(config: &RunConfig, stats: &AggregateStats, report: &Report) {
    println!("\n=== Run Summary ===");
    println!("Execution time: {}", report.bench_info.execution_time);
    println!("Workers: {} x {} ops", config.workers, config.ops_per_worker);
    println!("Attempted: {}", stats.total_requests);
    println!("Completed: {}", stats.completed);
    println!("Failed: {}", stats.failed);
    println!("Successful (200): {}", stats.success_count);
    for metric in &report.results {
        println!("{}: {} {}", metric.name, metric.value, metric.unit);
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use loadgen_core::ConfigError;

    #[test]
    fn test_defaults_without_flags() {
        let args = Args::parse_from(["loadgen", "--host", "10.0.0.5", "--function", "/hello"]);
        let mut settings = Settings::default();
        apply_overrides(&mut settings, &args);
        let config = settings.into_run_config().unwrap();

        assert_eq!(config.workers, 1);
        assert_eq!(config.ops_per_worker, 1);
        assert_eq!(config.port, 8000);
        assert_eq!(config.timeout, None);
        assert!(!config.connection_reuse);
        assert_eq!(args.mode, "http");
    }

    #[test]
    fn test_flags_override_file_settings() {
        let mut settings: Settings = toml::from_str(
            r#"
[target]
host = "from-file"
path = "/file"
timeout_ms = 1000

[workload]
workers = 8
            "#,
        )
        .unwrap();
        let args = Args::parse_from([
            "loadgen",
            "--host",
            "from-flag",
            "--threads",
            "3",
            "--ops",
            "7",
            "--agent-reuse",
            "--timeout",
            "250",
        ]);
        apply_overrides(&mut settings, &args);
        let config = settings.into_run_config().unwrap();

        assert_eq!(config.host, "from-flag");
        assert_eq!(config.path, "/file");
        assert_eq!(config.workers, 3);
        assert_eq!(config.ops_per_worker, 7);
        assert!(config.connection_reuse);
        assert_eq!(config.timeout, Some(std::time::Duration::from_millis(250)));
    }

    #[test]
    fn test_missing_host_is_config_error() {
        let args = Args::parse_from(["loadgen", "--function", "/hello"]);
        let mut settings = Settings::default();
        apply_overrides(&mut settings, &args);
        assert_eq!(settings.into_run_config().unwrap_err(), ConfigError::MissingHost);
    }
}
