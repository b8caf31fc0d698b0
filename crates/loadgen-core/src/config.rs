use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 8000;

/// On-disk configuration. Every field may be omitted; command-line flags are
/// layered on top before validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub target: TargetSettings,
    #[serde(default)]
    pub workload: WorkloadSettings,
    #[serde(default)]
    pub output: OutputSettings,
}

impl Settings {
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let settings: Settings = toml::from_str(&contents)?;
        Ok(settings)
    }

    /// Validate and freeze into a [`RunConfig`].
    pub fn into_run_config(self) -> Result<RunConfig, ConfigError> {
        let host = self
            .target
            .host
            .map(|h| h.trim().to_string())
            .filter(|h| !h.is_empty())
            .ok_or(ConfigError::MissingHost)?;

        let path = self
            .target
            .path
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .ok_or(ConfigError::MissingPath)?;
        let path = if path.starts_with('/') {
            path
        } else {
            format!("/{path}")
        };

        let scheme = match self.target.scheme.to_ascii_lowercase().as_str() {
            "http" => Scheme::Http,
            "https" => Scheme::Https,
            other => return Err(ConfigError::UnsupportedScheme(other.to_string())),
        };

        if self.workload.workers == 0 {
            return Err(ConfigError::ZeroWorkers);
        }
        if self.workload.ops_per_worker == 0 {
            return Err(ConfigError::ZeroOps);
        }
        let timeout = match self.target.timeout_ms {
            Some(0) => return Err(ConfigError::ZeroTimeout),
            Some(ms) => Some(Duration::from_millis(ms)),
            None => None,
        };

        let config = RunConfig {
            host,
            path,
            port: self.target.port,
            scheme,
            workers: self.workload.workers,
            ops_per_worker: self.workload.ops_per_worker,
            timeout,
            connection_reuse: self.workload.connection_reuse,
            accept_invalid_certs: !self.target.verify_certs,
        };

        // Surface a bad host/port now instead of on the first request.
        config.target_url()?;
        Ok(config)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetSettings {
    pub host: Option<String>,
    /// Request path, called "function" on the command line.
    pub path: Option<String>,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_scheme")]
    pub scheme: String,
    /// Per-request timeout in milliseconds; absent means wait indefinitely.
    pub timeout_ms: Option<u64>,
    /// Validate the target's TLS certificate (https only).
    #[serde(default)]
    pub verify_certs: bool,
}

impl Default for TargetSettings {
    fn default() -> Self {
        Self {
            host: None,
            path: None,
            port: default_port(),
            scheme: default_scheme(),
            timeout_ms: None,
            verify_certs: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkloadSettings {
    #[serde(default = "default_count")]
    pub workers: u64,
    #[serde(default = "default_count")]
    pub ops_per_worker: u64,
    #[serde(default)]
    pub connection_reuse: bool,
}

impl Default for WorkloadSettings {
    fn default() -> Self {
        Self {
            workers: default_count(),
            ops_per_worker: default_count(),
            connection_reuse: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputSettings {
    #[serde(default = "default_log_path")]
    pub log_path: PathBuf,
    #[serde(default = "default_report_path")]
    pub report_path: PathBuf,
    #[serde(default = "default_environment_path")]
    pub environment_path: PathBuf,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            log_path: default_log_path(),
            report_path: default_report_path(),
            environment_path: default_environment_path(),
        }
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_scheme() -> String {
    "http".to_string()
}

fn default_count() -> u64 {
    1
}

fn default_log_path() -> PathBuf {
    PathBuf::from("log.txt")
}

fn default_report_path() -> PathBuf {
    PathBuf::from("results.json")
}

fn default_environment_path() -> PathBuf {
    PathBuf::from("../machine_type/infra.txt")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable, validated configuration for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub host: String,
    pub path: String,
    pub port: u16,
    pub scheme: Scheme,
    pub workers: u64,
    pub ops_per_worker: u64,
    pub timeout: Option<Duration>,
    pub connection_reuse: bool,
    pub accept_invalid_certs: bool,
}

impl RunConfig {
    pub fn target_url(&self) -> Result<url::Url, ConfigError> {
        // IPv6 literals need brackets in a URL authority.
        let host = if self.host.parse::<std::net::Ipv6Addr>().is_ok() {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        };
        let raw = format!("{}://{}:{}{}", self.scheme, host, self.port, self.path);
        let url = url::Url::parse(&raw).map_err(|e| ConfigError::InvalidTarget {
            url: raw.clone(),
            reason: e.to_string(),
        })?;
        if url.host_str().is_none() {
            return Err(ConfigError::InvalidTarget {
                url: raw,
                reason: "missing host".to_string(),
            });
        }
        Ok(url)
    }

    /// Attempted operations for the whole run: workers × ops per worker.
    pub fn total_operations(&self) -> u64 {
        self.workers.saturating_mul(self.ops_per_worker)
    }

    pub fn transport(&self) -> TransportConfig {
        TransportConfig {
            scheme: self.scheme,
            connection_reuse: self.connection_reuse,
            timeout: self.timeout,
            accept_invalid_certs: self.accept_invalid_certs,
        }
    }
}

/// Transport policy handed to the HTTP executor. Certificate trust is decided
/// here, per client, never through process-wide state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    pub scheme: Scheme,
    pub connection_reuse: bool,
    pub timeout: Option<Duration>,
    /// When true, TLS certificates presented by the target are not validated.
    pub accept_invalid_certs: bool,
}
