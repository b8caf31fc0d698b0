use std::path::PathBuf;
use thiserror::Error;

/// Invalid or incomplete run configuration. Always fatal, raised before any
/// request is issued.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("No host specified! Use --host <HOST>")]
    MissingHost,

    #[error("No function specified! Use --function <PATH>")]
    MissingPath,

    #[error("worker count must be at least 1")]
    ZeroWorkers,

    #[error("operations per worker must be at least 1")]
    ZeroOps,

    #[error("timeout must be a positive number of milliseconds")]
    ZeroTimeout,

    #[error("unsupported scheme: {0}, must be 'http' or 'https'")]
    UnsupportedScheme(String),

    #[error("invalid target URL {url}: {reason}")]
    InvalidTarget { url: String, reason: String },
}

/// A single request that produced no outcome.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("request timed out after {elapsed_ms:.2}ms")]
    Timeout { elapsed_ms: f64 },

    #[error("network error after {elapsed_ms:.2}ms: {message}")]
    Network { message: String, elapsed_ms: f64 },

    #[error("failed to read response body after {elapsed_ms:.2}ms: {message}")]
    Body { message: String, elapsed_ms: f64 },
}

impl RequestError {
    pub fn elapsed_ms(&self) -> f64 {
        match self {
            RequestError::Timeout { elapsed_ms }
            | RequestError::Network { elapsed_ms, .. }
            | RequestError::Body { elapsed_ms, .. } => *elapsed_ms,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, RequestError::Timeout { .. })
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StatsError {
    /// No request completed, so there is nothing to compute statistics over.
    #[error("insufficient data: no completed requests to compute statistics from")]
    InsufficientData,
}

#[derive(Debug, Error)]
pub enum EnvironmentError {
    #[error("failed to read environment descriptor {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("environment descriptor has no KEY=VALUE line")]
    Empty,

    #[error("malformed environment descriptor line: {0:?}")]
    Malformed(String),
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to write report {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
