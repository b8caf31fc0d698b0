//! Append-only per-attempt log shared by all workers.
//!
//! One line per attempted operation:
//! `Worker 0, Operation 3, Status: 200, Latency: 12.40ms`, or
//! `Status: FAILED` when the request produced no response.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

const FAILED_MARKER: &str = "FAILED";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptStatus {
    Completed(u16),
    Failed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttemptRecord {
    pub worker: u64,
    pub operation: u64,
    pub status: AttemptStatus,
    pub latency_ms: f64,
}

impl fmt::Display for AttemptRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Worker {}, Operation {}, Status: ", self.worker, self.operation)?;
        match self.status {
            AttemptStatus::Completed(code) => write!(f, "{code}")?,
            AttemptStatus::Failed => f.write_str(FAILED_MARKER)?,
        }
        write!(f, ", Latency: {:.2}ms", self.latency_ms)
    }
}

impl FromStr for AttemptRecord {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> anyhow::Result<Self> {
        let mut fields = line.trim_end().split(", ");
        let mut next = |prefix: &str| field(&mut fields, prefix, line);

        let worker = next("Worker ")?.parse()?;
        let operation = next("Operation ")?.parse()?;
        let status = match next("Status: ")? {
            FAILED_MARKER => AttemptStatus::Failed,
            code => AttemptStatus::Completed(code.parse()?),
        };
        let latency = next("Latency: ")?;
        let latency_ms = latency
            .strip_suffix("ms")
            .ok_or_else(|| anyhow::anyhow!("latency without ms suffix: {latency:?}"))?
            .parse()?;

        Ok(Self {
            worker,
            operation,
            status,
            latency_ms,
        })
    }
}

fn field<'a>(
    fields: &mut impl Iterator<Item = &'a str>,
    prefix: &str,
    line: &str,
) -> anyhow::Result<&'a str> {
    let field = fields
        .next()
        .ok_or_else(|| anyhow::anyhow!("missing field {prefix:?} in {line:?}"))?;
    field
        .strip_prefix(prefix)
        .ok_or_else(|| anyhow::anyhow!("expected {prefix:?}, got {field:?}"))
}

pub struct AttemptLog {
    path: Option<PathBuf>,
    file: Option<Mutex<File>>,
}

impl AttemptLog {
    /// Open `path` for appending, creating it if needed. Existing lines are kept.
    pub async fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        Ok(Self {
            path: Some(path),
            file: Some(Mutex::new(file)),
        })
    }

    /// A log that drops every record.
    pub fn disabled() -> Self {
        Self {
            path: None,
            file: None,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Append one complete line. Concurrent callers never interleave.
    pub async fn append(&self, record: &AttemptRecord) -> std::io::Result<()> {
        let Some(file) = &self.file else {
            return Ok(());
        };
        let line = format!("{record}\n");
        let mut file = file.lock().await;
        file.write_all(line.as_bytes()).await?;
        file.flush().await
    }
}
