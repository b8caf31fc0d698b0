use crate::config::{Scheme, TransportConfig};
use crate::error::RequestError;
use anyhow::Result;
use reqwest::header::{HeaderValue, CONNECTION};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::time::sleep;

/// Outcome of one completed request (status line received, body drained).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestOutcome {
    pub latency_ms: f64,
    pub status: u16,
    pub success: bool,
}

impl RequestOutcome {
    pub fn new(latency_ms: f64, status: u16) -> Self {
        Self {
            latency_ms,
            status,
            success: status == 200,
        }
    }
}

pub type ExecuteFuture<'a> =
    Pin<Box<dyn Future<Output = Result<RequestOutcome, RequestError>> + Send + 'a>>;

/// Trait for request execution adapters
pub trait RequestExecutor: Send + Sync {
    fn name(&self) -> &'static str;

    fn execute(&self) -> ExecuteFuture<'_>;
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

/// Mock executor for dry runs and tests (never touches the network)
pub struct MockExecutor {
    delay_ms: u64,
    status: u16,
    fail_every: Option<u64>,
    calls: AtomicU64,
}

impl MockExecutor {
    pub fn new(delay_ms: u64) -> Self {
        Self {
            delay_ms,
            status: 200,
            fail_every: None,
            calls: AtomicU64::new(0),
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// Every `n`th call (1-based, counted across all callers) fails with a
    /// network error. `n == 1` fails every call.
    pub fn with_fail_every(mut self, n: u64) -> Self {
        self.fail_every = Some(n.max(1));
        self
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }
}

impl RequestExecutor for MockExecutor {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn execute(&self) -> ExecuteFuture<'_> {
        Box::pin(async move {
            let call = self.calls.fetch_add(1, Ordering::Relaxed) + 1;
            let start = Instant::now();
            sleep(Duration::from_millis(self.delay_ms)).await;

            if let Some(n) = self.fail_every {
                if call % n == 0 {
                    return Err(RequestError::Network {
                        message: "simulated failure".to_string(),
                        elapsed_ms: elapsed_ms(start),
                    });
                }
            }

            Ok(RequestOutcome::new(elapsed_ms(start), self.status))
        })
    }
}

/// GET executor against a single fixed URL
pub struct HttpExecutor {
    client: reqwest::Client,
    url: url::Url,
    connection_reuse: bool,
}

impl HttpExecutor {
    pub fn new(url: url::Url, transport: &TransportConfig) -> Result<Self> {
        let mut builder =
            reqwest::Client::builder().https_only(transport.scheme == Scheme::Https);

        // Covers connect, headers and body; no timeout means wait forever.
        if let Some(timeout) = transport.timeout {
            builder = builder.timeout(timeout);
        }
        if !transport.connection_reuse {
            builder = builder.pool_max_idle_per_host(0);
        }
        if transport.accept_invalid_certs {
            builder = builder.danger_accept_invalid_certs(true);
        }

        Ok(Self {
            client: builder.build()?,
            url,
            connection_reuse: transport.connection_reuse,
        })
    }
}

impl RequestExecutor for HttpExecutor {
    fn name(&self) -> &'static str {
        "http"
    }

    fn execute(&self) -> ExecuteFuture<'_> {
        Box::pin(async move {
            let mut request = self.client.get(self.url.clone());
            if !self.connection_reuse {
                request = request.header(CONNECTION, HeaderValue::from_static("close"));
            }

            let start = Instant::now();
            let response = match request.send().await {
                Ok(response) => response,
                Err(e) => return Err(classify(e, start, false)),
            };
            let status = response.status().as_u16();

            // Latency includes draining the body.
            if let Err(e) = response.bytes().await {
                return Err(classify(e, start, true));
            }

            Ok(RequestOutcome::new(elapsed_ms(start), status))
        })
    }
}

fn classify(err: reqwest::Error, start: Instant, reading_body: bool) -> RequestError {
    let elapsed_ms = elapsed_ms(start);
    if err.is_timeout() {
        return RequestError::Timeout { elapsed_ms };
    }

    let message = error_chain(&err);
    if reading_body {
        RequestError::Body {
            message,
            elapsed_ms,
        }
    } else {
        RequestError::Network {
            message,
            elapsed_ms,
        }
    }
}

// reqwest's Display omits the underlying cause (refused, reset, dns).
fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
