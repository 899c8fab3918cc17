//! HTTP probe implementation.

use super::{ProbeError, ProbeOutcome, Prober};

use async_trait::async_trait;
use std::time::{Duration, Instant};

/// Probes targets with a shared reqwest client.
///
/// Redirects are followed (reqwest's default policy, up to 10 hops) and
/// every request is bounded by `timeout`.
#[derive(Clone)]
pub struct HttpProber {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpProber {
    pub fn new(timeout: Duration) -> Result<Self, ProbeError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("vigil/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ProbeError::Config(e.to_string()))?;

        Ok(Self { client, timeout })
    }
}

#[async_trait]
impl Prober for HttpProber {
    async fn probe(&self, url: &str) -> ProbeOutcome {
        let start = Instant::now();
        let result = run_http_probe(&self.client, url, self.timeout).await;
        let latency = start.elapsed();

        match result {
            Ok(status) => ProbeOutcome::http(status, latency),
            Err(e) => ProbeOutcome::failed(e, latency),
        }
    }
}

/// Run an HTTP probe against the given URL.
///
/// Returns the final status code after redirects. The body is drained so the
/// caller's latency covers the whole transfer.
pub async fn run_http_probe(
    client: &reqwest::Client,
    url: &str,
    timeout: Duration,
) -> Result<u16, ProbeError> {
    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            ProbeError::Timeout(timeout)
        } else {
            ProbeError::Network(e.to_string())
        }
    })?;

    let status = response.status().as_u16();

    if let Err(e) = response.bytes().await {
        tracing::debug!("Probe of {} got status {} but body failed: {}", url, status, e);
    }

    Ok(status)
}
