//! Probe module for endpoint monitoring.
//!
//! A probe is one HTTP GET against a target URL; its outcome carries the
//! status that feeds the hysteresis state machine and the measured latency.

mod http;

pub use http::*;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Probe error types.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("probe timed out after {0:?}")]
    Timeout(Duration),
    #[error("network error: {0}")]
    Network(String),
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Result of the most recent probe of a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeStatus {
    /// Never probed, or not schedulable (disabled / no usable URL).
    NotProbed,
    /// The server answered with this HTTP status.
    Http(u16),
    /// Transport failure: DNS, connect, TLS, timeout.
    Failed,
}

impl ProbeStatus {
    /// Numeric code as reported to the admin API and the `{CODE}` placeholder.
    pub fn code(&self) -> i32 {
        match self {
            ProbeStatus::NotProbed => 0,
            ProbeStatus::Http(status) => i32::from(*status),
            ProbeStatus::Failed => -1,
        }
    }

    /// `Up` classification: any 2xx or 3xx answer.
    pub fn is_up(&self) -> bool {
        matches!(self, ProbeStatus::Http(status) if (200..400).contains(status))
    }
}

/// One completed probe.
#[derive(Debug, Clone)]
pub struct ProbeOutcome {
    pub status: ProbeStatus,
    /// Wall-clock time spent on the attempt, failures included.
    pub latency: Duration,
    pub error: Option<String>,
}

impl ProbeOutcome {
    pub fn http(status: u16, latency: Duration) -> Self {
        Self {
            status: ProbeStatus::Http(status),
            latency,
            error: None,
        }
    }

    pub fn failed(error: ProbeError, latency: Duration) -> Self {
        Self {
            status: ProbeStatus::Failed,
            latency,
            error: Some(error.to_string()),
        }
    }
}

/// Something that can check a URL.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, url: &str) -> ProbeOutcome;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_boundaries() {
        assert!(!ProbeStatus::Http(199).is_up());
        assert!(ProbeStatus::Http(200).is_up());
        assert!(ProbeStatus::Http(302).is_up());
        assert!(ProbeStatus::Http(399).is_up());
        assert!(!ProbeStatus::Http(400).is_up());
        assert!(!ProbeStatus::Http(503).is_up());
        assert!(!ProbeStatus::Failed.is_up());
        assert!(!ProbeStatus::NotProbed.is_up());
    }

    #[test]
    fn test_codes() {
        assert_eq!(ProbeStatus::NotProbed.code(), 0);
        assert_eq!(ProbeStatus::Http(503).code(), 503);
        assert_eq!(ProbeStatus::Failed.code(), -1);
    }
}
