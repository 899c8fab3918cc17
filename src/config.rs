//! Configuration module for vigil.
//!
//! Loads configuration from environment variables with sensible defaults.

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP port for the admin API (default: 8080)
    pub http_port: u16,
    /// Path to the JSON target store (default: "vigil.json")
    pub config_path: String,
    /// Number of target slots (default: 20)
    pub max_targets: u32,
    /// Upper bound for a single probe GET (default: 5s)
    pub probe_timeout: Duration,
    /// Upper bound for each outbound notification call (default: 10s)
    pub notify_timeout: Duration,
    /// Base URL of the Telegram bot API (default: "https://api.telegram.org")
    pub telegram_api: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_port: 8080,
            config_path: "vigil.json".to_string(),
            max_targets: 20,
            probe_timeout: Duration::from_secs(5),
            notify_timeout: Duration::from_secs(10),
            telegram_api: "https://api.telegram.org".to_string(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `VIGIL_HTTP_PORT`: HTTP port (default: 8080)
    /// - `VIGIL_CONFIG_PATH`: target store file path (default: "vigil.json")
    /// - `VIGIL_MAX_TARGETS`: number of target slots (default: 20)
    /// - `VIGIL_PROBE_TIMEOUT`: probe timeout in seconds (default: 5)
    /// - `VIGIL_NOTIFY_TIMEOUT`: notification timeout in seconds (default: 10)
    /// - `VIGIL_TELEGRAM_API`: Telegram API base URL
    ///
    /// Unparsable values are ignored and the default is kept.
    pub fn load() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(port) = parse_var(&lookup, "VIGIL_HTTP_PORT") {
            cfg.http_port = port;
        }

        if let Some(path) = lookup("VIGIL_CONFIG_PATH") {
            cfg.config_path = path;
        }

        if let Some(max) = parse_var::<u32, _>(&lookup, "VIGIL_MAX_TARGETS") {
            if max > 0 {
                cfg.max_targets = max;
            }
        }

        if let Some(secs) = parse_var::<f64, _>(&lookup, "VIGIL_PROBE_TIMEOUT") {
            if secs > 0.0 {
                cfg.probe_timeout = Duration::from_secs_f64(secs);
            }
        }

        if let Some(secs) = parse_var::<f64, _>(&lookup, "VIGIL_NOTIFY_TIMEOUT") {
            if secs > 0.0 {
                cfg.notify_timeout = Duration::from_secs_f64(secs);
            }
        }

        if let Some(api) = lookup("VIGIL_TELEGRAM_API") {
            cfg.telegram_api = api.trim_end_matches('/').to_string();
        }

        cfg
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!("Ignoring invalid value for {}: {:?}", key, raw);
            None
        }
    }
}
