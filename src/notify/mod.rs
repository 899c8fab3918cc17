//! Notification dispatch.
//!
//! Fans a rendered message out to every channel configured on a target.
//! Delivery is best effort: failures are logged per channel and never
//! retried.

mod callback;
mod ntfy;
mod telegram;
mod template;
mod webhook;

pub use callback::*;
pub use ntfy::*;
pub use telegram::*;
pub use template::*;
pub use webhook::*;

use crate::store::{is_plausible_url, Target, SENTINEL};

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinSet;

/// Address and token fields must be longer than this to count as configured.
const MIN_CHANNEL_LEN: usize = 10;

/// Notification error types.
#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("unexpected response status {0}")]
    Status(reqwest::StatusCode),
}

/// One outbound notification integration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Channel {
    Webhook { url: String },
    Ntfy { url: String, priority: String },
    Telegram { token: String, chat_id: String },
}

impl Channel {
    pub fn kind(&self) -> &'static str {
        match self {
            Channel::Webhook { .. } => "webhook",
            Channel::Ntfy { .. } => "ntfy",
            Channel::Telegram { .. } => "telegram",
        }
    }
}

fn is_set(value: &str, min_len: usize) -> bool {
    value != SENTINEL && value.len() > min_len
}

/// Every channel configured on `target`, one entry per Telegram chat.
pub fn channels_for(target: &Target) -> Vec<Channel> {
    let mut channels = Vec::new();

    if is_set(&target.discord_webhook, MIN_CHANNEL_LEN) {
        channels.push(Channel::Webhook {
            url: target.discord_webhook.clone(),
        });
    }

    if is_set(&target.ntfy_url, MIN_CHANNEL_LEN) {
        channels.push(Channel::Ntfy {
            url: target.ntfy_url.clone(),
            priority: target.ntfy_priority.clone(),
        });
    }

    if is_set(&target.telegram_bot_token, MIN_CHANNEL_LEN) {
        for chat_id in target.telegram_chat_ids() {
            if is_set(chat_id, 1) {
                channels.push(Channel::Telegram {
                    token: target.telegram_bot_token.clone(),
                    chat_id: chat_id.to_string(),
                });
            }
        }
    }

    channels
}

/// Outbound side of a confirmed transition.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send `message` to every channel configured on `target`.
    async fn notify(&self, target: &Target, message: &str);

    /// Fire a transition callback URL; unset or implausible URLs are skipped.
    async fn callback(&self, url: &str);
}

/// reqwest-backed notifier.
#[derive(Clone)]
pub struct Dispatcher {
    client: reqwest::Client,
    telegram_api: String,
}

impl Dispatcher {
    pub fn new(timeout: Duration, telegram_api: &str) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("vigil/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::with_client(client, telegram_api))
    }

    pub fn with_client(client: reqwest::Client, telegram_api: &str) -> Self {
        Self {
            client,
            telegram_api: telegram_api.trim_end_matches('/').to_string(),
        }
    }

    async fn send(&self, channel: &Channel, message: &str) -> Result<(), NotifyError> {
        match channel {
            Channel::Webhook { url } => send_webhook(&self.client, url, message).await,
            Channel::Ntfy { url, priority } => {
                send_ntfy(&self.client, url, priority, message).await
            }
            Channel::Telegram { token, chat_id } => {
                send_telegram(&self.client, &self.telegram_api, token, chat_id, message).await
            }
        }
    }
}

#[async_trait]
impl Notifier for Dispatcher {
    async fn notify(&self, target: &Target, message: &str) {
        let channels = channels_for(target);
        if channels.is_empty() {
            tracing::debug!("No notification channels configured for {}", target.name);
            return;
        }

        let mut tasks = JoinSet::new();
        for channel in channels {
            let this = self.clone();
            let message = message.to_string();
            let name = target.name.clone();
            tasks.spawn(async move {
                match this.send(&channel, &message).await {
                    Ok(()) => tracing::debug!("Sent {} notification for {}", channel.kind(), name),
                    Err(e) => tracing::warn!(
                        "Failed to send {} notification for {}: {}",
                        channel.kind(),
                        name,
                        e
                    ),
                }
            });
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                tracing::error!("Notification task failed: {}", e);
            }
        }
    }

    async fn callback(&self, url: &str) {
        if !is_plausible_url(url) {
            return;
        }

        if let Err(e) = send_callback(&self.client, url).await {
            tracing::warn!("Callback {} failed: {}", url, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        extract::{Request, State},
        http::StatusCode,
        Router,
    };
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone)]
    struct Recorded {
        method: String,
        uri: String,
        content_type: Option<String>,
        priority: Option<String>,
        body: String,
    }

    type Log = Arc<Mutex<Vec<Recorded>>>;

    async fn record(State(log): State<Log>, req: Request<Body>) -> StatusCode {
        let (parts, body) = req.into_parts();
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        let mut entry = Recorded {
            method: parts.method.to_string(),
            uri: parts.uri.to_string(),
            content_type: header("content-type"),
            priority: header("priority"),
            body: String::new(),
        };
        let failing = entry.uri.starts_with("/webhook");

        let bytes = to_bytes(body, usize::MAX).await.unwrap();
        entry.body = String::from_utf8_lossy(&bytes).into_owned();
        log.lock().unwrap().push(entry);

        if failing {
            StatusCode::INTERNAL_SERVER_ERROR
        } else {
            StatusCode::OK
        }
    }

    async fn spawn_recorder() -> (String, Log) {
        let log: Log = Arc::new(Mutex::new(Vec::new()));
        let app = Router::new().fallback(record).with_state(log.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{}", addr), log)
    }

    fn dispatcher(base: &str) -> Dispatcher {
        let client = reqwest::Client::builder()
            .no_proxy()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap();
        Dispatcher::with_client(client, base)
    }

    #[test]
    fn test_channels_for_skips_unset_and_short_values() {
        let mut target = Target::for_add(0);
        assert!(channels_for(&target).is_empty());

        target.discord_webhook = "http://x".to_string();
        target.ntfy_url = "https://ntfy.sh/alerts".to_string();
        target.telegram_bot_token = "123456:ABCDEF".to_string();
        target.telegram_chat_id_1 = "1001".to_string();
        target.telegram_chat_id_2 = "0".to_string();
        target.telegram_chat_id_3 = "7".to_string();

        let channels = channels_for(&target);
        assert_eq!(
            channels,
            vec![
                Channel::Ntfy {
                    url: "https://ntfy.sh/alerts".to_string(),
                    priority: "default".to_string(),
                },
                Channel::Telegram {
                    token: "123456:ABCDEF".to_string(),
                    chat_id: "1001".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_short_token_disables_all_chats() {
        let mut target = Target::for_add(0);
        target.telegram_bot_token = "short".to_string();
        target.telegram_chat_id_1 = "1001".to_string();
        assert!(channels_for(&target).is_empty());
    }

    #[tokio::test]
    async fn test_notify_fans_out_with_expected_wire_formats() {
        let (base, log) = spawn_recorder().await;

        let mut target = Target::for_add(0);
        target.name = "API".to_string();
        target.discord_webhook = format!("{}/webhook/1", base);
        target.ntfy_url = format!("{}/alerts", base);
        target.ntfy_priority = "high".to_string();
        target.telegram_bot_token = "123456:ABCDEF".to_string();
        target.telegram_chat_id_1 = "1001".to_string();
        target.telegram_chat_id_3 = "2002".to_string();

        dispatcher(&base).notify(&target, "API is down! (503)").await;

        let mut recorded = log.lock().unwrap().clone();
        recorded.sort_by(|a, b| a.uri.cmp(&b.uri));
        assert_eq!(recorded.len(), 4);

        let ntfy = &recorded[0];
        assert_eq!(ntfy.method, "POST");
        assert_eq!(ntfy.uri, "/alerts");
        assert_eq!(ntfy.priority.as_deref(), Some("high"));
        assert_eq!(ntfy.content_type.as_deref(), Some("text/plain"));
        assert_eq!(ntfy.body, "API is down! (503)");

        let chat_1 = &recorded[1];
        assert_eq!(chat_1.method, "GET");
        assert_eq!(
            chat_1.uri,
            "/bot123456:ABCDEF/sendMessage?chat_id=1001&text=API%20is%20down%21%20%28503%29"
        );
        assert!(recorded[2].uri.contains("chat_id=2002"));

        let webhook = &recorded[3];
        assert_eq!(webhook.method, "POST");
        assert_eq!(webhook.content_type.as_deref(), Some("application/json"));
        let body: serde_json::Value = serde_json::from_str(&webhook.body).unwrap();
        assert_eq!(body["content"], "API is down! (503)");
    }

    #[tokio::test]
    async fn test_callback_skips_sentinel_and_fires_get() {
        let (base, log) = spawn_recorder().await;
        let notifier = dispatcher(&base);

        notifier.callback("0").await;
        notifier.callback("http://x").await;
        assert!(log.lock().unwrap().is_empty());

        notifier.callback(&format!("{}/relay/off", base)).await;
        let recorded = log.lock().unwrap().clone();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].method, "GET");
        assert_eq!(recorded[0].uri, "/relay/off");
        assert!(recorded[0].body.is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_channel_does_not_block_others() {
        let (base, log) = spawn_recorder().await;

        let mut target = Target::for_add(0);
        target.discord_webhook = "http://127.0.0.1:1/webhook".to_string();
        target.ntfy_url = format!("{}/alerts", base);

        dispatcher(&base).notify(&target, "down").await;

        let recorded = log.lock().unwrap().clone();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].uri, "/alerts");
    }
}
