//! Target model types.

use serde::{Deserialize, Serialize};

/// Field value meaning "not configured".
pub const SENTINEL: &str = "0";

/// URLs shorter than this are never probed and never called back.
pub const MIN_URL_LEN: usize = 10;

/// Version stamp written to the store file.
pub const CONFIG_VERSION: u32 = 13;

pub const DEFAULT_ONLINE_MESSAGE: &str = "✅ {NAME} is back online: {URL}";
pub const DEFAULT_OFFLINE_MESSAGE: &str = "🚨 {NAME} OUTAGE: {URL} (Code: {CODE})";

/// A monitored HTTP endpoint.
///
/// Field names under `serde` are the on-disk names used by the store file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub id: u32,
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_group")]
    pub group: String,
    #[serde(default = "sentinel")]
    pub url: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_check_interval")]
    pub check_interval: u32,
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    #[serde(default = "default_recovery_threshold")]
    pub recovery_threshold: u32,
    #[serde(default = "sentinel")]
    pub discord_webhook: String,
    #[serde(default = "sentinel")]
    pub ntfy_url: String,
    #[serde(default = "default_ntfy_priority")]
    pub ntfy_priority: String,
    #[serde(rename = "telegram_token", default = "sentinel")]
    pub telegram_bot_token: String,
    #[serde(rename = "telegram_chat1", default = "sentinel")]
    pub telegram_chat_id_1: String,
    #[serde(rename = "telegram_chat2", default = "sentinel")]
    pub telegram_chat_id_2: String,
    #[serde(rename = "telegram_chat3", default = "sentinel")]
    pub telegram_chat_id_3: String,
    #[serde(rename = "http_url_on", default = "sentinel")]
    pub http_get_url_on: String,
    #[serde(rename = "http_url_off", default = "sentinel")]
    pub http_get_url_off: String,
    #[serde(rename = "msg_online", default = "default_online_message")]
    pub online_message: String,
    #[serde(rename = "msg_offline", default = "default_offline_message")]
    pub offline_message: String,
}

fn sentinel() -> String {
    SENTINEL.to_string()
}

fn default_group() -> String {
    "Default".to_string()
}

fn default_check_interval() -> u32 {
    20
}

fn default_failure_threshold() -> u32 {
    3
}

fn default_recovery_threshold() -> u32 {
    2
}

fn default_ntfy_priority() -> String {
    "default".to_string()
}

fn default_online_message() -> String {
    DEFAULT_ONLINE_MESSAGE.to_string()
}

fn default_offline_message() -> String {
    DEFAULT_OFFLINE_MESSAGE.to_string()
}

impl Target {
    /// An unused slot: disabled, no URL, every channel off.
    pub fn vacant(id: u32) -> Self {
        Self {
            id,
            name: String::new(),
            group: default_group(),
            url: sentinel(),
            enabled: false,
            check_interval: default_check_interval(),
            failure_threshold: default_failure_threshold(),
            recovery_threshold: default_recovery_threshold(),
            discord_webhook: sentinel(),
            ntfy_url: sentinel(),
            ntfy_priority: default_ntfy_priority(),
            telegram_bot_token: sentinel(),
            telegram_chat_id_1: sentinel(),
            telegram_chat_id_2: sentinel(),
            telegram_chat_id_3: sentinel(),
            http_get_url_on: sentinel(),
            http_get_url_off: sentinel(),
            online_message: default_online_message(),
            offline_message: default_offline_message(),
        }
    }

    /// Starting point for a target created through the admin API.
    pub fn for_add(id: u32) -> Self {
        Self {
            enabled: true,
            check_interval: 60,
            online_message: "{NAME} is back online!".to_string(),
            offline_message: "{NAME} is down!".to_string(),
            ..Self::vacant(id)
        }
    }

    /// Factory default for slot `id` when no store file exists.
    pub fn factory_default(id: u32) -> Self {
        Self {
            name: format!("Server {}", id + 1),
            group: if id < 3 { "Production" } else { "Staging" }.to_string(),
            url: if id == 0 { "http://localhost" } else { SENTINEL }.to_string(),
            enabled: id < 3,
            ..Self::vacant(id)
        }
    }

    /// A slot can be reused by `add` once it is disabled and has no URL.
    pub fn is_vacant(&self) -> bool {
        !self.enabled && self.url.len() <= 1
    }

    /// Whether the record is worth writing to the store file.
    pub fn is_persisted(&self) -> bool {
        self.enabled || self.url.len() > 1
    }

    /// Whether the engine should probe this target.
    pub fn is_schedulable(&self) -> bool {
        self.enabled && is_plausible_url(&self.url)
    }

    pub fn telegram_chat_ids(&self) -> [&str; 3] {
        [
            &self.telegram_chat_id_1,
            &self.telegram_chat_id_2,
            &self.telegram_chat_id_3,
        ]
    }
}

/// True when `url` is set and long enough to be a real URL.
pub fn is_plausible_url(url: &str) -> bool {
    url != SENTINEL && url.len() >= MIN_URL_LEN
}

/// A partial target update; only `Some` fields are applied.
///
/// Field names are the admin API names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TargetPatch {
    pub name: Option<String>,
    pub group: Option<String>,
    pub url: Option<String>,
    pub enabled: Option<bool>,
    pub check_interval: Option<u32>,
    pub failure_threshold: Option<u32>,
    pub recovery_threshold: Option<u32>,
    pub online_message: Option<String>,
    pub offline_message: Option<String>,
    pub discord_webhook: Option<String>,
    pub ntfy_url: Option<String>,
    pub ntfy_priority: Option<String>,
    pub telegram_bot_token: Option<String>,
    pub telegram_chat_id_1: Option<String>,
    pub telegram_chat_id_2: Option<String>,
    pub telegram_chat_id_3: Option<String>,
    pub http_get_url_on: Option<String>,
    pub http_get_url_off: Option<String>,
}

impl TargetPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Apply every present field to `target`.
    pub fn apply(&self, target: &mut Target) {
        fn set<T: Clone>(slot: &mut T, value: &Option<T>) {
            if let Some(v) = value {
                *slot = v.clone();
            }
        }

        set(&mut target.name, &self.name);
        set(&mut target.group, &self.group);
        set(&mut target.url, &self.url);
        set(&mut target.enabled, &self.enabled);
        set(&mut target.check_interval, &self.check_interval);
        set(&mut target.failure_threshold, &self.failure_threshold);
        set(&mut target.recovery_threshold, &self.recovery_threshold);
        set(&mut target.online_message, &self.online_message);
        set(&mut target.offline_message, &self.offline_message);
        set(&mut target.discord_webhook, &self.discord_webhook);
        set(&mut target.ntfy_url, &self.ntfy_url);
        set(&mut target.ntfy_priority, &self.ntfy_priority);
        set(&mut target.telegram_bot_token, &self.telegram_bot_token);
        set(&mut target.telegram_chat_id_1, &self.telegram_chat_id_1);
        set(&mut target.telegram_chat_id_2, &self.telegram_chat_id_2);
        set(&mut target.telegram_chat_id_3, &self.telegram_chat_id_3);
        set(&mut target.http_get_url_on, &self.http_get_url_on);
        set(&mut target.http_get_url_off, &self.http_get_url_off);
    }
}

/// Layout of the store file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreFile {
    #[serde(default = "default_gmt_offset")]
    pub gmt_offset: i32,
    #[serde(default)]
    pub config_version: u32,
    pub servers: Vec<serde_json::Value>,
}

pub fn default_gmt_offset() -> i32 {
    1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_take_defaults() {
        let target: Target = serde_json::from_str(r#"{"id": 4, "name": "API"}"#).unwrap();
        assert_eq!(target.id, 4);
        assert_eq!(target.group, "Default");
        assert_eq!(target.url, SENTINEL);
        assert!(!target.enabled);
        assert_eq!(target.check_interval, 20);
        assert_eq!(target.failure_threshold, 3);
        assert_eq!(target.recovery_threshold, 2);
        assert_eq!(target.ntfy_priority, "default");
        assert_eq!(target.offline_message, DEFAULT_OFFLINE_MESSAGE);
    }

    #[test]
    fn test_schedulable_requires_enabled_and_plausible_url() {
        let mut target = Target::for_add(0);
        assert!(!target.is_schedulable());

        target.url = "http://a".to_string();
        assert!(!target.is_schedulable());

        target.url = "https://example.com".to_string();
        assert!(target.is_schedulable());

        target.enabled = false;
        assert!(!target.is_schedulable());
    }

    #[test]
    fn test_vacancy() {
        assert!(Target::vacant(3).is_vacant());
        assert!(!Target::for_add(3).is_vacant());
        assert!(!Target::factory_default(0).is_vacant());
        // Enabled but without a URL still occupies its slot.
        assert!(!Target::factory_default(1).is_vacant());
        assert!(Target::factory_default(5).is_vacant());
    }

    #[test]
    fn test_patch_only_touches_present_fields() {
        let mut target = Target::for_add(2);
        target.name = "Old".to_string();
        target.ntfy_url = "https://ntfy.sh/topic".to_string();

        let patch = TargetPatch {
            name: Some("New".to_string()),
            failure_threshold: Some(5),
            ..Default::default()
        };
        patch.apply(&mut target);

        assert_eq!(target.name, "New");
        assert_eq!(target.failure_threshold, 5);
        assert_eq!(target.ntfy_url, "https://ntfy.sh/topic");
        assert_eq!(target.check_interval, 60);
    }

    #[test]
    fn test_patch_deserializes_api_names() {
        let patch: TargetPatch = serde_json::from_str(
            r#"{"telegram_bot_token": "123:abc", "telegram_chat_id_2": "42", "unknown": 1}"#,
        )
        .unwrap();
        assert_eq!(patch.telegram_bot_token.as_deref(), Some("123:abc"));
        assert_eq!(patch.telegram_chat_id_2.as_deref(), Some("42"));
        assert!(patch.name.is_none());
    }
}
