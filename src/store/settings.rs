//! Bulk settings updates keyed by `<field>_<id>` names.

use super::models::TargetPatch;

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// A parsed settings form: the global UTC offset plus per-target patches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsUpdate {
    pub gmt_offset: Option<i32>,
    pub patches: BTreeMap<u32, TargetPatch>,
}

impl SettingsUpdate {
    /// Parse `(name, value)` pairs.
    ///
    /// `gmt_offset` sets the global offset; every other name must look like
    /// `<field>_<id>` (e.g. `weburl_3`, `telegram_chat_id_2_3`). Unknown
    /// fields and malformed numbers are skipped.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        static FIELD_NAME: OnceLock<Regex> = OnceLock::new();
        let re = FIELD_NAME.get_or_init(|| Regex::new(r"^([a-z0-9_]+)_(\d+)$").unwrap());

        let mut update = Self::default();

        for (name, value) in pairs {
            let (name, value) = (name.as_ref(), value.as_ref());

            if name == "gmt_offset" {
                match value.trim().parse() {
                    Ok(offset) => update.gmt_offset = Some(offset),
                    Err(_) => tracing::warn!("Ignoring invalid gmt_offset {:?}", value),
                }
                continue;
            }

            let Some(caps) = re.captures(name) else {
                continue;
            };
            let Ok(id) = caps[2].parse::<u32>() else {
                continue;
            };

            let patch = update.patches.entry(id).or_default();
            if !apply_field(patch, &caps[1], value) {
                tracing::debug!("Ignoring unknown setting {}", name);
            }
        }

        update.patches.retain(|_, patch| !patch.is_empty());
        update
    }
}

fn apply_field(patch: &mut TargetPatch, field: &str, value: &str) -> bool {
    let text = || Some(value.to_string());
    let number = || value.trim().parse::<u32>().ok();

    match field {
        "server_name" => patch.name = text(),
        "weburl" => patch.url = text(),
        "check_interval" => patch.check_interval = number(),
        "failure_threshold" => patch.failure_threshold = number(),
        "recovery_threshold" => patch.recovery_threshold = number(),
        "online_message" => patch.online_message = text(),
        "offline_message" => patch.offline_message = text(),
        "discord_webhook" => patch.discord_webhook = text(),
        "ntfy_url" => patch.ntfy_url = text(),
        "ntfy_priority" => patch.ntfy_priority = text(),
        "telegram_bot_token" => patch.telegram_bot_token = text(),
        "telegram_chat_id_1" => patch.telegram_chat_id_1 = text(),
        "telegram_chat_id_2" => patch.telegram_chat_id_2 = text(),
        "telegram_chat_id_3" => patch.telegram_chat_id_3 = text(),
        "http_get_url_on" => patch.http_get_url_on = text(),
        "http_get_url_off" => patch.http_get_url_off = text(),
        _ => return false,
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_fields_and_ids() {
        let update = SettingsUpdate::from_pairs([
            ("gmt_offset", "2"),
            ("server_name_0", "Gateway"),
            ("weburl_0", "https://gateway.local"),
            ("check_interval_0", "30"),
            ("telegram_chat_id_2_7", "-100200"),
        ]);

        assert_eq!(update.gmt_offset, Some(2));

        let first = &update.patches[&0];
        assert_eq!(first.name.as_deref(), Some("Gateway"));
        assert_eq!(first.url.as_deref(), Some("https://gateway.local"));
        assert_eq!(first.check_interval, Some(30));

        let seventh = &update.patches[&7];
        assert_eq!(seventh.telegram_chat_id_2.as_deref(), Some("-100200"));
        assert!(seventh.telegram_chat_id_1.is_none());
    }

    #[test]
    fn test_ignores_unknown_and_malformed() {
        let update = SettingsUpdate::from_pairs([
            ("ssid", "home"),
            ("colour_3", "blue"),
            ("failure_threshold_1", "many"),
            ("gmt_offset", "east"),
            ("weburl", "https://no-id.example"),
        ]);

        assert_eq!(update, SettingsUpdate::default());
    }
}
