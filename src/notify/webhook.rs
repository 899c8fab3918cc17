//! Discord-style webhook channel.

use super::NotifyError;

use serde_json::json;

/// Body posted to the webhook.
pub fn webhook_payload(message: &str) -> serde_json::Value {
    json!({ "content": message })
}

/// POST `message` wrapped in `{"content": ...}`.
pub async fn send_webhook(
    client: &reqwest::Client,
    url: &str,
    message: &str,
) -> Result<(), NotifyError> {
    let response = client.post(url).json(&webhook_payload(message)).send().await?;

    if !response.status().is_success() {
        return Err(NotifyError::Status(response.status()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_escapes_message() {
        let payload = webhook_payload("API \"prod\" is down!\nCode: 503");
        assert_eq!(
            payload.to_string(),
            r#"{"content":"API \"prod\" is down!\nCode: 503"}"#
        );
    }
}
