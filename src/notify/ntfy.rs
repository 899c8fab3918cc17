//! ntfy-style push topic channel.

use super::NotifyError;

use reqwest::header::CONTENT_TYPE;

/// POST the raw message to the topic URL with a `Priority` header.
pub async fn send_ntfy(
    client: &reqwest::Client,
    url: &str,
    priority: &str,
    message: &str,
) -> Result<(), NotifyError> {
    let response = client
        .post(url)
        .header(CONTENT_TYPE, "text/plain")
        .header("Priority", priority)
        .body(message.to_string())
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(NotifyError::Status(response.status()));
    }
    Ok(())
}
