//! Custom HTTP callback fired on a confirmed transition.

use super::NotifyError;

/// Issue a body-less GET; used for integrations like relay toggles.
pub async fn send_callback(client: &reqwest::Client, url: &str) -> Result<(), NotifyError> {
    let response = client.get(url).send().await?;

    if !response.status().is_success() {
        return Err(NotifyError::Status(response.status()));
    }
    Ok(())
}
