//! Telegram-style bot channel.

use super::NotifyError;

/// Percent-encode `input` for embedding in a query string.
///
/// ASCII alphanumerics and `-_.~` pass through; every other byte of the
/// UTF-8 encoding becomes `%XX`.
pub fn url_encode(input: &str) -> String {
    let mut out = String::with_capacity(input.len() * 3);
    for byte in input.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b'.' | b'~') {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{:02X}", byte));
        }
    }
    out
}

/// Build the `sendMessage` URL for one chat.
pub fn send_message_url(api: &str, token: &str, chat_id: &str, message: &str) -> String {
    format!(
        "{}/bot{}/sendMessage?chat_id={}&text={}",
        api,
        token,
        chat_id,
        url_encode(message)
    )
}

/// Issue one GET per chat id.
pub async fn send_telegram(
    client: &reqwest::Client,
    api: &str,
    token: &str,
    chat_id: &str,
    message: &str,
) -> Result<(), NotifyError> {
    let url = send_message_url(api, token, chat_id, message);
    let response = client.get(url).send().await?;

    if !response.status().is_success() {
        return Err(NotifyError::Status(response.status()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_encode_reserved_set() {
        assert_eq!(url_encode("AZaz09-_.~"), "AZaz09-_.~");
        assert_eq!(url_encode("a b&c=d/e"), "a%20b%26c%3Dd%2Fe");
        assert_eq!(url_encode("(503)!"), "%28503%29%21");
    }

    #[test]
    fn test_url_encode_multibyte() {
        assert_eq!(url_encode("✅"), "%E2%9C%85");
        assert_eq!(url_encode("é"), "%C3%A9");
    }

    #[test]
    fn test_send_message_url() {
        let url = send_message_url(
            "https://api.telegram.org",
            "123456:ABC-DEF",
            "-100200",
            "API is down!",
        );
        assert_eq!(
            url,
            "https://api.telegram.org/bot123456:ABC-DEF/sendMessage?chat_id=-100200&text=API%20is%20down%21"
        );
    }
}
