//! Message template rendering.

/// Values substituted into a notification template.
#[derive(Debug, Clone, Copy)]
pub struct MessageFields<'a> {
    pub name: &'a str,
    pub url: &'a str,
    /// Last status code; only offline messages carry one.
    pub code: Option<i32>,
}

/// Substitute `{NAME}`, `{URL}` and, when present, `{CODE}` in `template`.
///
/// Unknown placeholders are left as they are.
pub fn render(template: &str, fields: &MessageFields<'_>) -> String {
    let mut message = template
        .replace("{NAME}", fields.name)
        .replace("{URL}", fields.url);

    if let Some(code) = fields.code {
        message = message.replace("{CODE}", &code.to_string());
    }

    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offline_message() {
        let fields = MessageFields {
            name: "API",
            url: "https://api.example.com",
            code: Some(503),
        };
        assert_eq!(render("{NAME} is down! ({CODE})", &fields), "API is down! (503)");
    }

    #[test]
    fn test_online_message_keeps_code_placeholder() {
        let fields = MessageFields {
            name: "Shop",
            url: "https://shop.example.com",
            code: None,
        };
        assert_eq!(
            render("{NAME} back at {URL} {CODE}", &fields),
            "Shop back at https://shop.example.com {CODE}"
        );
    }

    #[test]
    fn test_repeated_placeholders() {
        let fields = MessageFields {
            name: "db",
            url: "http://db.local:8080",
            code: Some(-1),
        };
        assert_eq!(render("{NAME}/{NAME}: {CODE}", &fields), "db/db: -1");
    }
}
