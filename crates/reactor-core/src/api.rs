use std::fmt;

/// Bot API method names used by the gateway.
pub mod methods {
    pub const GET_ME: &str = "getMe";
    pub const GET_UPDATES: &str = "getUpdates";
    pub const SEND_MESSAGE: &str = "sendMessage";
    pub const SET_CHAT_TITLE: &str = "setChatTitle";
    pub const SEND_VIDEO: &str = "sendVideo";
}

pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Builds `<base>/bot<token>/<method>` URLs.
///
/// `Debug`/`Display` never print the token.
#[derive(Clone)]
pub struct Api {
    base: String,
    token: String,
}

impl Api {
    pub fn new(base: impl Into<String>, token: impl Into<String>) -> Self {
        let base = base.into();
        Self {
            base: base.trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    pub fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.base, self.token)
    }

    /// Same as [`Api::method_url`] with the token masked, for logs.
    pub fn redacted_url(&self, method: &str) -> String {
        format!("{}/bot<redacted>/{method}", self.base)
    }
}

impl fmt::Debug for Api {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Api")
            .field("base", &self.base)
            .field("token", &"<redacted>")
            .finish()
    }
}

impl fmt::Display for Api {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/bot<redacted>", self.base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_method_urls() {
        let api = Api::new("https://api.telegram.org/", "123:abc");
        assert_eq!(
            api.method_url(methods::GET_UPDATES),
            "https://api.telegram.org/bot123:abc/getUpdates"
        );
        assert_eq!(
            api.redacted_url(methods::GET_ME),
            "https://api.telegram.org/bot<redacted>/getMe"
        );
    }

    #[test]
    fn token_never_printed() {
        let api = Api::new(DEFAULT_API_BASE, "123:secret");
        assert!(!format!("{api:?}").contains("secret"));
        assert!(!api.to_string().contains("secret"));
    }
}
