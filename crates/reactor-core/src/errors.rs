use serde_json::Value;

/// Error codes the Bot API reports in failure envelopes that we map to dedicated faults.
pub mod codes {
    pub const BAD_AUTHORIZATION: i64 = 401;
    pub const NOT_FOUND: i64 = 404;
}

/// Core fault type.
///
/// API faults come from `ok: false` envelopes (see [`classify`]), transport faults
/// from the `Transport` implementation, and decode faults from the codec.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("access token rejected by the Bot API server")]
    BadAuthorization,

    #[error("bot not found, the token is probably wrong")]
    BotNotFound,

    #[error("unknown Bot API error, code {0}")]
    UnknownError(i64),

    #[error("Bot API server unreachable: operation timed out")]
    DeadWall,

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("poll worker failed: {0}")]
    Worker(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::MalformedResponse(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Turn a failure envelope (`{"ok": false, "error_code": ..}`) into a fault.
///
/// There is no success path: callers invoke this only after the envelope said `ok: false`.
pub fn classify(envelope: &Value) -> Error {
    let Some(code) = envelope.get("error_code").and_then(Value::as_i64) else {
        return Error::MalformedResponse(
            "failure envelope without an integer error_code".to_string(),
        );
    };

    if let Some(description) = envelope.get("description").and_then(Value::as_str) {
        tracing::warn!(code, description, "Bot API reported a failure");
    }

    match code {
        codes::BAD_AUTHORIZATION => Error::BadAuthorization,
        codes::NOT_FOUND => Error::BotNotFound,
        other => Error::UnknownError(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn classifies_known_codes() {
        assert!(matches!(
            classify(&json!({"ok": false, "error_code": 401})),
            Error::BadAuthorization
        ));
        assert!(matches!(
            classify(&json!({"ok": false, "error_code": 404, "description": "Not Found"})),
            Error::BotNotFound
        ));
    }

    #[test]
    fn unknown_codes_keep_the_code() {
        assert!(matches!(
            classify(&json!({"error_code": 999})),
            Error::UnknownError(999)
        ));
        assert!(matches!(
            classify(&json!({"ok": false, "error_code": 429, "description": "Too Many Requests"})),
            Error::UnknownError(429)
        ));
    }

    #[test]
    fn missing_code_is_malformed() {
        assert!(matches!(
            classify(&json!({"ok": false})),
            Error::MalformedResponse(_)
        ));
        assert!(matches!(
            classify(&json!({"ok": false, "error_code": "401"})),
            Error::MalformedResponse(_)
        ));
    }

    #[test]
    fn json_errors_become_malformed_response() {
        let e = serde_json::from_str::<Value>("{not json").unwrap_err();
        assert!(matches!(Error::from(e), Error::MalformedResponse(_)));
    }
}
