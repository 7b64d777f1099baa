//! Errors - エラー型と分類
//!
//! - `TransportError`: pub/sub・HTTP など外部トランスポートの失敗
//! - `ValidationError`: タスク入力の不備（URL 欠落、JSON 不正など）
//! - `RequestError`: Request Executor の失敗（Failed envelope の `error` になる）

use thiserror::Error;

/// Failure reported by a pub/sub or HTTP transport.
///
/// The message is the cause's description; it is forwarded as-is into the
/// `error` field of a Failed envelope.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("transport is not connected")]
    NotConnected,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("publish to '{channel}' failed: {reason}")]
    Publish { channel: String, reason: String },

    #[error("subscription on '{channel}' failed: {reason}")]
    Subscription { channel: String, reason: String },

    #[error("{0}")]
    Request(String),
}

/// Malformed or incomplete task input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("URL is required in the inputs")]
    MissingUrl,

    #[error("invalid HTTP method '{0}'")]
    InvalidMethod(String),

    #[error("invalid task message: {0}")]
    MalformedMessage(String),
}

/// Anything that keeps the executor from producing a normalized response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("request execution panicked: {0}")]
    Panicked(String),
}

/// Render an error together with its `source()` chain, joined by `": "`.
///
/// HTTP client errors keep the useful part ("connection refused", "dns error")
/// in their sources, so the top-level `Display` alone is too vague for an
/// operator reading a Failed envelope.
pub fn describe_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.ends_with(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("outer")]
    struct Outer(#[source] Inner);

    #[derive(Debug, Error)]
    #[error("inner cause")]
    struct Inner;

    #[test]
    fn missing_url_message_is_stable() {
        let err = RequestError::from(ValidationError::MissingUrl);
        assert_eq!(err.to_string(), "URL is required in the inputs");
    }

    #[test]
    fn transport_error_is_transparent() {
        let err = RequestError::from(TransportError::Request("connection refused".into()));
        assert_eq!(err.to_string(), "connection refused");
    }

    #[test]
    fn describe_chain_joins_sources() {
        assert_eq!(describe_chain(&Outer(Inner)), "outer: inner cause");
    }
}
