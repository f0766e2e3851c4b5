//! Adapter errors

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AdapterError {
    /// Unparsable body/query or an unknown wait marker. Never retried.
    #[error("malformed request: {0}")]
    Malformed(String),

    /// An expected correlation entry is absent on a path that cannot
    /// proceed without it. Absence on polling paths is not an error.
    #[error("correlation entry not found: {0}")]
    CorrelationMiss(String),

    /// Non-success status or unreadable response from the provider.
    #[error("provider request failed: {0}")]
    Upstream(String),

    /// Missing or mismatched webhook signature. Rejected before any
    /// state mutation.
    #[error("signature verification failed: {0}")]
    Signature(String),

    /// Rendering was refused for a failed or sprint-less session.
    #[error("invalid session state: {0}")]
    SessionState(String),

    #[error("channel misconfigured: {0}")]
    Config(String),

    #[error("correlation store error: {0}")]
    Store(String),

    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    #[error("http transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("token signing error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
}
