use std::time::Duration;

use ianua_crypto::TlsError;
use thiserror::Error;

/// Errors surfaced by an [`HttpTransport`](crate::HttpTransport).
#[derive(Debug, Error)]
pub enum TransportError {
    /// No response within the response-wait timeout.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The connection or TLS handshake failed.
    #[error("connection failed: {0}")]
    Connect(String),

    /// Any other failure while sending the request or reading the head.
    #[error("request failed: {0}")]
    Request(String),

    /// The response body could not be read.
    #[error("failed to read response body: {0}")]
    Body(String),

    /// The underlying client could not be built.
    #[error("failed to build HTTP client: {0}")]
    Build(String),

    /// The TLS material is unusable.
    #[error(transparent)]
    Tls(#[from] TlsError),

    /// The request itself is malformed (bad URL, header name or value).
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl TransportError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    pub(crate) fn from_reqwest(err: &reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            Self::Timeout(timeout)
        } else if err.is_builder() {
            Self::InvalidRequest(err.to_string())
        } else if err.is_connect() {
            Self::Connect(error_chain(err))
        } else if err.is_body() || err.is_decode() {
            Self::Body(error_chain(err))
        } else {
            Self::Request(error_chain(err))
        }
    }
}

/// `reqwest` hides the interesting part of connect errors in the source chain.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
