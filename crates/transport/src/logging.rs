use std::time::Instant;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::error::TransportError;
use crate::transport::HttpTransport;
use crate::types::{HttpRequest, HttpResponse};

/// Header names whose values are replaced with `[REDACTED]` in log output.
pub const DEFAULT_REDACTED_HEADERS: &[&str] = &["authorization", "proxy-authorization"];

/// Decorator that logs every request/response pair of the wrapped transport.
///
/// Both bodies are already buffered [`Bytes`](bytes::Bytes), so logging reads
/// them without disturbing what the caller receives. The response is returned
/// untouched.
pub struct LoggingTransport<T> {
    inner: T,
    redacted_headers: Vec<String>,
}

impl<T: HttpTransport> LoggingTransport<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            redacted_headers: DEFAULT_REDACTED_HEADERS
                .iter()
                .map(|h| (*h).to_owned())
                .collect(),
        }
    }

    /// Also redact `name` (case-insensitive).
    #[must_use]
    pub fn redact_header(mut self, name: impl Into<String>) -> Self {
        self.redacted_headers.push(name.into().to_ascii_lowercase());
        self
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }

    fn loggable(&self, headers: &[(String, String)]) -> Vec<(String, String)> {
        headers
            .iter()
            .map(|(name, value)| {
                let value = if self
                    .redacted_headers
                    .iter()
                    .any(|r| r.eq_ignore_ascii_case(name))
                {
                    "[REDACTED]".to_owned()
                } else {
                    value.clone()
                };
                (name.clone(), value)
            })
            .collect()
    }
}

#[async_trait]
impl<T: HttpTransport> HttpTransport for LoggingTransport<T> {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let url = request.url.clone();
        let method = request.method;
        let request_headers = self.loggable(&request.headers);
        let request_body = request.body.clone();
        let started = Instant::now();

        let result = self.inner.execute(request).await;
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        match &result {
            Ok(response) => info!(
                url = %url,
                request_method = %method,
                request_headers = ?request_headers,
                request_body = %String::from_utf8_lossy(&request_body),
                response_status = response.status,
                response_headers = ?self.loggable(&response.headers),
                response_body = %String::from_utf8_lossy(&response.body),
                elapsed_ms,
                "http exchange"
            ),
            Err(error) => warn!(
                url = %url,
                request_method = %method,
                request_headers = ?request_headers,
                request_body = %String::from_utf8_lossy(&request_body),
                error = %error,
                elapsed_ms,
                "http exchange failed"
            ),
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use ianua_core::HttpMethod;
    use parking_lot::Mutex;

    use super::*;

    struct Recording {
        seen: Mutex<Vec<HttpRequest>>,
        reply: HttpResponse,
    }

    #[async_trait]
    impl HttpTransport for Recording {
        async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
            self.seen.lock().push(request);
            Ok(self.reply.clone())
        }
    }

    struct Failing;

    #[async_trait]
    impl HttpTransport for Failing {
        async fn execute(&self, _request: HttpRequest) -> Result<HttpResponse, TransportError> {
            Err(TransportError::Connect("refused".into()))
        }
    }

    #[tokio::test]
    async fn passes_request_and_response_through_untouched() {
        let reply = HttpResponse::new(200, r#"{"token":"t-1"}"#).with_header("X-Id", "7");
        let inner = Arc::new(Recording {
            seen: Mutex::new(Vec::new()),
            reply: reply.clone(),
        });
        let logging = LoggingTransport::new(Arc::clone(&inner)).redact_header("X-Api-Key");

        let request = HttpRequest::new(HttpMethod::Post, "http://psp.test/auth")
            .with_header("Authorization", "Bearer secret")
            .with_header("X-Api-Key", "k")
            .with_body("login=merchant");
        let response = logging.execute(request.clone()).await.unwrap();

        assert_eq!(response, reply);
        assert_eq!(inner.seen.lock().as_slice(), &[request]);
    }

    #[tokio::test]
    async fn errors_are_returned_unchanged() {
        let logging = LoggingTransport::new(Failing);
        let err = logging
            .execute(HttpRequest::new(HttpMethod::Get, "http://psp.test"))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Connect(ref m) if m == "refused"));
    }

    #[test]
    fn sensitive_headers_are_redacted() {
        let logging = LoggingTransport::new(Failing).redact_header("X-Api-Key");
        let headers = vec![
            ("authorization".to_owned(), "Bearer secret".to_owned()),
            ("x-api-key".to_owned(), "k".to_owned()),
            ("Content-Type".to_owned(), "application/json".to_owned()),
        ];
        let logged = logging.loggable(&headers);
        assert_eq!(logged[0].1, "[REDACTED]");
        assert_eq!(logged[1].1, "[REDACTED]");
        assert_eq!(logged[2].1, "application/json");
    }
}
