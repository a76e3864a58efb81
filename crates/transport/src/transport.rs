use std::sync::Arc;

use async_trait::async_trait;

use crate::error::TransportError;
use crate::types::{HttpRequest, HttpResponse};

/// Executes one HTTP round trip.
///
/// Object-safe so gateways can hold an `Arc<dyn HttpTransport>` and tests can
/// substitute an in-memory implementation. Implementations must be safe to
/// call concurrently.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Send `request` and return the fully buffered response.
    ///
    /// Any status code is a successful round trip; status validation belongs
    /// to the caller.
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

#[async_trait]
impl<T: HttpTransport + ?Sized> HttpTransport for Arc<T> {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).execute(request).await
    }
}
