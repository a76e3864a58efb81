//! HTTP transport for Ianua gateways.
//!
//! [`HttpTransport`] is the seam every outbound call goes through.
//! [`ReqwestTransport`] is the production implementation and
//! [`LoggingTransport`] decorates any transport with exchange logging.
//! [`build_transport`] assembles both from a [`TransportConfig`].

mod client;
mod config;
mod error;
mod logging;
mod transport;
mod types;

use std::sync::Arc;

pub use client::ReqwestTransport;
pub use config::{DEFAULT_RESPONSE_WAIT_TIMEOUT, TransportConfig};
pub use error::TransportError;
pub use logging::{DEFAULT_REDACTED_HEADERS, LoggingTransport};
pub use transport::HttpTransport;
pub use types::{HttpRequest, HttpResponse};

/// Build the transport described by `config`, wrapped in a
/// [`LoggingTransport`] when `log_exchanges` is set.
pub fn build_transport(config: &TransportConfig) -> Result<Arc<dyn HttpTransport>, TransportError> {
    let transport = ReqwestTransport::new(config)?;
    if config.log_exchanges {
        Ok(Arc::new(LoggingTransport::new(transport)))
    } else {
        Ok(Arc::new(transport))
    }
}
