use std::time::Duration;

use ianua_crypto::{ClientTlsOptions, TlsMaterial};

/// Default for [`TransportConfig::response_wait_timeout`].
pub const DEFAULT_RESPONSE_WAIT_TIMEOUT: Duration = Duration::from_secs(30);

/// Settings for one gateway's transport.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Client certificate, key and CA bundle. Without it the transport
    /// verifies servers against the bundled Mozilla roots.
    pub tls: Option<TlsMaterial>,
    /// Bounds the whole request as well as connecting, the TLS handshake,
    /// each read and pooled-connection idleness.
    pub response_wait_timeout: Duration,
    /// Wrap the transport in [`LoggingTransport`](crate::LoggingTransport).
    pub log_exchanges: bool,
    pub danger_accept_invalid_certs: bool,
    pub allow_renegotiation: bool,
}

impl TransportConfig {
    #[must_use]
    pub fn with_tls(mut self, tls: TlsMaterial) -> Self {
        self.tls = Some(tls);
        self
    }

    #[must_use]
    pub fn with_response_wait_timeout(mut self, timeout: Duration) -> Self {
        self.response_wait_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_log_exchanges(mut self, enabled: bool) -> Self {
        self.log_exchanges = enabled;
        self
    }

    #[must_use]
    pub fn with_danger_accept_invalid_certs(mut self, enabled: bool) -> Self {
        self.danger_accept_invalid_certs = enabled;
        self
    }

    pub fn tls_options(&self) -> ClientTlsOptions {
        ClientTlsOptions {
            danger_accept_invalid_certs: self.danger_accept_invalid_certs,
            allow_renegotiation: self.allow_renegotiation,
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            tls: None,
            response_wait_timeout: DEFAULT_RESPONSE_WAIT_TIMEOUT,
            log_exchanges: true,
            danger_accept_invalid_certs: false,
            allow_renegotiation: false,
        }
    }
}
