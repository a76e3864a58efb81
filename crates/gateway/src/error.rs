use ianua_core::ExtractError;
use ianua_crypto::{SigningError, TlsError};
use ianua_transport::TransportError;
use thiserror::Error;

/// Errors raised while building a gateway from its configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The security `type` is not `none`, `hash` or `token`.
    #[error("unknown security type: {0}")]
    UnknownSecurityType(String),

    /// The security type needs an options block that is absent.
    #[error("security type \"{0}\" requires a [security.{0}] section")]
    MissingSecurityOptions(&'static str),

    #[error("response format \"{0}\" is unknown")]
    UnknownResponseFormat(String),

    #[error("TLS error: {0}")]
    Tls(#[from] TlsError),

    #[error("signing configuration error: {0}")]
    Signing(#[from] SigningError),

    /// The HTTP client could not be built.
    #[error("transport error: {0}")]
    TransportBuild(TransportError),

    #[error("gateway \"{0}\" is already registered")]
    DuplicateGateway(String),

    #[error("gateway \"{gateway}\" declares method \"{method}\" more than once")]
    DuplicateMethod { gateway: String, method: String },

    #[error("invalid configuration file: {0}")]
    Toml(#[from] toml::de::Error),
}

impl From<TransportError> for ConfigError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Tls(e) => Self::Tls(e),
            other => Self::TransportBuild(other),
        }
    }
}

/// Errors returned by gateway method execution and registration.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("signing failed: {0}")]
    Signing(#[from] SigningError),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The provider answered with a status other than the expected one. The
    /// body is kept verbatim since providers put the reason there.
    #[error("request failed with status {status}, reason in body: \"{body}\"")]
    UnexpectedStatusCode { status: u16, body: String },

    #[error("failed to extract result: {0}")]
    Extract(#[from] ExtractError),

    #[error("gateway not found: {0}")]
    GatewayNotFound(String),

    #[error("method {method} not found in gateway \"{gateway}\"")]
    MethodNotFound { gateway: String, method: String },
}

impl GatewayError {
    /// Whether the error comes from building a gateway rather than from
    /// executing a call.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    /// Whether the transport gave up waiting for a response.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Transport(e) if e.is_timeout())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn transport_tls_errors_become_tls_config_errors() {
        let err: ConfigError = TransportError::Tls(TlsError::CaParse("empty".into())).into();
        assert!(matches!(err, ConfigError::Tls(TlsError::CaParse(_))));

        let err: ConfigError = TransportError::Build("no".into()).into();
        assert!(matches!(err, ConfigError::TransportBuild(_)));
    }

    #[test]
    fn classification() {
        let err: GatewayError = ConfigError::UnknownSecurityType("bogus".into()).into();
        assert!(err.is_configuration());
        assert!(!err.is_timeout());

        let err: GatewayError = TransportError::Timeout(Duration::from_secs(1)).into();
        assert!(err.is_timeout());
        assert!(!err.is_configuration());
    }

    #[test]
    fn error_display() {
        let err = GatewayError::UnexpectedStatusCode {
            status: 402,
            body: "insufficient funds".into(),
        };
        assert_eq!(
            err.to_string(),
            "request failed with status 402, reason in body: \"insufficient funds\""
        );

        let err = ConfigError::MissingSecurityOptions("hash");
        assert_eq!(
            err.to_string(),
            "security type \"hash\" requires a [security.hash] section"
        );

        let err = GatewayError::MethodNotFound {
            gateway: "acme".into(),
            method: "\"refund\"".into(),
        };
        assert_eq!(err.to_string(), "method \"refund\" not found in gateway \"acme\"");
    }
}
