//! Client TLS configuration from embedded certificate material.
//!
//! Gateways receive their client key, client certificate and CA bundle as
//! base64-encoded PEM strings. They are decoded and validated once, at gateway
//! construction, into a shared [`rustls::ClientConfig`].

use std::fmt;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::sign::CertifiedKey;
use rustls::{InconsistentKeys, RootCertStore};
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use tracing::warn;
use zeroize::Zeroizing;

/// Errors that can occur while building a client TLS configuration.
#[derive(Debug, Error)]
pub enum TlsError {
    /// A field is not valid base64.
    #[error("failed to decode {field}: {message}")]
    Decode {
        field: &'static str,
        message: String,
    },

    /// The client certificate or key is malformed, empty, or the two do not
    /// belong together.
    #[error("invalid client key pair: {0}")]
    KeyPair(String),

    /// The CA bundle holds no usable certificate.
    #[error("invalid CA certificate: {0}")]
    CaParse(String),

    /// The `rustls` configuration could not be built.
    #[error("rustls config error: {0}")]
    Config(String),
}

/// Embedded TLS material, each field a base64-encoded PEM document.
#[derive(Clone)]
pub struct TlsMaterial {
    pub client_key: SecretString,
    pub client_cert: String,
    pub ca_cert: String,
}

impl fmt::Debug for TlsMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsMaterial")
            .field("client_key", &"[REDACTED]")
            .field("client_cert_len", &self.client_cert.len())
            .field("ca_cert_len", &self.ca_cert.len())
            .finish()
    }
}

/// Knobs applied on top of the loaded material.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClientTlsOptions {
    /// Skip server certificate verification entirely. Dev/test only.
    pub danger_accept_invalid_certs: bool,
    /// Accept one server-initiated renegotiation. rustls never renegotiates,
    /// so this only produces a warning.
    pub allow_renegotiation: bool,
}

/// A validated client TLS configuration, cheap to clone and share.
#[derive(Clone)]
pub struct ClientTlsConfig {
    config: Arc<rustls::ClientConfig>,
    mutual: bool,
}

impl ClientTlsConfig {
    /// Decode `material` and build a configuration that presents the client
    /// certificate and trusts only the embedded CA bundle.
    pub fn from_material(
        material: &TlsMaterial,
        options: ClientTlsOptions,
    ) -> Result<Self, TlsError> {
        load_tls(
            material.client_key.expose_secret(),
            &material.client_cert,
            &material.ca_cert,
            options,
        )
    }

    /// A configuration without client authentication that trusts the bundled
    /// Mozilla roots.
    pub fn webpki_roots(options: ClientTlsOptions) -> Result<Self, TlsError> {
        let mut roots = RootCertStore::empty();
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        let config = builder(roots)?.with_no_client_auth();
        Ok(Self {
            config: finish(config, options),
            mutual: false,
        })
    }

    pub fn rustls_config(&self) -> Arc<rustls::ClientConfig> {
        Arc::clone(&self.config)
    }

    /// Whether a client certificate is presented.
    pub fn is_mutual(&self) -> bool {
        self.mutual
    }
}

impl fmt::Debug for ClientTlsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientTlsConfig")
            .field("mutual", &self.mutual)
            .finish_non_exhaustive()
    }
}

/// Decode and validate the three base64 PEM inputs into a client config.
///
/// - base64 failures name the offending field;
/// - a malformed, empty or mismatched certificate/key pair is
///   [`TlsError::KeyPair`];
/// - a CA bundle with no usable certificate is [`TlsError::CaParse`].
pub fn load_tls(
    client_key_b64: &str,
    client_cert_b64: &str,
    ca_cert_b64: &str,
    options: ClientTlsOptions,
) -> Result<ClientTlsConfig, TlsError> {
    let key_pem = Zeroizing::new(decode_base64("client_key", client_key_b64)?);
    let cert_pem = decode_base64("client_cert", client_cert_b64)?;
    let ca_pem = decode_base64("ca_cert", ca_cert_b64)?;

    let certs = parse_certs(&cert_pem).map_err(TlsError::KeyPair)?;
    if certs.is_empty() {
        return Err(TlsError::KeyPair("no certificate in client_cert".into()));
    }
    let key = parse_private_key(&key_pem)?;
    check_key_pair(&certs, &key)?;

    let ca_certs = parse_certs(&ca_pem).map_err(TlsError::CaParse)?;
    let mut roots = RootCertStore::empty();
    let (added, ignored) = roots.add_parsable_certificates(ca_certs);
    if added == 0 {
        return Err(TlsError::CaParse(format!(
            "no usable certificate in ca_cert ({ignored} rejected)"
        )));
    }

    let config = builder(roots)?
        .with_client_auth_cert(certs, key)
        .map_err(|e| TlsError::KeyPair(e.to_string()))?;

    Ok(ClientTlsConfig {
        config: finish(config, options),
        mutual: true,
    })
}

fn decode_base64(field: &'static str, value: &str) -> Result<Vec<u8>, TlsError> {
    B64.decode(value.trim()).map_err(|e| TlsError::Decode {
        field,
        message: e.to_string(),
    })
}

fn parse_certs(pem: &[u8]) -> Result<Vec<CertificateDer<'static>>, String> {
    let mut reader = pem;
    rustls_pemfile::certs(&mut reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("malformed PEM: {e}"))
}

/// Returns the first PKCS#8, PKCS#1 or SEC1 key in `pem`.
fn parse_private_key(pem: &[u8]) -> Result<PrivateKeyDer<'static>, TlsError> {
    let mut reader = pem;
    for item in rustls_pemfile::read_all(&mut reader) {
        match item {
            Ok(rustls_pemfile::Item::Pkcs1Key(key)) => return Ok(PrivateKeyDer::Pkcs1(key)),
            Ok(rustls_pemfile::Item::Pkcs8Key(key)) => return Ok(PrivateKeyDer::Pkcs8(key)),
            Ok(rustls_pemfile::Item::Sec1Key(key)) => return Ok(PrivateKeyDer::Sec1(key)),
            Ok(_) => {}
            Err(e) => return Err(TlsError::KeyPair(format!("malformed PEM: {e}"))),
        }
    }
    Err(TlsError::KeyPair("no private key in client_key".into()))
}

fn check_key_pair(
    certs: &[CertificateDer<'static>],
    key: &PrivateKeyDer<'static>,
) -> Result<(), TlsError> {
    let provider = rustls::crypto::ring::default_provider();
    let signing_key = provider
        .key_provider
        .load_private_key(key.clone_key())
        .map_err(|e| TlsError::KeyPair(e.to_string()))?;
    match CertifiedKey::new(certs.to_vec(), signing_key).keys_match() {
        // The provider could not derive a public key to compare against.
        Ok(()) | Err(rustls::Error::InconsistentKeys(InconsistentKeys::Unknown)) => Ok(()),
        Err(e) => Err(TlsError::KeyPair(e.to_string())),
    }
}

fn builder(
    roots: RootCertStore,
) -> Result<rustls::ConfigBuilder<rustls::ClientConfig, rustls::client::WantsClientCert>, TlsError>
{
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    Ok(rustls::ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| TlsError::Config(e.to_string()))?
        .with_root_certificates(roots))
}

fn finish(mut config: rustls::ClientConfig, options: ClientTlsOptions) -> Arc<rustls::ClientConfig> {
    // HTTP/1.1 only.
    config.alpn_protocols = vec![b"http/1.1".to_vec()];

    if options.allow_renegotiation {
        warn!("TLS renegotiation requested but not supported by rustls; ignoring");
    }
    if options.danger_accept_invalid_certs {
        warn!("server certificate verification is disabled");
        config
            .dangerous()
            .set_certificate_verifier(Arc::new(NoCertificateVerification));
    }
    Arc::new(config)
}

/// Certificate verifier that accepts any certificate.
///
/// Only installed when `danger_accept_invalid_certs` is set.
#[derive(Debug)]
struct NoCertificateVerification;

impl rustls::client::danger::ServerCertVerifier for NoCertificateVerification {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &rustls::pki_types::ServerName<'_>,
        _ocsp_response: &[u8],
        _now: rustls::pki_types::UnixTime,
    ) -> Result<rustls::client::danger::ServerCertVerified, rustls::Error> {
        Ok(rustls::client::danger::ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        rustls::crypto::ring::default_provider()
            .signature_verification_algorithms
            .supported_schemes()
    }
}
