//! Gateway configuration, deserialized from TOML.
//!
//! Names that select behavior (security type, digest and post-process
//! algorithms, response format) are kept as strings here and resolved when
//! the gateway is built, so an unknown name fails registration with a typed
//! [`ConfigError`] rather than a parse error.
//!
//! # Example
//!
//! ```toml
//! [[gateways]]
//! name = "acme"
//!
//! [gateways.transport]
//! response_wait_timeout_secs = 30
//!
//! [gateways.security]
//! type = "hash"
//!
//! [gateways.security.hash]
//! algorithm = "sha256"
//! post_process = [{ algorithm = "base64" }]
//!
//! [[gateways.methods]]
//! name = "pay"
//! url = "https://api.acme.test/pay"
//! body = '{"amount":"{{amount}}"}'
//! response_format = "json"
//! response_field_path = ["result", "id"]
//! signature = { placement = "header", name = "X-Signature" }
//! ```

use std::collections::BTreeMap;
use std::time::Duration;

use ianua_core::{HttpMethod, RequestTemplate, ResponseFormat};
use ianua_crypto::{SecretString, TlsMaterial};
use ianua_transport::{DEFAULT_RESPONSE_WAIT_TIMEOUT, TransportConfig};
use serde::Deserialize;

use crate::error::ConfigError;
use crate::placement::SignaturePlacement;

/// Every gateway of a registry.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegistryConfig {
    #[serde(default)]
    pub gateways: Vec<GatewayConfig>,
}

impl RegistryConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }
}

/// One payment provider integration.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    pub name: String,

    #[serde(default)]
    pub transport: TransportSection,

    #[serde(default)]
    pub security: SecurityConfig,

    #[serde(default)]
    pub methods: Vec<MethodConfig>,
}

impl GatewayConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transport: TransportSection::default(),
            security: SecurityConfig::default(),
            methods: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_security(mut self, security: SecurityConfig) -> Self {
        self.security = security;
        self
    }

    #[must_use]
    pub fn with_method(mut self, method: MethodConfig) -> Self {
        self.methods.push(method);
        self
    }
}

/// `[gateways.transport]`.
#[derive(Debug, Clone, Deserialize)]
pub struct TransportSection {
    #[serde(default = "default_response_wait_timeout_secs")]
    pub response_wait_timeout_secs: u64,

    /// Log every request/response pair.
    #[serde(default = "default_log_exchanges")]
    pub log_exchanges: bool,

    /// Skip server certificate verification. Dev/test only.
    #[serde(default)]
    pub danger_accept_invalid_certs: bool,

    #[serde(default)]
    pub allow_renegotiation: bool,

    #[serde(default)]
    pub tls: Option<TlsSection>,
}

impl Default for TransportSection {
    fn default() -> Self {
        Self {
            response_wait_timeout_secs: default_response_wait_timeout_secs(),
            log_exchanges: default_log_exchanges(),
            danger_accept_invalid_certs: false,
            allow_renegotiation: false,
            tls: None,
        }
    }
}

impl TransportSection {
    pub fn to_transport_config(&self) -> TransportConfig {
        TransportConfig {
            tls: self.tls.as_ref().map(|tls| TlsMaterial {
                client_key: tls.client_key.clone(),
                client_cert: tls.client_cert.clone(),
                ca_cert: tls.ca_cert.clone(),
            }),
            response_wait_timeout: Duration::from_secs(self.response_wait_timeout_secs),
            log_exchanges: self.log_exchanges,
            danger_accept_invalid_certs: self.danger_accept_invalid_certs,
            allow_renegotiation: self.allow_renegotiation,
        }
    }
}

fn default_response_wait_timeout_secs() -> u64 {
    DEFAULT_RESPONSE_WAIT_TIMEOUT.as_secs()
}

fn default_log_exchanges() -> bool {
    true
}

/// `[gateways.transport.tls]`: base64-encoded PEM documents.
#[derive(Debug, Clone, Deserialize)]
pub struct TlsSection {
    pub client_key: SecretString,
    pub client_cert: String,
    pub ca_cert: String,
}

/// `[gateways.security]`.
#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    /// `none`, `hash` or `token`.
    #[serde(rename = "type", default = "default_security_type")]
    pub kind: String,

    #[serde(default)]
    pub hash: Option<HashOptions>,

    #[serde(default)]
    pub token: Option<TokenOptions>,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self::none()
    }
}

impl SecurityConfig {
    pub fn none() -> Self {
        Self {
            kind: default_security_type(),
            hash: None,
            token: None,
        }
    }

    pub fn hash(options: HashOptions) -> Self {
        Self {
            kind: "hash".to_owned(),
            hash: Some(options),
            token: None,
        }
    }

    pub fn token(options: TokenOptions) -> Self {
        Self {
            kind: "token".to_owned(),
            hash: None,
            token: Some(options),
        }
    }
}

fn default_security_type() -> String {
    "none".to_owned()
}

/// `[gateways.security.hash]`.
#[derive(Debug, Clone, Deserialize)]
pub struct HashOptions {
    /// `md5`, `sha1`, `sha256` or `sha512`.
    pub algorithm: String,

    /// Applied in order to the digest. Empty means lowercase hex.
    #[serde(default)]
    pub post_process: Vec<PostProcessConfig>,
}

impl HashOptions {
    pub fn new(algorithm: impl Into<String>) -> Self {
        Self {
            algorithm: algorithm.into(),
            post_process: Vec::new(),
        }
    }

    #[must_use]
    pub fn then(mut self, step: PostProcessConfig) -> Self {
        self.post_process.push(step);
        self
    }
}

/// One post-processing step.
#[derive(Debug, Clone, Deserialize)]
pub struct PostProcessConfig {
    /// `hex`, `base64` or `rsa_pkcs1`.
    pub algorithm: String,

    /// Base64-encoded PEM RSA private key, for `rsa_pkcs1`.
    #[serde(default)]
    pub private_key: Option<SecretString>,
}

impl PostProcessConfig {
    pub fn new(algorithm: impl Into<String>) -> Self {
        Self {
            algorithm: algorithm.into(),
            private_key: None,
        }
    }

    pub fn rsa_pkcs1(private_key: SecretString) -> Self {
        Self {
            algorithm: "rsa_pkcs1".to_owned(),
            private_key: Some(private_key),
        }
    }
}

/// `[gateways.security.token]`.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenOptions {
    /// The auth request. It is rendered without parameters, so every value
    /// it needs is written literally.
    pub request: RequestConfig,

    /// How long a fetched token is reused.
    pub token_lifetime_secs: u64,
}

/// The shape of one HTTP request, shared by methods and token auth requests.
#[derive(Debug, Clone, Deserialize)]
pub struct RequestConfig {
    #[serde(default)]
    pub method: HttpMethod,

    pub url: String,

    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    #[serde(default)]
    pub body: String,

    #[serde(default = "default_expected_status")]
    pub expected_status: u16,

    /// `raw` (default), `json` or `xml`.
    #[serde(default)]
    pub response_format: String,

    #[serde(default)]
    pub response_field_path: Vec<String>,
}

impl RequestConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::default(),
            url: url.into(),
            headers: BTreeMap::new(),
            body: String::new(),
            expected_status: default_expected_status(),
            response_format: String::new(),
            response_field_path: Vec::new(),
        }
    }

    pub fn to_template(&self) -> Result<RequestTemplate, ConfigError> {
        let response_format: ResponseFormat = self
            .response_format
            .parse()
            .map_err(|_| ConfigError::UnknownResponseFormat(self.response_format.clone()))?;
        Ok(RequestTemplate {
            method: self.method,
            url: self.url.clone(),
            headers: self.headers.clone(),
            body: self.body.clone(),
            expected_status: self.expected_status,
            response_format,
            field_path: self.response_field_path.clone(),
        })
    }
}

fn default_expected_status() -> u16 {
    200
}

/// `[[gateways.methods]]`.
#[derive(Debug, Clone, Deserialize)]
pub struct MethodConfig {
    pub name: String,

    #[serde(flatten)]
    pub request: RequestConfig,

    /// Template whose rendering is signed. Defaults to the body template.
    #[serde(default)]
    pub signing_template: Option<String>,

    #[serde(default)]
    pub signature: SignaturePlacement,
}

impl MethodConfig {
    pub fn new(name: impl Into<String>, request: RequestConfig) -> Self {
        Self {
            name: name.into(),
            request,
            signing_template: None,
            signature: SignaturePlacement::None,
        }
    }
}
