use std::collections::HashSet;
use std::sync::Arc;

use ianua_transport::{HttpTransport, TransportConfig, build_transport};

use crate::config::{GatewayConfig, SecurityConfig};
use crate::error::ConfigError;
use crate::gateway::Gateway;
use crate::method::Method;
use crate::security::Signer;

/// Fluent builder for constructing a [`Gateway`].
///
/// Without an explicit transport, one is built from the transport config
/// (the default config if none was given). The signer is built last so a
/// token signer shares the gateway's transport.
pub struct GatewayBuilder {
    name: String,
    transport: Option<Arc<dyn HttpTransport>>,
    transport_config: TransportConfig,
    security: SecurityConfig,
    signer: Option<Signer>,
    methods: Vec<Method>,
}

impl GatewayBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transport: None,
            transport_config: TransportConfig::default(),
            security: SecurityConfig::default(),
            signer: None,
            methods: Vec::new(),
        }
    }

    /// Start from a full gateway configuration.
    pub fn from_config(config: &GatewayConfig) -> Result<Self, ConfigError> {
        let methods = config
            .methods
            .iter()
            .map(Method::from_config)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            name: config.name.clone(),
            transport: None,
            transport_config: config.transport.to_transport_config(),
            security: config.security.clone(),
            signer: None,
            methods,
        })
    }

    /// Use `transport` instead of building one from the transport config.
    #[must_use]
    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    #[must_use]
    pub fn transport_config(mut self, config: TransportConfig) -> Self {
        self.transport_config = config;
        self
    }

    #[must_use]
    pub fn security(mut self, security: SecurityConfig) -> Self {
        self.security = security;
        self
    }

    /// Use a prepared signer; the security config is then ignored.
    #[must_use]
    pub fn signer(mut self, signer: Signer) -> Self {
        self.signer = Some(signer);
        self
    }

    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.methods.push(method);
        self
    }

    /// Build the gateway.
    ///
    /// # Errors
    ///
    /// Fails on duplicate method names, an unusable transport configuration
    /// (including TLS material) or an invalid security configuration.
    pub fn build(self) -> Result<Gateway, ConfigError> {
        let mut seen = HashSet::new();
        for method in &self.methods {
            if !seen.insert(method.name()) {
                return Err(ConfigError::DuplicateMethod {
                    gateway: self.name.clone(),
                    method: method.name().to_owned(),
                });
            }
        }

        let transport = match self.transport {
            Some(transport) => transport,
            None => build_transport(&self.transport_config)?,
        };
        let signer = match self.signer {
            Some(signer) => signer,
            None => Signer::from_config(&self.security, Arc::clone(&transport))?,
        };

        Ok(Gateway::new(self.name, transport, signer, self.methods))
    }
}
