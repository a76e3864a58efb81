use std::fmt;
use std::sync::Arc;

use ianua_core::Params;
use ianua_transport::HttpTransport;
use tracing::field::{Empty, display};
use tracing::{Span, debug, instrument, warn};

use crate::builder::GatewayBuilder;
use crate::config::GatewayConfig;
use crate::error::{ConfigError, GatewayError};
use crate::method::{Method, MethodSelector};
use crate::security::Signer;

/// A configured payment provider integration.
///
/// Owns one transport shared by all of its methods and, for token security,
/// by the token refresh request. Safe to share across tasks.
pub struct Gateway {
    name: String,
    transport: Arc<dyn HttpTransport>,
    signer: Signer,
    methods: Vec<Method>,
}

impl Gateway {
    pub(crate) fn new(
        name: String,
        transport: Arc<dyn HttpTransport>,
        signer: Signer,
        methods: Vec<Method>,
    ) -> Self {
        Self {
            name,
            transport,
            signer,
            methods,
        }
    }

    pub fn builder(name: impl Into<String>) -> GatewayBuilder {
        GatewayBuilder::new(name)
    }

    /// Build a gateway with a transport made from its own configuration.
    pub fn from_config(config: &GatewayConfig) -> Result<Self, ConfigError> {
        GatewayBuilder::from_config(config)?.build()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    pub fn method(&self, selector: &MethodSelector) -> Option<&Method> {
        match selector {
            MethodSelector::Index(index) => self.methods.get(*index),
            MethodSelector::Name(name) => self.methods.iter().find(|m| m.name() == name),
        }
    }

    pub fn signer(&self) -> &Signer {
        &self.signer
    }

    pub fn transport(&self) -> &Arc<dyn HttpTransport> {
        &self.transport
    }

    /// Execute one method with `params`.
    ///
    /// # Errors
    ///
    /// [`GatewayError::MethodNotFound`] for an unknown selector; otherwise
    /// whatever signing, the exchange or extraction returns.
    #[instrument(skip_all, fields(gateway = %self.name, method = Empty))]
    pub async fn execute(
        &self,
        selector: impl Into<MethodSelector>,
        params: &Params,
    ) -> Result<String, GatewayError> {
        let selector = selector.into();
        Span::current().record("method", display(&selector));
        let method = self
            .method(&selector)
            .ok_or_else(|| GatewayError::MethodNotFound {
                gateway: self.name.clone(),
                method: selector.to_string(),
            })?;

        match method
            .execute(self.transport.as_ref(), &self.signer, params)
            .await
        {
            Ok(result) => {
                debug!(method = method.name(), "method executed");
                Ok(result)
            }
            Err(err) => {
                warn!(method = method.name(), error = %err, "method failed");
                Err(err)
            }
        }
    }
}

impl fmt::Debug for Gateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gateway")
            .field("name", &self.name)
            .field("signer", &self.signer.kind())
            .field(
                "methods",
                &self.methods.iter().map(Method::name).collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}
