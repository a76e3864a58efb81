use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;

use ianua_core::Params;
use parking_lot::RwLock;
use tracing::info;

use crate::config::{GatewayConfig, RegistryConfig};
use crate::error::{ConfigError, GatewayError};
use crate::gateway::Gateway;
use crate::method::MethodSelector;

/// Gateways by name.
///
/// Registration builds the whole gateway before touching the map, so a
/// failed registration leaves the registry unchanged. Names are unique.
#[derive(Default)]
pub struct GatewayRegistry {
    gateways: RwLock<HashMap<String, Arc<Gateway>>>,
}

impl GatewayRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build and register every gateway of `config`, in order.
    ///
    /// All or nothing: the first gateway that fails to build or register
    /// fails the whole call and no registry is returned.
    pub fn from_config(config: &RegistryConfig) -> Result<Self, GatewayError> {
        let registry = Self::new();
        for gateway in &config.gateways {
            registry.register(gateway)?;
        }
        Ok(registry)
    }

    /// Build a gateway from `config` and register it under its name.
    ///
    /// # Errors
    ///
    /// [`ConfigError::DuplicateGateway`] if the name is taken, or any error
    /// from building the transport, signer or methods.
    pub fn register(&self, config: &GatewayConfig) -> Result<(), GatewayError> {
        if self.gateways.read().contains_key(&config.name) {
            return Err(ConfigError::DuplicateGateway(config.name.clone()).into());
        }
        let gateway = Gateway::from_config(config)?;
        self.insert(gateway)
    }

    /// Register an already built gateway.
    pub fn insert(&self, gateway: Gateway) -> Result<(), GatewayError> {
        match self.gateways.write().entry(gateway.name().to_owned()) {
            Entry::Occupied(entry) => {
                Err(ConfigError::DuplicateGateway(entry.key().clone()).into())
            }
            Entry::Vacant(entry) => {
                info!(
                    gateway = %gateway.name(),
                    signer = gateway.signer().kind(),
                    methods = gateway.methods().len(),
                    "registered gateway"
                );
                entry.insert(Arc::new(gateway));
                Ok(())
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<Gateway>> {
        self.gateways.read().get(name).cloned()
    }

    /// Registered gateway names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.gateways.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.gateways.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.gateways.read().is_empty()
    }

    /// Execute a method of the gateway called `gateway`.
    ///
    /// The registry lock is released before any I/O.
    pub async fn execute_method(
        &self,
        gateway: &str,
        selector: impl Into<MethodSelector>,
        params: &Params,
    ) -> Result<String, GatewayError> {
        let gateway = self
            .get(gateway)
            .ok_or_else(|| GatewayError::GatewayNotFound(gateway.to_owned()))?;
        gateway.execute(selector, params).await
    }
}
