//! Payment gateway method execution.
//!
//! A [`Gateway`] bundles a transport, a [`Signer`] and a list of
//! [`Method`]s. Executing a method renders its request templates against the
//! caller's parameters, signs, sends, checks the status code and extracts the
//! result. A [`GatewayRegistry`] holds gateways by name and is usually built
//! from a TOML [`RegistryConfig`].
//!
//! ```no_run
//! use ianua_gateway::{GatewayRegistry, Params, RegistryConfig};
//!
//! # async fn run(toml: &str) -> Result<(), Box<dyn std::error::Error>> {
//! let registry = GatewayRegistry::from_config(&RegistryConfig::from_toml_str(toml)?)?;
//! let mut params = Params::new();
//! params.insert("amount".into(), serde_json::json!("10.50"));
//! let payment_id = registry.execute_method("acme", "pay", &params).await?;
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod config;
pub mod error;
pub mod gateway;
pub mod method;
pub mod placement;
pub mod registry;
pub mod security;

mod exchange;

pub use builder::GatewayBuilder;
pub use config::{
    GatewayConfig, HashOptions, MethodConfig, PostProcessConfig, RegistryConfig, RequestConfig,
    SecurityConfig, TlsSection, TokenOptions, TransportSection,
};
pub use error::{ConfigError, GatewayError};
pub use gateway::Gateway;
pub use method::{Method, MethodSelector};
pub use placement::SignaturePlacement;
pub use registry::GatewayRegistry;
pub use security::{HashSigner, Signer, TokenSigner};

pub use ianua_core::{Params, RequestTemplate, TtlCache, render};
