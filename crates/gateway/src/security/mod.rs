//! Request signing strategies.

mod hash;
mod token;

use std::sync::Arc;

use ianua_core::Params;
use ianua_transport::HttpTransport;

pub use hash::HashSigner;
pub use token::TokenSigner;

use crate::config::SecurityConfig;
use crate::error::{ConfigError, GatewayError};

/// How a gateway authenticates its requests.
#[derive(Debug)]
pub enum Signer {
    /// No authentication. Signs as the empty string.
    None,
    /// Digest of the rendered signing template, post-processed.
    Hash(HashSigner),
    /// Bearer token from an auth endpoint. Ignores the template.
    Token(TokenSigner),
}

impl Signer {
    /// Build the signer named by `config.kind` (case-insensitive).
    ///
    /// `transport` is the owning gateway's transport, used by token signers
    /// for their auth request.
    pub fn from_config(
        config: &SecurityConfig,
        transport: Arc<dyn HttpTransport>,
    ) -> Result<Self, ConfigError> {
        match config.kind.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "hash" => {
                let options = config
                    .hash
                    .as_ref()
                    .ok_or(ConfigError::MissingSecurityOptions("hash"))?;
                Ok(Self::Hash(HashSigner::from_options(options)?))
            }
            "token" => {
                let options = config
                    .token
                    .as_ref()
                    .ok_or(ConfigError::MissingSecurityOptions("token"))?;
                Ok(Self::Token(TokenSigner::from_options(options, transport)?))
            }
            _ => Err(ConfigError::UnknownSecurityType(config.kind.clone())),
        }
    }

    /// Produce the signature for one call.
    pub async fn sign(&self, template: &str, params: &Params) -> Result<String, GatewayError> {
        match self {
            Self::None => Ok(String::new()),
            Self::Hash(signer) => Ok(signer.sign(template, params)?),
            Self::Token(signer) => signer.token().await,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Hash(_) => "hash",
            Self::Token(_) => "token",
        }
    }
}
