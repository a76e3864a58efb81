use std::fmt;

use ianua_core::{Params, RequestTemplate, render};
use ianua_transport::HttpTransport;

use crate::config::MethodConfig;
use crate::error::{ConfigError, GatewayError};
use crate::exchange::{exchange, render_headers};
use crate::placement::SignaturePlacement;
use crate::security::Signer;

/// Picks a method of a gateway, by position or by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MethodSelector {
    Index(usize),
    Name(String),
}

impl From<usize> for MethodSelector {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

impl From<&str> for MethodSelector {
    fn from(name: &str) -> Self {
        Self::Name(name.to_owned())
    }
}

impl From<String> for MethodSelector {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl fmt::Display for MethodSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(index) => write!(f, "#{index}"),
            Self::Name(name) => write!(f, "\"{name}\""),
        }
    }
}

/// One operation a gateway offers: a request template plus how it is signed.
#[derive(Debug, Clone)]
pub struct Method {
    name: String,
    request: RequestTemplate,
    signing_template: Option<String>,
    signature: SignaturePlacement,
}

impl Method {
    pub fn new(name: impl Into<String>, request: RequestTemplate) -> Self {
        Self {
            name: name.into(),
            request,
            signing_template: None,
            signature: SignaturePlacement::None,
        }
    }

    #[must_use]
    pub fn with_signing_template(mut self, template: impl Into<String>) -> Self {
        self.signing_template = Some(template.into());
        self
    }

    #[must_use]
    pub fn with_signature(mut self, placement: SignaturePlacement) -> Self {
        self.signature = placement;
        self
    }

    pub fn from_config(config: &MethodConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            name: config.name.clone(),
            request: config.request.to_template()?,
            signing_template: config.signing_template.clone(),
            signature: config.signature.clone(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn request(&self) -> &RequestTemplate {
        &self.request
    }

    /// The template whose rendering gets signed: the dedicated signing
    /// template if set, the body template otherwise.
    pub fn signing_template(&self) -> &str {
        self.signing_template.as_deref().unwrap_or(&self.request.body)
    }

    pub fn signature_placement(&self) -> &SignaturePlacement {
        &self.signature
    }

    /// Render, sign, send, check the status and extract the result.
    pub(crate) async fn execute(
        &self,
        transport: &dyn HttpTransport,
        signer: &Signer,
        params: &Params,
    ) -> Result<String, GatewayError> {
        let mut url = render(&self.request.url, params);
        let mut headers = render_headers(&self.request, params);

        let signature = signer.sign(self.signing_template(), params).await?;

        let mut params = params.clone();
        self.signature
            .apply(&signature, &mut url, &mut headers, &mut params);
        let body = render(&self.request.body, &params);

        exchange(transport, &self.request, url, headers, body).await
    }
}
