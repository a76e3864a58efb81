use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use ianua_core::{Params, RequestTemplate, render};
use ianua_crypto::{ExposeSecret, SecretString};
use ianua_transport::HttpTransport;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::config::TokenOptions;
use crate::error::{ConfigError, GatewayError};
use crate::exchange::{exchange, render_headers};

struct Token {
    value: SecretString,
    /// `None` when the lifetime reaches past what `Instant` can represent.
    expires_at: Option<Instant>,
}

/// Fetches a bearer token from an auth endpoint and reuses it for a fixed
/// lifetime.
///
/// The cache lock is held across the refresh call, so concurrent callers that
/// find the token missing or expired wait for one refresh instead of each
/// hitting the auth endpoint. A failed refresh leaves the cache empty and the
/// next caller tries again.
pub struct TokenSigner {
    request: RequestTemplate,
    lifetime: Duration,
    transport: Arc<dyn HttpTransport>,
    cached: Mutex<Option<Token>>,
}

impl TokenSigner {
    pub fn new(request: RequestTemplate, lifetime: Duration, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            request,
            lifetime,
            transport,
            cached: Mutex::new(None),
        }
    }

    pub fn from_options(
        options: &TokenOptions,
        transport: Arc<dyn HttpTransport>,
    ) -> Result<Self, ConfigError> {
        Ok(Self::new(
            options.request.to_template()?,
            Duration::from_secs(options.token_lifetime_secs),
            transport,
        ))
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// Returns the cached token while it is valid, otherwise fetches a new one.
    pub async fn token(&self) -> Result<String, GatewayError> {
        let mut cached = self.cached.lock().await;

        if let Some(token) = cached.as_ref()
            && token.expires_at.is_none_or(|at| Instant::now() < at)
        {
            debug!(url = %self.request.url, "using cached auth token");
            return Ok(token.value.expose_secret().clone());
        }
        *cached = None;

        debug!(url = %self.request.url, "refreshing auth token");
        let value = self.fetch().await?;
        *cached = Some(Token {
            value: SecretString::new(value.clone()),
            expires_at: Instant::now().checked_add(self.lifetime),
        });
        info!(
            url = %self.request.url,
            lifetime_secs = self.lifetime.as_secs(),
            "fetched auth token"
        );
        Ok(value)
    }

    /// Drop the cached token so the next call fetches a fresh one.
    pub async fn invalidate(&self) {
        *self.cached.lock().await = None;
    }

    async fn fetch(&self) -> Result<String, GatewayError> {
        let params = Params::new();
        exchange(
            self.transport.as_ref(),
            &self.request,
            render(&self.request.url, &params),
            render_headers(&self.request, &params),
            render(&self.request.body, &params),
        )
        .await
    }
}

impl fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSigner")
            .field("url", &self.request.url)
            .field("lifetime", &self.lifetime)
            .finish_non_exhaustive()
    }
}
