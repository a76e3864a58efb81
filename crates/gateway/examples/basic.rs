//! Basic example: a hash-signed gateway talking to an in-process mock provider.
//!
//! Run with: `cargo run -p ianua-gateway --example basic`

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ianua_core::ResponseFormat;
use ianua_gateway::{
    Gateway, GatewayRegistry, HashOptions, Method, Params, PostProcessConfig, RequestTemplate,
    SecurityConfig, SignaturePlacement, TtlCache,
};
use ianua_transport::{HttpRequest, HttpResponse, HttpTransport, LoggingTransport, TransportError};

/// Accepts every payment and echoes the signature it received.
struct MockProvider;

#[async_trait]
impl HttpTransport for MockProvider {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        println!(
            "  [provider] {} {} signed {}",
            request.method,
            request.url,
            request.header("X-Signature").unwrap_or("-")
        );
        Ok(HttpResponse::new(
            200,
            r#"{"payment":{"id":"pay-0001","state":"captured"}}"#,
        ))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter("ianua=debug,info")
        .init();

    let gateway = Gateway::builder("acme")
        .transport(Arc::new(LoggingTransport::new(MockProvider)))
        .security(SecurityConfig::hash(
            HashOptions::new("sha256").then(PostProcessConfig::new("base64")),
        ))
        .method(
            Method::new(
                "pay",
                RequestTemplate::new("https://api.acme.test/payments")
                    .with_header("Content-Type", "application/json")
                    .with_body(r#"{"order":"{{order}}","amount":"{{amount}}"}"#)
                    .with_response(ResponseFormat::Json, &["payment", "id"]),
            )
            .with_signature(SignaturePlacement::header("X-Signature")),
        )
        .build()?;

    let registry = GatewayRegistry::new();
    registry.insert(gateway)?;

    // Payment ids keyed by order, as a repository would keep them.
    let payments: TtlCache<String> = TtlCache::new();

    for order in ["A-1", "A-2"] {
        let mut params = Params::new();
        params.insert("order".into(), order.into());
        params.insert("amount".into(), "10.50".into());

        let id = registry.execute_method("acme", "pay", &params).await?;
        println!("order {order} -> payment {id}");
        payments.set(order, id, Duration::from_secs(300));
    }

    println!("cached payments: {:?}", payments.snapshot());
    Ok(())
}
