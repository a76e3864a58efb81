use std::time::Duration;

use async_trait::async_trait;
use ianua_core::HttpMethod;
use ianua_crypto::ClientTlsConfig;
use reqwest::Client;
use tracing::{debug, instrument};

use crate::config::TransportConfig;
use crate::error::TransportError;
use crate::transport::HttpTransport;
use crate::types::{HttpRequest, HttpResponse};

/// [`HttpTransport`] backed by a `reqwest` client.
///
/// The client speaks HTTP/1.1 only, never follows redirects, never retries
/// and never asks for compressed bodies. A single response-wait timeout is
/// applied to connecting, the TLS handshake, each read, idle pooled
/// connections and the request as a whole.
pub struct ReqwestTransport {
    client: Client,
    timeout: Duration,
}

impl ReqwestTransport {
    /// Build a transport from `config`, decoding its TLS material.
    pub fn new(config: &TransportConfig) -> Result<Self, TransportError> {
        let tls = match &config.tls {
            Some(material) => ClientTlsConfig::from_material(material, config.tls_options())?,
            None => ClientTlsConfig::webpki_roots(config.tls_options())?,
        };
        let timeout = config.response_wait_timeout;

        let client = Client::builder()
            .use_preconfigured_tls((*tls.rustls_config()).clone())
            .timeout(timeout)
            .connect_timeout(timeout)
            .read_timeout(timeout)
            .pool_idle_timeout(timeout)
            .http1_only()
            .no_gzip()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| TransportError::Build(e.to_string()))?;

        debug!(mutual_tls = tls.is_mutual(), ?timeout, "built HTTP transport");
        Ok(Self { client, timeout })
    }

    /// Wrap an existing client. `timeout` is only used to label timeout errors.
    pub fn with_client(client: Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    fn method(method: HttpMethod) -> reqwest::Method {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    #[instrument(skip_all, fields(method = %request.method, url = %request.url))]
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = self
            .client
            .request(Self::method(request.method), &request.url)
            .body(request.body);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(&e, self.timeout))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::from_reqwest(&e, self.timeout))?;

        debug!(status, body_len = body.len(), "received response");
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use super::*;

    /// A minimal mock HTTP server built on tokio that returns canned responses.
    struct MockServer {
        listener: TcpListener,
        base_url: String,
    }

    impl MockServer {
        async fn start() -> Self {
            let listener = TcpListener::bind("127.0.0.1:0")
                .await
                .expect("failed to bind mock server");
            let port = listener.local_addr().unwrap().port();
            Self {
                listener,
                base_url: format!("http://127.0.0.1:{port}"),
            }
        }

        /// Accept one connection, answer with `status` and `body`, and return
        /// the raw request bytes.
        async fn respond_once(self, status: u16, body: &str) -> Vec<u8> {
            let (mut stream, _) = self.listener.accept().await.unwrap();
            let buf = read_request(&mut stream).await;
            stream
                .write_all(http_response(status, body).as_bytes())
                .await
                .unwrap();
            stream.shutdown().await.unwrap();
            buf
        }

        /// Accept one connection and never answer.
        async fn hang(self) {
            let (_stream, _) = self.listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
    }

    fn http_response(status: u16, body: &str) -> String {
        format!(
            "HTTP/1.1 {status} Whatever\r\n\
             Content-Type: application/json\r\n\
             Content-Length: {}\r\n\
             X-Request-Id: test-123\r\n\
             Connection: close\r\n\
             \r\n\
             {body}",
            body.len()
        )
    }

    /// Read until the head and a `Content-Length` body have arrived.
    async fn read_request<S: AsyncRead + Unpin>(stream: &mut S) -> Vec<u8> {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = stream.read(&mut chunk).await.unwrap();
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf).to_lowercase();
            if let Some(head_end) = text.find("\r\n\r\n") {
                let content_length = text[..head_end]
                    .lines()
                    .find_map(|l| l.strip_prefix("content-length:"))
                    .and_then(|v| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= head_end + 4 + content_length {
                    return buf;
                }
            }
            if n == 0 {
                return buf;
            }
        }
    }

    fn transport(timeout: Duration) -> ReqwestTransport {
        let config = TransportConfig::default().with_response_wait_timeout(timeout);
        ReqwestTransport::new(&config).unwrap()
    }

    #[tokio::test]
    async fn sends_method_headers_and_body() {
        let server = MockServer::start().await;
        let url = format!("{}/pay?ref=1", server.base_url);
        let handle = tokio::spawn(async move { server.respond_once(201, r#"{"id":"p-1"}"#).await });

        let request = HttpRequest::new(HttpMethod::Put, url)
            .with_header("X-Signature", "abc123")
            .with_body(r#"{"amount":"10"}"#);
        let response = transport(Duration::from_secs(5)).execute(request).await.unwrap();

        let raw = String::from_utf8(handle.await.unwrap()).unwrap();
        assert!(raw.starts_with("PUT /pay?ref=1 HTTP/1.1"));
        assert!(raw.to_lowercase().contains("x-signature: abc123"));
        assert!(raw.ends_with(r#"{"amount":"10"}"#));
        assert!(!raw.to_lowercase().contains("accept-encoding: gzip"));

        assert_eq!(response.status, 201);
        assert_eq!(response.header("x-request-id"), Some("test-123"));
        assert_eq!(response.text(), r#"{"id":"p-1"}"#);
    }

    #[tokio::test]
    async fn non_success_status_is_not_an_error() {
        let server = MockServer::start().await;
        let url = server.base_url.clone();
        let handle = tokio::spawn(async move { server.respond_once(500, "boom").await });

        let response = transport(Duration::from_secs(5))
            .execute(HttpRequest::new(HttpMethod::Get, url))
            .await
            .unwrap();
        handle.await.unwrap();

        assert_eq!(response.status, 500);
        assert_eq!(response.text(), "boom");
    }

    #[tokio::test]
    async fn slow_server_times_out() {
        let server = MockServer::start().await;
        let url = server.base_url.clone();
        let handle = tokio::spawn(server.hang());

        let err = transport(Duration::from_millis(200))
            .execute(HttpRequest::new(HttpMethod::Post, url))
            .await
            .unwrap_err();
        handle.abort();

        assert!(err.is_timeout(), "expected timeout, got {err:?}");
    }

    #[tokio::test]
    async fn refused_connection_is_connect_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let err = transport(Duration::from_secs(5))
            .execute(HttpRequest::new(HttpMethod::Get, url))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Connect(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn malformed_url_is_invalid_request() {
        let err = transport(Duration::from_secs(5))
            .execute(HttpRequest::new(HttpMethod::Get, "not a url"))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::InvalidRequest(_)), "got {err:?}");
    }

    mod tls {
        use std::net::{IpAddr, Ipv4Addr};
        use std::sync::Arc;

        use base64::Engine;
        use base64::engine::general_purpose::STANDARD as B64;
        use ianua_crypto::{SecretString, TlsMaterial};
        use rcgen::{
            BasicConstraints, Certificate, CertificateParams, DnType, IsCa, KeyPair, SanType,
        };
        use rustls::RootCertStore;
        use rustls::pki_types::{PrivateKeyDer, PrivatePkcs8KeyDer};
        use rustls::server::WebPkiClientVerifier;
        use tokio_rustls::TlsAcceptor;

        use super::*;

        struct Authority {
            cert: Certificate,
            key: KeyPair,
        }

        impl Authority {
            fn new(name: &str) -> Self {
                let mut params = CertificateParams::new(Vec::<String>::new()).unwrap();
                params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
                params.distinguished_name.push(DnType::CommonName, name);
                let key = KeyPair::generate().unwrap();
                let cert = params.self_signed(&key).unwrap();
                Self { cert, key }
            }

            fn issue(&self, params: &CertificateParams) -> (Certificate, KeyPair) {
                let key = KeyPair::generate().unwrap();
                let cert = params.clone().signed_by(&key, &self.cert, &self.key).unwrap();
                (cert, key)
            }

            fn issue_server(&self) -> (Certificate, KeyPair) {
                let mut params = CertificateParams::new(vec!["localhost".to_string()]).unwrap();
                params
                    .distinguished_name
                    .push(DnType::CommonName, "localhost");
                params
                    .subject_alt_names
                    .push(SanType::IpAddress(IpAddr::V4(Ipv4Addr::LOCALHOST)));
                self.issue(&params)
            }

            /// Client key pair issued by this authority, trusting only it.
            fn client_material(&self) -> TlsMaterial {
                let mut params = CertificateParams::new(Vec::<String>::new()).unwrap();
                params
                    .distinguished_name
                    .push(DnType::CommonName, "merchant-client");
                let (cert, key) = self.issue(&params);
                TlsMaterial {
                    client_key: SecretString::new(B64.encode(key.serialize_pem())),
                    client_cert: B64.encode(cert.pem()),
                    ca_cert: B64.encode(self.cert.pem()),
                }
            }
        }

        /// HTTPS server on loopback presenting a certificate from `issuer`.
        struct TlsServer {
            listener: TcpListener,
            acceptor: TlsAcceptor,
            url: String,
        }

        impl TlsServer {
            /// With `client_ca`, the handshake fails unless the client presents
            /// a certificate issued by it.
            async fn start(issuer: &Authority, client_ca: Option<&Authority>) -> Self {
                let provider = Arc::new(rustls::crypto::ring::default_provider());
                let builder = rustls::ServerConfig::builder_with_provider(Arc::clone(&provider))
                    .with_safe_default_protocol_versions()
                    .unwrap();
                let builder = match client_ca {
                    Some(ca) => {
                        let mut roots = RootCertStore::empty();
                        roots.add(ca.cert.der().clone()).unwrap();
                        let verifier =
                            WebPkiClientVerifier::builder_with_provider(Arc::new(roots), provider)
                                .build()
                                .unwrap();
                        builder.with_client_cert_verifier(verifier)
                    }
                    None => builder.with_no_client_auth(),
                };

                let (cert, key) = issuer.issue_server();
                let key = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(key.serialize_der()));
                let mut config = builder
                    .with_single_cert(vec![cert.der().clone()], key)
                    .unwrap();
                config.alpn_protocols = vec![b"http/1.1".to_vec()];

                let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
                let port = listener.local_addr().unwrap().port();
                Self {
                    listener,
                    acceptor: TlsAcceptor::from(Arc::new(config)),
                    url: format!("https://127.0.0.1:{port}/pay"),
                }
            }

            /// Complete one handshake and answer `200 ok`. Returns how many
            /// certificates the client presented.
            async fn respond_once(self) -> std::io::Result<usize> {
                let (tcp, _) = self.listener.accept().await?;
                let mut stream = self.acceptor.accept(tcp).await?;
                let presented = stream
                    .get_ref()
                    .1
                    .peer_certificates()
                    .map_or(0, <[_]>::len);
                read_request(&mut stream).await;
                stream
                    .write_all(http_response(200, "ok").as_bytes())
                    .await?;
                stream.shutdown().await?;
                Ok(presented)
            }
        }

        async fn call(server: TlsServer, config: TransportConfig) -> (
            Result<HttpResponse, TransportError>,
            std::io::Result<usize>,
        ) {
            let url = server.url.clone();
            let handle = tokio::spawn(server.respond_once());
            let transport = ReqwestTransport::new(
                &config.with_response_wait_timeout(Duration::from_secs(5)),
            )
            .unwrap();
            let result = transport
                .execute(HttpRequest::new(HttpMethod::Get, url))
                .await;
            (result, handle.await.unwrap())
        }

        fn assert_rejected_certificate(result: Result<HttpResponse, TransportError>) {
            let err = result.unwrap_err();
            assert!(
                matches!(err, TransportError::Connect(ref m) if m.contains("certificate")),
                "got {err:?}"
            );
        }

        #[tokio::test]
        async fn mutual_tls_against_configured_ca() {
            let ca = Authority::new("Ianua Test CA");
            let server = TlsServer::start(&ca, Some(&ca)).await;

            let (result, served) =
                call(server, TransportConfig::default().with_tls(ca.client_material())).await;

            let response = result.unwrap();
            assert_eq!(response.status, 200);
            assert_eq!(response.text(), "ok");
            assert_eq!(served.unwrap(), 1, "client certificate not presented");
        }

        #[tokio::test]
        async fn server_from_another_ca_is_rejected() {
            let ours = Authority::new("Ianua Test CA");
            let theirs = Authority::new("Unrelated CA");
            let server = TlsServer::start(&theirs, None).await;

            let (result, served) =
                call(server, TransportConfig::default().with_tls(ours.client_material())).await;

            assert_rejected_certificate(result);
            assert!(served.is_err());
        }

        #[tokio::test]
        async fn default_roots_reject_private_ca() {
            let ca = Authority::new("Ianua Test CA");
            let server = TlsServer::start(&ca, None).await;

            let (result, served) = call(server, TransportConfig::default()).await;

            assert_rejected_certificate(result);
            assert!(served.is_err());
        }

        #[tokio::test]
        async fn accept_invalid_certs_skips_server_verification() {
            let ca = Authority::new("Unrelated CA");
            let server = TlsServer::start(&ca, None).await;

            let (result, served) = call(
                server,
                TransportConfig::default().with_danger_accept_invalid_certs(true),
            )
            .await;

            assert_eq!(result.unwrap().text(), "ok");
            assert_eq!(served.unwrap(), 0);
        }

        #[tokio::test]
        async fn accept_invalid_certs_still_presents_client_certificate() {
            let ours = Authority::new("Ianua Test CA");
            let theirs = Authority::new("Unrelated CA");
            let server = TlsServer::start(&theirs, Some(&ours)).await;

            let config = TransportConfig::default()
                .with_tls(ours.client_material())
                .with_danger_accept_invalid_certs(true);
            let (result, served) = call(server, config).await;

            assert_eq!(result.unwrap().status, 200);
            assert_eq!(served.unwrap(), 1);
        }
    }
}
