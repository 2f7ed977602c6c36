//! HTTP transport seam
//!
//! The client speaks to the network only through [`Transport`], so tests and
//! callers with special needs (proxies, recorded sessions) can substitute
//! their own. [`ReqwestTransport`] is the default.

use crate::error::Result;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE, HeaderMap, TRANSFER_ENCODING};
use reqwest::{Client, Method, StatusCode};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::trace;
use url::Url;

/// A fully prepared request
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    /// Form-encoded parameters for POST requests
    pub body: Option<Bytes>,
}

/// A response with its body read completely
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }

    /// Declared `Content-Length`, if any
    pub fn content_length(&self) -> Option<u64> {
        self.headers
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse().ok())
    }

    /// Whether the server sent the body with chunked transfer encoding
    pub fn is_chunked(&self) -> bool {
        self.headers
            .get_all(TRANSFER_ENCODING)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .any(|v| v.to_ascii_lowercase().contains("chunked"))
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Sends one request and returns the whole response
///
/// Implementations report transport failures as errors and every HTTP
/// status, including 401, as a response.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse>;
}

/// Install the ring crypto provider for rustls once per process
///
/// reqwest is built without a bundled provider, so one must be installed
/// before the first TLS client is created.
pub fn ensure_crypto_provider() {
    static INSTALLED: OnceLock<()> = OnceLock::new();
    INSTALLED.get_or_init(|| {
        // Err means another provider is already installed
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}

/// [`Transport`] on a reqwest client
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Create a transport whose calls are bounded by `read_timeout`
    ///
    /// Redirects are not followed; a 3xx reaches the client as a response.
    pub fn new(read_timeout: Duration) -> Result<Self> {
        ensure_crypto_provider();
        let client = Client::builder()
            .timeout(read_timeout)
            .connect_timeout(Duration::from_secs(30))
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_nodelay(true)
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self { client })
    }

    /// Wrap an existing reqwest client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        trace!("{} {}", request.method, request.url);

        let mut builder = self
            .client
            .request(request.method, request.url)
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;

        trace!("Response {} with {} bytes", status, body.len());
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_reqwest_transport_round_trip() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rets/login"))
            .and(header("RETS-Version", "RETS/1.7"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw("<RETS ReplyCode=\"0\" ReplyText=\"OK\"/>", "text/xml"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let transport = ReqwestTransport::new(Duration::from_secs(5)).unwrap();
        let mut headers = HeaderMap::new();
        headers.insert("RETS-Version", HeaderValue::from_static("RETS/1.7"));

        let response = transport
            .send(HttpRequest {
                method: Method::GET,
                url: Url::parse(&format!("{}/rets/login", server.uri())).unwrap(),
                headers,
                body: None,
            })
            .await
            .unwrap();

        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.content_type(), Some("text/xml"));
        assert_eq!(response.body.as_ref(), b"<RETS ReplyCode=\"0\" ReplyText=\"OK\"/>");
    }

    #[tokio::test]
    async fn test_unauthorized_is_a_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(401)
                    .insert_header("WWW-Authenticate", "Digest realm=\"r\", nonce=\"n\""),
            )
            .mount(&server)
            .await;

        let transport = ReqwestTransport::new(Duration::from_secs(5)).unwrap();
        let response = transport
            .send(HttpRequest {
                method: Method::GET,
                url: Url::parse(&server.uri()).unwrap(),
                headers: HeaderMap::new(),
                body: None,
            })
            .await
            .unwrap();
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
        assert!(response.header("www-authenticate").is_some());
    }

    #[tokio::test]
    async fn test_redirect_is_returned_not_followed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rets/login"))
            .respond_with(ResponseTemplate::new(302).insert_header("Location", "/elsewhere"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/elsewhere"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let transport = ReqwestTransport::new(Duration::from_secs(5)).unwrap();
        let response = transport
            .send(HttpRequest {
                method: Method::GET,
                url: Url::parse(&format!("{}/rets/login", server.uri())).unwrap(),
                headers: HeaderMap::new(),
                body: None,
            })
            .await
            .unwrap();
        assert_eq!(response.status, StatusCode::FOUND);
        assert_eq!(response.header("location"), Some("/elsewhere"));
    }

    #[test]
    fn test_single_object_hints() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("2048"));
        headers.insert(TRANSFER_ENCODING, HeaderValue::from_static("gzip, Chunked"));
        let response = HttpResponse {
            status: StatusCode::OK,
            headers,
            body: Bytes::new(),
        };
        assert_eq!(response.content_length(), Some(2048));
        assert!(response.is_chunked());
    }
}
