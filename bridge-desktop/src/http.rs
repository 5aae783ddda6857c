//! HTTP Client Implementation using Reqwest

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    http::{DynAsyncRead, HttpClient, HttpMethod, HttpRequest, HttpResponse},
};
use futures_util::TryStreamExt;
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

const USER_AGENT: &str = concat!("drive-pull/", env!("CARGO_PKG_VERSION"));

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Reqwest-based HTTP client implementation
///
/// Provides HTTP operations with:
/// - Connection pooling via reqwest
/// - TLS support by default (rustls)
/// - Async streaming for downloads
///
/// Each call performs a single attempt. Throttling is surfaced to the caller
/// as a status code, never retried here.
pub struct ReqwestHttpClient {
    client: Client,
}

impl ReqwestHttpClient {
    /// Create a new HTTP client with a 30 second timeout
    pub fn new() -> Result<Self> {
        Self::with_timeout(Duration::from_secs(30))
    }

    /// Create a new HTTP client with custom timeout
    ///
    /// The client itself only bounds connecting and each socket read, so a
    /// download that keeps receiving data may run as long as it needs. The
    /// request's own timeout bounds a whole `execute` call, and only the
    /// wait for response headers of a `download_stream` call.
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .read_timeout(timeout)
            .connect_timeout(CONNECT_TIMEOUT)
            .pool_max_idle_per_host(10)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| BridgeError::NotAvailable(format!("HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    /// Create a new HTTP client with custom configuration
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Convert bridge HttpMethod to reqwest Method
    fn convert_method(method: HttpMethod) -> reqwest::Method {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
            HttpMethod::Head => reqwest::Method::HEAD,
        }
    }

    /// Build reqwest request from bridge request, without its timeout
    fn build_request(&self, request: HttpRequest) -> reqwest::RequestBuilder {
        let method = Self::convert_method(request.method);
        let mut req = self.client.request(method, &request.url);

        for (key, value) in request.headers {
            req = req.header(key, value);
        }

        if let Some(body) = request.body {
            req = req.body(body);
        }

        req
    }

    /// Map a transport failure to a bridge error
    fn map_transport_error(e: reqwest::Error) -> BridgeError {
        if e.is_timeout() {
            BridgeError::Network("Request timed out".to_string())
        } else if e.is_connect() {
            BridgeError::Network(format!("Connection failed: {}", e))
        } else {
            BridgeError::Network(e.to_string())
        }
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        debug!(method = ?request.method, url = %request.url, "Executing HTTP request");

        let timeout = request.timeout;
        let mut builder = self.build_request(request);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await.map_err(|e| {
            warn!(error = %e, "HTTP request failed");
            Self::map_transport_error(e)
        })?;

        let status = response.status().as_u16();
        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|s| (k.to_string(), s.to_string())))
            .collect();

        let body = response.bytes().await.map_err(Self::map_transport_error)?;

        debug!(status, bytes = body.len(), "HTTP response received");
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }

    async fn download_stream(&self, request: HttpRequest) -> Result<Box<DynAsyncRead>> {
        debug!(url = %request.url, "Opening download stream");

        let timeout = request.timeout;
        let send = self.build_request(request).send();
        let response = match timeout {
            Some(limit) => tokio::time::timeout(limit, send)
                .await
                .map_err(|_| BridgeError::Network("Request timed out".to_string()))?,
            None => send.await,
        }
        .map_err(Self::map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(BridgeError::Http {
                status: status.as_u16(),
                message,
            });
        }

        let stream = response.bytes_stream().map_err(std::io::Error::other);
        let reader = tokio_util::io::StreamReader::new(stream);

        Ok(Box::new(reader))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_http_client_creation() {
        assert!(ReqwestHttpClient::with_timeout(Duration::from_secs(5)).is_ok());
    }

    #[test]
    fn test_method_conversion() {
        assert_eq!(
            ReqwestHttpClient::convert_method(HttpMethod::Get),
            reqwest::Method::GET
        );
        assert_eq!(
            ReqwestHttpClient::convert_method(HttpMethod::Delete),
            reqwest::Method::DELETE
        );
    }

    /// Serve one response whose body arrives a byte at a time
    async fn drip_server(body: &'static [u8], gap: Duration) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;

            let head = format!(
                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            );
            socket.write_all(head.as_bytes()).await.unwrap();
            for byte in body {
                tokio::time::sleep(gap).await;
                socket.write_all(&[*byte]).await.unwrap();
                socket.flush().await.unwrap();
            }
        });

        format!("http://{}/file", addr)
    }

    #[tokio::test]
    async fn test_stream_outlives_request_timeout() {
        let url = drip_server(b"0123456789", Duration::from_millis(150)).await;
        let client = ReqwestHttpClient::with_timeout(Duration::from_millis(500)).unwrap();
        let request =
            HttpRequest::new(HttpMethod::Get, url).timeout(Duration::from_millis(500));

        let mut reader = client.download_stream(request).await.unwrap();
        let mut body = Vec::new();
        reader.read_to_end(&mut body).await.unwrap();

        assert_eq!(body, b"0123456789");
    }

    #[tokio::test]
    async fn test_execute_keeps_total_timeout() {
        let url = drip_server(b"0123456789", Duration::from_millis(150)).await;
        let client = ReqwestHttpClient::with_timeout(Duration::from_secs(5)).unwrap();
        let request =
            HttpRequest::new(HttpMethod::Get, url).timeout(Duration::from_millis(500));

        let err = client.execute(request).await.unwrap_err();
        assert!(matches!(err, BridgeError::Network(_)));
    }

    #[tokio::test]
    async fn test_build_request_carries_headers() {
        let client = ReqwestHttpClient::new().unwrap();
        let request = HttpRequest::new(HttpMethod::Get, "https://example.com/files")
            .bearer_token("token")
            .header("X-Goog-Drive-Resource-Keys", "abc/key");

        let built = client.build_request(request).build().unwrap();
        assert_eq!(built.method(), reqwest::Method::GET);
        assert_eq!(
            built.headers().get("Authorization").unwrap(),
            "Bearer token"
        );
        assert_eq!(
            built.headers().get("X-Goog-Drive-Resource-Keys").unwrap(),
            "abc/key"
        );
    }
}
