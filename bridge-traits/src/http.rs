//! HTTP Client Abstraction
//!
//! Provides async HTTP operations for the networking core: single-shot
//! execution, streamed uploads and streamed downloads. Retry is deliberately
//! absent from this contract; callers that need it drive [`RetryPolicy`]
//! themselves.

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::stream::{self, Stream, StreamExt};
use rand::Rng;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fmt;
use std::pin::Pin;
use std::time::Duration;

use crate::error::{BridgeError, Result};

/// Boxed stream of body chunks used for streamed uploads and downloads.
pub type ByteStream = Pin<Box<dyn Stream<Item = std::io::Result<Bytes>> + Send>>;

/// HTTP method types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully constructed HTTP request.
///
/// Values are built fresh for every call and handed to an [`HttpClient`] by
/// value; nothing in the core mutates a request after it has been built.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub body: Option<Bytes>,
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HashMap::new(),
            body: None,
            timeout: None,
        }
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn body(mut self, body: Bytes) -> Self {
        self.body = Some(body);
        self
    }

    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    /// Look up a header value, ignoring ASCII case of the name.
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// HTTP response
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Bytes,
}

impl HttpResponse {
    /// Parse response body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(|e| {
            BridgeError::OperationFailed(format!("JSON deserialization failed: {}", e))
        })
    }

    /// Get response body as UTF-8 string
    pub fn text(&self) -> Result<String> {
        String::from_utf8(self.body.to_vec())
            .map_err(|e| BridgeError::OperationFailed(format!("Invalid UTF-8: {}", e)))
    }

    /// Check if response status is successful (2xx)
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Check if response status indicates a client error (4xx)
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status)
    }

    /// Check if response status indicates a server error (5xx)
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status)
    }
}

/// Response head plus a streaming body, returned by
/// [`HttpClient::download_stream`].
pub struct DownloadResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    /// Value of `Content-Length` when the server sent one.
    pub content_length: Option<u64>,
    pub body: ByteStream,
}

impl fmt::Debug for DownloadResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownloadResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

impl DownloadResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Drain the body into memory. Used for error bodies, which are small.
    pub async fn into_bytes(self) -> Result<Bytes> {
        let mut body = self.body;
        let mut buffer = BytesMut::new();
        while let Some(chunk) = body.next().await {
            buffer.extend_from_slice(&chunk?);
        }
        Ok(buffer.freeze())
    }
}

/// Backoff configuration for transfer retries.
///
/// `delay(attempt)` is zero for `attempt == 0` and otherwise
/// `base_delay * 2^(attempt - 1) * (1 + jitter)` with jitter drawn uniformly
/// from `[0, 0.2]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of retries after the initial attempt
    pub max_retries: u32,
    /// Delay before the first retry
    pub base_delay: Duration,
}

/// Upper bound on the jitter factor applied by [`RetryPolicy::delay`].
pub const MAX_RETRY_JITTER: f64 = 0.2;

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// A policy that never retries.
    pub fn none() -> Self {
        Self::new(0, Duration::ZERO)
    }

    /// Backoff to wait before retry number `attempt` (1-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let jitter = rand::thread_rng().gen_range(0.0..=MAX_RETRY_JITTER);
        let exponent = (attempt - 1).min(30) as i32;
        self.base_delay
            .mul_f64(2f64.powi(exponent) * (1.0 + jitter))
    }

    /// Whether another attempt is allowed after `attempts_so_far` retries.
    pub fn allows_retry(&self, attempts_so_far: u32) -> bool {
        attempts_so_far < self.max_retries
    }
}

/// Async HTTP client trait
///
/// This trait abstracts HTTP operations to allow platform-specific
/// implementations. Implementations execute each call exactly once:
/// - no implicit retry
/// - no token injection (requests arrive fully built)
/// - transport failures map to [`BridgeError`], HTTP error statuses do not
///
/// # Example
///
/// ```ignore
/// use bridge_traits::http::{HttpClient, HttpRequest, HttpMethod};
///
/// async fn fetch_data(client: &dyn HttpClient) -> Result<String> {
///     let request = HttpRequest::new(HttpMethod::Get, "https://api.example.com/data");
///     let response = client.execute(request).await?;
///     response.text()
/// }
/// ```
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Execute an HTTP request
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Network connection fails
    /// - TLS validation fails
    /// - Request times out
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;

    /// Send `request` with a body pulled from `body` chunk by chunk.
    ///
    /// Any `body` already set on `request` is ignored. The default
    /// implementation buffers the stream and delegates to [`execute`].
    ///
    /// [`execute`]: HttpClient::execute
    async fn upload_stream(
        &self,
        request: HttpRequest,
        mut body: ByteStream,
        content_length: u64,
    ) -> Result<HttpResponse> {
        let mut buffer = BytesMut::with_capacity(content_length as usize);
        while let Some(chunk) = body.next().await {
            buffer.extend_from_slice(&chunk?);
        }
        self.execute(request.body(buffer.freeze())).await
    }

    /// Execute `request` and return the response body as a stream.
    ///
    /// This is useful for large files that should not be loaded entirely into
    /// memory. The default implementation executes the request and exposes the
    /// buffered body as a single chunk.
    async fn download_stream(&self, request: HttpRequest) -> Result<DownloadResponse> {
        let response = self.execute(request).await?;
        let content_length = Some(response.body.len() as u64);
        let body: ByteStream = Box::pin(stream::once(async move { Ok(response.body) }));
        Ok(DownloadResponse {
            status: response.status,
            headers: response.headers,
            content_length,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_http_request_builder() {
        let request = HttpRequest::new(HttpMethod::Get, "https://example.com")
            .header("User-Agent", "test")
            .header("Authorization", "Basic secret")
            .timeout(Duration::from_secs(30));

        assert_eq!(request.url, "https://example.com");
        assert_eq!(request.headers.get("User-Agent"), Some(&"test".to_string()));
        assert_eq!(request.header_value("authorization"), Some("Basic secret"));
        assert_eq!(request.timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_http_response_status_checks() {
        let response = HttpResponse {
            status: 200,
            headers: HashMap::new(),
            body: Bytes::from("test"),
        };

        assert!(response.is_success());
        assert!(!response.is_client_error());
        assert!(!response.is_server_error());

        let response = HttpResponse {
            status: 503,
            headers: HashMap::new(),
            body: Bytes::new(),
        };
        assert!(response.is_server_error());
    }

    #[test]
    fn test_retry_delay_zero_for_first_attempt() {
        let policy = RetryPolicy::new(3, Duration::from_millis(500));
        assert_eq!(policy.delay(0), Duration::ZERO);
    }

    #[test]
    fn test_retry_delay_bounds() {
        let policy = RetryPolicy::new(5, Duration::from_millis(100));
        for attempt in 1..=5u32 {
            let floor = Duration::from_millis(100) * 2u32.pow(attempt - 1);
            let ceiling = floor.mul_f64(1.0 + MAX_RETRY_JITTER);
            for _ in 0..50 {
                let delay = policy.delay(attempt);
                assert!(delay >= floor, "attempt {attempt}: {delay:?} < {floor:?}");
                assert!(delay <= ceiling, "attempt {attempt}: {delay:?} > {ceiling:?}");
            }
        }
    }

    #[test]
    fn test_retry_allowance() {
        let policy = RetryPolicy::new(2, Duration::from_millis(10));
        assert!(policy.allows_retry(0));
        assert!(policy.allows_retry(1));
        assert!(!policy.allows_retry(2));
        assert!(!RetryPolicy::none().allows_retry(0));
    }

    struct RecordingClient {
        seen: Mutex<Vec<HttpRequest>>,
    }

    #[async_trait]
    impl HttpClient for RecordingClient {
        async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
            self.seen.lock().unwrap().push(request);
            Ok(HttpResponse {
                status: 200,
                headers: HashMap::new(),
                body: Bytes::from_static(b"payload"),
            })
        }
    }

    #[tokio::test]
    async fn test_default_upload_buffers_stream() {
        let client = RecordingClient {
            seen: Mutex::new(Vec::new()),
        };
        let chunks: Vec<std::io::Result<Bytes>> =
            vec![Ok(Bytes::from_static(b"hel")), Ok(Bytes::from_static(b"lo"))];
        let body: ByteStream = Box::pin(stream::iter(chunks));

        let request = HttpRequest::new(HttpMethod::Post, "https://example.com/upload");
        client.upload_stream(request, body, 5).await.unwrap();

        let seen = client.seen.lock().unwrap();
        assert_eq!(seen[0].body.as_deref(), Some(&b"hello"[..]));
    }

    #[tokio::test]
    async fn test_default_download_exposes_single_chunk() {
        let client = RecordingClient {
            seen: Mutex::new(Vec::new()),
        };
        let request = HttpRequest::new(HttpMethod::Get, "https://example.com/file");
        let response = client.download_stream(request).await.unwrap();

        assert!(response.is_success());
        assert_eq!(response.content_length, Some(7));
        assert_eq!(response.into_bytes().await.unwrap(), Bytes::from_static(b"payload"));
    }
}
