//! HTTP client abstraction for testability

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use thiserror::Error;

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// User-Agent sent with every request.
pub const USER_AGENT: &str = concat!("CO2Monitor/", env!("CARGO_PKG_VERSION"));

/// Boxed future type for dyn-compatible async methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Transport-level failure: the request never produced a response.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HttpError {
    /// Could not connect to the remote host.
    #[error("connection failed: {0}")]
    Connect(String),

    /// The request exceeded its timeout.
    #[error("request timed out: {0}")]
    Timeout(String),

    /// The URL could not be built.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// Any other transport failure (body read, TLS, ...).
    #[error("request failed: {0}")]
    Other(String),
}

/// A completed HTTP response, successful or not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Create a response.
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Shorthand for a 200 response.
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self::new(200, body)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Trait for async HTTP GET operations.
///
/// This abstraction allows for dependency injection and easier testing
/// by enabling mock HTTP clients in tests. Non-2xx statuses are returned as
/// responses, not errors, because the backend reports failures in its JSON
/// body.
pub trait HttpClient: Send + Sync {
    /// Performs an HTTP GET request for a fully-built URL.
    fn get(&self, url: &str) -> BoxFuture<'_, Result<HttpResponse, HttpError>>;
}

impl<T: HttpClient + ?Sized> HttpClient for std::sync::Arc<T> {
    fn get(&self, url: &str) -> BoxFuture<'_, Result<HttpResponse, HttpError>> {
        (**self).get(url)
    }
}

/// Real HTTP client implementation using reqwest.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    /// Creates a new ReqwestClient with default configuration.
    pub fn new() -> Result<Self, HttpError> {
        Self::with_timeout(DEFAULT_TIMEOUT_SECS)
    }

    /// Creates a new ReqwestClient with custom timeout.
    pub fn with_timeout(timeout_secs: u64) -> Result<Self, HttpError> {
        Self::with_options(timeout_secs, USER_AGENT)
    }

    /// Creates a new ReqwestClient with custom timeout and User-Agent.
    pub fn with_options(timeout_secs: u64, user_agent: &str) -> Result<Self, HttpError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(user_agent)
            .build()
            .map_err(|e| HttpError::Other(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

fn map_reqwest_error(e: reqwest::Error) -> HttpError {
    if e.is_timeout() {
        HttpError::Timeout(e.to_string())
    } else if e.is_connect() {
        HttpError::Connect(e.to_string())
    } else if e.is_builder() {
        HttpError::InvalidUrl(e.to_string())
    } else {
        HttpError::Other(e.to_string())
    }
}

impl HttpClient for ReqwestClient {
    fn get(&self, url: &str) -> BoxFuture<'_, Result<HttpResponse, HttpError>> {
        let request = self.client.get(url);
        Box::pin(async move {
            let response = request.send().await.map_err(map_reqwest_error)?;
            let status = response.status().as_u16();
            let body = response.bytes().await.map_err(map_reqwest_error)?;
            Ok(HttpResponse::new(status, body.to_vec()))
        })
    }
}

/// Build a URL from a base and query parameters, percent-encoding values.
pub fn build_url(base: &str, params: &[(&str, String)]) -> Result<String, HttpError> {
    let url = if params.is_empty() {
        reqwest::Url::parse(base)
    } else {
        reqwest::Url::parse_with_params(base, params.iter().map(|(k, v)| (*k, v.as_str())))
    };
    url.map(String::from)
        .map_err(|e| HttpError::InvalidUrl(format!("{}: {}", base, e)))
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Mock HTTP client for testing.
    ///
    /// Routes are matched by URL prefix; the longest matching prefix wins.
    /// Every requested URL is recorded.
    #[derive(Default)]
    pub struct MockHttpClient {
        routes: Mutex<HashMap<String, Result<HttpResponse, HttpError>>>,
        pub requests: Mutex<Vec<String>>,
    }

    impl MockHttpClient {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn route(self, prefix: &str, response: Result<HttpResponse, HttpError>) -> Self {
            self.routes
                .lock()
                .unwrap()
                .insert(prefix.to_string(), response);
            self
        }

        pub fn json(self, prefix: &str, body: &str) -> Self {
            self.route(prefix, Ok(HttpResponse::ok(body)))
        }

        pub fn requested(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }
    }

    impl HttpClient for MockHttpClient {
        fn get(&self, url: &str) -> BoxFuture<'_, Result<HttpResponse, HttpError>> {
            self.requests.lock().unwrap().push(url.to_string());
            let routes = self.routes.lock().unwrap();
            let response = routes
                .iter()
                .filter(|(prefix, _)| url.starts_with(prefix.as_str()))
                .max_by_key(|(prefix, _)| prefix.len())
                .map(|(_, response)| response.clone())
                .unwrap_or_else(|| Ok(HttpResponse::new(404, "{}")));
            Box::pin(async move { response })
        }
    }

    #[tokio::test]
    async fn test_mock_client_longest_prefix_wins() {
        let mock = MockHttpClient::new()
            .json("http://api/co2", "short")
            .json("http://api/co2/custom", "long");

        let response = mock.get("http://api/co2/custom?lat=1").await.unwrap();
        assert_eq!(response.body, b"long".to_vec());
        assert_eq!(mock.requested(), vec!["http://api/co2/custom?lat=1"]);
    }

    #[tokio::test]
    async fn test_mock_client_unrouted_is_404() {
        let mock = MockHttpClient::new();
        let response = mock.get("http://nowhere").await.unwrap();
        assert_eq!(response.status, 404);
        assert!(!response.is_success());
    }

    #[test]
    fn test_build_url_encodes_params() {
        let url = build_url(
            "http://localhost:5000/api/search/cities",
            &[("q", "São Paulo".to_string()), ("limit", "5".to_string())],
        )
        .unwrap();
        assert_eq!(
            url,
            "http://localhost:5000/api/search/cities?q=S%C3%A3o+Paulo&limit=5"
        );
    }

    #[test]
    fn test_build_url_rejects_garbage() {
        assert!(matches!(
            build_url("not a url", &[]),
            Err(HttpError::InvalidUrl(_))
        ));
    }
}
