//! The HTTP seam under the gateway.

use reqwest::cookie::Jar;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

pub use reqwest::{Method, StatusCode};

/// Per-request timeout of [`HttpTransport`].
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// An outbound API call, before or after the bearer header is attached.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the API base, starting with `/`
    pub path: String,
    pub body: Option<serde_json::Value>,
    pub bearer: Option<String>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            bearer: None,
        }
    }
}

/// Status and body of a completed exchange.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,
    #[error("{0}")]
    Connection(String),
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout
        } else {
            TransportError::Connection(e.to_string())
        }
    }
}

/// Sends requests. Cookies are the transport's business: the refresh
/// cookie is attached and stored the way a browser would, invisible to the
/// gateway.
pub trait Transport: Send + Sync {
    fn send(
        &self,
        request: &ApiRequest,
    ) -> impl Future<Output = Result<RawResponse, TransportError>> + Send;
}

/// reqwest-backed transport with a browser-like cookie jar.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base: String,
}

impl HttpTransport {
    /// Transport with its own cookie jar.
    pub fn new(base_url: &str) -> Result<Self, TransportError> {
        Self::with_jar(base_url, Arc::new(Jar::default()))
    }

    /// Transport sharing `jar` with others, like browser tabs sharing
    /// cookies while each keeps its own access token.
    pub fn with_jar(base_url: &str, jar: Arc<Jar>) -> Result<Self, TransportError> {
        let url = Url::parse(base_url).map_err(|e| TransportError::InvalidBaseUrl(e.to_string()))?;
        let client = reqwest::Client::builder()
            .cookie_provider(jar)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base: url.as_str().trim_end_matches('/').to_string(),
        })
    }
}

impl Transport for HttpTransport {
    async fn send(&self, request: &ApiRequest) -> Result<RawResponse, TransportError> {
        let url = format!("{}{}", self.base, request.path);
        let mut builder = self.client.request(request.method.clone(), url);
        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.bytes().await?.to_vec();

        Ok(RawResponse { status, body })
    }
}
