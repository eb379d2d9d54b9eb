use std::collections::HashMap;
use std::fmt;
use std::io::Read;

use reqwest::blocking::Client;
use reqwest::header::HeaderMap;
use url::Url;

use crate::error::Result;

/// Configuration for the HTTP client
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// User agent string
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("ets-core/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Response header fields, keyed by lower-cased name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseHeaders {
    fields: HashMap<String, Vec<String>>,
}

impl ResponseHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one value for a header field.
    pub fn insert(&mut self, name: &str, value: impl Into<String>) {
        self.fields
            .entry(name.to_ascii_lowercase())
            .or_default()
            .push(value.into());
    }

    /// All values of a header field; lookup ignores case.
    pub fn get_all(&self, name: &str) -> &[String] {
        self.fields
            .get(&name.to_ascii_lowercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn first(&self, name: &str) -> Option<&str> {
        self.get_all(name).first().map(String::as_str)
    }

    pub fn content_types(&self) -> &[String] {
        self.get_all("content-type")
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<N: AsRef<str>, V: Into<String>> FromIterator<(N, V)> for ResponseHeaders {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut headers = ResponseHeaders::new();
        for (name, value) in iter {
            headers.insert(name.as_ref(), value);
        }
        headers
    }
}

impl From<&HeaderMap> for ResponseHeaders {
    fn from(map: &HeaderMap) -> Self {
        let mut headers = ResponseHeaders::new();
        for (name, value) in map {
            // Non-visible-ASCII values are kept lossily rather than dropped
            let text = match value.to_str() {
                Ok(text) => text.to_string(),
                Err(_) => String::from_utf8_lossy(value.as_bytes()).into_owned(),
            };
            headers.insert(name.as_str(), text);
        }
        headers
    }
}

/// One HTTP response with its body still unread
pub struct HttpResponse {
    pub status: u16,
    pub headers: ResponseHeaders,
    pub body: Box<dyn Read + Send>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

impl fmt::Debug for HttpResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

/// Issues a single blocking GET.
///
/// No timeout, retry or cancellation is applied; callers that need bounded
/// latency wrap the call with their own deadline.
pub trait HttpTransport: Send + Sync {
    fn get(&self, url: &Url) -> Result<HttpResponse>;
}

/// Blocking HTTP client backed by reqwest
#[derive(Debug, Clone)]
pub struct BlockingHttpClient {
    client: Client,
    config: HttpClientConfig,
}

impl BlockingHttpClient {
    /// Create a new blocking HTTP client with the given configuration
    pub fn new(config: HttpClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(None)
            .user_agent(&config.user_agent)
            .build()?;

        Ok(Self { client, config })
    }

    /// Get the underlying reqwest client (for advanced usage)
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Get the client configuration
    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }
}

impl HttpTransport for BlockingHttpClient {
    fn get(&self, url: &Url) -> Result<HttpResponse> {
        log::debug!("GET {}", url);
        let response = self.client.get(url.clone()).send()?;
        let status = response.status().as_u16();
        let headers = ResponseHeaders::from(response.headers());
        log::debug!("GET {} -> {}", url, status);

        Ok(HttpResponse {
            status,
            headers,
            body: Box::new(response),
        })
    }
}
