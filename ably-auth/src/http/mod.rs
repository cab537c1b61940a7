// HTTP plumbing consumed by the auth engine
// The engine only needs "perform this request"; the reqwest transport is the
// production implementation and tests substitute their own.

use crate::error::{AblyError, AblyResult, ErrorInfo};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

pub use self::config::{HttpConfig, HttpConfigBuilder};

pub mod config;

/// HTTP methods supported by Ably REST API
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
        }
    }
}

/// A request ready to hand to a [`Transport`]
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    /// Absolute URL, or a path relative to the REST host
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub query: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, url)
    }

    /// Add a header to the request
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    /// Add a single query parameter
    pub fn query_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Set JSON body
    pub fn json<T: Serialize>(mut self, body: &T) -> AblyResult<Self> {
        let json = serde_json::to_vec(body)
            .map_err(|e| AblyError::protocol(format!("Failed to encode JSON body: {}", e)))?;
        self.body = Some(json);
        Ok(self.header("Content-Type", "application/json"))
    }

    /// Set a form-encoded body
    pub fn form(mut self, fields: &[(String, String)]) -> AblyResult<Self> {
        let encoded = serde_urlencoded::to_string(fields)
            .map_err(|e| AblyError::protocol(format!("Failed to encode form body: {}", e)))?;
        self.body = Some(encoded.into_bytes());
        Ok(self.header("Content-Type", "application/x-www-form-urlencoded"))
    }

    /// First header value with this name, compared case-insensitively
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Replace any existing header with this name
    pub fn set_header(&mut self, key: &str, value: impl Into<String>) {
        self.headers.retain(|(existing, _)| !existing.eq_ignore_ascii_case(key));
        self.headers.push((key.to_string(), value.into()));
    }
}

/// Fully buffered HTTP response
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, headers: Vec<(String, String)>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Get a response header, compared case-insensitively
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Media type without parameters, lowercased
    pub fn content_type(&self) -> Option<String> {
        self.header("content-type").map(|value| {
            value
                .split(';')
                .next()
                .unwrap_or_default()
                .trim()
                .to_ascii_lowercase()
        })
    }

    /// Parse response as JSON
    pub fn json<T: DeserializeOwned>(&self) -> AblyResult<T> {
        serde_json::from_slice(&self.body)
            .map_err(|e| AblyError::protocol(format!("Failed to parse JSON: {}", e)))
    }

    /// Get response as text
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// The Ably error carried by the body, if any
    pub fn error_info(&self) -> Option<ErrorInfo> {
        ErrorInfo::from_body(&self.body)
    }

    /// Some(error) when the server rejected the request's token as expired
    /// or invalid, which is the signal to renew and retry once.
    pub fn token_rejection(&self) -> Option<ErrorInfo> {
        if self.status != 401 {
            return None;
        }
        self.error_info()
            .filter(|info| crate::error::ably_codes::is_token_error(info.code))
    }
}

/// The primitive the auth engine uses to talk to the network
#[async_trait]
pub trait Transport: Send + Sync {
    /// Whether REST requests travel over TLS
    fn is_tls(&self) -> bool;

    async fn execute(&self, request: HttpRequest) -> AblyResult<HttpResponse>;
}

/// reqwest-backed transport for the Ably REST API
pub struct ReqwestTransport {
    client: Client,
    base_url: String,
    tls: bool,
}

impl ReqwestTransport {
    /// Create new transport from configuration
    pub fn new(config: &HttpConfig) -> AblyResult<Self> {
        let mut builder = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host);
        if let Some(idle) = config.pool_idle_timeout {
            builder = builder.pool_idle_timeout(idle);
        }
        let client = builder
            .build()
            .map_err(|e| AblyError::network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url(),
            tls: config.tls,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn resolve_url(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else {
            format!("{}{}", self.base_url, url)
        }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    fn is_tls(&self) -> bool {
        self.tls
    }

    async fn execute(&self, request: HttpRequest) -> AblyResult<HttpResponse> {
        let url = self.resolve_url(&request.url);
        debug!(method = request.method.as_str(), url = %url, "Sending HTTP request");

        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(&url),
            HttpMethod::Post => self.client.post(&url),
            HttpMethod::Put => self.client.put(&url),
            HttpMethod::Delete => self.client.delete(&url),
            HttpMethod::Patch => self.client.patch(&url),
        };

        for (key, value) in &request.headers {
            builder = builder.header(key.as_str(), value.as_str());
        }

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }

        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                AblyError::timeout(format!("Request timeout: {}", e))
            } else if e.is_connect() {
                AblyError::network(format!("Connection failed: {}", e))
            } else {
                AblyError::network(format!("Network error: {}", e))
            }
        })?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let body = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                AblyError::timeout(format!("Response timeout: {}", e))
            } else {
                AblyError::network(format!("Failed to read response: {}", e))
            }
        })?;

        debug!(status, bytes = body.len(), "Received HTTP response");
        Ok(HttpResponse::new(status, headers, body.to_vec()))
    }
}
