// HTTP client configuration

use std::time::Duration;

pub const DEFAULT_REST_HOST: &str = "rest.ably.io";
pub const DEFAULT_PORT: u16 = 80;
pub const DEFAULT_TLS_PORT: u16 = 443;

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Use TLS for REST requests
    pub tls: bool,
    /// REST host name
    pub rest_host: String,
    /// Port used when `tls` is false
    pub port: u16,
    /// Port used when `tls` is true
    pub tls_port: u16,
    /// Request timeout
    pub timeout: Duration,
    /// Connection timeout
    pub connect_timeout: Duration,
    /// Pool idle timeout
    pub pool_idle_timeout: Option<Duration>,
    /// Maximum idle connections per host
    pub pool_max_idle_per_host: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            tls: true,
            rest_host: DEFAULT_REST_HOST.to_string(),
            port: DEFAULT_PORT,
            tls_port: DEFAULT_TLS_PORT,
            timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(5),
            pool_idle_timeout: Some(Duration::from_secs(90)),
            pool_max_idle_per_host: 32,
        }
    }
}

impl HttpConfig {
    /// Create a new configuration builder
    pub fn builder() -> HttpConfigBuilder {
        HttpConfigBuilder::default()
    }

    /// Base URL for REST requests, e.g. `https://rest.ably.io`
    pub fn base_url(&self) -> String {
        let (scheme, port, default_port) = if self.tls {
            ("https", self.tls_port, DEFAULT_TLS_PORT)
        } else {
            ("http", self.port, DEFAULT_PORT)
        };

        if port == default_port {
            format!("{}://{}", scheme, self.rest_host)
        } else {
            format!("{}://{}:{}", scheme, self.rest_host, port)
        }
    }
}

/// HTTP configuration builder
#[derive(Default)]
pub struct HttpConfigBuilder {
    tls: Option<bool>,
    rest_host: Option<String>,
    port: Option<u16>,
    tls_port: Option<u16>,
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    pool_idle_timeout: Option<Duration>,
    pool_max_idle_per_host: Option<usize>,
}

impl HttpConfigBuilder {
    /// Enable or disable TLS
    pub fn tls(mut self, tls: bool) -> Self {
        self.tls = Some(tls);
        self
    }

    /// Set the REST host
    pub fn rest_host(mut self, host: impl Into<String>) -> Self {
        self.rest_host = Some(host.into());
        self
    }

    /// Set the non-TLS port
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Set the TLS port
    pub fn tls_port(mut self, port: u16) -> Self {
        self.tls_port = Some(port);
        self
    }

    /// Set request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set connection timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Set pool idle timeout
    pub fn pool_idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.pool_idle_timeout = timeout;
        self
    }

    /// Set maximum idle connections per host
    pub fn pool_max_idle_per_host(mut self, max: usize) -> Self {
        self.pool_max_idle_per_host = Some(max);
        self
    }

    /// Build the configuration
    pub fn build(self) -> HttpConfig {
        let default = HttpConfig::default();
        HttpConfig {
            tls: self.tls.unwrap_or(default.tls),
            rest_host: self.rest_host.unwrap_or(default.rest_host),
            port: self.port.unwrap_or(default.port),
            tls_port: self.tls_port.unwrap_or(default.tls_port),
            timeout: self.timeout.unwrap_or(default.timeout),
            connect_timeout: self.connect_timeout.unwrap_or(default.connect_timeout),
            pool_idle_timeout: self.pool_idle_timeout.or(default.pool_idle_timeout),
            pool_max_idle_per_host: self
                .pool_max_idle_per_host
                .unwrap_or(default.pool_max_idle_per_host),
        }
    }
}
