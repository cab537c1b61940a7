// Client options and builder

use crate::auth::{AuthCallback, AuthOptions, TokenDetails, TokenParams, TokenRequest};
use crate::error::{AblyError, AblyErrorCode, AblyResult};
use crate::http::{HttpConfig, HttpMethod};
use std::time::Duration;

/// Everything a REST client is configured with
#[derive(Debug, Clone, Default)]
pub struct ClientOptions {
    pub auth: AuthOptions,
    /// Token params used for every acquisition unless overridden per call
    pub default_token_params: TokenParams,
    pub http: HttpConfig,
}

impl ClientOptions {
    pub fn builder() -> ClientOptionsBuilder {
        ClientOptionsBuilder::default()
    }

    /// Options from `ABLY_KEY`, `ABLY_CLIENT_ID` and `ABLY_REST_HOST`
    pub fn from_env() -> AblyResult<Self> {
        let key = std::env::var("ABLY_KEY").map_err(|_| {
            AblyError::configuration(AblyErrorCode::NoAuthOptions, "ABLY_KEY is not set")
        })?;

        let mut builder = Self::builder().key(key);
        if let Ok(client_id) = std::env::var("ABLY_CLIENT_ID") {
            builder = builder.client_id(client_id);
        }
        if let Ok(host) = std::env::var("ABLY_REST_HOST") {
            builder = builder.rest_host(host);
        }
        Ok(builder.build())
    }
}

/// Builder for [`ClientOptions`]
#[derive(Default)]
pub struct ClientOptionsBuilder {
    auth: AuthOptions,
    default_token_params: Option<TokenParams>,
    http: Option<HttpConfig>,
    tls: Option<bool>,
    rest_host: Option<String>,
    port: Option<u16>,
    tls_port: Option<u16>,
    timeout: Option<Duration>,
}

impl ClientOptionsBuilder {
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.auth.key = Some(key.into());
        self
    }

    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.auth.client_id = Some(client_id.into());
        self
    }

    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.auth.token = Some(token.into());
        self
    }

    pub fn token_details(mut self, details: TokenDetails) -> Self {
        self.auth.token_details = Some(details);
        self
    }

    pub fn token_request(mut self, request: TokenRequest) -> Self {
        self.auth.token_request = Some(request);
        self
    }

    pub fn auth_callback(mut self, callback: impl AuthCallback + 'static) -> Self {
        self.auth = self.auth.with_auth_callback(callback);
        self
    }

    pub fn auth_url(mut self, url: impl Into<String>) -> Self {
        self.auth.auth_url = Some(url.into());
        self
    }

    pub fn auth_method(mut self, method: HttpMethod) -> Self {
        self.auth.auth_method = Some(method);
        self
    }

    pub fn auth_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.auth = self.auth.with_auth_header(name, value);
        self
    }

    pub fn auth_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.auth = self.auth.with_auth_param(name, value);
        self
    }

    pub fn query_time(mut self, enabled: bool) -> Self {
        self.auth.query_time = Some(enabled);
        self
    }

    pub fn use_token_auth(mut self, enabled: bool) -> Self {
        self.auth.use_token_auth = Some(enabled);
        self
    }

    /// Replace all auth options at once
    pub fn auth_options(mut self, options: AuthOptions) -> Self {
        self.auth = options;
        self
    }

    pub fn default_token_params(mut self, params: TokenParams) -> Self {
        self.default_token_params = Some(params);
        self
    }

    /// Base HTTP configuration; individual settings below override it
    pub fn http_config(mut self, config: HttpConfig) -> Self {
        self.http = Some(config);
        self
    }

    pub fn tls(mut self, tls: bool) -> Self {
        self.tls = Some(tls);
        self
    }

    pub fn rest_host(mut self, host: impl Into<String>) -> Self {
        self.rest_host = Some(host.into());
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn tls_port(mut self, port: u16) -> Self {
        self.tls_port = Some(port);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn build(self) -> ClientOptions {
        let mut http = self.http.unwrap_or_default();
        if let Some(tls) = self.tls {
            http.tls = tls;
        }
        if let Some(host) = self.rest_host {
            http.rest_host = host;
        }
        if let Some(port) = self.port {
            http.port = port;
        }
        if let Some(port) = self.tls_port {
            http.tls_port = port;
        }
        if let Some(timeout) = self.timeout {
            http.timeout = timeout;
        }

        ClientOptions {
            auth: self.auth,
            default_token_params: self.default_token_params.unwrap_or_default(),
            http,
        }
    }
}
