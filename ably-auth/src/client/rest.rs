// REST client: every request goes through the authenticator

use super::options::{ClientOptions, ClientOptionsBuilder};
use crate::auth::{Auth, AuthOptions, Clock, RequestAuthenticator, SystemClock, TokenParams};
use crate::error::{parse_ably_error, AblyError, AblyResult};
use crate::http::{HttpMethod, HttpRequest, HttpResponse, ReqwestTransport, Transport};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

/// REST client for the Ably API
#[derive(Debug)]
pub struct RestClient {
    options: ClientOptions,
    authenticator: RequestAuthenticator,
}

impl RestClient {
    /// Create a client authenticating with an API key
    pub fn new(api_key: impl Into<String>) -> AblyResult<Self> {
        Self::with_options(ClientOptions::builder().key(api_key).build())
    }

    /// Create a client over the reqwest transport
    pub fn with_options(options: ClientOptions) -> AblyResult<Self> {
        let transport = Arc::new(ReqwestTransport::new(&options.http)?);
        Self::with_transport(options, transport)
    }

    /// Create a client over a caller-supplied transport
    pub fn with_transport(options: ClientOptions, transport: Arc<dyn Transport>) -> AblyResult<Self> {
        Self::with_parts(options, transport, Arc::new(SystemClock))
    }

    pub fn with_parts(
        options: ClientOptions,
        transport: Arc<dyn Transport>,
        clock: Arc<dyn Clock>,
    ) -> AblyResult<Self> {
        let auth = Auth::with_clock(
            options.auth.clone(),
            options.default_token_params.clone(),
            transport,
            clock,
        )?;
        info!(base_url = %options.http.base_url(), "REST client created");

        Ok(Self {
            options,
            authenticator: RequestAuthenticator::new(Arc::new(auth)),
        })
    }

    pub fn builder() -> RestClientBuilder {
        RestClientBuilder::default()
    }

    pub fn auth(&self) -> &Arc<Auth> {
        self.authenticator.auth()
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Server time in milliseconds since the epoch
    pub async fn time(&self) -> AblyResult<i64> {
        let response = self.request(HttpMethod::Get, "/time", &[], None).await?;
        let times: Vec<i64> = response.json()?;
        times
            .first()
            .copied()
            .ok_or_else(|| AblyError::protocol("Empty time response"))
    }

    /// Perform an authenticated request against the REST API.
    ///
    /// Non-2xx responses are returned as errors parsed from the body.
    pub async fn request(
        &self,
        method: HttpMethod,
        path: &str,
        params: &[(String, String)],
        body: Option<Value>,
    ) -> AblyResult<HttpResponse> {
        let mut request = HttpRequest::new(method, path).header("Accept", "application/json");
        request.query = params.to_vec();
        if let Some(ref body) = body {
            request = request.json(body)?;
        }

        debug!(method = method.as_str(), path, "REST request");
        let response = self.authenticator.execute(request).await?;
        if !response.is_success() {
            return Err(parse_ably_error(response.status, &response.body));
        }
        Ok(response)
    }
}

/// Builder for [`RestClient`]
#[derive(Default)]
pub struct RestClientBuilder {
    options: ClientOptionsBuilder,
    transport: Option<Arc<dyn Transport>>,
    clock: Option<Arc<dyn Clock>>,
}

impl RestClientBuilder {
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.options = self.options.key(key);
        self
    }

    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.options = self.options.token(token);
        self
    }

    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.options = self.options.client_id(client_id);
        self
    }

    pub fn auth_options(mut self, options: AuthOptions) -> Self {
        self.options = self.options.auth_options(options);
        self
    }

    pub fn default_token_params(mut self, params: TokenParams) -> Self {
        self.options = self.options.default_token_params(params);
        self
    }

    /// Adjust the underlying [`ClientOptionsBuilder`]
    pub fn options(mut self, f: impl FnOnce(ClientOptionsBuilder) -> ClientOptionsBuilder) -> Self {
        self.options = f(self.options);
        self
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn build(self) -> AblyResult<RestClient> {
        let options = self.options.build();
        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new(&options.http)?),
        };
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        RestClient::with_parts(options, transport, clock)
    }
}
