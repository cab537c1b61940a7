// Authentication options and the auth callback interface

use super::token::{TokenDetails, TokenParams, TokenRequest};
use crate::http::HttpMethod;
use crate::logging::{redact_key, redact_secret};
use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Error type an auth callback may fail with
pub type CallbackError = Box<dyn std::error::Error + Send + Sync>;

/// What an auth callback may hand back
#[derive(Debug, Clone)]
pub enum AuthCallbackResult {
    /// An opaque token string, used as is
    Token(String),
    /// A signed token request, exchanged for a token
    TokenRequest(TokenRequest),
    /// A token obtained by the callback itself
    TokenDetails(TokenDetails),
    /// JSON text of a token request or token details
    Serialized(String),
}

impl From<TokenRequest> for AuthCallbackResult {
    fn from(request: TokenRequest) -> Self {
        Self::TokenRequest(request)
    }
}

impl From<TokenDetails> for AuthCallbackResult {
    fn from(details: TokenDetails) -> Self {
        Self::TokenDetails(details)
    }
}

/// Application-supplied token source
///
/// Implemented for any `Fn(TokenParams) -> impl Future<Output = Result<..>>`,
/// so an async closure can be passed directly.
#[async_trait]
pub trait AuthCallback: Send + Sync {
    async fn get_token_request(
        &self,
        params: TokenParams,
    ) -> Result<AuthCallbackResult, CallbackError>;
}

#[async_trait]
impl<F, Fut> AuthCallback for F
where
    F: Fn(TokenParams) -> Fut + Send + Sync,
    Fut: Future<Output = Result<AuthCallbackResult, CallbackError>> + Send + 'static,
{
    async fn get_token_request(
        &self,
        params: TokenParams,
    ) -> Result<AuthCallbackResult, CallbackError> {
        (self)(params).await
    }
}

/// Authentication options, at client level or for a single call
///
/// Every field is optional so per-call options can be layered over the
/// client's with [`AuthOptions::merge`].
#[derive(Clone, Default)]
pub struct AuthOptions {
    /// `keyName:keySecret`
    pub key: Option<String>,
    pub client_id: Option<String>,
    /// Static token string
    pub token: Option<String>,
    /// Static token with known lifetime
    pub token_details: Option<TokenDetails>,
    /// Pre-signed token request, exchanged on first use
    pub token_request: Option<TokenRequest>,
    pub auth_callback: Option<Arc<dyn AuthCallback>>,
    pub auth_url: Option<String>,
    /// GET (default) or POST
    pub auth_method: Option<HttpMethod>,
    pub auth_headers: Option<Vec<(String, String)>>,
    pub auth_params: Option<Vec<(String, String)>>,
    /// Sign token requests with server time instead of the local clock
    pub query_time: Option<bool>,
    /// Use token auth even when a key alone would allow basic auth
    pub use_token_auth: Option<bool>,
}

impl AuthOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_token_details(mut self, details: TokenDetails) -> Self {
        self.token_details = Some(details);
        self
    }

    pub fn with_token_request(mut self, request: TokenRequest) -> Self {
        self.token_request = Some(request);
        self
    }

    pub fn with_auth_callback(mut self, callback: impl AuthCallback + 'static) -> Self {
        self.auth_callback = Some(Arc::new(callback));
        self
    }

    pub fn with_auth_url(mut self, url: impl Into<String>) -> Self {
        self.auth_url = Some(url.into());
        self
    }

    pub fn with_auth_method(mut self, method: HttpMethod) -> Self {
        self.auth_method = Some(method);
        self
    }

    pub fn with_auth_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.auth_headers
            .get_or_insert_with(Vec::new)
            .push((name.into(), value.into()));
        self
    }

    pub fn with_auth_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.auth_params
            .get_or_insert_with(Vec::new)
            .push((name.into(), value.into()));
        self
    }

    pub fn with_query_time(mut self, enabled: bool) -> Self {
        self.query_time = Some(enabled);
        self
    }

    pub fn with_use_token_auth(mut self, enabled: bool) -> Self {
        self.use_token_auth = Some(enabled);
        self
    }

    /// A static token, from either `token_details` or `token`
    pub fn static_token(&self) -> Option<TokenDetails> {
        self.token_details
            .clone()
            .or_else(|| self.token.as_ref().map(TokenDetails::from_token))
    }

    /// True if any option able to produce a token is set
    pub fn has_token_source(&self) -> bool {
        self.token.is_some()
            || self.token_details.is_some()
            || self.token_request.is_some()
            || self.auth_callback.is_some()
            || self.auth_url.is_some()
    }

    fn has_primary_source(&self) -> bool {
        self.key.is_some() || self.has_token_source()
    }

    pub fn query_time(&self) -> bool {
        self.query_time.unwrap_or(false)
    }

    pub fn use_token_auth(&self) -> bool {
        self.use_token_auth.unwrap_or(false)
    }

    /// Layer `self` (per call) over `base` (client level).
    ///
    /// If `self` names any credential source, its sources replace the
    /// client's wholesale, so a per-call key is never shadowed by a
    /// client-level callback. Remaining fields merge one by one.
    pub fn merge(&self, base: &AuthOptions) -> AuthOptions {
        let sources = if self.has_primary_source() { self } else { base };

        AuthOptions {
            key: sources.key.clone(),
            token: sources.token.clone(),
            token_details: sources.token_details.clone(),
            token_request: sources.token_request.clone(),
            auth_callback: sources.auth_callback.clone(),
            auth_url: sources.auth_url.clone(),
            client_id: self.client_id.clone().or_else(|| base.client_id.clone()),
            auth_method: self.auth_method.or(base.auth_method),
            auth_headers: self.auth_headers.clone().or_else(|| base.auth_headers.clone()),
            auth_params: self.auth_params.clone().or_else(|| base.auth_params.clone()),
            query_time: self.query_time.or(base.query_time),
            use_token_auth: self.use_token_auth.or(base.use_token_auth),
        }
    }
}

impl fmt::Debug for AuthOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthOptions")
            .field("key", &self.key.as_deref().map(redact_key))
            .field("client_id", &self.client_id)
            .field("token", &self.token.as_deref().map(redact_secret))
            .field("token_details", &self.token_details)
            .field("token_request", &self.token_request.is_some())
            .field("auth_callback", &self.auth_callback.is_some())
            .field("auth_url", &self.auth_url)
            .field("auth_method", &self.auth_method)
            .field("auth_headers", &self.auth_headers)
            .field("auth_params", &self.auth_params)
            .field("query_time", &self.query_time)
            .field("use_token_auth", &self.use_token_auth)
            .finish()
    }
}
