// Authentication and token lifecycle

pub mod authenticator;
pub mod cache;
pub mod clock;
pub mod key;
pub mod options;
pub mod resolver;
pub mod signer;
pub mod strategy;
pub mod token;

pub use authenticator::{AuthenticatedRequest, Credential, RequestAuthenticator};
pub use cache::{TokenCache, TokenState};
pub use clock::{Clock, ManualClock, SystemClock};
pub use key::ApiKey;
pub use options::{AuthCallback, AuthCallbackResult, AuthOptions, CallbackError};
pub use resolver::resolve_auth_method;
pub use signer::TokenRequestSigner;
pub use strategy::{Acquired, TokenSource};
pub use token::{TokenDetails, TokenParams, TokenRequest, DEFAULT_CAPABILITY, DEFAULT_TTL};

use crate::error::{AblyError, AblyResult};
use crate::http::Transport;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use strategy::{AcquireContext, Obtained};
use tracing::{debug, info};

/// How requests are authenticated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
    /// `Authorization: Basic` with the API key
    Basic,
    /// `Authorization: Bearer` with a token
    Token,
}

/// Options and params renewals are made with; replaced by `authorize`
struct Settings {
    options: AuthOptions,
    default_params: TokenParams,
    source: TokenSource,
    method: AuthMethod,
}

/// Per-client authentication state.
///
/// Owns the token cache and the signer. Tokens are acquired lazily: the
/// first request in token mode triggers the first acquisition.
pub struct Auth {
    settings: RwLock<Settings>,
    transport: Arc<dyn Transport>,
    signer: TokenRequestSigner,
    cache: TokenCache,
    /// Pre-signed request from the client options, exchanged once
    pending_request: Mutex<Option<TokenRequest>>,
}

impl Auth {
    pub fn new(
        options: AuthOptions,
        default_params: TokenParams,
        transport: Arc<dyn Transport>,
    ) -> AblyResult<Self> {
        Self::with_clock(options, default_params, transport, Arc::new(SystemClock))
    }

    pub fn with_clock(
        options: AuthOptions,
        default_params: TokenParams,
        transport: Arc<dyn Transport>,
        clock: Arc<dyn Clock>,
    ) -> AblyResult<Self> {
        let method = resolve_auth_method(&options)?;
        let source = TokenSource::select(&options)?;

        let cache = TokenCache::new(clock.clone());
        if let Some(details) = options.static_token() {
            cache.seed(details, None);
        }

        info!(
            ?method,
            source = source.name(),
            client_id = ?options.client_id,
            "Auth initialised"
        );

        Ok(Self {
            pending_request: Mutex::new(options.token_request.clone()),
            settings: RwLock::new(Settings {
                options,
                default_params,
                source,
                method,
            }),
            transport,
            signer: TokenRequestSigner::new(clock),
            cache,
        })
    }

    pub fn auth_method(&self) -> AuthMethod {
        self.settings.read().method
    }

    /// The configured client id, or the one bound to the current token
    pub fn client_id(&self) -> Option<String> {
        self.settings
            .read()
            .options
            .client_id
            .clone()
            .or_else(|| self.cache.current().and_then(|token| token.client_id.clone()))
    }

    /// A copy of the client-level options in effect
    pub fn options(&self) -> AuthOptions {
        self.settings.read().options.clone()
    }

    /// The cached token, if any
    pub fn token_details(&self) -> Option<Arc<TokenDetails>> {
        self.cache.current()
    }

    pub fn token_state(&self) -> TokenState {
        self.cache.state()
    }

    /// Create a signed token request without contacting the issuing
    /// endpoint (except for `/time` when `query_time` is on).
    ///
    /// A key in `options` replaces the client's key; `params` take
    /// precedence over the client's default token params.
    pub async fn create_token_request(
        &self,
        params: Option<TokenParams>,
        options: Option<AuthOptions>,
    ) -> AblyResult<TokenRequest> {
        let options = self.effective_options(options.as_ref());
        let params = self.effective_params(params.as_ref(), &options);

        let key = options
            .key
            .as_deref()
            .ok_or_else(|| AblyError::signing("No key specified: unable to sign a token request"))?;
        let key = ApiKey::parse(key)?;

        self.signer
            .sign(&key, &params, options.query_time(), self.transport.as_ref())
            .await
    }

    /// Obtain a new token through the strategy the merged options select.
    ///
    /// The cache is left untouched.
    pub async fn request_token(
        &self,
        params: Option<TokenParams>,
        options: Option<AuthOptions>,
    ) -> AblyResult<TokenDetails> {
        let merged = self.effective_options(options.as_ref());
        let params = self.effective_params(params.as_ref(), &merged);

        // Only a request handed in for this call is exchanged; the client's
        // pre-signed request belongs to the cache's first acquisition.
        if let Some(request) = options.and_then(|o| o.token_request) {
            let acquired =
                strategy::resolve(Obtained::Request(request), &params, self.transport.as_ref())
                    .await?;
            return Ok(acquired.details);
        }

        let source = TokenSource::select(&merged)?;
        let acquired = self
            .acquire_with(&source, &params, merged.query_time())
            .await?;
        Ok(acquired.details)
    }

    /// Force a new token and install it in the cache.
    ///
    /// The merged params and options become the ones later renewals use,
    /// and the client switches to token auth.
    pub async fn authorize(
        &self,
        params: Option<TokenParams>,
        options: Option<AuthOptions>,
    ) -> AblyResult<Arc<TokenDetails>> {
        let merged = self.effective_options(options.as_ref());
        let default_params = {
            let defaults = self.settings.read().default_params.clone();
            match params {
                Some(params) => params.merge(&defaults),
                None => defaults,
            }
        };
        let source = TokenSource::select(&merged)?;
        // The client's pre-signed request predates these params
        self.pending_request.lock().take();

        let call_options = options.unwrap_or_default();
        let token = if let Some(request) = call_options.token_request.clone() {
            let params = self.params_with(&default_params, None, &merged);
            self.cache
                .get_token(true, || {
                    strategy::resolve(Obtained::Request(request), &params, self.transport.as_ref())
                })
                .await?
        } else if let (false, Some(details)) = (source.can_renew(), call_options.static_token()) {
            self.cache.seed(details, None)
        } else {
            let params = self.params_with(&default_params, None, &merged);
            self.cache
                .get_token(true, || {
                    self.acquire_with(&source, &params, merged.query_time())
                })
                .await?
        };

        info!(source = source.name(), "Authorized with new token");
        let mut settings = self.settings.write();
        settings.options = merged;
        settings.default_params = default_params;
        settings.source = source;
        settings.method = AuthMethod::Token;
        Ok(token)
    }

    /// Drop the cached token; the next request in token mode acquires anew
    pub fn clear_token(&self) {
        self.cache.clear();
    }

    pub(crate) fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Key for basic auth, if the client has one
    pub(crate) fn basic_key(&self) -> AblyResult<ApiKey> {
        let settings = self.settings.read();
        match settings.options.key.as_deref() {
            Some(key) => ApiKey::parse(key),
            None => Err(AblyError::configuration(
                crate::error::AblyErrorCode::NoAuthOptions,
                "Basic auth requires a key",
            )),
        }
    }

    /// A valid token, acquiring one if the cache has none
    pub(crate) async fn get_token(&self) -> AblyResult<Arc<TokenDetails>> {
        self.cache
            .get_token(false, || self.acquire_for_cache())
            .await
    }

    /// Replace a token the server rejected
    pub(crate) async fn renew_after_rejection(
        &self,
        stale: &Arc<TokenDetails>,
    ) -> AblyResult<Arc<TokenDetails>> {
        self.cache
            .renew_after_rejection(stale, || self.acquire_for_cache())
            .await
    }

    fn effective_options(&self, options: Option<&AuthOptions>) -> AuthOptions {
        let settings = self.settings.read();
        match options {
            Some(options) => options.merge(&settings.options),
            None => settings.options.clone(),
        }
    }

    /// Per-call params over default params over the options' client id
    fn effective_params(&self, params: Option<&TokenParams>, options: &AuthOptions) -> TokenParams {
        let defaults = self.settings.read().default_params.clone();
        self.params_with(&defaults, params, options)
    }

    fn params_with(
        &self,
        defaults: &TokenParams,
        params: Option<&TokenParams>,
        options: &AuthOptions,
    ) -> TokenParams {
        let mut defaults = defaults.clone();
        if defaults.client_id.is_none() {
            defaults.client_id = options.client_id.clone();
        }
        match params {
            Some(params) => params.merge(&defaults),
            None => defaults,
        }
    }

    async fn acquire_for_cache(&self) -> AblyResult<Acquired> {
        let (source, params, query_time) = {
            let settings = self.settings.read();
            let params = self.params_with(&settings.default_params, None, &settings.options);
            (settings.source.clone(), params, settings.options.query_time())
        };

        let pending = self.pending_request.lock().take();
        if let Some(request) = pending {
            debug!("Exchanging pre-signed token request");
            return strategy::resolve(Obtained::Request(request), &params, self.transport.as_ref())
                .await;
        }

        self.acquire_with(&source, &params, query_time).await
    }

    async fn acquire_with(
        &self,
        source: &TokenSource,
        params: &TokenParams,
        query_time: bool,
    ) -> AblyResult<Acquired> {
        let ctx = AcquireContext {
            transport: self.transport.as_ref(),
            signer: &self.signer,
            query_time,
        };
        source.acquire(params, &ctx).await
    }
}

impl std::fmt::Debug for Auth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let settings = self.settings.read();
        f.debug_struct("Auth")
            .field("method", &settings.method)
            .field("source", &settings.source)
            .field("options", &settings.options)
            .field("token", &self.cache.current())
            .finish()
    }
}
