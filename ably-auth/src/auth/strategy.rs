//! Token acquisition strategies.
//!
//! A [`TokenSource`] is chosen once from the options (callback, then authUrl,
//! then key) and dispatched with a plain `match`. Every strategy yields an
//! [`Obtained`]: either a token, or a token request that needs one more hop
//! to the token-issuing endpoint.

use super::key::ApiKey;
use super::options::{AuthCallback, AuthCallbackResult, AuthOptions};
use super::signer::TokenRequestSigner;
use super::token::{TokenDetails, TokenParams, TokenRequest};
use crate::error::{http_to_ably_code, AblyError, AblyErrorCode, AblyResult};
use crate::http::{HttpMethod, HttpRequest, HttpResponse, Transport};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Where tokens come from
#[derive(Clone)]
pub enum TokenSource {
    Callback(Arc<dyn AuthCallback>),
    AuthUrl(AuthUrl),
    /// Sign locally with the key, exchange at the issuing endpoint
    Local(ApiKey),
    /// A caller-supplied token; cannot be renewed
    StaticToken,
}

/// authUrl configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUrl {
    pub url: String,
    pub method: HttpMethod,
    pub headers: Vec<(String, String)>,
    pub params: Vec<(String, String)>,
}

/// Result of running a strategy
#[derive(Debug, Clone)]
pub enum Obtained {
    Details(TokenDetails),
    Request(TokenRequest),
}

/// A token ready for the cache
#[derive(Debug, Clone)]
pub struct Acquired {
    pub details: TokenDetails,
    /// Lifetime requested at issuance, used when the server omits `expires`
    pub ttl: Option<Duration>,
}

/// Collaborators a strategy may need
pub struct AcquireContext<'a> {
    pub transport: &'a dyn Transport,
    pub signer: &'a TokenRequestSigner,
    pub query_time: bool,
}

impl TokenSource {
    /// Pick the strategy for a set of options
    pub fn select(options: &AuthOptions) -> AblyResult<Self> {
        if let Some(ref callback) = options.auth_callback {
            return Ok(TokenSource::Callback(callback.clone()));
        }

        if let Some(ref url) = options.auth_url {
            return Ok(TokenSource::AuthUrl(AuthUrl {
                url: url.clone(),
                method: options.auth_method.unwrap_or(HttpMethod::Get),
                headers: options.auth_headers.clone().unwrap_or_default(),
                params: options.auth_params.clone().unwrap_or_default(),
            }));
        }

        if let Some(ref key) = options.key {
            return Ok(TokenSource::Local(ApiKey::parse(key)?));
        }

        Ok(TokenSource::StaticToken)
    }

    pub fn name(&self) -> &'static str {
        match self {
            TokenSource::Callback(_) => "callback",
            TokenSource::AuthUrl(_) => "authUrl",
            TokenSource::Local(_) => "local",
            TokenSource::StaticToken => "static",
        }
    }

    pub fn can_renew(&self) -> bool {
        !matches!(self, TokenSource::StaticToken)
    }

    /// Run the strategy, then exchange a token request if that is what it
    /// produced.
    pub async fn acquire(
        &self,
        params: &TokenParams,
        ctx: &AcquireContext<'_>,
    ) -> AblyResult<Acquired> {
        info!(source = self.name(), "Acquiring token");
        let obtained = self.obtain(params, ctx).await?;
        resolve(obtained, params, ctx.transport).await
    }

    pub async fn obtain(
        &self,
        params: &TokenParams,
        ctx: &AcquireContext<'_>,
    ) -> AblyResult<Obtained> {
        match self {
            TokenSource::Callback(callback) => obtain_from_callback(callback.as_ref(), params).await,
            TokenSource::AuthUrl(auth_url) => obtain_from_url(auth_url, params, ctx.transport).await,
            TokenSource::Local(key) => {
                let request = ctx
                    .signer
                    .sign(key, params, ctx.query_time, ctx.transport)
                    .await?;
                Ok(Obtained::Request(request))
            }
            TokenSource::StaticToken => Err(AblyError::configuration(
                AblyErrorCode::NoMeansToRenewToken,
                "Token expired or rejected and no key, authCallback or authUrl to renew it",
            )),
        }
    }
}

impl fmt::Debug for TokenSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenSource::Callback(_) => f.write_str("Callback"),
            TokenSource::AuthUrl(url) => f.debug_tuple("AuthUrl").field(&url.url).finish(),
            TokenSource::Local(key) => f.debug_tuple("Local").field(key).finish(),
            TokenSource::StaticToken => f.write_str("StaticToken"),
        }
    }
}

/// Turn an [`Obtained`] into a token, exchanging token requests
pub async fn resolve(
    obtained: Obtained,
    params: &TokenParams,
    transport: &dyn Transport,
) -> AblyResult<Acquired> {
    match obtained {
        Obtained::Details(details) => Ok(Acquired {
            details,
            ttl: params.ttl,
        }),
        Obtained::Request(request) => {
            let ttl = request.ttl.map(|ms| Duration::from_millis(ms.max(0) as u64));
            let details = submit_token_request(transport, &request).await?;
            Ok(Acquired { details, ttl })
        }
    }
}

/// Exchange a signed token request at `/keys/{keyName}/requestToken`
pub async fn submit_token_request(
    transport: &dyn Transport,
    request: &TokenRequest,
) -> AblyResult<TokenDetails> {
    let path = format!(
        "/keys/{}/requestToken",
        urlencoding::encode(&request.key_name)
    );
    debug!(path = %path, "Submitting token request");

    let response = transport
        .execute(HttpRequest::post(path).json(request)?)
        .await?;

    if !response.is_success() {
        let (code, message) = match response.error_info() {
            Some(info) => (
                info.code,
                info.message
                    .unwrap_or_else(|| "Token request rejected".to_string()),
            ),
            None => (
                http_to_ably_code(response.status).to_u32(),
                format!("Token request failed with status {}", response.status),
            ),
        };
        warn!(status = response.status, code, "Token request rejected");
        return Err(AblyError::remote_auth(
            response.status,
            code,
            message,
            Some(response.text()),
        ));
    }

    let details: TokenDetails = response.json()?;
    if details.token.is_empty() {
        return Err(AblyError::protocol("Token-issuing endpoint returned an empty token"));
    }
    Ok(details)
}

async fn obtain_from_callback(
    callback: &dyn AuthCallback,
    params: &TokenParams,
) -> AblyResult<Obtained> {
    let result = callback
        .get_token_request(params.clone())
        .await
        .map_err(|e| {
            warn!(error = %e, "Auth callback failed");
            AblyError::callback(e)
        })?;

    match result {
        AuthCallbackResult::Token(token) if token.is_empty() => {
            Err(AblyError::protocol("Auth callback returned an empty token"))
        }
        AuthCallbackResult::Token(token) => Ok(Obtained::Details(TokenDetails::from_token(token))),
        AuthCallbackResult::TokenRequest(request) => Ok(Obtained::Request(request)),
        AuthCallbackResult::TokenDetails(details) => Ok(Obtained::Details(details)),
        AuthCallbackResult::Serialized(text) => {
            let value: Value = serde_json::from_str(&text).map_err(|e| {
                AblyError::protocol(format!("Auth callback returned invalid JSON: {}", e))
            })?;
            interpret_json(value)
        }
    }
}

async fn obtain_from_url(
    auth_url: &AuthUrl,
    params: &TokenParams,
    transport: &dyn Transport,
) -> AblyResult<Obtained> {
    // Token params win over configured authParams of the same name
    let mut fields = auth_url.params.clone();
    for (name, value) in params.to_params() {
        fields.retain(|(existing, _)| existing != &name);
        fields.push((name, value));
    }

    let mut request = match auth_url.method {
        HttpMethod::Get => {
            let mut request = HttpRequest::get(auth_url.url.clone());
            request.query = fields;
            request
        }
        HttpMethod::Post => HttpRequest::post(auth_url.url.clone()).form(&fields)?,
        other => {
            return Err(AblyError::configuration(
                AblyErrorCode::BadRequest,
                format!("Unsupported authMethod {}", other.as_str()),
            ))
        }
    };
    for (name, value) in &auth_url.headers {
        request = request.header(name.clone(), value.clone());
    }

    debug!(url = %auth_url.url, method = auth_url.method.as_str(), "Requesting token from authUrl");
    let response = transport.execute(request).await?;
    interpret_url_response(response)
}

fn interpret_url_response(response: HttpResponse) -> AblyResult<Obtained> {
    if !response.is_success() {
        let code = response
            .error_info()
            .map(|info| info.code)
            .unwrap_or_else(|| AblyErrorCode::TokenCallbackError.to_u32());
        warn!(status = response.status, code, "authUrl request failed");
        return Err(AblyError::remote_auth(
            response.status,
            code,
            format!("authUrl request failed with status {}", response.status),
            Some(response.text()),
        ));
    }

    match response.content_type().as_deref() {
        Some("application/json") => interpret_json(response.json()?),
        Some("text/plain") | Some("application/jwt") => {
            let token = response.text().trim().to_string();
            if token.is_empty() {
                return Err(AblyError::protocol("authUrl returned an empty token"));
            }
            Ok(Obtained::Details(TokenDetails::from_token(token)))
        }
        other => Err(AblyError::protocol(format!(
            "authUrl returned unsupported content type {:?}",
            other
        ))),
    }
}

/// Token request when `mac`/`nonce` are present, token details when `token` is
fn interpret_json(value: Value) -> AblyResult<Obtained> {
    if value.get("mac").is_some() || value.get("nonce").is_some() {
        let request = serde_json::from_value(value)
            .map_err(|e| AblyError::protocol(format!("Malformed token request: {}", e)))?;
        return Ok(Obtained::Request(request));
    }

    if value.get("token").is_some() {
        let details: TokenDetails = serde_json::from_value(value)
            .map_err(|e| AblyError::protocol(format!("Malformed token details: {}", e)))?;
        if details.token.is_empty() {
            return Err(AblyError::protocol("Token details carry an empty token"));
        }
        return Ok(Obtained::Details(details));
    }

    Err(AblyError::protocol(
        "Expected a token request or token details in JSON response",
    ))
}
