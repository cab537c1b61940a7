// Decides between basic and token auth from the client's options

use super::key::ApiKey;
use super::options::AuthOptions;
use super::AuthMethod;
use crate::error::{AblyError, AblyErrorCode, AblyResult};
use tracing::debug;

/// Resolve the authentication method for a client.
///
/// A key on its own means basic auth. A client id, `use_token_auth`, or any
/// option able to produce a token switches to token auth.
pub fn resolve_auth_method(options: &AuthOptions) -> AblyResult<AuthMethod> {
    if let Some(ref key) = options.key {
        ApiKey::parse(key).map_err(|e| {
            AblyError::configuration(AblyErrorCode::InvalidCredentials, e.message())
        })?;
    }

    if options.key.is_none() && !options.has_token_source() {
        return Err(AblyError::configuration(
            AblyErrorCode::NoAuthOptions,
            "No authentication options provided: need a key, token, authCallback or authUrl",
        ));
    }

    let method = if options.key.is_some()
        && !options.use_token_auth()
        && options.client_id.is_none()
        && !options.has_token_source()
    {
        AuthMethod::Basic
    } else {
        AuthMethod::Token
    };

    debug!(?method, "Resolved auth method");
    Ok(method)
}
