// Attaches credentials to outbound requests and renews once on rejection

use super::token::TokenDetails;
use super::{Auth, AuthMethod};
use crate::error::{AblyError, AblyResult};
use crate::http::{HttpRequest, HttpResponse};
use base64::Engine;
use std::sync::Arc;
use tracing::{debug, warn};

/// Credential attached to a request
#[derive(Debug, Clone)]
pub enum Credential {
    Basic,
    Bearer(Arc<TokenDetails>),
}

/// A request carrying an `Authorization` header
#[derive(Debug, Clone)]
pub struct AuthenticatedRequest {
    pub request: HttpRequest,
    pub credential: Credential,
}

/// Where a request stands in the reject-renew-retry cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attempt {
    Initial,
    Renewed,
}

#[derive(Debug)]
pub struct RequestAuthenticator {
    auth: Arc<Auth>,
}

impl RequestAuthenticator {
    pub fn new(auth: Arc<Auth>) -> Self {
        Self { auth }
    }

    pub fn auth(&self) -> &Arc<Auth> {
        &self.auth
    }

    /// Attach basic or bearer credentials.
    ///
    /// Basic auth over a non-TLS transport fails before any I/O.
    pub async fn authenticate(&self, request: HttpRequest) -> AblyResult<AuthenticatedRequest> {
        match self.auth.auth_method() {
            AuthMethod::Basic => {
                if !self.auth.transport().is_tls() {
                    return Err(AblyError::insecure_transport(
                        "Basic auth requires a TLS connection; use token auth over plain HTTP",
                    ));
                }
                let key = self.auth.basic_key()?;
                let mut request = request;
                request.set_header("Authorization", key.basic_authorization());
                Ok(AuthenticatedRequest {
                    request,
                    credential: Credential::Basic,
                })
            }
            AuthMethod::Token => {
                let token = self.auth.get_token().await?;
                Ok(with_bearer(request, token))
            }
        }
    }

    /// Authenticate and perform a request.
    ///
    /// A token rejection triggers one renewal and one retry; a rejection of
    /// the renewed token is returned as a final error.
    pub async fn execute(&self, request: HttpRequest) -> AblyResult<HttpResponse> {
        let transport = self.auth.transport().clone();
        let mut authenticated = self.authenticate(request.clone()).await?;
        let mut attempt = Attempt::Initial;

        loop {
            let response = transport.execute(authenticated.request.clone()).await?;

            let rejection = match response.token_rejection() {
                Some(info) => info,
                None => return Ok(response),
            };
            let stale = match authenticated.credential {
                Credential::Bearer(ref token) => token.clone(),
                Credential::Basic => return Ok(response),
            };

            match attempt {
                Attempt::Initial => {
                    warn!(code = rejection.code, "Token rejected, renewing");
                    let fresh = self.auth.renew_after_rejection(&stale).await?;
                    authenticated = with_bearer(request.clone(), fresh);
                    attempt = Attempt::Renewed;
                }
                Attempt::Renewed => {
                    warn!(code = rejection.code, "Renewed token rejected");
                    return Err(AblyError::remote_auth(
                        response.status,
                        rejection.code,
                        rejection
                            .message
                            .unwrap_or_else(|| "Token rejected after renewal".to_string()),
                        Some(response.text()),
                    ));
                }
            }
        }
    }
}

fn with_bearer(mut request: HttpRequest, token: Arc<TokenDetails>) -> AuthenticatedRequest {
    debug!("Attaching bearer token");
    request.set_header("Authorization", bearer_authorization(&token.token));
    AuthenticatedRequest {
        request,
        credential: Credential::Bearer(token),
    }
}

/// `Bearer base64(token)`
pub fn bearer_authorization(token: &str) -> String {
    format!(
        "Bearer {}",
        base64::engine::general_purpose::STANDARD.encode(token.as_bytes())
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_is_base64_of_token() {
        assert_eq!(bearer_authorization("abc"), "Bearer YWJj");
    }
}
