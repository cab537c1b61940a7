// Error handling for the auth engine
// Every failure carries an Ably error code and HTTP status so callers can
// treat them the same way the Ably REST protocol does.

pub mod ably_codes;

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

pub use ably_codes::{http_to_ably_code, parse_ably_error, AblyErrorCode};

/// Type alias for Ably results
pub type AblyResult<T> = Result<T, AblyError>;

type SharedSource = Arc<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Clone, Error)]
pub enum AblyError {
    /// Unusable or contradictory client options. Fails client construction.
    #[error("Configuration error: {message}")]
    Configuration { message: String, code: u32 },

    /// Key material missing or malformed.
    #[error("Signing error: {message}")]
    Signing { message: String },

    /// The auth callback raised an error.
    #[error("Auth callback failed: {message}")]
    Callback {
        message: String,
        #[source]
        source: Option<SharedSource>,
    },

    /// Non-2xx from the token-issuing endpoint or the authUrl, or a token
    /// rejected twice in a row by the REST endpoint.
    #[error("Token request failed ({status_code}/{code}): {message}")]
    RemoteAuth {
        status_code: u16,
        code: u32,
        message: String,
        body: Option<String>,
    },

    /// A response or callback result had a shape we cannot interpret.
    #[error("Protocol error: {message}")]
    Protocol { message: String },

    /// Basic credentials would have been sent over a non-TLS transport.
    #[error("Insecure transport: {message}")]
    InsecureTransport { message: String },

    #[error("Timeout: {message}")]
    Timeout { message: String },

    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<SharedSource>,
    },

    /// Non-auth error response from the REST API.
    #[error("API error {code}: {message}")]
    Api {
        status_code: u16,
        code: u32,
        message: String,
    },
}

impl AblyError {
    /// Create a configuration error
    pub fn configuration(code: AblyErrorCode, message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            code: code.to_u32(),
        }
    }

    /// Create a signing error
    pub fn signing(message: impl Into<String>) -> Self {
        Self::Signing {
            message: message.into(),
        }
    }

    /// Wrap an error raised by an auth callback
    pub fn callback<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let source: Box<dyn std::error::Error + Send + Sync> = err.into();
        Self::Callback {
            message: source.to_string(),
            source: Some(Arc::from(source)),
        }
    }

    /// Create a remote auth error
    pub fn remote_auth(
        status_code: u16,
        code: u32,
        message: impl Into<String>,
        body: Option<String>,
    ) -> Self {
        Self::RemoteAuth {
            status_code,
            code,
            message: message.into(),
            body,
        }
    }

    /// Create a protocol error
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Create an insecure transport error
    pub fn insecure_transport(message: impl Into<String>) -> Self {
        Self::InsecureTransport {
            message: message.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout {
            message: message.into(),
        }
    }

    /// Create a network error
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
            source: None,
        }
    }

    /// Create an API error
    pub fn api(status_code: u16, code: u32, message: impl Into<String>) -> Self {
        Self::Api {
            status_code,
            code,
            message: message.into(),
        }
    }

    /// Ably error code for this error
    pub fn code(&self) -> u32 {
        match self {
            AblyError::Configuration { code, .. } => *code,
            AblyError::Signing { .. } => AblyErrorCode::InvalidCredentials.to_u32(),
            AblyError::Callback { .. } => AblyErrorCode::TokenCallbackError.to_u32(),
            AblyError::RemoteAuth { code, .. } => *code,
            AblyError::Protocol { .. } => AblyErrorCode::InvalidResponse.to_u32(),
            AblyError::InsecureTransport { .. } => {
                AblyErrorCode::InvalidUseOfBasicAuthOverHttp.to_u32()
            }
            AblyError::Timeout { .. } => AblyErrorCode::TimeoutError.to_u32(),
            AblyError::Network { .. } => AblyErrorCode::RequestFailed.to_u32(),
            AblyError::Api { code, .. } => *code,
        }
    }

    /// HTTP status code equivalent for this error
    pub fn status_code(&self) -> u16 {
        match self {
            AblyError::RemoteAuth { status_code, .. } | AblyError::Api { status_code, .. } => {
                *status_code
            }
            _ => AblyErrorCode::from_u32(self.code())
                .map(|code| code.status_code())
                .unwrap_or(500),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            AblyError::Configuration { message, .. }
            | AblyError::Signing { message }
            | AblyError::Callback { message, .. }
            | AblyError::RemoteAuth { message, .. }
            | AblyError::Protocol { message }
            | AblyError::InsecureTransport { message }
            | AblyError::Timeout { message }
            | AblyError::Network { message, .. }
            | AblyError::Api { message, .. } => message,
        }
    }

    /// Body returned by the remote endpoint, parsed as JSON.
    ///
    /// authUrl endpoints frequently answer errors with arbitrary JSON, so
    /// the raw document is kept for the caller to inspect.
    pub fn raw_json(&self) -> Option<serde_json::Value> {
        match self {
            AblyError::RemoteAuth {
                body: Some(body), ..
            } => serde_json::from_str(body).ok(),
            _ => None,
        }
    }

    /// True when the server reported the token as expired or invalid
    pub fn is_token_error(&self) -> bool {
        ably_codes::is_token_error(self.code())
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, AblyError::Timeout { .. })
    }

    pub fn error_info(&self) -> ErrorInfo {
        ErrorInfo {
            code: self.code(),
            message: Some(self.message().to_string()),
            status_code: Some(self.status_code()),
            href: None,
        }
    }
}

/// Ably error payload as carried in `{"error": {...}}` response bodies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorInfo {
    pub code: u32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
}

impl ErrorInfo {
    /// Extract the `error` member of an Ably error body
    pub fn from_body(body: &[u8]) -> Option<Self> {
        #[derive(Deserialize)]
        struct Envelope {
            error: ErrorInfo,
        }

        serde_json::from_slice::<Envelope>(body)
            .ok()
            .map(|envelope| envelope.error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_callback_error_keeps_source_and_code() {
        let err = AblyError::callback("test exception");
        assert_eq!(err.code(), 40170);
        assert_eq!(err.status_code(), 401);
        assert_eq!(err.message(), "test exception");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_remote_auth_raw_json() {
        let err = AblyError::remote_auth(
            404,
            40170,
            "authUrl failed",
            Some(r#"{"test-param":"test-value"}"#.to_string()),
        );
        let json = err.raw_json().unwrap();
        assert_eq!(json["test-param"], "test-value");
        assert_eq!(err.status_code(), 404);
    }

    #[test]
    fn test_error_info_from_body() {
        let body = br#"{"error":{"code":40142,"message":"Token expired","statusCode":401}}"#;
        let info = ErrorInfo::from_body(body).unwrap();
        assert_eq!(info.code, 40142);
        assert_eq!(info.status_code, Some(401));
        assert!(ErrorInfo::from_body(b"not json").is_none());
    }

    #[test]
    fn test_insecure_transport_code() {
        let err = AblyError::insecure_transport("basic auth over http");
        assert_eq!(err.code(), 40103);
        assert_eq!(err.error_info().status_code, Some(401));
    }
}
