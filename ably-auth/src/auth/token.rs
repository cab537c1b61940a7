// Token data model: parameters, signed requests and issued tokens

use crate::logging::redact_secret;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Capability granting every operation on every channel
pub const DEFAULT_CAPABILITY: &str = r#"{"*":["*"]}"#;

/// Token lifetime used when no ttl is requested
pub const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60);

/// Parameters for a token: what it allows, who holds it, how long it lives
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenParams {
    /// JSON-encoded capability
    pub capability: Option<String>,
    pub client_id: Option<String>,
    pub ttl: Option<Duration>,
    /// Issue time in milliseconds since the epoch
    pub timestamp: Option<i64>,
}

impl TokenParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capability(mut self, capability: impl Into<String>) -> Self {
        self.capability = Some(capability.into());
        self
    }

    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Field-wise merge; values set on `self` win over `fallback`.
    pub fn merge(&self, fallback: &TokenParams) -> TokenParams {
        TokenParams {
            capability: self.capability.clone().or_else(|| fallback.capability.clone()),
            client_id: self.client_id.clone().or_else(|| fallback.client_id.clone()),
            ttl: self.ttl.or(fallback.ttl),
            timestamp: self.timestamp.or(fallback.timestamp),
        }
    }

    /// Wire form as name/value pairs, used for authUrl requests
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();
        if let Some(ttl) = self.ttl {
            params.push(("ttl".to_string(), ttl.as_millis().to_string()));
        }
        if let Some(ref capability) = self.capability {
            params.push(("capability".to_string(), capability.clone()));
        }
        if let Some(ref client_id) = self.client_id {
            params.push(("clientId".to_string(), client_id.clone()));
        }
        if let Some(timestamp) = self.timestamp {
            params.push(("timestamp".to_string(), timestamp.to_string()));
        }
        params
    }
}

/// Signed request for a token, exchanged at the token-issuing endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRequest {
    pub key_name: String,

    /// Milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub capability: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    pub timestamp: i64,

    pub nonce: String,

    pub mac: String,
}

/// An issued token
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenDetails {
    pub token: String,

    /// Expiry in milliseconds since the epoch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<i64>,

    /// Issue time in milliseconds since the epoch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issued: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capability: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
}

impl TokenDetails {
    /// Wrap a bare token string; nothing is known about its lifetime
    pub fn from_token(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            expires: None,
            issued: None,
            capability: None,
            client_id: None,
        }
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
    }

    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        self.issued.and_then(|ms| Utc.timestamp_millis_opt(ms).single())
    }
}

impl fmt::Debug for TokenDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenDetails")
            .field("token", &redact_secret(&self.token))
            .field("expires", &self.expires)
            .field("issued", &self.issued)
            .field("capability", &self.capability)
            .field("client_id", &self.client_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_prefers_self() {
        let defaults = TokenParams::new()
            .with_client_id("cid")
            .with_capability(DEFAULT_CAPABILITY);
        let call = TokenParams::new()
            .with_client_id("cid_2")
            .with_ttl(Duration::from_millis(64));

        let merged = call.merge(&defaults);
        assert_eq!(merged.client_id.as_deref(), Some("cid_2"));
        assert_eq!(merged.ttl, Some(Duration::from_millis(64)));
        assert_eq!(merged.capability.as_deref(), Some(DEFAULT_CAPABILITY));
        assert_eq!(merged.timestamp, None);
    }

    #[test]
    fn test_to_params_uses_wire_names() {
        let params = TokenParams::new()
            .with_ttl(Duration::from_secs(1))
            .with_client_id("bob")
            .to_params();
        assert_eq!(
            params,
            vec![
                ("ttl".to_string(), "1000".to_string()),
                ("clientId".to_string(), "bob".to_string()),
            ]
        );
    }

    #[test]
    fn test_token_request_wire_format() {
        let request = TokenRequest {
            key_name: "app.key".into(),
            ttl: Some(3_600_000),
            capability: None,
            client_id: Some("bob".into()),
            timestamp: 1_700_000_000_000,
            nonce: "abcdefghijklmnopqrstuv".into(),
            mac: "mac".into(),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["keyName"], "app.key");
        assert_eq!(json["clientId"], "bob");
        assert!(json.get("capability").is_none());
    }

    #[test]
    fn test_token_details_parses_server_response() {
        let details: TokenDetails = serde_json::from_str(
            r#"{"token":"xVLyHw.abc","keyName":"xVLyHw.key","issued":1000,"expires":3601000,"capability":"{\"*\":[\"*\"]}","clientId":"bob"}"#,
        )
        .unwrap();
        assert_eq!(details.token, "xVLyHw.abc");
        assert_eq!(details.expires, Some(3_601_000));
        assert_eq!(details.client_id.as_deref(), Some("bob"));
        assert_eq!(details.expires_at().unwrap().timestamp_millis(), 3_601_000);
    }

    #[test]
    fn test_token_details_debug_redacts_token() {
        let details = TokenDetails::from_token("very-secret-token-value");
        assert!(!format!("{:?}", details).contains("very-secret-token-value"));
    }
}
