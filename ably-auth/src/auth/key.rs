// API key handling

use crate::error::{AblyError, AblyResult};
use crate::logging::redact_secret;
use base64::Engine;
use std::fmt;
use std::str::FromStr;

/// An Ably API key, `keyName:keySecret`
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey {
    pub key_name: String,
    pub key_secret: String,
}

impl ApiKey {
    /// Parse a key of the form `appId.keyId:secret`
    pub fn parse(key: &str) -> AblyResult<Self> {
        let (name, secret) = key
            .split_once(':')
            .ok_or_else(|| AblyError::signing("Invalid key: expected keyName:keySecret"))?;

        if name.is_empty() {
            return Err(AblyError::signing("Invalid key: key name is empty"));
        }
        if secret.is_empty() {
            return Err(AblyError::signing("Invalid key: key secret is empty"));
        }

        Ok(Self {
            key_name: name.to_string(),
            key_secret: secret.to_string(),
        })
    }

    /// Value for an `Authorization: Basic ...` header
    pub fn basic_authorization(&self) -> String {
        let raw = format!("{}:{}", self.key_name, self.key_secret);
        format!(
            "Basic {}",
            base64::engine::general_purpose::STANDARD.encode(raw)
        )
    }
}

impl FromStr for ApiKey {
    type Err = AblyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKey")
            .field("key_name", &self.key_name)
            .field("key_secret", &redact_secret(&self.key_secret))
            .finish()
    }
}
