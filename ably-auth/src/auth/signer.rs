//! Token request signing.
//!
//! Builds a [`TokenRequest`] from key material and signs it with
//! HMAC-SHA256 over the canonical field sequence the token-issuing endpoint
//! verifies.

use super::clock::Clock;
use super::key::ApiKey;
use super::token::{TokenParams, TokenRequest, DEFAULT_CAPABILITY, DEFAULT_TTL};
use crate::error::{AblyError, AblyResult};
use crate::http::{HttpRequest, Transport};
use base64::Engine;
use hmac::{Hmac, Mac};
use parking_lot::Mutex;
use rand::Rng;
use sha2::Sha256;
use std::sync::Arc;
use tracing::debug;

type HmacSha256 = Hmac<Sha256>;

/// Signs token requests, tracking server time when asked to
pub struct TokenRequestSigner {
    clock: Arc<dyn Clock>,
    /// Server time minus local time, learned from `/time`
    server_offset: Mutex<Option<i64>>,
}

impl TokenRequestSigner {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            server_offset: Mutex::new(None),
        }
    }

    /// Create and sign a token request.
    ///
    /// `params` are the already-merged effective params; protocol defaults
    /// fill whatever is still missing. With `query_time` the timestamp is
    /// taken from server time, fetched once and then tracked as an offset.
    pub async fn sign(
        &self,
        key: &ApiKey,
        params: &TokenParams,
        query_time: bool,
        transport: &dyn Transport,
    ) -> AblyResult<TokenRequest> {
        let timestamp = match params.timestamp {
            Some(timestamp) => timestamp,
            None => self.timestamp(query_time, transport).await?,
        };

        Self::sign_with(key, params, timestamp, Self::generate_nonce())
    }

    /// Deterministic signing with an explicit timestamp and nonce
    pub fn sign_with(
        key: &ApiKey,
        params: &TokenParams,
        timestamp: i64,
        nonce: String,
    ) -> AblyResult<TokenRequest> {
        if key.key_secret.is_empty() {
            return Err(AblyError::signing("Key secret is missing"));
        }

        let ttl = params.ttl.unwrap_or(DEFAULT_TTL);
        let mut request = TokenRequest {
            key_name: key.key_name.clone(),
            ttl: Some(i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX)),
            capability: Some(
                params
                    .capability
                    .clone()
                    .unwrap_or_else(|| DEFAULT_CAPABILITY.to_string()),
            ),
            client_id: params.client_id.clone(),
            timestamp,
            nonce,
            mac: String::new(),
        };

        request.mac = Self::compute_mac(&key.key_secret, &request)?;
        debug!(
            key_name = %request.key_name,
            client_id = ?request.client_id,
            ttl = ?request.ttl,
            "Signed token request"
        );
        Ok(request)
    }

    /// Check a request's mac against a key
    pub fn verify_mac(key: &ApiKey, request: &TokenRequest) -> AblyResult<bool> {
        let computed = Self::compute_mac(&key.key_secret, request)?;
        Ok(computed == request.mac)
    }

    /// Compute MAC for token request
    pub fn compute_mac(secret: &str, request: &TokenRequest) -> AblyResult<String> {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|e| AblyError::signing(format!("Failed to create HMAC: {}", e)))?;

        mac.update(Self::signing_text(request).as_bytes());
        let result = mac.finalize();

        Ok(base64::engine::general_purpose::STANDARD.encode(result.into_bytes()))
    }

    /// Every field followed by a newline, absent fields empty
    fn signing_text(request: &TokenRequest) -> String {
        let ttl = request.ttl.map(|ttl| ttl.to_string()).unwrap_or_default();
        let timestamp = request.timestamp.to_string();
        let fields = [
            request.key_name.as_str(),
            ttl.as_str(),
            request.capability.as_deref().unwrap_or_default(),
            request.client_id.as_deref().unwrap_or_default(),
            timestamp.as_str(),
            request.nonce.as_str(),
        ];

        let mut text = String::new();
        for field in fields {
            text.push_str(field);
            text.push('\n');
        }
        text
    }

    /// 16 random bytes, URL-safe base64: 22 characters
    pub fn generate_nonce() -> String {
        let mut rng = rand::thread_rng();
        let nonce: [u8; 16] = rng.gen();
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(nonce)
    }

    async fn timestamp(&self, query_time: bool, transport: &dyn Transport) -> AblyResult<i64> {
        let local = self.clock.now_millis();
        if !query_time {
            return Ok(local);
        }

        let cached = *self.server_offset.lock();
        let offset = match cached {
            Some(offset) => offset,
            None => {
                let server = fetch_server_time(transport).await?;
                let offset = server - self.clock.now_millis();
                debug!(offset_ms = offset, "Learned server time offset");
                *self.server_offset.lock() = Some(offset);
                offset
            }
        };
        Ok(local + offset)
    }
}

/// `GET /time`, returns the first element of the array the server sends
pub async fn fetch_server_time(transport: &dyn Transport) -> AblyResult<i64> {
    let response = transport.execute(HttpRequest::get("/time")).await?;
    if !response.is_success() {
        return Err(crate::error::parse_ably_error(response.status, &response.body));
    }

    let times: Vec<i64> = response.json()?;
    times
        .first()
        .copied()
        .ok_or_else(|| AblyError::protocol("Empty time response"))
}
