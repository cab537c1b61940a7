// Shared fakes for the integration suites
// MockTransport records every request and answers through a handler;
// FakeAbly is a handler that issues, checks and revokes tokens.

#![allow(dead_code)]

use ably_auth::auth::{ApiKey, Clock, ManualClock, TokenRequest, TokenRequestSigner};
use ably_auth::error::AblyResult;
use ably_auth::http::{HttpRequest, HttpResponse, Transport};
use async_trait::async_trait;
use base64::Engine;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const TEST_KEY: &str = "appId.keyId:keySecret";
pub const START_MILLIS: i64 = 1_700_000_000_000;

type Handler = Box<dyn Fn(&HttpRequest) -> HttpResponse + Send + Sync>;

pub struct MockTransport {
    tls: bool,
    handler: Handler,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockTransport {
    pub fn new(
        tls: bool,
        handler: impl Fn(&HttpRequest) -> HttpResponse + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            tls,
            handler: Box::new(handler),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Requests sent to exactly this URL or path
    pub fn count(&self, url: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|request| request.url == url)
            .count()
    }

    pub fn last(&self, url: &str) -> Option<HttpRequest> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|request| request.url == url)
            .cloned()
    }
}

#[async_trait]
impl Transport for MockTransport {
    fn is_tls(&self) -> bool {
        self.tls
    }

    async fn execute(&self, request: HttpRequest) -> AblyResult<HttpResponse> {
        self.requests.lock().unwrap().push(request.clone());
        // Let concurrent callers interleave as they would on a real network
        tokio::task::yield_now().await;
        Ok((self.handler)(&request))
    }
}

pub fn json_response(status: u16, body: Value) -> HttpResponse {
    HttpResponse::new(
        status,
        vec![("content-type".into(), "application/json".into())],
        body.to_string(),
    )
}

pub fn error_response(status: u16, code: u32, message: &str) -> HttpResponse {
    json_response(
        status,
        json!({"error": {"code": code, "message": message, "statusCode": status}}),
    )
}

/// Token carried by a `Bearer` header, base64-decoded
pub fn bearer_token(request: &HttpRequest) -> Option<String> {
    let value = request.header_value("Authorization")?;
    let encoded = value.strip_prefix("Bearer ")?;
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .ok()?;
    String::from_utf8(bytes).ok()
}

pub fn sign_request(key: &str, client_id: Option<&str>, timestamp: i64) -> TokenRequest {
    let key = ApiKey::parse(key).unwrap();
    let mut params = ably_auth::auth::TokenParams::new();
    if let Some(client_id) = client_id {
        params = params.with_client_id(client_id);
    }
    TokenRequestSigner::sign_with(&key, &params, timestamp, TokenRequestSigner::generate_nonce())
        .unwrap()
}

/// In-process stand-in for the REST API and its token-issuing endpoint
pub struct FakeAbly {
    key: ApiKey,
    pub clock: Arc<ManualClock>,
    time_offset: AtomicI64,
    issued: AtomicUsize,
    /// token -> expiry, None for tokens the fake did not issue
    tokens: Mutex<HashMap<String, Option<i64>>>,
    revoked: Mutex<HashSet<String>>,
    reject_all: AtomicBool,
    nonces: Mutex<HashSet<String>>,
}

impl FakeAbly {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            key: ApiKey::parse(TEST_KEY).unwrap(),
            clock: Arc::new(ManualClock::new(START_MILLIS)),
            time_offset: AtomicI64::new(0),
            issued: AtomicUsize::new(0),
            tokens: Mutex::new(HashMap::new()),
            revoked: Mutex::new(HashSet::new()),
            reject_all: AtomicBool::new(false),
            nonces: Mutex::new(HashSet::new()),
        })
    }

    pub fn transport(self: &Arc<Self>, tls: bool) -> Arc<MockTransport> {
        let server = self.clone();
        MockTransport::new(tls, move |request| server.handle(request))
    }

    pub fn issued(&self) -> usize {
        self.issued.load(Ordering::SeqCst)
    }

    pub fn revoke(&self, token: &str) {
        self.revoked.lock().unwrap().insert(token.to_string());
    }

    pub fn reject_all_tokens(&self, reject: bool) {
        self.reject_all.store(reject, Ordering::SeqCst);
    }

    /// Server clock runs ahead of the client's by `offset` milliseconds
    pub fn set_time_offset(&self, offset: i64) {
        self.time_offset.store(offset, Ordering::SeqCst);
    }

    pub fn server_time(&self) -> i64 {
        self.clock.now_millis() + self.time_offset.load(Ordering::SeqCst)
    }

    pub fn handle(&self, request: &HttpRequest) -> HttpResponse {
        if request.url.starts_with("/keys/") && request.url.ends_with("/requestToken") {
            return self.issue(request);
        }

        match request.header_value("Authorization") {
            None if request.url == "/time" => json_response(200, json!([self.server_time()])),
            None => error_response(401, 40101, "No authentication"),
            Some(value) if value.starts_with("Basic ") => {
                if value == self.key.basic_authorization() {
                    json_response(200, json!([self.server_time()]))
                } else {
                    error_response(401, 40101, "Invalid credentials")
                }
            }
            Some(_) => self.check_bearer(request),
        }
    }

    fn check_bearer(&self, request: &HttpRequest) -> HttpResponse {
        let token = match bearer_token(request) {
            Some(token) => token,
            None => return error_response(401, 40101, "Malformed bearer token"),
        };

        if self.reject_all.load(Ordering::SeqCst) || self.revoked.lock().unwrap().contains(&token)
        {
            return error_response(401, 40141, "Token revoked");
        }

        let expiry = self.tokens.lock().unwrap().get(&token).copied().flatten();
        if matches!(expiry, Some(expires) if self.clock.now_millis() >= expires) {
            return error_response(401, 40142, "Token expired");
        }

        json_response(200, json!([self.server_time()]))
    }

    fn issue(&self, request: &HttpRequest) -> HttpResponse {
        let body = request.body.clone().unwrap_or_default();
        let token_request: TokenRequest = match serde_json::from_slice(&body) {
            Ok(token_request) => token_request,
            Err(_) => return error_response(400, 40001, "Invalid request body"),
        };

        if token_request.key_name != self.key.key_name {
            return error_response(404, 40400, "Key not found");
        }
        if !TokenRequestSigner::verify_mac(&self.key, &token_request).unwrap_or(false) {
            return error_response(401, 40101, "Invalid mac");
        }
        if !self.nonces.lock().unwrap().insert(token_request.nonce.clone()) {
            return error_response(401, 40101, "Nonce reused");
        }

        let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        let token = format!("token-{}", n);
        let issued = self.clock.now_millis();
        let expires = issued + token_request.ttl.unwrap_or(3_600_000);
        self.tokens
            .lock()
            .unwrap()
            .insert(token.clone(), Some(expires));

        json_response(
            200,
            json!({
                "token": token,
                "issued": issued,
                "expires": expires,
                "capability": token_request.capability,
                "clientId": token_request.client_id,
            }),
        )
    }
}
