mod common;

use ably_auth::auth::{AuthCallbackResult, AuthMethod, CallbackError, TokenParams};
use ably_auth::client::{ClientOptions, RestClient};
use ably_auth::error::AblyError;
use common::{bearer_token, FakeAbly, TEST_KEY};

fn build(options: ClientOptions, server: &std::sync::Arc<FakeAbly>, tls: bool) -> RestClient {
    let transport = server.transport(tls);
    RestClient::with_parts(options, transport, server.clock.clone()).unwrap()
}

#[tokio::test]
async fn test_key_only_uses_basic_auth() {
    let server = FakeAbly::new();
    let transport = server.transport(true);
    let client = RestClient::with_parts(
        ClientOptions::builder().key(TEST_KEY).build(),
        transport.clone(),
        server.clock.clone(),
    )
    .unwrap();

    assert_eq!(client.auth().auth_method(), AuthMethod::Basic);
    client.time().await.unwrap();

    let request = transport.last("/time").unwrap();
    assert_eq!(
        request.header_value("Authorization"),
        Some("Basic YXBwSWQua2V5SWQ6a2V5U2VjcmV0")
    );
    assert_eq!(server.issued(), 0);
}

#[tokio::test]
async fn test_key_and_client_id_uses_token_auth() {
    let server = FakeAbly::new();
    let transport = server.transport(true);
    let client = RestClient::with_parts(
        ClientOptions::builder()
            .key(TEST_KEY)
            .client_id("testClientId")
            .build(),
        transport.clone(),
        server.clock.clone(),
    )
    .unwrap();

    assert_eq!(client.auth().auth_method(), AuthMethod::Token);
    client.time().await.unwrap();

    assert_eq!(server.issued(), 1);
    assert_eq!(
        bearer_token(&transport.last("/time").unwrap()).as_deref(),
        Some("token-1")
    );
    let token = client.auth().token_details().unwrap();
    assert_eq!(token.client_id.as_deref(), Some("testClientId"));
    assert_eq!(client.auth().client_id().as_deref(), Some("testClientId"));
}

#[tokio::test]
async fn test_token_only_uses_token_auth_without_acquiring() {
    let server = FakeAbly::new();
    let transport = server.transport(true);
    let client = RestClient::with_parts(
        ClientOptions::builder().token("this_is_a_static_token").build(),
        transport.clone(),
        server.clock.clone(),
    )
    .unwrap();

    assert_eq!(client.auth().auth_method(), AuthMethod::Token);
    client.time().await.unwrap();

    assert_eq!(server.issued(), 0);
    assert_eq!(
        bearer_token(&transport.last("/time").unwrap()).as_deref(),
        Some("this_is_a_static_token")
    );
}

#[test]
fn test_callback_only_uses_token_auth() {
    let server = FakeAbly::new();
    let client = build(
        ClientOptions::builder()
            .auth_callback(|_: TokenParams| async {
                Ok::<_, CallbackError>(AuthCallbackResult::Token("from-callback".into()))
            })
            .build(),
        &server,
        true,
    );
    assert_eq!(client.auth().auth_method(), AuthMethod::Token);
}

#[test]
fn test_auth_url_only_uses_token_auth() {
    let server = FakeAbly::new();
    let client = build(
        ClientOptions::builder()
            .auth_url("https://auth.example.com/token")
            .build(),
        &server,
        true,
    );
    assert_eq!(client.auth().auth_method(), AuthMethod::Token);
}

#[test]
fn test_no_credentials_is_rejected_at_construction() {
    let server = FakeAbly::new();
    let result = RestClient::with_parts(
        ClientOptions::builder().client_id("lonely").build(),
        server.transport(true),
        server.clock.clone(),
    );
    match result {
        Err(AblyError::Configuration { code, .. }) => assert_eq!(code, 40160),
        Err(other) => panic!("unexpected error {:?}", other),
        Ok(_) => panic!("client without credentials was created"),
    }
}

#[tokio::test]
async fn test_basic_auth_over_plain_http_fails_before_io() {
    let server = FakeAbly::new();
    let transport = server.transport(false);
    let client = RestClient::with_parts(
        ClientOptions::builder().key(TEST_KEY).tls(false).build(),
        transport.clone(),
        server.clock.clone(),
    )
    .unwrap();

    let err = client.time().await.unwrap_err();
    assert!(matches!(err, AblyError::InsecureTransport { .. }));
    assert_eq!(err.code(), 40103);
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn test_token_auth_over_plain_http_is_allowed() {
    let server = FakeAbly::new();
    let transport = server.transport(false);
    let client = RestClient::with_parts(
        ClientOptions::builder()
            .key(TEST_KEY)
            .use_token_auth(true)
            .tls(false)
            .build(),
        transport.clone(),
        server.clock.clone(),
    )
    .unwrap();

    client.time().await.unwrap();
    assert_eq!(server.issued(), 1);
}

#[tokio::test]
async fn test_time_returns_server_time() {
    let server = FakeAbly::new();
    let client = build(ClientOptions::builder().key(TEST_KEY).build(), &server, true);
    assert_eq!(client.time().await.unwrap(), common::START_MILLIS);
}
