mod common;

use ably_auth::client::{ClientOptions, RestClient};
use ably_auth::error::AblyError;
use ably_auth::http::HttpMethod;
use common::{error_response, json_response, MockTransport, TEST_KEY};
use serde_json::json;

#[tokio::test]
async fn test_request_attaches_params_and_body() {
    let transport = MockTransport::new(true, |_| json_response(201, json!({"ok": true})));
    let client =
        RestClient::with_transport(ClientOptions::builder().key(TEST_KEY).build(), transport.clone())
            .unwrap();

    let response = client
        .request(
            HttpMethod::Post,
            "/channels/test/messages",
            &[("limit".to_string(), "10".to_string())],
            Some(json!({"name": "greeting", "data": "hello"})),
        )
        .await
        .unwrap();
    assert_eq!(response.status, 201);

    let sent = transport.last("/channels/test/messages").unwrap();
    assert_eq!(sent.query, vec![("limit".to_string(), "10".to_string())]);
    assert_eq!(sent.header_value("Accept"), Some("application/json"));
    assert!(sent
        .header_value("Authorization")
        .unwrap()
        .starts_with("Basic "));
    let body: serde_json::Value = serde_json::from_slice(&sent.body.unwrap()).unwrap();
    assert_eq!(body, json!({"name": "greeting", "data": "hello"}));
}

#[tokio::test]
async fn test_non_success_is_api_error() {
    let transport = MockTransport::new(true, |_| error_response(404, 40400, "Not found"));
    let client =
        RestClient::with_transport(ClientOptions::builder().key(TEST_KEY).build(), transport)
            .unwrap();

    let err = client
        .request(HttpMethod::Get, "/channels/missing", &[], None)
        .await
        .unwrap_err();
    match err {
        AblyError::Api {
            status_code, code, ..
        } => {
            assert_eq!(status_code, 404);
            assert_eq!(code, 40400);
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[tokio::test]
async fn test_invalid_key_error_is_not_a_token_rejection() {
    let transport = MockTransport::new(true, |_| error_response(401, 40101, "Invalid credentials"));
    let client =
        RestClient::with_transport(ClientOptions::builder().key(TEST_KEY).build(), transport.clone())
            .unwrap();

    let err = client.time().await.unwrap_err();
    assert_eq!(err.code(), 40101);
    assert_eq!(transport.count("/time"), 1);
}

#[test]
fn test_builder_with_transport() {
    let transport = MockTransport::new(true, |_| json_response(200, json!([1])));
    let client = RestClient::builder()
        .key(TEST_KEY)
        .client_id("built")
        .transport(transport)
        .build()
        .unwrap();
    assert_eq!(client.auth().client_id().as_deref(), Some("built"));
    assert_eq!(client.options().http.base_url(), "https://rest.ably.io");
}
