// Logging setup and secret hygiene

use ably_auth::auth::{AuthOptions, TokenDetails};
use ably_auth::logging::{init_logging, LogConfig, LogFormat, LogLevel};
use tracing::{debug, info};

#[test]
fn test_init_logging_installs_once() {
    let config = LogConfig::builder()
        .level(LogLevel::Debug)
        .format(LogFormat::Text)
        .use_env_filter(false)
        .build();

    let first = init_logging(config.clone());
    let second = init_logging(config);
    assert!(!second);

    info!(installed = first, "Logging initialised for tests");
    debug!("Debug output after init");
}

#[test]
fn test_debug_output_hides_secrets() {
    let options = AuthOptions::new()
        .with_key("appId.keyId:superSecretValue")
        .with_token("xVLyHw.A-very-long-token-body");
    let printed = format!("{:?}", options);

    assert!(printed.contains("appId.keyId:[REDACTED]"));
    assert!(!printed.contains("superSecretValue"));
    assert!(!printed.contains("A-very-long-token-body"));

    let details = format!("{:?}", TokenDetails::from_token("xVLyHw.A-very-long-token-body"));
    assert!(!details.contains("A-very-long-token-body"));
}
