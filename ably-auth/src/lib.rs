//! Ably REST authentication engine
//!
//! Decides between basic and token auth, acquires tokens by local signing,
//! an auth callback or an authUrl, caches them with single-flight renewal,
//! and attaches credentials to every outbound REST request.

pub mod auth;
pub mod client;
pub mod error;
pub mod http;
pub mod logging;

pub use auth::{
    Auth, AuthCallback, AuthCallbackResult, AuthMethod, AuthOptions, TokenDetails, TokenParams,
    TokenRequest,
};
pub use client::{ClientOptions, RestClient};
pub use error::{AblyError, AblyResult, ErrorInfo};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
