// REST client surface

pub mod options;
pub mod rest;

pub use options::{ClientOptions, ClientOptionsBuilder};
pub use rest::{RestClient, RestClientBuilder};
