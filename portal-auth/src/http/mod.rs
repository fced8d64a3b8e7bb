//! HTTP client building with middleware, and the transport every API call goes through.

mod client;
mod retry;
mod transport;

pub use client::{AuthenticatedClient, AuthenticatedClientBuilder, HttpClientConfig};
pub use retry::BackoffPolicy;
pub use transport::{Transport, DEFAULT_AUTH_HEADER};
