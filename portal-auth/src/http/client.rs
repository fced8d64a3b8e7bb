//! Building the reqwest client shared by the session store and the API client.

use std::time::Duration;

use log::*;
use reqwest_middleware::ClientBuilder;
use reqwest_retry::RetryTransientMiddleware;

use super::BackoffPolicy;
use crate::error::Error;

#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Limit for a single attempt.
    pub timeout: Duration,
    /// Retries of transient failures; `0` disables them.
    pub max_retries: u32,
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retries: 2,
            user_agent: concat!("event-portal/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl HttpClientConfig {
    /// Longest a request may keep retrying: one timeout per attempt.
    pub fn retry_budget(&self) -> Duration {
        self.timeout.saturating_mul(self.max_retries.saturating_add(1))
    }
}

/// HTTP client wrapped in middleware.
pub type AuthenticatedClient = reqwest_middleware::ClientWithMiddleware;

/// Authentication is not baked into the client: the session token changes over the
/// life of the process, so [`super::Transport`] attaches it per request.
#[derive(Debug, Default, Clone)]
pub struct AuthenticatedClientBuilder {
    config: HttpClientConfig,
}

impl AuthenticatedClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: HttpClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Client that retries transient failures. Only safe for idempotent requests.
    pub fn build(self) -> Result<AuthenticatedClient, Error> {
        let client = self.base_client()?;

        let policy = BackoffPolicy::new(self.config.max_retries)
            .with_budget(self.config.retry_budget());
        debug!(
            "HTTP client ready: timeout {:?}, up to {} retries",
            self.config.timeout, self.config.max_retries
        );

        Ok(ClientBuilder::new(client)
            .with(RetryTransientMiddleware::new_with_policy(policy))
            .build())
    }

    /// Client that sends every request exactly once, for POSTs that create or
    /// change something on the server.
    pub fn build_single_attempt(self) -> Result<AuthenticatedClient, Error> {
        let client = self.base_client()?;
        debug!(
            "Single-attempt HTTP client ready: timeout {:?}",
            self.config.timeout
        );
        Ok(ClientBuilder::new(client).build())
    }

    fn base_client(&self) -> Result<reqwest::Client, Error> {
        Ok(reqwest::Client::builder()
            .timeout(self.config.timeout)
            .user_agent(&self.config.user_agent)
            .build()?)
    }
}
