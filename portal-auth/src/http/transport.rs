//! Request/response plumbing against the portal API.

use log::*;
use reqwest::header::HeaderName;
use reqwest::{Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::Value;
use std::error::Error as StdError;
use std::fmt;
use url::Url;

use super::{AuthenticatedClient, AuthenticatedClientBuilder, HttpClientConfig};
use crate::error::{ApiErrorKind, Error, ErrorKind, HttpErrorKind};

/// Header the backend reads the session token from.
pub const DEFAULT_AUTH_HEADER: &str = "X-Auth-Token";

/// Shape of the backend's error payloads. Only `message` is used.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// Sends requests to the API base URL and classifies the responses.
///
/// Idempotent requests go through the retrying client. Everything else (the
/// portal's POSTs create events, registrations and sessions) is sent once.
///
/// The transport has no notion of who is logged in: callers hand it the token to
/// attach, which keeps it usable by the session store itself (login, logout) as
/// well as by the authenticated [`crate::api::Client`].
#[derive(Clone)]
pub struct Transport {
    retrying: AuthenticatedClient,
    single_attempt: AuthenticatedClient,
    base_url: Url,
    auth_header: HeaderName,
}

impl fmt::Debug for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transport")
            .field("base_url", &self.base_url.as_str())
            .field("auth_header", &self.auth_header)
            .finish()
    }
}

impl Transport {
    /// Build a transport sending the token in the default header.
    pub fn new(base_url: &str, config: HttpClientConfig) -> Result<Self, Error> {
        Self::with_auth_header(base_url, DEFAULT_AUTH_HEADER, config)
    }

    pub fn with_auth_header(
        base_url: &str,
        auth_header: &str,
        config: HttpClientConfig,
    ) -> Result<Self, Error> {
        let base_url = Url::parse(base_url)?;
        let auth_header = HeaderName::from_bytes(auth_header.as_bytes()).map_err(|err| Error {
            source: Some(Box::new(err)),
            error_kind: ErrorKind::Http(HttpErrorKind::BuilderFailed),
        })?;

        let builder = AuthenticatedClientBuilder::new().with_config(config);
        Ok(Self {
            retrying: builder.clone().build()?,
            single_attempt: builder.build_single_attempt()?,
            base_url,
            auth_header,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn auth_header(&self) -> &HeaderName {
        &self.auth_header
    }

    /// Absolute URL for an API path such as `/event/list?type=upcoming`.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Send a request and return the raw body of a successful response.
    ///
    /// # Arguments
    ///
    /// * `method` - HTTP method
    /// * `path` - API path, including any query string
    /// * `token` - Session token to attach in the auth header, if any
    /// * `body` - Optional JSON body
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        token: Option<&SecretString>,
        body: Option<&Value>,
    ) -> Result<String, Error> {
        let client = if method.is_idempotent() {
            &self.retrying
        } else {
            &self.single_attempt
        };
        let mut request = client.request(method.clone(), self.endpoint(path));

        if let Some(token) = token {
            request = request.header(self.auth_header.clone(), token.expose_secret().as_str());
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        debug!("{} {}", method, path);
        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if status.is_success() {
            trace!("{} {} -> {}", method, path, status);
            Ok(text)
        } else {
            debug!("{} {} -> {}", method, path, status);
            Err(error_for_status(status, &text))
        }
    }
}

/// Map a non-success status to the error taxonomy, keeping the server's message.
pub(crate) fn error_for_status(status: StatusCode, body: &str) -> Error {
    let kind = match status {
        StatusCode::UNAUTHORIZED => ApiErrorKind::Authentication,
        StatusCode::FORBIDDEN => ApiErrorKind::Authorization,
        StatusCode::NOT_FOUND => ApiErrorKind::NotFound,
        s if s.is_server_error() => ApiErrorKind::Server,
        _ => ApiErrorKind::Validation,
    };

    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|body| body.message)
        .filter(|message| !message.trim().is_empty());

    Error {
        source: message.map(Box::<dyn StdError + Send + Sync>::from),
        error_kind: ErrorKind::Api(kind),
    }
}
