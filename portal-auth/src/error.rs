//! Error types for the `portal-auth` crate.
//!
//! Follows the same pattern as the other layers: a root `Error` struct holding an
//! error kind tree and an optional source for error chaining. For failures that
//! came back from the API the source is the server's own `message`, which is what
//! gets shown to the user.

use std::error::Error as StdError;
use std::fmt;

/// Top-level error type for portal-auth crate.
/// Holds error kind and optional source for error chaining.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: ErrorKind,
}

/// Major categories of errors in portal-auth.
#[derive(Debug, PartialEq)]
pub enum ErrorKind {
    Api(ApiErrorKind),
    Session(SessionErrorKind),
    Storage(StorageErrorKind),
    Http(HttpErrorKind),
}

/// Failures of a call against the remote API, classified by cause.
#[derive(Debug, PartialEq)]
pub enum ApiErrorKind {
    /// The request never produced a response (connect, timeout, transport).
    Network,
    /// 401: credentials rejected or the token is no longer valid.
    Authentication,
    /// 403, or refused locally because the role may not perform the action.
    Authorization,
    /// 400-class request problems, including local form checks.
    Validation,
    NotFound,
    /// 5xx responses.
    Server,
    /// A successful response whose body could not be decoded.
    InvalidResponse,
}

/// Errors from session state transitions.
#[derive(Debug, PartialEq)]
pub enum SessionErrorKind {
    /// A login finished after a logout or forced logout closed the session it belonged to.
    Superseded,
}

/// Errors from the persisted key-value storage.
#[derive(Debug, PartialEq)]
pub enum StorageErrorKind {
    Read,
    Write,
}

/// Errors from building or addressing the HTTP client.
#[derive(Debug, PartialEq)]
pub enum HttpErrorKind {
    BuilderFailed,
    InvalidUrl,
}

impl Error {
    /// Message suitable for showing to a user.
    pub fn reason(&self) -> String {
        self.reason_or(&self.to_string())
    }

    /// The server-provided or locally attached message, else `fallback`.
    ///
    /// Transport and decoding failures never carry a user-facing message, so they
    /// always fall back.
    pub fn reason_or(&self, fallback: &str) -> String {
        match (&self.error_kind, &self.source) {
            (ErrorKind::Api(ApiErrorKind::Network), _)
            | (ErrorKind::Api(ApiErrorKind::InvalidResponse), _) => fallback.to_string(),
            (_, Some(source)) => source.to_string(),
            (_, None) => fallback.to_string(),
        }
    }

    pub fn is_authentication(&self) -> bool {
        self.error_kind == ErrorKind::Api(ApiErrorKind::Authentication)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.error_kind {
            ErrorKind::Api(kind) => write!(f, "API error: {:?}", kind)?,
            ErrorKind::Session(kind) => write!(f, "Session error: {:?}", kind)?,
            ErrorKind::Storage(kind) => write!(f, "Storage error: {:?}", kind)?,
            ErrorKind::Http(kind) => write!(f, "HTTP error: {:?}", kind)?,
        }
        if let Some(source) = &self.source {
            write!(f, " ({})", source)?;
        }
        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        let error_kind = if err.is_builder() {
            ErrorKind::Http(HttpErrorKind::BuilderFailed)
        } else if err.is_decode() {
            ErrorKind::Api(ApiErrorKind::InvalidResponse)
        } else {
            ErrorKind::Api(ApiErrorKind::Network)
        };

        Error {
            source: Some(Box::new(err)),
            error_kind,
        }
    }
}

impl From<reqwest_middleware::Error> for Error {
    fn from(err: reqwest_middleware::Error) -> Self {
        match err {
            reqwest_middleware::Error::Reqwest(err) => err.into(),
            other => Error {
                source: Some(Box::new(other)),
                error_kind: ErrorKind::Api(ApiErrorKind::Network),
            },
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error {
            source: Some(Box::new(err)),
            error_kind: ErrorKind::Api(ApiErrorKind::InvalidResponse),
        }
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error {
            source: Some(Box::new(err)),
            error_kind: ErrorKind::Http(HttpErrorKind::InvalidUrl),
        }
    }
}

/// Helper function to create API errors.
pub fn api_error(kind: ApiErrorKind, message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: ErrorKind::Api(kind),
    }
}

/// Helper function to create session errors.
pub fn session_error(kind: SessionErrorKind, message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: ErrorKind::Session(kind),
    }
}

/// Helper function to create storage errors, keeping the underlying cause.
pub fn storage_error<E>(kind: StorageErrorKind, err: E) -> Error
where
    E: Into<Box<dyn StdError + Send + Sync>>,
{
    Error {
        source: Some(err.into()),
        error_kind: ErrorKind::Storage(kind),
    }
}
