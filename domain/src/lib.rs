//! Typed access to the Event Portal resources.
//!
//! Every call goes through [`portal_auth::api::Client`], so each request carries the
//! session token, is refused locally when the role may not perform it, and ends the
//! session when the server rejects the token.

// Re-exports from `portal-auth` so views only need to depend on `domain`.
pub use portal_auth::{
    api::Client,
    capability::{self, Action},
    error::{ApiErrorKind, Error, ErrorKind},
    session::{Role, Session},
    storage::KeyValueStore,
};

pub mod event;
pub mod user;
