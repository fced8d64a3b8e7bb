//! # portal-auth
//!
//! Session handling for the Event Portal client:
//! - The session store: login, logout, restoring the persisted session on start
//! - Route guarding for protected views, and stale-view detection
//! - The role capability table shared by views and the API client
//! - The authenticated API client that attaches the session token and ends the
//!   session when the server rejects it
//! - HTTP client building with retry middleware
//!
//! ## Usage
//!
//! ```rust,ignore
//! use portal_auth::{
//!     api::Client,
//!     guard::{Navigator, Route, RouteGuard},
//!     http::{HttpClientConfig, Transport},
//!     session::Store,
//!     storage::FileStore,
//! };
//!
//! let transport = Transport::new("http://localhost:8080", HttpClientConfig::default())?;
//! let store = Arc::new(Store::new(FileStore::new(".session.json"), transport));
//! store.initialize().await;
//!
//! let navigator = Navigator::new(RouteGuard::new(store.clone()));
//! let client = Client::new(store.clone());
//! ```

pub mod api;
pub mod capability;
pub mod error;
pub mod guard;
pub mod http;
pub mod notify;
pub mod session;
pub mod storage;

// Re-export commonly used types
pub use error::{Error, ErrorKind};
