//! The authenticated API client every view issues its requests through.

use std::sync::Arc;

use log::*;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::capability::{self, Action};
use crate::error::{api_error, ApiErrorKind, Error};
use crate::session::{Session, Store};
use crate::storage::KeyValueStore;

/// Sends requests on behalf of the current session.
///
/// For every request it:
/// 1. Refuses locally if the session's role may not perform the action
/// 2. Attaches the current session token
/// 3. Ends the session if the server answers 401 for that token
///
/// All other failures are returned to the caller untouched.
pub struct Client<S: KeyValueStore> {
    store: Arc<Store<S>>,
}

impl<S: KeyValueStore> Clone for Client<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S: KeyValueStore> Client<S> {
    pub fn new(store: Arc<Store<S>>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<Store<S>> {
        &self.store
    }

    /// The session requests are currently sent as.
    pub fn session(&self) -> Option<Session> {
        self.store.current()
    }

    /// Send a request and decode the JSON response body.
    pub async fn send<T: DeserializeOwned>(
        &self,
        action: Action,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<T, Error> {
        let text = self.dispatch(action, method, path, body).await?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Send a request whose response body is not needed.
    pub async fn execute(
        &self,
        action: Action,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<(), Error> {
        self.dispatch(action, method, path, body).await.map(|_| ())
    }

    async fn dispatch(
        &self,
        action: Action,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<String, Error> {
        let session = self.store.current();
        let role = session.as_ref().map(|s| s.role);

        if !capability::is_allowed(role, action) {
            warn!("Refusing to {} for role {:?}", action, role);
            return Err(match role {
                None => api_error(ApiErrorKind::Authentication, "Please log in to continue"),
                Some(role) => api_error(
                    ApiErrorKind::Authorization,
                    &format!("A {} account cannot {}", role, action),
                ),
            });
        }

        let token = session.map(|s| s.token);
        let result = self
            .store
            .transport()
            .send(method, path, token.as_ref(), body)
            .await;

        if let (Err(err), Some(token)) = (&result, &token) {
            if err.is_authentication() {
                self.store.invalidate(token).await;
            }
        }

        result
    }
}
