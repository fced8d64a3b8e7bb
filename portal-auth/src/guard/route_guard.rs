//! Per-navigation gate deciding whether a view may render.

use std::sync::Arc;

use log::*;

use super::Route;
use crate::session::{SessionState, Store};
use crate::storage::KeyValueStore;

/// Outcome of guarding one navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// The session is not known yet: show a neutral placeholder and decide later.
    Pending,
    /// Render the requested view.
    Render(Route),
    /// Send the user elsewhere instead.
    Redirect(Route),
}

/// Decide a navigation against a given session state.
///
/// `/` always forwards to the dashboard, which is then guarded like any other
/// view. Public views render regardless of the session.
pub fn decide(state: &SessionState, route: &Route) -> Decision {
    match (state, route) {
        (SessionState::Undetermined, _) => Decision::Pending,
        (_, Route::Root) => Decision::Redirect(Route::Dashboard),
        (_, route) if route.is_public() => Decision::Render(route.clone()),
        (SessionState::Authenticated(_), route) => Decision::Render(route.clone()),
        (SessionState::Unauthenticated, _) => Decision::Redirect(Route::Login),
    }
}

/// Gate for protected views, backed by the session store.
///
/// Nothing is cached: each call looks at the store's state as it is now, since the
/// session can end while views stay open.
pub struct RouteGuard<S: KeyValueStore> {
    store: Arc<Store<S>>,
}

impl<S: KeyValueStore> Clone for RouteGuard<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S: KeyValueStore> RouteGuard<S> {
    pub fn new(store: Arc<Store<S>>) -> Self {
        Self { store }
    }

    /// Decide immediately; yields [`Decision::Pending`] before the store is ready.
    pub fn evaluate(&self, route: &Route) -> Decision {
        let decision = decide(&self.store.state(), route);
        trace!("Guard {} -> {:?}", route, decision);
        decision
    }

    /// Wait for the store to leave `Undetermined`, then decide.
    pub async fn resolve(&self, route: &Route) -> Decision {
        let mut rx = self.store.subscribe();
        let decision = match rx.wait_for(SessionState::is_ready).await {
            Ok(state) => decide(&state, route),
            // The sender lives inside the store we hold, so this cannot happen;
            // fall back to whatever the store reports.
            Err(_) => decide(&self.store.state(), route),
        };
        debug!("Guard {} -> {:?}", route, decision);
        decision
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{HttpClientConfig, Transport};
    use crate::session::{Role, Session, TOKEN_KEY, USER_KEY};
    use crate::storage::MemoryStore;
    use secrecy::SecretString;
    use std::time::Duration;

    fn authenticated() -> SessionState {
        SessionState::Authenticated(Session::new(
            "a@x.com",
            Role::Volunteer,
            SecretString::new("t".to_string()),
        ))
    }

    fn store_with(storage: MemoryStore) -> Arc<Store<MemoryStore>> {
        let transport = Transport::new("http://localhost:8080", HttpClientConfig::default()).unwrap();
        Arc::new(Store::new(storage, transport))
    }

    #[test]
    fn test_undetermined_is_always_pending() {
        for route in [Route::Login, Route::Dashboard, Route::Root] {
            assert_eq!(decide(&SessionState::Undetermined, &route), Decision::Pending);
        }
    }

    #[test]
    fn test_unauthenticated_protected_redirects_to_login() {
        assert_eq!(
            decide(&SessionState::Unauthenticated, &Route::Profile),
            Decision::Redirect(Route::Login)
        );
        assert_eq!(
            decide(
                &SessionState::Unauthenticated,
                &Route::EventDetails("1".to_string())
            ),
            Decision::Redirect(Route::Login)
        );
    }

    #[test]
    fn test_public_routes_render_for_everyone() {
        for state in [SessionState::Unauthenticated, authenticated()] {
            assert_eq!(
                decide(&state, &Route::Register),
                Decision::Render(Route::Register)
            );
        }
    }

    #[test]
    fn test_authenticated_renders_protected() {
        assert_eq!(
            decide(&authenticated(), &Route::CreateEvent),
            Decision::Render(Route::CreateEvent)
        );
    }

    #[test]
    fn test_root_forwards_to_dashboard() {
        assert_eq!(
            decide(&SessionState::Unauthenticated, &Route::Root),
            Decision::Redirect(Route::Dashboard)
        );
    }

    #[tokio::test]
    async fn test_pending_until_initialized_then_redirect() {
        let store = store_with(MemoryStore::new());
        let guard = RouteGuard::new(store.clone());

        assert_eq!(guard.evaluate(&Route::Dashboard), Decision::Pending);

        store.initialize().await;

        assert_eq!(
            guard.evaluate(&Route::Dashboard),
            Decision::Redirect(Route::Login)
        );
    }

    #[tokio::test]
    async fn test_resolve_waits_for_initialize() {
        let store = store_with(MemoryStore::with_entries([
            (TOKEN_KEY, "t"),
            (USER_KEY, r#"{"emailId":"a@x.com","role":"ORGANIZER"}"#),
        ]));
        let guard = RouteGuard::new(store.clone());

        let pending = tokio::spawn({
            let guard = guard.clone();
            async move { guard.resolve(&Route::CreateEvent).await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!pending.is_finished());

        store.initialize().await;

        assert_eq!(
            pending.await.unwrap(),
            Decision::Render(Route::CreateEvent)
        );
    }

    #[tokio::test]
    async fn test_decision_is_recomputed_after_logout() {
        let store = store_with(MemoryStore::with_entries([
            (TOKEN_KEY, "t"),
            (USER_KEY, r#"{"emailId":"a@x.com","role":"VOLUNTEER"}"#),
        ]));
        let guard = RouteGuard::new(store.clone());
        store.initialize().await;
        assert_eq!(
            guard.evaluate(&Route::Profile),
            Decision::Render(Route::Profile)
        );

        // The server rejected the token on some unrelated request.
        store.invalidate(&SecretString::new("t".to_string())).await;

        assert_eq!(
            guard.evaluate(&Route::Profile),
            Decision::Redirect(Route::Login)
        );
    }
}
