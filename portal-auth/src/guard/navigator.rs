//! Tracks the current view and hands out tickets that go stale on navigation.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use log::*;
use tokio::sync::watch;

use super::{Decision, Route, RouteGuard};
use crate::storage::KeyValueStore;

/// Redirect chains are short (`/` -> `/dashboard` -> `/login`); anything longer is a bug.
const MAX_REDIRECTS: usize = 4;

/// Where a navigation ended up.
#[derive(Debug, Clone)]
pub struct Navigation {
    pub requested: Route,
    pub landed: Route,
    pub ticket: NavigationTicket,
}

impl Navigation {
    pub fn was_redirected(&self) -> bool {
        self.requested != self.landed
    }
}

/// Identifies one visit to a view.
///
/// A view takes the ticket when it starts a request and checks it when the response
/// arrives; if the user navigated in between, the response belongs to a view that
/// is gone and is dropped.
#[derive(Debug, Clone)]
pub struct NavigationTicket {
    issued: u64,
    sequence: Arc<AtomicU64>,
}

impl NavigationTicket {
    pub fn is_current(&self) -> bool {
        self.sequence.load(Ordering::SeqCst) == self.issued
    }

    /// Pass `value` through only while the visit it was fetched for is still current.
    pub fn accept<T>(&self, value: T) -> Option<T> {
        if self.is_current() {
            Some(value)
        } else {
            debug!("Dropping response for a view that is no longer shown");
            None
        }
    }
}

/// Applies [`RouteGuard`] decisions and remembers the current view.
pub struct Navigator<S: KeyValueStore> {
    guard: RouteGuard<S>,
    current: watch::Sender<Option<Route>>,
    sequence: Arc<AtomicU64>,
}

impl<S: KeyValueStore> Navigator<S> {
    pub fn new(guard: RouteGuard<S>) -> Self {
        let (current, _) = watch::channel(None);
        Self {
            guard,
            current,
            sequence: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Navigate to `requested`, following guard redirects, and make the landed
    /// view current. Waits for the session store to be ready first.
    pub async fn navigate(&self, requested: Route) -> Navigation {
        let mut route = requested.clone();

        for _ in 0..MAX_REDIRECTS {
            match self.guard.resolve(&route).await {
                Decision::Render(landed) => return self.land(requested, landed),
                Decision::Redirect(target) => {
                    debug!("Redirecting {} -> {}", route, target);
                    route = target;
                }
                Decision::Pending => continue,
            }
        }

        warn!("Too many redirects from {}, falling back to login", requested);
        self.land(requested, Route::Login)
    }

    /// Re-check the current view against the session, e.g. after a logout that
    /// happened while it was shown. Returns the new navigation if the view had to
    /// be left.
    pub async fn revalidate(&self) -> Option<Navigation> {
        let route = self.current()?;
        match self.guard.resolve(&route).await {
            Decision::Render(_) => None,
            _ => Some(self.navigate(route).await),
        }
    }

    pub fn current(&self) -> Option<Route> {
        self.current.borrow().clone()
    }

    /// Ticket for the view shown right now.
    pub fn ticket(&self) -> NavigationTicket {
        NavigationTicket {
            issued: self.sequence.load(Ordering::SeqCst),
            sequence: self.sequence.clone(),
        }
    }

    fn land(&self, requested: Route, landed: Route) -> Navigation {
        let issued = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        self.current.send_replace(Some(landed.clone()));
        info!("Showing {}", landed);

        Navigation {
            requested,
            landed,
            ticket: NavigationTicket {
                issued,
                sequence: self.sequence.clone(),
            },
        }
    }
}
