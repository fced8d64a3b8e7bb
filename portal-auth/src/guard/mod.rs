//! Navigation gating for protected views.
//!
//! [`RouteGuard`] answers, for one navigation, whether the requested view may
//! render, must wait for the session store, or must send the user to the login
//! view. [`Navigator`] applies those answers and remembers where the user is, so
//! views can tell when a response arrives for a page they have already left.

mod navigator;
mod route;
mod route_guard;

pub use navigator::{Navigation, NavigationTicket, Navigator};
pub use route::{Route, RouteParseError};
pub use route_guard::{decide, Decision, RouteGuard};
