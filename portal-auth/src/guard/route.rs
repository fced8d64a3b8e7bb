//! The views a user can navigate to.

use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Route {
    /// `/`, which forwards to the dashboard.
    Root,
    Login,
    Register,
    Dashboard,
    CreateEvent,
    EditEvent(String),
    EventDetails(String),
    Profile,
    ResetPassword,
}

#[derive(Debug, PartialEq, Eq)]
pub struct RouteParseError(pub String);

impl fmt::Display for RouteParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "no view at path {}", self.0)
    }
}

impl std::error::Error for RouteParseError {}

impl Route {
    /// Views anyone may open without a session.
    pub fn is_public(&self) -> bool {
        matches!(self, Route::Login | Route::Register)
    }

    pub fn is_protected(&self) -> bool {
        !self.is_public()
    }

    pub fn path(&self) -> String {
        match self {
            Route::Root => "/".to_string(),
            Route::Login => "/login".to_string(),
            Route::Register => "/register".to_string(),
            Route::Dashboard => "/dashboard".to_string(),
            Route::CreateEvent => "/create-event".to_string(),
            Route::EditEvent(id) => format!("/edit-event/{}", id),
            Route::EventDetails(id) => format!("/event/{}", id),
            Route::Profile => "/profile".to_string(),
            Route::ResetPassword => "/reset-password".to_string(),
        }
    }
}

impl FromStr for Route {
    type Err = RouteParseError;

    fn from_str(path: &str) -> Result<Route, Self::Err> {
        let trimmed = path.split(['?', '#']).next().unwrap_or_default();
        let segments: Vec<&str> = trimmed.split('/').filter(|s| !s.is_empty()).collect();

        match segments.as_slice() {
            [] => Ok(Route::Root),
            ["login"] => Ok(Route::Login),
            ["register"] => Ok(Route::Register),
            ["dashboard"] => Ok(Route::Dashboard),
            ["create-event"] => Ok(Route::CreateEvent),
            ["edit-event", id] => Ok(Route::EditEvent(id.to_string())),
            ["event", id] => Ok(Route::EventDetails(id.to_string())),
            ["profile"] => Ok(Route::Profile),
            ["reset-password"] => Ok(Route::ResetPassword),
            _ => Err(RouteParseError(path.to_string())),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.path())
    }
}
