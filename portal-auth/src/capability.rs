//! Which role may perform which action.
//!
//! The same table backs what the front end offers and what the API client is willing
//! to send, so hiding a button is never the only thing standing between a volunteer
//! and an organizer-only request. The server remains the final authority.

use std::fmt;

use crate::session::Role;

/// Actions a user can trigger against the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Login,
    Logout,
    SignUp,
    ListEvents,
    ViewEvent,
    ViewAnalytics,
    CreateEvent,
    UpdateEvent,
    DeleteEvent,
    RegisterForEvent,
    UnregisterFromEvent,
    ListMyRegistrations,
    ViewProfile,
    UpdateProfile,
    ChangePassword,
}

/// Who may perform an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    /// Anyone, logged in or not.
    Public,
    /// Any logged-in user.
    Session,
    /// A logged-in user with exactly this role.
    Role(Role),
}

impl Action {
    pub fn requirement(self) -> Requirement {
        match self {
            Action::Login | Action::SignUp => Requirement::Public,
            Action::Logout
            | Action::ListEvents
            | Action::ViewEvent
            | Action::ViewAnalytics
            | Action::ViewProfile
            | Action::UpdateProfile
            | Action::ChangePassword => Requirement::Session,
            Action::CreateEvent | Action::UpdateEvent | Action::DeleteEvent => {
                Requirement::Role(Role::Organizer)
            }
            Action::RegisterForEvent
            | Action::UnregisterFromEvent
            | Action::ListMyRegistrations => Requirement::Role(Role::Volunteer),
        }
    }

    pub fn requires_session(self) -> bool {
        self.requirement() != Requirement::Public
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Action::Login => "log in",
            Action::Logout => "log out",
            Action::SignUp => "sign up",
            Action::ListEvents => "list events",
            Action::ViewEvent => "view an event",
            Action::ViewAnalytics => "view event analytics",
            Action::CreateEvent => "create events",
            Action::UpdateEvent => "edit events",
            Action::DeleteEvent => "delete events",
            Action::RegisterForEvent => "register for events",
            Action::UnregisterFromEvent => "unregister from events",
            Action::ListMyRegistrations => "list registrations",
            Action::ViewProfile => "view the profile",
            Action::UpdateProfile => "update the profile",
            Action::ChangePassword => "change the password",
        }
    }
}

impl Action {
    pub const ALL: [Action; 15] = [
        Action::Login,
        Action::Logout,
        Action::SignUp,
        Action::ListEvents,
        Action::ViewEvent,
        Action::ViewAnalytics,
        Action::CreateEvent,
        Action::UpdateEvent,
        Action::DeleteEvent,
        Action::RegisterForEvent,
        Action::UnregisterFromEvent,
        Action::ListMyRegistrations,
        Action::ViewProfile,
        Action::UpdateProfile,
        Action::ChangePassword,
    ];
}

/// Actions a user with `role` may perform, in [`Action::ALL`] order.
pub fn allowed_actions(role: Option<Role>) -> impl Iterator<Item = Action> {
    Action::ALL
        .into_iter()
        .filter(move |action| is_allowed(role, *action))
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Whether a user with `role` (`None` when logged out) may perform `action`.
pub fn is_allowed(role: Option<Role>, action: Action) -> bool {
    match (action.requirement(), role) {
        (Requirement::Public, _) => true,
        (Requirement::Session, role) => role.is_some(),
        (Requirement::Role(required), Some(role)) => required == role,
        (Requirement::Role(_), None) => false,
    }
}
