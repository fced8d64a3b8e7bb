//! Session identity types.

use std::fmt;
use std::str::FromStr;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

/// Account role, governing which actions a session may perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Organizer,
    Volunteer,
}

#[derive(Debug, PartialEq, Eq)]
pub struct RoleParseError;

impl fmt::Display for RoleParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "role must be ORGANIZER or VOLUNTEER")
    }
}

impl std::error::Error for RoleParseError {}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Organizer => "ORGANIZER",
            Role::Volunteer => "VOLUNTEER",
        }
    }
}

impl FromStr for Role {
    type Err = RoleParseError;
    fn from_str(role: &str) -> Result<Role, Self::Err> {
        match role.to_uppercase().as_str() {
            "ORGANIZER" => Ok(Role::Organizer),
            "VOLUNTEER" => Ok(Role::Volunteer),
            _ => Err(RoleParseError),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The authenticated user. All three fields always exist together; "logged out" is
/// the absence of a `Session`, never a partially filled one.
#[derive(Debug, Clone)]
pub struct Session {
    /// Email address the account is keyed by.
    pub identity: String,
    pub role: Role,
    /// Bearer credential sent with every request.
    pub token: SecretString,
}

impl Session {
    pub fn new(identity: impl Into<String>, role: Role, token: SecretString) -> Self {
        Self {
            identity: identity.into(),
            role,
            token,
        }
    }

    pub fn is_organizer(&self) -> bool {
        self.role == Role::Organizer
    }

    /// Whether this session was issued `token`.
    pub fn holds_token(&self, token: &SecretString) -> bool {
        self.token.expose_secret() == token.expose_secret()
    }
}

impl PartialEq for Session {
    fn eq(&self, other: &Self) -> bool {
        self.identity == other.identity && self.role == other.role && self.holds_token(&other.token)
    }
}

impl Eq for Session {}

/// What the session store currently knows.
///
/// Starts `Undetermined` and leaves it exactly once, when the persisted record has
/// been read (or a login/logout settled the question first).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Undetermined,
    Unauthenticated,
    Authenticated(Session),
}

impl SessionState {
    /// Whether startup restoration has finished.
    pub fn is_ready(&self) -> bool {
        !matches!(self, SessionState::Undetermined)
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated(_))
    }

    pub fn session(&self) -> Option<&Session> {
        match self {
            SessionState::Authenticated(session) => Some(session),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(value: &str) -> SecretString {
        SecretString::new(value.to_string())
    }

    #[test]
    fn test_role_parse_is_case_insensitive() {
        assert_eq!("ORGANIZER".parse::<Role>(), Ok(Role::Organizer));
        assert_eq!("volunteer".parse::<Role>(), Ok(Role::Volunteer));
        assert_eq!("admin".parse::<Role>(), Err(RoleParseError));
    }

    #[test]
    fn test_role_serializes_uppercase() {
        assert_eq!(
            serde_json::to_string(&Role::Volunteer).unwrap(),
            "\"VOLUNTEER\""
        );
        assert_eq!(
            serde_json::from_str::<Role>("\"ORGANIZER\"").unwrap(),
            Role::Organizer
        );
    }

    #[test]
    fn test_session_equality_compares_token() {
        let a = Session::new("a@x.com", Role::Volunteer, token("t1"));
        let b = Session::new("a@x.com", Role::Volunteer, token("t1"));
        let c = Session::new("a@x.com", Role::Volunteer, token("t2"));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_session_debug_redacts_token() {
        let session = Session::new("a@x.com", Role::Volunteer, token("super-secret"));
        assert!(!format!("{:?}", session).contains("super-secret"));
    }

    #[test]
    fn test_state_accessors() {
        assert!(!SessionState::Undetermined.is_ready());
        assert!(SessionState::Unauthenticated.is_ready());
        assert!(SessionState::Unauthenticated.session().is_none());

        let state =
            SessionState::Authenticated(Session::new("a@x.com", Role::Organizer, token("t")));
        assert!(state.is_ready());
        assert!(state.is_authenticated());
        assert!(state.session().unwrap().is_organizer());
    }
}
