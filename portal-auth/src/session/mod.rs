//! Session state: the authenticated identity, its persisted record, and the store
//! that owns both.

mod model;
mod record;
mod store;

pub use model::{Role, RoleParseError, Session, SessionState};
pub use record::{TOKEN_KEY, USER_KEY};
pub use store::Store;
