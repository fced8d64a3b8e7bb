//! The persisted form of a session: a `token` entry and a `user` JSON entry.

use log::*;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::{Role, Session};
use crate::error::{storage_error, Error, StorageErrorKind};
use crate::storage::KeyValueStore;

pub const TOKEN_KEY: &str = "token";
pub const USER_KEY: &str = "user";

/// The `user` entry.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredUser {
    email_id: String,
    role: Role,
}

/// Turn the two raw entries into a session, or `None` if they do not form a
/// complete, well-formed record.
pub(crate) fn decode(token: Option<&str>, user: Option<&str>) -> Option<Session> {
    let token = token.filter(|t| !t.trim().is_empty())?;
    let user: StoredUser = serde_json::from_str(user?).ok()?;
    if user.email_id.trim().is_empty() {
        return None;
    }
    Some(Session::new(
        user.email_id,
        user.role,
        SecretString::new(token.to_string()),
    ))
}

/// Read the persisted session.
///
/// `Ok(None)` covers both "nothing saved" and "saved data is unusable"; in the
/// second case the leftovers are removed so they are not re-read on every start.
/// Only a failing storage backend is an error.
pub(crate) async fn load<S: KeyValueStore>(storage: &S) -> Result<Option<Session>, Error> {
    let token = storage.get(TOKEN_KEY).await?;
    let user = storage.get(USER_KEY).await?;

    if token.is_none() && user.is_none() {
        return Ok(None);
    }

    match decode(token.as_deref(), user.as_deref()) {
        Some(session) => Ok(Some(session)),
        None => {
            warn!(
                "Discarding incomplete persisted session (token: {}, user: {})",
                token.is_some(),
                user.is_some()
            );
            clear(storage).await?;
            Ok(None)
        }
    }
}

pub(crate) async fn save<S: KeyValueStore>(storage: &S, session: &Session) -> Result<(), Error> {
    let user = serde_json::to_string(&StoredUser {
        email_id: session.identity.clone(),
        role: session.role,
    })
    .map_err(|err| storage_error(StorageErrorKind::Write, err))?;
    storage
        .set(TOKEN_KEY, session.token.expose_secret().as_str())
        .await?;
    storage.set(USER_KEY, &user).await
}

pub(crate) async fn clear<S: KeyValueStore>(storage: &S) -> Result<(), Error> {
    storage.remove(TOKEN_KEY).await?;
    storage.remove(USER_KEY).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn test_decode_complete_record() {
        let session = decode(
            Some("t1"),
            Some(r#"{"emailId":"a@x.com","role":"VOLUNTEER"}"#),
        )
        .unwrap();
        assert_eq!(session.identity, "a@x.com");
        assert_eq!(session.role, Role::Volunteer);
        assert_eq!(session.token.expose_secret(), "t1");
    }

    #[test]
    fn test_decode_rejects_partial_or_corrupt_records() {
        let user = r#"{"emailId":"a@x.com","role":"VOLUNTEER"}"#;
        assert!(decode(Some("t1"), None).is_none());
        assert!(decode(None, Some(user)).is_none());
        assert!(decode(Some(""), Some(user)).is_none());
        assert!(decode(Some("t1"), Some("not json")).is_none());
        assert!(decode(Some("t1"), Some(r#"{"emailId":"a@x.com"}"#)).is_none());
        assert!(decode(Some("t1"), Some(r#"{"emailId":"a@x.com","role":"ADMIN"}"#)).is_none());
        assert!(decode(Some("t1"), Some(r#"{"emailId":"","role":"VOLUNTEER"}"#)).is_none());
    }

    #[tokio::test]
    async fn test_save_then_load_round_trips() {
        let storage = MemoryStore::new();
        let session = Session::new(
            "org@x.com",
            Role::Organizer,
            SecretString::new("t9".to_string()),
        );

        save(&storage, &session).await.unwrap();

        assert_eq!(
            storage.get(USER_KEY).await.unwrap().as_deref(),
            Some(r#"{"emailId":"org@x.com","role":"ORGANIZER"}"#)
        );
        assert_eq!(load(&storage).await.unwrap(), Some(session));
    }

    #[tokio::test]
    async fn test_load_removes_partial_record() {
        let storage = MemoryStore::with_entries([(TOKEN_KEY, "t1")]);

        assert_eq!(load(&storage).await.unwrap(), None);
        assert!(storage.is_empty().await);
    }
}
