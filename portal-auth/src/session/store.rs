//! The session store: who is logged in, for the lifetime of the process.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::*;
use reqwest::Method;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::{watch, Mutex};

use super::{record, Role, Session, SessionState};
use crate::error::{api_error, session_error, ApiErrorKind, Error, SessionErrorKind};
use crate::http::Transport;
use crate::notify::{LogNotifier, Notifier};
use crate::storage::KeyValueStore;

const LOGIN_PATH: &str = "/user/login";
const LOGOUT_PATH: &str = "/user/logout";

/// Longest `logout` waits for the server to acknowledge.
const LOGOUT_NOTICE_TIMEOUT: Duration = Duration::from_secs(2);

/// Successful `/user/login` response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    token: String,
    email_id: String,
    role: Role,
}

/// Single source of truth for the current session.
///
/// Construct one per process and share it behind an `Arc`. The in-memory state and
/// the persisted record are only ever changed here, under `write_lock`, so the two
/// never disagree for longer than one operation.
///
/// Every transition that ends a session (logout, forced logout) bumps `generation`
/// before taking the lock. A login remembers the generation it started in and
/// refuses to commit if it changed, which is what stops a slow login response from
/// bringing back a session the user already closed.
pub struct Store<S: KeyValueStore> {
    storage: S,
    transport: Transport,
    notifier: Arc<dyn Notifier>,
    state: watch::Sender<SessionState>,
    generation: AtomicU64,
    write_lock: Mutex<()>,
}

impl<S: KeyValueStore> Store<S> {
    /// Create a store in the `Undetermined` state. Call [`Store::initialize`] before
    /// making any routing decision.
    pub fn new(storage: S, transport: Transport) -> Self {
        let (state, _) = watch::channel(SessionState::Undetermined);
        Self {
            storage,
            transport,
            notifier: Arc::new(LogNotifier),
            state,
            generation: AtomicU64::new(0),
            write_lock: Mutex::new(()),
        }
    }

    /// Replace the default log-only notifier.
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    /// Restore the session saved by a previous run.
    ///
    /// A missing, partial or corrupt record, and a storage backend that cannot be
    /// read, all resolve to `Unauthenticated`. Runs once; later calls return the
    /// current state untouched.
    pub async fn initialize(&self) -> SessionState {
        let _guard = self.write_lock.lock().await;
        if self.state.borrow().is_ready() {
            debug!("Session store already initialized");
            return self.state();
        }

        let restored = match record::load(&self.storage).await {
            Ok(Some(session)) => {
                info!("Restored session for {} ({})", session.identity, session.role);
                SessionState::Authenticated(session)
            }
            Ok(None) => {
                debug!("No persisted session found");
                SessionState::Unauthenticated
            }
            Err(err) => {
                warn!("Could not read persisted session, starting logged out: {}", err);
                SessionState::Unauthenticated
            }
        };

        self.state.send_replace(restored.clone());
        restored
    }

    /// Authenticate against the API and, on success, persist and adopt the session.
    ///
    /// On failure the current session is left as it was and the returned error's
    /// [`Error::reason`] carries the server's message when it sent one. Both outcomes
    /// are reported to the notifier.
    pub async fn login(&self, identity: &str, credential: &SecretString) -> Result<Session, Error> {
        let generation = self.generation.load(Ordering::SeqCst);

        let result = match self.request_login(identity, credential).await {
            Ok(session) => self.commit_login(generation, session).await,
            Err(err) => Err(err),
        };

        match &result {
            Ok(session) => {
                info!("Logged in as {} ({})", session.identity, session.role);
                self.notifier.success("Login Successful!");
            }
            Err(err) => {
                warn!("Login failed for {}: {}", identity, err);
                self.notifier.error(&err.reason_or("Login failed"));
            }
        }

        result
    }

    /// End the session.
    ///
    /// Local state is cleared first and unconditionally. The server is then told
    /// the token is done with, in a single attempt bounded by
    /// `LOGOUT_NOTICE_TIMEOUT`; a failure or timeout is only logged.
    /// Calling this with no session is a harmless no-op.
    pub async fn logout(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);

        let previous = {
            let _guard = self.write_lock.lock().await;
            let previous = self.state.send_replace(SessionState::Unauthenticated);
            if let Err(err) = record::clear(&self.storage).await {
                error!("Failed to clear persisted session: {}", err);
            }
            previous
        };

        match previous {
            SessionState::Authenticated(session) => {
                let notice = self
                    .transport
                    .send(Method::POST, LOGOUT_PATH, Some(&session.token), None);
                match tokio::time::timeout(LOGOUT_NOTICE_TIMEOUT, notice).await {
                    Ok(Ok(_)) => {}
                    Ok(Err(err)) => {
                        warn!("Logout notification failed, local session already cleared: {}", err)
                    }
                    Err(_) => warn!(
                        "Logout notification got no answer within {:?}, local session already cleared",
                        LOGOUT_NOTICE_TIMEOUT
                    ),
                }
                info!("Logged out {}", session.identity);
            }
            _ => debug!("Logout requested without an active session"),
        }

        self.notifier.success("Logged out");
    }

    /// Drop the session because the server rejected `token`.
    ///
    /// Only acts while `token` still belongs to the current session, so a late
    /// rejection of an old token cannot end a newer session. Returns whether the
    /// session was dropped.
    pub async fn invalidate(&self, token: &SecretString) -> bool {
        let _guard = self.write_lock.lock().await;

        let identity = match self.state.borrow().session() {
            Some(session) if session.holds_token(token) => session.identity.clone(),
            _ => {
                debug!("Ignoring rejection of a token that is no longer current");
                return false;
            }
        };

        self.generation.fetch_add(1, Ordering::SeqCst);
        self.state.send_replace(SessionState::Unauthenticated);
        if let Err(err) = record::clear(&self.storage).await {
            error!("Failed to clear persisted session: {}", err);
        }

        warn!("Session for {} was rejected by the server, logged out", identity);
        self.notifier
            .error("Your session has expired. Please log in again.");
        true
    }

    /// The current session, or `None` when logged out or not yet initialized.
    pub fn current(&self) -> Option<Session> {
        self.state.borrow().session().cloned()
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Whether [`Store::initialize`] (or a login/logout) has settled the state.
    pub fn is_ready(&self) -> bool {
        self.state.borrow().is_ready()
    }

    /// Watch state transitions.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    async fn request_login(&self, identity: &str, credential: &SecretString) -> Result<Session, Error> {
        let body = json!({
            "emailId": identity,
            "password": credential.expose_secret(),
        });

        let text = self
            .transport
            .send(Method::POST, LOGIN_PATH, None, Some(&body))
            .await?;
        let response: LoginResponse = serde_json::from_str(&text)?;

        if response.token.trim().is_empty() || response.email_id.trim().is_empty() {
            return Err(api_error(
                ApiErrorKind::InvalidResponse,
                "Login response is missing the token or email",
            ));
        }

        Ok(Session::new(
            response.email_id,
            response.role,
            SecretString::new(response.token),
        ))
    }

    async fn commit_login(&self, generation: u64, session: Session) -> Result<Session, Error> {
        let _guard = self.write_lock.lock().await;

        if self.generation.load(Ordering::SeqCst) != generation {
            return Err(session_error(
                SessionErrorKind::Superseded,
                "You were logged out while signing in",
            ));
        }

        if let Err(err) = record::save(&self.storage, &session).await {
            self.restore_record().await;
            return Err(err);
        }

        self.state
            .send_replace(SessionState::Authenticated(session.clone()));
        Ok(session)
    }

    /// Put the persisted record back in line with the in-memory state after a
    /// failed write.
    async fn restore_record(&self) {
        let current = self.current();
        let result = match &current {
            Some(session) => record::save(&self.storage, session).await,
            None => record::clear(&self.storage).await,
        };
        if let Err(err) = result {
            error!("Persisted session may be inconsistent: {}", err);
        }
    }
}
