//! Session store: the single authority for who is signed in.
//!
//! SYSTEM CONTEXT
//! ==============
//! Built once in `main` and shared as `Arc<SessionStore>` with the guard and
//! every page. The backend is the source of truth; the store mirrors its
//! answer in memory and in [`SessionStorage`] so a restart can rehydrate.
//!
//! INVARIANTS
//! ==========
//! - Identity and token are set together and cleared together, in memory and
//!   in storage. Every commit runs under `commit_lock`, and storage is
//!   written before memory so a failed write leaves the session unchanged.
//! - `loading` is true exactly while a login, register, or re-validation
//!   request is outstanding.
//! - The phase stays [`AuthPhase::Unknown`] until the first operation
//!   settles, so guards never redirect on a not-yet-checked session.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;

use crate::net::api::Backend;
use crate::net::types::{AccountKind, ApiError, AuthGrant, Credentials, Identity, RegisterData};
use crate::storage::{SessionStorage, StorageError};

// =============================================================================
// ERROR
// =============================================================================

/// Failures surfaced to callers of the session store and pages.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The request could not be sent or its response could not be read.
    #[error("network failure: {0}")]
    NetworkFailure(String),

    /// The backend answered with a non-success status.
    #[error("request rejected with status {status}: {message}")]
    RejectedCredentials { status: u16, message: String },

    /// A client-side check failed before any request was made.
    #[error("{0}")]
    ValidationFailure(String),

    /// The persisted session could not be written.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The operation needs a signed-in session.
    #[error("not signed in")]
    NotAuthenticated,
}

impl SessionError {
    /// The single message shown to the user for this failure.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::NetworkFailure(_) => "Could not reach the server. Check your connection and try again.".to_owned(),
            Self::RejectedCredentials { message, .. } => message.clone(),
            Self::ValidationFailure(message) => message.clone(),
            Self::Storage(_) => "Could not save your session on this device.".to_owned(),
            Self::NotAuthenticated => "Please sign in first.".to_owned(),
        }
    }
}

impl From<ApiError> for SessionError {
    fn from(error: ApiError) -> Self {
        match error {
            ApiError::Rejected { status, body } => {
                Self::RejectedCredentials { status, message: rejection_message(status, &body) }
            }
            ApiError::Network(message) | ApiError::Malformed(message) | ApiError::HttpClientBuild(message) => {
                Self::NetworkFailure(message)
            }
        }
    }
}

/// Prefer the backend's own `message`/`error` text over a bare status.
fn rejection_message(status: u16, body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            ["message", "error"]
                .iter()
                .find_map(|key| value.get(*key).and_then(serde_json::Value::as_str).map(ToOwned::to_owned))
        })
        .filter(|message| !message.trim().is_empty())
        .unwrap_or_else(|| format!("Request failed with status {status}"))
}

// =============================================================================
// STATE
// =============================================================================

/// Identity-level view of the session used by guards.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthPhase {
    /// A request is outstanding or the session has not been checked yet.
    Unknown,
    Anonymous,
    Authenticated(AccountKind),
}

/// Snapshot of the session published to subscribers.
#[derive(Clone, Default, PartialEq)]
pub struct SessionState {
    identity: Option<Identity>,
    token: Option<String>,
    in_flight: usize,
    settled: bool,
}

impl SessionState {
    #[must_use]
    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.in_flight > 0
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }

    #[must_use]
    pub fn phase(&self) -> AuthPhase {
        if self.is_loading() || !self.settled {
            return AuthPhase::Unknown;
        }
        match &self.identity {
            Some(identity) => AuthPhase::Authenticated(identity.account_kind),
            None => AuthPhase::Anonymous,
        }
    }
}

impl fmt::Debug for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionState")
            .field("identity", &self.identity)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("in_flight", &self.in_flight)
            .field("settled", &self.settled)
            .finish()
    }
}

/// Marks a request outstanding for as long as it lives.
struct Loading<'a> {
    state: &'a watch::Sender<SessionState>,
}

impl<'a> Loading<'a> {
    fn begin(state: &'a watch::Sender<SessionState>) -> Self {
        state.send_modify(|s| s.in_flight += 1);
        Self { state }
    }
}

impl Drop for Loading<'_> {
    fn drop(&mut self) {
        self.state.send_modify(|s| {
            s.in_flight = s.in_flight.saturating_sub(1);
            s.settled = true;
        });
    }
}

// =============================================================================
// STORE
// =============================================================================

pub struct SessionStore {
    backend: Arc<dyn Backend>,
    storage: Arc<dyn SessionStorage>,
    state: watch::Sender<SessionState>,
    commit_lock: Mutex<()>,
}

impl SessionStore {
    #[must_use]
    pub fn new(backend: Arc<dyn Backend>, storage: Arc<dyn SessionStorage>) -> Self {
        let (state, _) = watch::channel(SessionState::default());
        Self { backend, storage, state, commit_lock: Mutex::new(()) }
    }

    /// Backend shared with pages that make authenticated calls.
    #[must_use]
    pub fn backend(&self) -> Arc<dyn Backend> {
        Arc::clone(&self.backend)
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Receiver that observes every session change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    #[must_use]
    pub fn identity(&self) -> Option<Identity> {
        self.state.borrow().identity.clone()
    }

    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.state.borrow().token.clone()
    }

    /// Identity and token together, or `None` when signed out.
    #[must_use]
    pub fn credentials(&self) -> Option<(Identity, String)> {
        let state = self.state.borrow();
        Some((state.identity.clone()?, state.token.clone()?))
    }

    /// Sign in against the endpoint family for `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NetworkFailure`] or
    /// [`SessionError::RejectedCredentials`] from the backend, or
    /// [`SessionError::Storage`] if the session cannot be persisted. The
    /// session is unchanged on error.
    pub async fn login(&self, email: &str, password: &str, kind: AccountKind) -> Result<Identity, SessionError> {
        let _loading = Loading::begin(&self.state);
        tracing::info!(%kind, "signing in");

        let credentials = Credentials { email: email.to_owned(), password: password.to_owned() };
        let grant = self.backend.sign_in(kind, &credentials).await.map_err(|error| {
            tracing::warn!(%kind, %error, "sign-in failed");
            SessionError::from(error)
        })?;
        self.commit(grant)
    }

    /// Create an account and sign in as it.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::ValidationFailure`] without contacting the
    /// backend when the passwords differ or no account kind is chosen;
    /// otherwise fails like [`SessionStore::login`].
    pub async fn register(&self, data: &RegisterData) -> Result<Identity, SessionError> {
        if !data.passwords_match() {
            return Err(SessionError::ValidationFailure("Passwords do not match".to_owned()));
        }
        let kind = data
            .account_kind
            .ok_or_else(|| SessionError::ValidationFailure("Choose an account type".to_owned()))?;

        let _loading = Loading::begin(&self.state);
        tracing::info!(%kind, "registering account");

        let grant = self.backend.sign_up(kind, data).await.map_err(|error| {
            tracing::warn!(%kind, %error, "sign-up failed");
            SessionError::from(error)
        })?;
        self.commit(grant)
    }

    /// Drop the session from memory and storage. No backend call.
    pub fn logout(&self) {
        let _commit = self.commit_lock.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(error) = self.storage.clear() {
            tracing::warn!(%error, "failed to clear persisted session");
            // check_auth discards an empty pair.
            if let Err(error) = self.storage.save("", "") {
                tracing::error!(%error, "persisted session could not be invalidated");
            }
        }
        self.state.send_modify(|s| {
            s.identity = None;
            s.token = None;
            s.settled = true;
        });
        tracing::info!("signed out");
    }

    /// Rehydrate the persisted session and confirm it with the backend.
    ///
    /// Runs once at startup. Nothing persisted means no request. Any
    /// failure (unreadable storage, a torn key pair, a rejected or
    /// unreachable probe) ends in a full logout.
    pub async fn check_auth(&self) {
        let stored = match self.storage.load() {
            Ok(stored) => stored,
            Err(error) => {
                tracing::warn!(%error, "persisted session unreadable");
                self.logout();
                return;
            }
        };

        let Some((token, user_data)) = stored.complete() else {
            if stored.is_empty() {
                self.state.send_modify(|s| s.settled = true);
            } else {
                tracing::warn!("persisted session has only one of its keys");
                self.logout();
            }
            return;
        };

        let cached: Identity = match serde_json::from_str(user_data) {
            Ok(identity) => identity,
            Err(error) => {
                tracing::warn!(%error, "cached identity unreadable");
                self.logout();
                return;
            }
        };

        let _loading = Loading::begin(&self.state);
        let kind = cached.account_kind;
        match self.backend.probe_session(kind, token).await {
            Ok(identity) => {
                let grant = AuthGrant { identity, token: token.to_owned() };
                if let Err(error) = self.commit(grant) {
                    tracing::warn!(%error, "failed to persist re-validated session");
                    self.logout();
                }
            }
            Err(error) => {
                tracing::warn!(%kind, %error, "session re-validation failed");
                self.logout();
            }
        }
    }

    fn commit(&self, grant: AuthGrant) -> Result<Identity, SessionError> {
        let user_data = serde_json::to_string(&grant.identity).map_err(StorageError::from)?;

        let _commit = self.commit_lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.storage.save(&grant.token, &user_data)?;

        let identity = grant.identity;
        tracing::info!(kind = %identity.account_kind, user_id = %identity.id, "session established");
        self.state.send_modify(|s| {
            s.identity = Some(identity.clone());
            s.token = Some(grant.token);
            s.settled = true;
        });
        Ok(identity)
    }
}
