//! Credential holder with change notifications.
//!
//! The raw bearer token only ever lives in memory. The only thing persisted is
//! a boolean "was authenticated" flag, which tells a cold-started client to
//! attempt a refresh before treating the session as authenticated. Signing
//! out also drops the session cookies the transport keeps for that refresh.

use std::fmt;
use std::sync::mpsc::{channel, Receiver, Sender};

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::storage::{Storage, AUTH_FLAG_KEY, SESSION_COOKIES_KEY};

/// Opaque bearer token
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `Authorization` header value
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// Snapshot of the in-memory authentication state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthState {
    pub is_authenticated: bool,
    pub token: Option<Credential>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthFlagRecord {
    is_authenticated: bool,
}

pub struct TokenStore {
    storage: Storage,
    state: RwLock<AuthState>,
    subscribers: Mutex<Vec<Sender<AuthState>>>,
}

impl TokenStore {
    /// Create a store. The in-memory state always starts signed out.
    pub fn new(storage: Storage) -> Self {
        Self {
            storage,
            state: RwLock::new(AuthState::default()),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn get(&self) -> AuthState {
        self.state.read().clone()
    }

    pub fn token(&self) -> Option<Credential> {
        self.state.read().token.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.read().is_authenticated
    }

    /// Whether a previous session left the authenticated flag behind.
    ///
    /// A corrupt flag record reads as `false`.
    pub fn was_authenticated(&self) -> bool {
        match self.storage.get_json::<AuthFlagRecord>(AUTH_FLAG_KEY) {
            Ok(Some(record)) => record.is_authenticated,
            Ok(None) => false,
            Err(e) => {
                warn!(error = %e, "Ignoring unreadable auth flag");
                false
            }
        }
    }

    pub fn login(&self, credential: Credential) {
        let snapshot = {
            let mut state = self.state.write();
            state.is_authenticated = true;
            state.token = Some(credential);
            state.clone()
        };
        if let Err(e) = self.storage.set_json(
            AUTH_FLAG_KEY,
            &AuthFlagRecord {
                is_authenticated: true,
            },
        ) {
            warn!(error = %e, "Failed to persist auth flag");
        }
        info!("Session authenticated");
        self.notify(snapshot);
    }

    pub fn logout(&self) {
        let snapshot = {
            let mut state = self.state.write();
            *state = AuthState::default();
            state.clone()
        };
        for key in [AUTH_FLAG_KEY, SESSION_COOKIES_KEY] {
            if let Err(e) = self.storage.remove(key) {
                warn!(key, error = %e, "Failed to clear session record");
            }
        }
        info!("Session cleared");
        self.notify(snapshot);
    }

    /// Receive every state change from now on
    pub fn subscribe(&self) -> Receiver<AuthState> {
        let (sender, receiver) = channel();
        self.subscribers.lock().push(sender);
        receiver
    }

    /// Reconcile with a flag change made by another handle.
    ///
    /// If another handle signed out, the local credential is dropped. A flag
    /// that appeared elsewhere is not enough to sign in here: the token must
    /// still be reacquired through refresh. Returns whether local state changed.
    pub fn resync(&self) -> bool {
        if self.is_authenticated() && !self.was_authenticated() {
            debug!("Auth flag removed by another handle");
            let snapshot = {
                let mut state = self.state.write();
                *state = AuthState::default();
                state.clone()
            };
            self.notify(snapshot);
            return true;
        }
        false
    }

    fn notify(&self, snapshot: AuthState) {
        self.subscribers
            .lock()
            .retain(|sender| sender.send(snapshot.clone()).is_ok());
    }
}
