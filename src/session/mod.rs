//! Operator sessions and the gate in front of protected routes.
//!
//! Flow: `POST /login` issues an opaque token, the browser returns it as a
//! cookie (or a bearer header), and every protected request runs the guard
//! state machine `Unmounted -> Checking -> Authorized | Redirecting` before
//! anything is rendered.

pub mod guard;

pub use self::guard::{require_api_session, require_page_session, SESSION_COOKIE_NAME};

use base64ct::{Base64UrlUnpadded, Encoding};
use rand::RngCore;
use serde::Serialize;
use std::{
    collections::HashMap,
    sync::RwLock,
    time::{SystemTime, UNIX_EPOCH},
};
use thiserror::Error;
use tracing::{debug, error};
use utoipa::ToSchema;

pub const DEFAULT_SESSION_TTL_SECONDS: u64 = 3600;
const TOKEN_BYTES: usize = 32;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session store unavailable")]
    Unavailable,
}

#[derive(ToSchema, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    pub created_at: u64,
    pub expires_at: u64,
}

impl Session {
    #[must_use]
    pub const fn is_expired(&self, now: u64) -> bool {
        now >= self.expires_at
    }
}

/// In-memory session registry. Sessions do not survive a restart.
#[derive(Debug)]
pub struct SessionStore {
    ttl_seconds: u64,
    sessions: RwLock<HashMap<String, Session>>,
}

impl SessionStore {
    #[must_use]
    pub fn new(ttl_seconds: u64) -> Self {
        Self {
            ttl_seconds,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    #[must_use]
    pub const fn ttl_seconds(&self) -> u64 {
        self.ttl_seconds
    }

    /// Create a session and return its token.
    ///
    /// # Errors
    /// Returns `SessionError::Unavailable` if the registry lock is poisoned.
    pub fn issue(&self, now: u64) -> Result<(String, Session), SessionError> {
        self.purge_expired(now);

        let mut bytes = [0u8; TOKEN_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        let token = Base64UrlUnpadded::encode_string(&bytes);

        let session = Session {
            created_at: now,
            expires_at: now.saturating_add(self.ttl_seconds),
        };

        self.sessions
            .write()
            .map_err(|_| SessionError::Unavailable)?
            .insert(token.clone(), session);

        debug!("session issued, expires at {}", session.expires_at);

        Ok((token, session))
    }

    /// Resolve a token into a live session. Expired sessions are dropped.
    ///
    /// # Errors
    /// Returns `SessionError::Unavailable` if the registry lock is poisoned.
    pub fn lookup(&self, token: &str, now: u64) -> Result<Option<Session>, SessionError> {
        let session = self
            .sessions
            .read()
            .map_err(|_| SessionError::Unavailable)?
            .get(token)
            .copied();

        match session {
            Some(session) if session.is_expired(now) => {
                self.revoke(token);
                Ok(None)
            }
            other => Ok(other),
        }
    }

    pub fn revoke(&self, token: &str) {
        match self.sessions.write() {
            Ok(mut sessions) => {
                sessions.remove(token);
            }
            Err(e) => error!("Failed to revoke session: {}", e),
        }
    }

    /// Returns the number of sessions removed.
    pub fn purge_expired(&self, now: u64) -> usize {
        match self.sessions.write() {
            Ok(mut sessions) => {
                let before = sessions.len();
                sessions.retain(|_, session| !session.is_expired(now));
                before - sessions.len()
            }
            Err(e) => {
                error!("Failed to purge sessions: {}", e);
                0
            }
        }
    }
}

/// Where a guarded request stands.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum GuardState {
    #[default]
    Unmounted,
    Checking,
    Authorized(Session),
    Redirecting,
}

impl GuardState {
    #[must_use]
    pub fn mount(self) -> Self {
        match self {
            Self::Unmounted => Self::Checking,
            other => other,
        }
    }

    /// Only `Checking` moves; `Authorized` and `Redirecting` are terminal and
    /// an unmounted guard makes no decision.
    #[must_use]
    pub fn decide(self, token: Option<&str>, store: &SessionStore, now: u64) -> Self {
        if self != Self::Checking {
            return self;
        }

        let Some(token) = token else {
            return Self::Redirecting;
        };

        match store.lookup(token, now) {
            Ok(Some(session)) => Self::Authorized(session),
            Ok(None) => Self::Redirecting,
            Err(e) => {
                // An unreadable store is treated as "not logged in".
                error!("Failed to lookup session: {}", e);
                Self::Redirecting
            }
        }
    }

    #[must_use]
    pub const fn renders_children(&self) -> bool {
        matches!(self, Self::Authorized(_))
    }
}

#[must_use]
pub fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_secs())
}
