use chrono::Utc;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::principal::UserIdentity;
use super::token;
use crate::http::TokenSource;
use crate::storage::SharedKv;

pub type SessionToken = String;

/// Storage slot holding the JSON session snapshot.
pub const AUTH_STORAGE_KEY: &str = "auth-storage";

/// The client's belief about who is logged in.
///
/// `is_logged_in` is derived from `token` and `user` both being present; a session cannot hold
/// one without the other.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    token: Option<SessionToken>,
    user: Option<UserIdentity>,
    is_initialized: bool,
}

impl Session {
    fn normalized(token: Option<SessionToken>, user: Option<UserIdentity>, is_initialized: bool) -> Self {
        match (token, user) {
            (Some(t), Some(u)) => Self { token: Some(t), user: Some(u), is_initialized },
            _ => Self { token: None, user: None, is_initialized },
        }
    }

    pub fn token(&self) -> Option<&str> { self.token.as_deref() }
    pub fn user(&self) -> Option<&UserIdentity> { self.user.as_ref() }
    pub fn is_logged_in(&self) -> bool { self.token.is_some() && self.user.is_some() }
    pub fn is_initialized(&self) -> bool { self.is_initialized }
}

/// Partial update for [`SessionStore::set_session`]. `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct SessionPatch {
    pub token: Option<Option<SessionToken>>,
    pub user: Option<Option<UserIdentity>>,
    pub is_initialized: Option<bool>,
}

impl SessionPatch {
    pub fn signed_in(token: impl Into<SessionToken>, user: UserIdentity) -> Self {
        Self { token: Some(Some(token.into())), user: Some(Some(user)), is_initialized: Some(true) }
    }

    pub fn signed_out() -> Self {
        Self { token: Some(None), user: Some(None), is_initialized: Some(true) }
    }

    pub fn initialized() -> Self {
        Self { is_initialized: Some(true), ..Default::default() }
    }

    pub fn user(user: UserIdentity) -> Self {
        Self { user: Some(Some(user)), ..Default::default() }
    }
}

/// On-disk shape of the `auth-storage` slot.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    #[serde(default)]
    pub token: Option<SessionToken>,
    #[serde(default)]
    pub user: Option<UserIdentity>,
    #[serde(default)]
    pub is_logged_in: bool,
    #[serde(default)]
    pub is_initialized: bool,
}

impl From<&Session> for SessionSnapshot {
    fn from(s: &Session) -> Self {
        Self {
            token: s.token.clone(),
            user: s.user.clone(),
            is_logged_in: s.is_logged_in(),
            is_initialized: s.is_initialized,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StoreOptions {
    /// Mark the session initialized as soon as it is rehydrated, before any live profile check.
    /// Guards may then briefly render with a stale cached identity.
    pub trust_cached_session: bool,
}

/// Counter of auth transitions. Async work captures one and may only commit if it is still current.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Generation(u64);

impl Generation {
    pub fn value(&self) -> u64 { self.0 }
}

#[derive(Debug)]
struct Inner {
    session: Session,
    generation: u64,
}

/// Holds the session, mirrors every change to the `auth-storage` slot and broadcasts it to
/// subscribers. Concurrent writers are last-writer-wins; only [`commit_if_current`] can lose.
///
/// [`commit_if_current`]: SessionStore::commit_if_current
pub struct SessionStore {
    kv: SharedKv,
    inner: RwLock<Inner>,
    tx: watch::Sender<Session>,
}

impl SessionStore {
    /// Rehydrate from storage. A missing, unreadable or inconsistent slot yields the default
    /// uninitialized session.
    pub fn open(kv: SharedKv, options: StoreOptions) -> Self {
        let session = rehydrate(&kv, options);
        let (tx, _rx) = watch::channel(session.clone());
        Self { kv, inner: RwLock::new(Inner { session, generation: 0 }), tx }
    }

    pub fn get_session(&self) -> Session { self.inner.read().session.clone() }

    pub fn subscribe(&self) -> watch::Receiver<Session> { self.tx.subscribe() }

    pub fn generation(&self) -> Generation { Generation(self.inner.read().generation) }

    /// Capture the generation an async operation starts under.
    pub fn begin(&self) -> Generation { self.generation() }

    pub fn set_session(&self, patch: SessionPatch) -> Session {
        let mut inner = self.inner.write();
        self.apply_locked(&mut inner, patch)
    }

    /// Apply an auth transition: bumps the generation so in-flight work started earlier is discarded.
    pub fn advance(&self, patch: SessionPatch) -> (Generation, Session) {
        let mut inner = self.inner.write();
        inner.generation += 1;
        let gen = Generation(inner.generation);
        let session = self.apply_locked(&mut inner, patch);
        (gen, session)
    }

    /// Apply `patch` only if no transition happened since `gen` was captured.
    pub fn commit_if_current(&self, gen: Generation, patch: SessionPatch) -> bool {
        let mut inner = self.inner.write();
        if inner.generation != gen.0 {
            debug!(target: "adopta::session", captured = gen.0, current = inner.generation, "discarding stale session commit");
            return false;
        }
        self.apply_locked(&mut inner, patch);
        true
    }

    fn apply_locked(&self, inner: &mut Inner, patch: SessionPatch) -> Session {
        let cur = &inner.session;
        let token = patch.token.unwrap_or_else(|| cur.token.clone());
        let user = patch.user.unwrap_or_else(|| cur.user.clone());
        // monotonic: once initialized, always initialized
        let is_initialized = cur.is_initialized || patch.is_initialized.unwrap_or(false);
        let next = Session::normalized(token, user, is_initialized);
        // storage may lag the in-memory value after rehydration, so persist even when unchanged
        self.persist(&next);
        if next != inner.session {
            inner.session = next.clone();
            self.tx.send_replace(next.clone());
        }
        next
    }

    fn persist(&self, session: &Session) {
        let snap = SessionSnapshot::from(session);
        match serde_json::to_string(&snap) {
            Ok(json) => {
                if let Err(e) = self.kv.set(AUTH_STORAGE_KEY, &json) {
                    warn!(target: "adopta::session", error = %e, "failed to persist session snapshot");
                }
            }
            Err(e) => warn!(target: "adopta::session", error = %e, "failed to encode session snapshot"),
        }
    }
}

impl TokenSource for SessionStore {
    fn bearer_token(&self) -> Option<String> { self.inner.read().session.token.clone() }
}

fn rehydrate(kv: &SharedKv, options: StoreOptions) -> Session {
    let initialized = options.trust_cached_session;
    let raw = match kv.get(AUTH_STORAGE_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => return Session { is_initialized: initialized, ..Default::default() },
        Err(e) => {
            warn!(target: "adopta::session", error = %e, "session slot unreadable; using defaults");
            return Session { is_initialized: initialized, ..Default::default() };
        }
    };
    let snap: SessionSnapshot = match serde_json::from_str(&raw) {
        Ok(s) => s,
        Err(e) => {
            warn!(target: "adopta::session", error = %e, "corrupt session snapshot; using defaults");
            return Session { is_initialized: initialized, ..Default::default() };
        }
    };
    let consistent = snap.is_logged_in == (snap.token.is_some() && snap.user.is_some());
    if !consistent {
        warn!(target: "adopta::session", is_logged_in = snap.is_logged_in, "inconsistent session snapshot; using defaults");
        return Session { is_initialized: initialized, ..Default::default() };
    }
    if let Some(t) = snap.token.as_deref() {
        if token::is_expired_at(t, Utc::now()) {
            info!(target: "adopta::session", "cached token expired; rehydrating logged out");
            return Session { is_initialized: initialized, ..Default::default() };
        }
    }
    debug!(target: "adopta::session", logged_in = snap.is_logged_in, trusted = initialized, "session rehydrated");
    Session::normalized(snap.token, snap.user, initialized)
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod session_tests;
