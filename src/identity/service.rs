use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::authorizer;
use super::credentials::CredentialChannel;
use super::guard::{Guard, GuardWatch, Routes};
use super::principal::UserPatch;
use super::provider::{LoginResponse, ProfileFetcher};
use super::session::{Generation, Session, SessionPatch, SessionStore};
use crate::notifications::{NotificationPoller, NotificationSource, UnreadCount};

/// How a bootstrap pass ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitOutcome {
    /// No stored credential pair
    Anonymous,
    /// Profile fetched; session authenticated with the stored token
    Restored,
    /// Profile fetch failed; stored credentials purged
    Rejected,
    /// A login or logout happened while the fetch was in flight; its result was dropped
    Superseded,
}

struct Notifications {
    source: Arc<dyn NotificationSource>,
    interval: Duration,
    poller: Mutex<Option<NotificationPoller>>,
}

/// Session lifecycle for the client: bootstrap, login, logout and profile edits.
///
/// Every mutator writes the session store and the credential channel together.
pub struct SessionService {
    store: Arc<SessionStore>,
    credentials: CredentialChannel,
    profiles: Arc<dyn ProfileFetcher>,
    routes: Routes,
    notifications: Option<Notifications>,
    /// Held across every auth transition: credential slots, store and poller change together
    transition: Mutex<()>,
}

impl SessionService {
    pub fn new(store: Arc<SessionStore>, credentials: CredentialChannel, profiles: Arc<dyn ProfileFetcher>) -> Self {
        Self { store, credentials, profiles, routes: Routes::default(), notifications: None, transition: Mutex::new(()) }
    }

    pub fn with_routes(mut self, routes: Routes) -> Self {
        self.routes = routes;
        self
    }

    /// Poll the unread count every `interval` while a user is logged in.
    pub fn with_notifications(mut self, source: Arc<dyn NotificationSource>, interval: Duration) -> Self {
        self.notifications = Some(Notifications { source, interval, poller: Mutex::new(None) });
        self
    }

    pub fn store(&self) -> &Arc<SessionStore> { &self.store }

    pub fn credentials(&self) -> &CredentialChannel { &self.credentials }

    pub fn routes(&self) -> &Routes { &self.routes }

    /// Reconcile stored credentials with a live profile fetch. Never fails: any error ends in a
    /// logged-out, initialized session.
    pub async fn initialize(&self) -> InitOutcome {
        let gen = self.store.begin();
        let Some(creds) = self.credentials.read() else {
            debug!(target: "adopta::init", "no stored credentials");
            return self.finish_init(gen, SessionPatch::signed_out(), InitOutcome::Anonymous);
        };

        match self.profiles.fetch_profile(&creds.token).await {
            Ok(user) => {
                if user.id != creds.user_id {
                    warn!(target: "adopta::init", stored = %creds.user_id, fetched = %user.id, "profile id differs from stored user id");
                }
                let user_id = user.id.clone();
                let outcome = self.finish_init(gen, SessionPatch::signed_in(creds.token, user), InitOutcome::Restored);
                if outcome == InitOutcome::Restored {
                    info!(target: "adopta::init", user_id = %user_id, "session restored");
                }
                outcome
            }
            Err(e) => {
                warn!(target: "adopta::init", error = %e, "profile check failed");
                self.finish_init(gen, SessionPatch::signed_out(), InitOutcome::Rejected)
            }
        }
    }

    /// Commit a bootstrap result unless a login or logout happened since `gen`. Runs under the
    /// transition lock so the purge, the store write and the poller change land together.
    fn finish_init(&self, gen: Generation, patch: SessionPatch, outcome: InitOutcome) -> InitOutcome {
        let _t = self.transition.lock();
        if self.store.generation() != gen {
            // the newer transition already marked the session initialized; make sure of it anyway
            self.store.set_session(SessionPatch::initialized());
            debug!(target: "adopta::init", ?outcome, "bootstrap result superseded");
            return InitOutcome::Superseded;
        }
        if outcome == InitOutcome::Rejected {
            if let Err(e) = self.credentials.purge() {
                warn!(target: "adopta::init", error = %e, "failed to purge credentials");
            }
        }
        if !self.store.commit_if_current(gen, patch) {
            return InitOutcome::Superseded;
        }
        match outcome {
            InitOutcome::Restored => self.start_polling(),
            _ => self.stop_polling(),
        }
        outcome
    }

    /// Adopt a successful login response: resolve roles, write store and credential channel.
    pub fn login(&self, resp: LoginResponse) -> Session {
        let _t = self.transition.lock();
        let user = resp.identity();
        if let Err(e) = self.credentials.write(&resp.token, &user.id, &resp.roles) {
            warn!(target: "adopta::session", error = %e, "failed to write credential slots");
        }
        let (_, session) = self.store.advance(SessionPatch::signed_in(resp.token, user));
        info!(target: "adopta::session", user_id = %resp.id, roles = ?session.user().map(|u| &u.roles), "logged in");
        self.stop_polling();
        self.start_polling();
        session
    }

    /// Clear both storage channels and reset to logged out. Idempotent.
    pub fn logout(&self) -> Session {
        let _t = self.transition.lock();
        self.stop_polling();
        if let Err(e) = self.credentials.purge() {
            warn!(target: "adopta::session", error = %e, "failed to purge credential slots");
        }
        let was_logged_in = self.store.get_session().is_logged_in();
        let (_, session) = self.store.advance(SessionPatch::signed_out());
        if was_logged_in {
            info!(target: "adopta::session", "logged out");
        }
        session
    }

    /// Merge profile edits into the current user. No-op when logged out, or when a login or
    /// logout replaced the user while the patch was being applied.
    pub fn set_user(&self, patch: UserPatch) -> Session {
        let _t = self.transition.lock();
        let gen = self.store.begin();
        let current = self.store.get_session();
        let Some(mut user) = current.user().cloned() else {
            debug!(target: "adopta::session", "set_user ignored: not logged in");
            return current;
        };
        if patch.is_empty() {
            return current;
        }
        user.apply(patch);
        if !self.store.commit_if_current(gen, SessionPatch::user(user)) {
            debug!(target: "adopta::session", "set_user dropped: session changed");
        }
        self.store.get_session()
    }

    pub fn session(&self) -> Session { self.store.get_session() }

    pub fn is_admin(&self) -> bool { authorizer::is_admin(&self.store.get_session()) }

    pub fn is_authenticated(&self) -> bool { authorizer::is_authenticated(&self.store.get_session()) }

    pub fn subscribe(&self) -> watch::Receiver<Session> { self.store.subscribe() }

    pub fn guard_watch(&self, guard: Guard) -> GuardWatch {
        GuardWatch::new(guard, self.routes.clone(), self.store.subscribe())
    }

    pub fn unread_count(&self) -> Option<UnreadCount> {
        let n = self.notifications.as_ref()?;
        let latest = n.poller.lock().as_ref().and_then(|p| p.latest());
        latest
    }

    pub fn is_polling(&self) -> bool {
        self.notifications
            .as_ref()
            .map(|n| n.poller.lock().as_ref().map(|p| p.is_running()).unwrap_or(false))
            .unwrap_or(false)
    }

    fn start_polling(&self) {
        let Some(n) = self.notifications.as_ref() else { return };
        if tokio::runtime::Handle::try_current().is_err() {
            debug!(target: "adopta::notify", "no async runtime; unread count polling skipped");
            return;
        }
        let mut slot = n.poller.lock();
        if slot.is_none() {
            *slot = Some(NotificationPoller::start(n.source.clone(), n.interval));
        }
    }

    fn stop_polling(&self) {
        if let Some(n) = self.notifications.as_ref() {
            if let Some(mut p) = n.poller.lock().take() {
                p.stop();
            }
        }
    }

    /// Tear down background work. The session itself is left as is.
    pub fn dispose(&self) {
        self.stop_polling();
        debug!(target: "adopta::session", "session service disposed");
    }
}

impl Drop for SessionService {
    fn drop(&mut self) { self.stop_polling(); }
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod service_tests;
