//! Route guards: decide whether protected content renders, waits, or redirects.
//!
//! A guard is evaluated against a session value and nothing else, so it can be re-run on every
//! store notification. [`GuardWatch`] does exactly that for a mounted view.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use super::authorizer::Screen;
use super::roles::RoleName;
use super::session::Session;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Routes {
    #[serde(default = "Routes::default_sign_in")]
    pub sign_in: String,
    #[serde(default = "Routes::default_home")]
    pub home: String,
}

impl Routes {
    fn default_sign_in() -> String { "/login".to_string() }
    fn default_home() -> String { "/".to_string() }
}

impl Default for Routes {
    fn default() -> Self { Self { sign_in: Self::default_sign_in(), home: Self::default_home() } }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectReason {
    /// Not logged in
    Unauthenticated,
    /// Logged in without any admitted role
    Unauthorized,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Loading,
    Redirect { to: String, reason: RedirectReason },
    Render,
}

impl GuardDecision {
    pub fn is_render(&self) -> bool { matches!(self, GuardDecision::Render) }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Guard {
    allowed_roles: BTreeSet<RoleName>,
    public: bool,
}

impl Guard {
    pub fn new(allowed_roles: BTreeSet<RoleName>) -> Self { Self { allowed_roles, public: false } }

    /// Any logged in user.
    pub fn authenticated() -> Self { Self::default() }

    pub fn for_screen(screen: Screen) -> Self {
        Self { allowed_roles: screen.allowed_roles(), public: !screen.requires_login() }
    }

    pub fn allowed_roles(&self) -> &BTreeSet<RoleName> { &self.allowed_roles }

    pub fn evaluate(&self, session: &Session, routes: &Routes) -> GuardDecision {
        if self.public {
            return GuardDecision::Render;
        }
        if !session.is_initialized() {
            return GuardDecision::Loading;
        }
        let Some(user) = session.user().filter(|_| session.is_logged_in()) else {
            return GuardDecision::Redirect { to: routes.sign_in.clone(), reason: RedirectReason::Unauthenticated };
        };
        if !self.allowed_roles.is_empty() && !user.has_any_role(&self.allowed_roles) {
            return GuardDecision::Redirect { to: routes.home.clone(), reason: RedirectReason::Unauthorized };
        }
        GuardDecision::Render
    }
}

/// A guard bound to a live session subscription.
pub struct GuardWatch {
    guard: Guard,
    routes: Routes,
    rx: watch::Receiver<Session>,
}

impl GuardWatch {
    pub fn new(guard: Guard, routes: Routes, rx: watch::Receiver<Session>) -> Self { Self { guard, routes, rx } }

    pub fn current(&mut self) -> GuardDecision {
        let session = self.rx.borrow_and_update().clone();
        self.guard.evaluate(&session, &self.routes)
    }

    /// Wait for the next session change and re-evaluate. `None` once the store is gone.
    pub async fn changed(&mut self) -> Option<GuardDecision> {
        self.rx.changed().await.ok()?;
        Some(self.current())
    }

    /// Wait until the decision is no longer `Loading`.
    pub async fn settled(&mut self) -> Option<GuardDecision> {
        let decision = self.current();
        if decision != GuardDecision::Loading {
            return Some(decision);
        }
        loop {
            let d = self.changed().await?;
            if d != GuardDecision::Loading {
                return Some(d);
            }
        }
    }
}

#[cfg(test)]
#[path = "guard_tests.rs"]
mod guard_tests;
