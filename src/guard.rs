//! Route guard for account-specific pages.
//!
//! SYSTEM CONTEXT
//! ==============
//! Dashboards render only for a settled session of the right account kind.
//! The decision itself is the pure [`decide`]; [`RouteGuard`] re-runs it
//! against a `watch` subscription whenever the session changes.

#[cfg(test)]
#[path = "guard_test.rs"]
mod guard_test;

use std::fmt;

use tokio::sync::watch;

use crate::net::types::AccountKind;
use crate::state::session::{AuthPhase, SessionState};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Route {
    Home,
    Auth,
    UserDashboard,
    VendorDashboard,
}

impl Route {
    pub const ALL: [Self; 4] = [Self::Home, Self::Auth, Self::UserDashboard, Self::VendorDashboard];

    #[must_use]
    pub fn path(self) -> &'static str {
        match self {
            Self::Home => "/",
            Self::Auth => "/auth",
            Self::UserDashboard => "/user/dashboard",
            Self::VendorDashboard => "/vendor/dashboard",
        }
    }

    /// Parse a route path; a trailing slash is ignored.
    #[must_use]
    pub fn from_path(path: &str) -> Option<Self> {
        let trimmed = path.trim();
        let normalized = if trimmed.len() > 1 { trimmed.trim_end_matches('/') } else { trimmed };
        Self::ALL.into_iter().find(|route| route.path() == normalized)
    }

    /// Dashboard that serves `kind`.
    #[must_use]
    pub fn dashboard_for(kind: AccountKind) -> Self {
        match kind {
            AccountKind::Individual => Self::UserDashboard,
            AccountKind::Organization => Self::VendorDashboard,
        }
    }

    /// Guard protecting this route, or `None` for public routes.
    #[must_use]
    pub fn guard(self) -> Option<RouteGuard> {
        match self {
            Self::Home | Self::Auth => None,
            Self::UserDashboard => Some(RouteGuard::new().require(AccountKind::Individual)),
            Self::VendorDashboard => Some(RouteGuard::new().require(AccountKind::Organization)),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GuardDecision {
    /// Session not settled; show a neutral loading state and do not redirect.
    Pending,
    Render,
    Redirect(Route),
}

/// Decide whether a protected page renders.
///
/// A visitor with the wrong account kind goes to the dashboard for the kind
/// they actually have, never to `fallback`.
#[must_use]
pub fn decide(phase: AuthPhase, required: Option<AccountKind>, fallback: Route) -> GuardDecision {
    match phase {
        AuthPhase::Unknown => GuardDecision::Pending,
        AuthPhase::Anonymous => GuardDecision::Redirect(fallback),
        AuthPhase::Authenticated(kind) => match required {
            Some(required) if required != kind => GuardDecision::Redirect(Route::dashboard_for(kind)),
            _ => GuardDecision::Render,
        },
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RouteGuard {
    required: Option<AccountKind>,
    fallback: Route,
}

impl Default for RouteGuard {
    fn default() -> Self {
        Self { required: None, fallback: Route::Auth }
    }
}

impl RouteGuard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn require(mut self, kind: AccountKind) -> Self {
        self.required = Some(kind);
        self
    }

    #[must_use]
    pub fn with_fallback(mut self, fallback: Route) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn set_required(&mut self, required: Option<AccountKind>) {
        self.required = required;
    }

    #[must_use]
    pub fn required(&self) -> Option<AccountKind> {
        self.required
    }

    #[must_use]
    pub fn evaluate(&self, state: &SessionState) -> GuardDecision {
        decide(state.phase(), self.required, self.fallback)
    }

    /// Wait until the session settles and return the first non-pending
    /// decision. Returns `Pending` if the store goes away first.
    pub async fn settle(&self, session: &mut watch::Receiver<SessionState>) -> GuardDecision {
        loop {
            let decision = self.evaluate(&session.borrow_and_update());
            if decision != GuardDecision::Pending {
                return decision;
            }
            if session.changed().await.is_err() {
                return decision;
            }
        }
    }

    /// Wait for the next session change and re-evaluate.
    /// `None` once the store is gone.
    pub async fn next_change(&self, session: &mut watch::Receiver<SessionState>) -> Option<GuardDecision> {
        session.changed().await.ok()?;
        Some(self.evaluate(&session.borrow_and_update()))
    }
}
