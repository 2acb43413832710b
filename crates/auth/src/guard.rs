//! Route guard: decides, per navigation, whether a session may enter a scope.
//!
//! - No IO (beyond reading the session provider)
//! - No panics
//! - Outcomes are values, never errors

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::policy::RoleCompatibilityTable;
use crate::roles::CanonicalRole;
use crate::scope::Scope;
use crate::session::SessionProvider;

/// Default login page path.
pub const LOGIN_PATH: &str = "/login";

/// A navigation target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
}

impl Location {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            query: None,
        }
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        let query = query.into();
        self.query = (!query.is_empty()).then_some(query);
        self
    }
}

impl core::fmt::Display for Location {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match &self.query {
            Some(q) => write!(f, "{}?{}", self.path, q),
            None => f.write_str(&self.path),
        }
    }
}

/// Where the guard left the session relative to the requested scope.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GuardState {
    Unauthenticated,
    AuthenticatedWrongRole,
    AuthenticatedOk,
}

impl GuardState {
    pub fn as_str(&self) -> &'static str {
        match self {
            GuardState::Unauthenticated => "UNAUTHENTICATED",
            GuardState::AuthenticatedWrongRole => "AUTHENTICATED_WRONG_ROLE",
            GuardState::AuthenticatedOk => "AUTHENTICATED_OK",
        }
    }
}

/// A request to leave the protected subtree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Redirect {
    pub path: String,
    /// Replace the current history entry instead of pushing a new one.
    pub replace: bool,
    /// Where the user was headed, so login can send them back.
    pub preserved: Option<Location>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum GuardAction {
    Render,
    Redirect(Redirect),
}

/// The guard's verdict for one navigation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GuardDecision {
    pub state: GuardState,
    pub action: GuardAction,
}

impl GuardDecision {
    pub fn is_allowed(&self) -> bool {
        self.state == GuardState::AuthenticatedOk
    }

    pub fn redirect(&self) -> Option<&Redirect> {
        match &self.action {
            GuardAction::Redirect(r) => Some(r),
            GuardAction::Render => None,
        }
    }

    /// Carry out the decision: render the subtree, or hand the redirect to
    /// the navigator.
    pub fn resolve<N, F>(self, navigator: &N, render: F) -> N::Output
    where
        N: Navigator + ?Sized,
        F: FnOnce() -> N::Output,
    {
        match self.action {
            GuardAction::Render => render(),
            GuardAction::Redirect(r) => navigator.redirect(&r.path, r.replace, r.preserved.as_ref()),
        }
    }
}

/// Leaves a protected subtree.
pub trait Navigator {
    type Output;

    fn redirect(&self, path: &str, replace: bool, preserved: Option<&Location>) -> Self::Output;
}

/// Session/role gate for scoped subtrees.
///
/// Holds no session state: each [`RouteGuard::evaluate`] reads the provider
/// afresh.
#[derive(Debug, Clone)]
pub struct RouteGuard {
    table: Arc<RoleCompatibilityTable>,
    login_path: String,
}

impl Default for RouteGuard {
    fn default() -> Self {
        Self::new(Arc::new(RoleCompatibilityTable::default()))
    }
}

impl RouteGuard {
    pub fn new(table: Arc<RoleCompatibilityTable>) -> Self {
        Self {
            table,
            login_path: LOGIN_PATH.to_string(),
        }
    }

    pub fn with_login_path(mut self, path: impl Into<String>) -> Self {
        self.login_path = path.into();
        self
    }

    pub fn table(&self) -> &RoleCompatibilityTable {
        &self.table
    }

    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    pub fn evaluate<P>(&self, session: &P, scope: &Scope, location: &Location) -> GuardDecision
    where
        P: SessionProvider + ?Sized,
    {
        let has_token = session
            .token()
            .is_some_and(|t| !t.trim().is_empty());

        if !has_token {
            return GuardDecision {
                state: GuardState::Unauthenticated,
                action: GuardAction::Redirect(Redirect {
                    path: self.login_path.clone(),
                    replace: true,
                    preserved: Some(location.clone()),
                }),
            };
        }

        let role = CanonicalRole::from_optional(session.role().as_deref());
        if !self.table.permits(scope, &role) {
            return GuardDecision {
                state: GuardState::AuthenticatedWrongRole,
                action: GuardAction::Redirect(Redirect {
                    path: self.login_path.clone(),
                    replace: true,
                    preserved: None,
                }),
            };
        }

        GuardDecision {
            state: GuardState::AuthenticatedOk,
            action: GuardAction::Render,
        }
    }

    /// Evaluate and carry out in one step.
    pub fn guard<P, N, F>(
        &self,
        session: &P,
        scope: &Scope,
        location: &Location,
        navigator: &N,
        render: F,
    ) -> N::Output
    where
        P: SessionProvider + ?Sized,
        N: Navigator + ?Sized,
        F: FnOnce() -> N::Output,
    {
        self.evaluate(session, scope, location)
            .resolve(navigator, render)
    }
}
