//! Role compatibility table: which canonical roles may enter which scope.
//!
//! One table serves both the route guard and the post-login landing lookup,
//! so the two can never drift apart.

use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::roles::CanonicalRole;
use crate::scope::Scope;

/// Immutable set of canonical roles authorised for a scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RoleSet(BTreeSet<CanonicalRole>);

impl RoleSet {
    pub fn new(roles: impl IntoIterator<Item = CanonicalRole>) -> Self {
        Self(roles.into_iter().collect())
    }

    pub fn singleton(role: CanonicalRole) -> Self {
        Self::new([role])
    }

    pub fn contains(&self, role: &CanonicalRole) -> bool {
        self.0.contains(role)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CanonicalRole> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A table row: the roles admitted to a scope and where they land after login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScopeEntry {
    pub scope: Scope,
    pub roles: RoleSet,
    pub landing_path: Cow<'static, str>,
}

/// Static mapping from [`Scope`] to the [`RoleSet`] allowed to enter it.
///
/// Built once at startup and shared read-only afterwards. Scopes without an
/// entry fall back to an exact match on the scope name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleCompatibilityTable {
    entries: BTreeMap<Scope, ScopeEntry>,
    /// Insertion order, used for landing lookups so a role admitted to several
    /// scopes resolves deterministically.
    order: Vec<Scope>,
}

impl RoleCompatibilityTable {
    pub fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
            order: Vec::new(),
        }
    }

    /// Add (or replace) a scope entry. Only meant for construction time.
    pub fn with_entry(
        mut self,
        scope: Scope,
        roles: impl IntoIterator<Item = CanonicalRole>,
        landing_path: impl Into<Cow<'static, str>>,
    ) -> Self {
        if !self.entries.contains_key(&scope) {
            self.order.push(scope.clone());
        }
        self.entries.insert(
            scope.clone(),
            ScopeEntry {
                scope,
                roles: RoleSet::new(roles),
                landing_path: landing_path.into(),
            },
        );
        self
    }

    /// Roles allowed to enter `scope`.
    pub fn allowed(&self, scope: &Scope) -> Cow<'_, RoleSet> {
        match self.entries.get(scope) {
            Some(entry) => Cow::Borrowed(&entry.roles),
            None => Cow::Owned(RoleSet::singleton(scope.as_role())),
        }
    }

    pub fn permits(&self, scope: &Scope, role: &CanonicalRole) -> bool {
        if role.is_empty() {
            return false;
        }
        self.allowed(scope).contains(role)
    }

    /// Entries in construction order.
    pub fn entries(&self) -> impl Iterator<Item = &ScopeEntry> {
        self.order.iter().filter_map(|s| self.entries.get(s))
    }

    /// Dashboard path for a role: the landing path of the first scope (in
    /// construction order) that admits it.
    pub fn landing_path(&self, role: &CanonicalRole) -> Option<&str> {
        if role.is_empty() {
            return None;
        }
        self.entries()
            .find(|entry| entry.roles.contains(role))
            .map(|entry| entry.landing_path.as_ref())
    }
}

impl Default for RoleCompatibilityTable {
    /// The portal's seeded table.
    fn default() -> Self {
        Self::empty()
            .with_entry(Scope::admin(), [CanonicalRole::ADMIN], "/admin/dashboard")
            .with_entry(
                Scope::employee(),
                [CanonicalRole::EMPLOYEE, CanonicalRole::SURVEYOR],
                "/employee/dashboard",
            )
            .with_entry(
                Scope::lab(),
                [CanonicalRole::LAB_TECHNICIAN, CanonicalRole::LAB],
                "/lab/dashboard",
            )
            .with_entry(Scope::user(), [CanonicalRole::USER], "/dashboard")
    }
}
