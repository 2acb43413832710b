//! Post-login role selection.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use agriportal_core::PortalError;

use crate::roles::CanonicalRole;

/// Which login portal the user came through.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoginKind {
    #[default]
    User,
    Admin,
    Employee,
    Lab,
}

impl LoginKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoginKind::User => "user",
            LoginKind::Admin => "admin",
            LoginKind::Employee => "employee",
            LoginKind::Lab => "lab",
        }
    }

    /// The canonical role this portal is meant for.
    pub fn role(&self) -> CanonicalRole {
        match self {
            LoginKind::User => CanonicalRole::USER,
            LoginKind::Admin => CanonicalRole::ADMIN,
            LoginKind::Employee => CanonicalRole::EMPLOYEE,
            LoginKind::Lab => CanonicalRole::LAB,
        }
    }
}

impl FromStr for LoginKind {
    type Err = PortalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" => Ok(LoginKind::User),
            "admin" => Ok(LoginKind::Admin),
            "employee" => Ok(LoginKind::Employee),
            "lab" => Ok(LoginKind::Lab),
            other => Err(PortalError::validation(format!(
                "unknown login kind '{other}' (expected user, admin, employee or lab)"
            ))),
        }
    }
}

impl core::fmt::Display for LoginKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pick the role to persist after a successful login.
///
/// Prefers a granted role matching the portal's own role, then the first
/// granted role, then the portal's role when nothing was granted.
pub fn resolve_login_role<S: AsRef<str>>(kind: LoginKind, granted: &[S]) -> CanonicalRole {
    let intended = kind.role();

    let normalized: Vec<CanonicalRole> = granted
        .iter()
        .map(|r| CanonicalRole::normalize(r.as_ref()))
        .collect();

    if normalized.iter().any(|r| *r == intended) {
        return intended;
    }

    match normalized.into_iter().find(|r| !r.is_empty()) {
        Some(first) => first,
        None => intended,
    }
}
