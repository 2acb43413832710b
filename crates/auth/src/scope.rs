use serde::{Deserialize, Serialize};

use crate::roles::{CanonicalRole, normalize_role};

/// Identifier of a protected area of the portal (e.g. `ADMIN`, `LAB`).
///
/// Scopes are canonicalised with the same rules as roles, so `lab` and `LAB`
/// name the same area. Supplied by the caller of the guard; never derived from
/// the session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Scope(String);

impl Scope {
    pub fn new(name: &str) -> Self {
        Self(normalize_role(name))
    }

    pub fn admin() -> Self {
        Self::new("ADMIN")
    }

    pub fn employee() -> Self {
        Self::new("EMPLOYEE")
    }

    pub fn lab() -> Self {
        Self::new("LAB")
    }

    pub fn user() -> Self {
        Self::new("USER")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The role that exactly matches this scope (fallback policy for scopes
    /// without a table entry).
    pub fn as_role(&self) -> CanonicalRole {
        CanonicalRole::normalize(&self.0)
    }
}

impl From<String> for Scope {
    fn from(value: String) -> Self {
        Self::new(&value)
    }
}

impl From<Scope> for String {
    fn from(value: Scope) -> Self {
        value.0
    }
}

impl core::fmt::Display for Scope {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_names_are_canonical() {
        assert_eq!(Scope::new("lab"), Scope::lab());
        assert_eq!(Scope::new("ROLE_admin").as_str(), "ADMIN");
    }

    #[test]
    fn deserializing_canonicalises() {
        let scope: Scope = serde_json::from_str("\"employee\"").unwrap();
        assert_eq!(scope, Scope::employee());
        assert_eq!(serde_json::to_string(&scope).unwrap(), "\"EMPLOYEE\"");
    }
}
