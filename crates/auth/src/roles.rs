use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Namespace marker some backends prepend to role names (`ROLE_ADMIN`).
pub const ROLE_PREFIX: &str = "ROLE_";

/// Canonicalise a raw role string.
///
/// Upper-cases (full Unicode mapping), trims surrounding whitespace and strips
/// every leading [`ROLE_PREFIX`]. Total and idempotent; empty input yields `""`.
pub fn normalize_role(raw: &str) -> String {
    let upper = raw.to_uppercase();
    let mut rest = upper.as_str();
    loop {
        let trimmed = rest.trim();
        match trimmed.strip_prefix(ROLE_PREFIX) {
            Some(stripped) => rest = stripped,
            None => {
                rest = trimmed;
                break;
            }
        }
    }
    rest.to_string()
}

/// Canonical role identifier.
///
/// The only way to build one from arbitrary input is [`CanonicalRole::normalize`],
/// so every comparison happens on normalised values.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalRole(Cow<'static, str>);

impl CanonicalRole {
    pub const ADMIN: CanonicalRole = CanonicalRole(Cow::Borrowed("ADMIN"));
    pub const EMPLOYEE: CanonicalRole = CanonicalRole(Cow::Borrowed("EMPLOYEE"));
    pub const SURVEYOR: CanonicalRole = CanonicalRole(Cow::Borrowed("SURVEYOR"));
    pub const LAB: CanonicalRole = CanonicalRole(Cow::Borrowed("LAB"));
    pub const LAB_TECHNICIAN: CanonicalRole = CanonicalRole(Cow::Borrowed("LAB_TECHNICIAN"));
    pub const USER: CanonicalRole = CanonicalRole(Cow::Borrowed("USER"));

    pub fn normalize(raw: &str) -> Self {
        Self(Cow::Owned(normalize_role(raw)))
    }

    /// Normalise an optional raw role; absent means "no role" (`""`).
    pub fn from_optional(raw: Option<&str>) -> Self {
        Self::normalize(raw.unwrap_or_default())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `true` for the "no role" value.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl core::fmt::Display for CanonicalRole {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn strips_prefix_and_uppercases() {
        assert_eq!(normalize_role("ROLE_ADMIN"), "ADMIN");
        assert_eq!(normalize_role("role_admin"), "ADMIN");
        assert_eq!(normalize_role("lab_technician"), "LAB_TECHNICIAN");
        assert_eq!(normalize_role("  Surveyor "), "SURVEYOR");
    }

    #[test]
    fn uppercases_non_ascii_letters() {
        assert_eq!(normalize_role("role_técnico"), "TÉCNICO");
        assert_eq!(normalize_role("Lab_Größe"), "LAB_GRÖSSE");
        assert_eq!(normalize_role(&normalize_role("ROLE_agrónomo")), "AGRÓNOMO");
    }

    #[test]
    fn empty_and_absent_normalize_to_empty() {
        assert_eq!(normalize_role(""), "");
        assert_eq!(normalize_role("   "), "");
        assert!(CanonicalRole::from_optional(None).is_empty());
    }

    #[test]
    fn bare_prefix_is_no_role() {
        assert_eq!(normalize_role("ROLE_"), "");
    }

    #[test]
    fn repeated_prefixes_are_all_stripped() {
        assert_eq!(normalize_role("ROLE_ROLE_ADMIN"), "ADMIN");
        assert_eq!(normalize_role("ROLE_ ROLE_lab"), "LAB");
    }

    #[test]
    fn prefix_only_stripped_at_start() {
        assert_eq!(normalize_role("SUPER_ROLE_ADMIN"), "SUPER_ROLE_ADMIN");
    }

    #[test]
    fn constants_are_already_canonical() {
        for role in [
            CanonicalRole::ADMIN,
            CanonicalRole::EMPLOYEE,
            CanonicalRole::SURVEYOR,
            CanonicalRole::LAB,
            CanonicalRole::LAB_TECHNICIAN,
            CanonicalRole::USER,
        ] {
            assert_eq!(CanonicalRole::normalize(role.as_str()), role);
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 512,
            ..ProptestConfig::default()
        })]

        #[test]
        fn normalize_is_idempotent(raw in any::<String>()) {
            let once = normalize_role(&raw);
            prop_assert_eq!(normalize_role(&once), once);
        }

        #[test]
        fn normalize_is_idempotent_on_role_like_input(
            raw in "[ \t]*((?i:role_))*[ \t]*[a-zA-Z_]{0,16} *"
        ) {
            let once = normalize_role(&raw);
            prop_assert_eq!(normalize_role(&once), once.clone());
            prop_assert!(!once.starts_with(ROLE_PREFIX));
        }
    }
}
