//! `agriportal-auth`: session/role authorization gate.
//!
//! No HTTP or persistent storage here: the guard reads sessions through
//! [`SessionProvider`] and leaves through [`Navigator`], both supplied by the
//! caller.

pub mod guard;
pub mod login;
pub mod policy;
pub mod roles;
pub mod scope;
pub mod session;

pub use guard::{
    GuardAction, GuardDecision, GuardState, LOGIN_PATH, Location, Navigator, Redirect, RouteGuard,
};
pub use login::{LoginKind, resolve_login_role};
pub use policy::{RoleCompatibilityTable, RoleSet, ScopeEntry};
pub use roles::{CanonicalRole, ROLE_PREFIX, normalize_role};
pub use scope::Scope;
pub use session::{
    MemoryTokenStore, Session, SessionProvider, StorageKey, StoreError, StoreSessionProvider,
    TokenStore,
};
