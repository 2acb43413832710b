//! Session lifecycle over a [`TokenStore`].
//!
//! Login and logout flows write the store; the route guard only ever reads it
//! (through this manager's [`SessionProvider`] impl or its own provider).

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use agriportal_auth::{
    CanonicalRole, LOGIN_PATH, LoginKind, RoleCompatibilityTable, Session, SessionProvider,
    StorageKey, StoreError, StoreSessionProvider, TokenStore, resolve_login_role,
};
use agriportal_core::UserId;

use crate::throttle::{LimitKind, RateDecision, RateLimiter};

/// Successful login payload as returned by the backend.
///
/// Backends disagree on the token field (`token` or `accessToken`) and some
/// wrap the whole payload in `data`; both spellings are read at either level.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default, deserialize_with = "de_user_id")]
    pub user_id: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Box<LoginResponse>>,
}

impl LoginResponse {
    /// First non-blank of `token`, `accessToken`, `data.token`, `data.accessToken`.
    pub fn session_token(&self) -> Option<&str> {
        [self.token.as_deref(), self.access_token.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|t| !t.is_empty())
            .or_else(|| self.data.as_deref().and_then(LoginResponse::session_token))
    }

    /// Granted roles, from the top level or else the `data` envelope.
    pub fn granted_roles(&self) -> &[String] {
        match &self.data {
            Some(data) if self.roles.is_empty() => data.granted_roles(),
            _ => self.roles.as_slice(),
        }
    }

    pub fn granted_user_id(&self) -> Option<&UserId> {
        self.user_id
            .as_ref()
            .or_else(|| self.data.as_deref().and_then(LoginResponse::granted_user_id))
    }
}

/// The backend sends user ids as numbers or strings.
fn de_user_id<'de, D>(deserializer: D) -> Result<Option<UserId>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u64),
        Text(String),
    }

    let raw: Option<Raw> = Option::deserialize(deserializer)?;
    Ok(match raw {
        Some(Raw::Number(n)) => Some(UserId::from(n)),
        Some(Raw::Text(s)) => s.parse().ok(),
        None => None,
    })
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("login response carried no access token")]
    MissingToken,

    #[error("too many attempts; retry in {}s", .retry_after.as_secs())]
    Throttled { retry_after: Duration },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Owns session creation and destruction for one client.
pub struct SessionManager<S> {
    provider: StoreSessionProvider<S>,
    table: Arc<RoleCompatibilityTable>,
    login_path: String,
    limiter: RateLimiter,
}

impl<S: TokenStore> SessionManager<S> {
    pub fn new(store: S, table: Arc<RoleCompatibilityTable>) -> Self {
        Self {
            provider: StoreSessionProvider::new(store),
            table,
            login_path: LOGIN_PATH.to_string(),
            limiter: RateLimiter::new(),
        }
    }

    pub fn with_login_path(mut self, path: impl Into<String>) -> Self {
        self.login_path = path.into();
        self
    }

    pub fn store(&self) -> &S {
        self.provider.store()
    }

    /// Current token/role snapshot, read fresh.
    pub fn session(&self) -> Result<Session, SessionError> {
        Ok(self.store().snapshot()?)
    }

    /// Gate a login attempt for `identity` against the login budget.
    pub fn begin_login(&mut self, identity: &str, now: Instant) -> Result<(), SessionError> {
        match self.limiter.check(&login_key(identity), LimitKind::Login, now) {
            RateDecision::Allowed => Ok(()),
            RateDecision::Limited { retry_after } => {
                tracing::warn!(retry_after_secs = retry_after.as_secs(), "login attempt throttled");
                Err(SessionError::Throttled { retry_after })
            }
        }
    }

    /// Persist a session after a successful login.
    ///
    /// The previous session's keys are dropped and the new token, role and
    /// identity fields written in a single store update.
    pub fn establish(
        &mut self,
        kind: LoginKind,
        email: Option<&str>,
        response: &LoginResponse,
    ) -> Result<CanonicalRole, SessionError> {
        let token = response
            .session_token()
            .ok_or(SessionError::MissingToken)?;

        let role = resolve_login_role(kind, response.granted_roles());

        let mut entries = vec![
            (StorageKey::Token, token.to_string()),
            (StorageKey::Role, role.as_str().to_string()),
        ];
        if let Some(user_id) = response.granted_user_id() {
            entries.push((StorageKey::UserId, user_id.to_string()));
        }
        if let Some(email) = email {
            entries.push((StorageKey::UserEmail, email.to_string()));
        }

        self.store().replace_all(&entries)?;

        if let Some(email) = email {
            self.limiter.reset(&login_key(email));
        }

        tracing::info!(login_kind = %kind, role = %role, "session established");
        Ok(role)
    }

    /// Destroy the session.
    ///
    /// Store failures are logged, not returned. If the single update fails,
    /// each key is removed on its own so one bad key cannot keep the token alive.
    pub fn logout(&self) {
        match self.store().remove_many(&StorageKey::ALL) {
            Ok(()) => tracing::info!("session cleared"),
            Err(err) => {
                tracing::warn!(error = %err, "failed to clear session; removing keys one by one");
                for key in StorageKey::ALL {
                    if let Err(err) = self.store().remove(key) {
                        tracing::warn!(key = key.as_str(), error = %err, "failed to remove session key");
                    }
                }
            }
        }
    }

    /// React to a backend response status. 401/403 end the session.
    ///
    /// Returns `true` when the session was destroyed.
    pub fn handle_backend_status(&self, status: u16) -> bool {
        if !is_auth_failure(status) {
            return false;
        }
        tracing::warn!(status, "backend rejected credentials; ending session");
        self.logout();
        true
    }

    /// Dashboard for the current role, or the login page.
    pub fn landing_path(&self) -> String {
        let role = CanonicalRole::from_optional(self.provider.role().as_deref());
        self.table
            .landing_path(&role)
            .unwrap_or(self.login_path.as_str())
            .to_string()
    }

    /// Gate an API call against the per-user API budget.
    pub fn check_api(&mut self, endpoint: &str, now: Instant) -> RateDecision {
        let user = self
            .provider
            .store()
            .get(StorageKey::UserId)
            .ok()
            .flatten()
            .unwrap_or_else(|| "anonymous".to_string());
        self.limiter
            .check(&format!("{endpoint}_{user}"), LimitKind::Api, now)
    }
}

impl<S: TokenStore> SessionProvider for SessionManager<S> {
    fn token(&self) -> Option<String> {
        self.provider.token()
    }

    fn role(&self) -> Option<String> {
        self.provider.role()
    }
}

pub fn is_auth_failure(status: u16) -> bool {
    status == 401 || status == 403
}

fn login_key(identity: &str) -> String {
    format!("login_{}", identity.trim().to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use agriportal_auth::{GuardState, Location, MemoryTokenStore, RouteGuard, Scope};

    fn manager() -> SessionManager<Arc<MemoryTokenStore>> {
        SessionManager::new(
            Arc::new(MemoryTokenStore::new()),
            Arc::new(RoleCompatibilityTable::default()),
        )
    }

    fn response(token: &str, roles: &[&str]) -> LoginResponse {
        LoginResponse {
            access_token: Some(token.to_string()),
            roles: roles.iter().map(|r| r.to_string()).collect(),
            user_id: Some(UserId::from(17)),
            ..LoginResponse::default()
        }
    }

    /// Memory store that counts whole-store writes and can refuse bulk removal.
    #[derive(Default)]
    struct InstrumentedStore {
        inner: MemoryTokenStore,
        writes: AtomicUsize,
        fail_bulk_remove: bool,
        fail_all_removes: bool,
    }

    impl TokenStore for InstrumentedStore {
        fn get(&self, key: StorageKey) -> Result<Option<String>, StoreError> {
            self.inner.get(key)
        }

        fn set_many(&self, entries: &[(StorageKey, String)]) -> Result<(), StoreError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.inner.set_many(entries)
        }

        fn remove_many(&self, keys: &[StorageKey]) -> Result<(), StoreError> {
            if self.fail_all_removes || (self.fail_bulk_remove && keys.len() > 1) {
                return Err(StoreError::Corrupt("disk full".to_string()));
            }
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.inner.remove_many(keys)
        }

        fn replace_all(&self, entries: &[(StorageKey, String)]) -> Result<(), StoreError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.inner.replace_all(entries)
        }
    }

    fn table() -> Arc<RoleCompatibilityTable> {
        Arc::new(RoleCompatibilityTable::default())
    }

    #[test]
    fn login_response_accepts_numeric_and_string_ids() {
        let r: LoginResponse =
            serde_json::from_str(r#"{"accessToken":"t","roles":["ROLE_ADMIN"],"userId":42}"#).unwrap();
        assert_eq!(r.user_id.unwrap().as_str(), "42");

        let r: LoginResponse = serde_json::from_str(r#"{"accessToken":"t","userId":"u-9"}"#).unwrap();
        assert_eq!(r.user_id.unwrap().as_str(), "u-9");
        assert!(r.roles.is_empty());

        let r: LoginResponse = serde_json::from_str(r#"{"accessToken":"t"}"#).unwrap();
        assert!(r.user_id.is_none());
    }

    #[test]
    fn login_response_token_shapes() {
        let shapes = [
            r#"{"token":"jwt","roles":["ROLE_LAB"]}"#,
            r#"{"accessToken":"jwt","roles":["ROLE_LAB"]}"#,
            r#"{"data":{"token":"jwt","roles":["ROLE_LAB"]}}"#,
            r#"{"data":{"accessToken":"jwt","roles":["ROLE_LAB"]}}"#,
            r#"{"token":" ","data":{"accessToken":"jwt"},"roles":["ROLE_LAB"]}"#,
        ];
        for json in shapes {
            let r: LoginResponse = serde_json::from_str(json).unwrap();
            assert_eq!(r.session_token(), Some("jwt"), "{json}");
            assert_eq!(r.granted_roles(), ["ROLE_LAB".to_string()], "{json}");
        }

        let r: LoginResponse =
            serde_json::from_str(r#"{"token":"a","accessToken":"b"}"#).unwrap();
        assert_eq!(r.session_token(), Some("a"));

        let r: LoginResponse = serde_json::from_str(r#"{"data":{"message":"ok"}}"#).unwrap();
        assert_eq!(r.session_token(), None);
    }

    #[test]
    fn establish_reads_enveloped_response() {
        let mut m = manager();
        let r: LoginResponse = serde_json::from_str(
            r#"{"data":{"token":"jwt","roles":["ROLE_SURVEYOR"],"userId":5}}"#,
        )
        .unwrap();

        assert_eq!(m.establish(LoginKind::Employee, None, &r).unwrap(), CanonicalRole::SURVEYOR);
        assert_eq!(m.session().unwrap(), Session::new("jwt", "SURVEYOR"));
        assert_eq!(m.store().get(StorageKey::UserId).unwrap().as_deref(), Some("5"));
    }

    #[test]
    fn establish_is_one_store_update() {
        let mut m = SessionManager::new(InstrumentedStore::default(), table());
        m.establish(LoginKind::Lab, Some("lab@farm.io"), &response("a", &["ROLE_LAB"]))
            .unwrap();
        assert_eq!(m.store().writes.load(Ordering::SeqCst), 1);

        let mut r = response("b", &["ROLE_USER"]);
        r.user_id = None;
        m.establish(LoginKind::User, None, &r).unwrap();
        assert_eq!(m.store().writes.load(Ordering::SeqCst), 2);
        assert_eq!(m.store().get(StorageKey::UserEmail).unwrap(), None);
    }

    #[test]
    fn logout_falls_back_to_per_key_removal() {
        let store = InstrumentedStore {
            fail_bulk_remove: true,
            ..InstrumentedStore::default()
        };
        let mut m = SessionManager::new(store, table());
        m.establish(LoginKind::Admin, None, &response("t", &["ROLE_ADMIN"]))
            .unwrap();

        m.logout();
        assert_eq!(m.session().unwrap(), Session::anonymous());
        assert_eq!(m.store().get(StorageKey::UserId).unwrap(), None);
    }

    #[test]
    fn logout_reports_but_does_not_fail_on_store_errors() {
        let store = InstrumentedStore {
            fail_all_removes: true,
            ..InstrumentedStore::default()
        };
        let mut m = SessionManager::new(store, table());
        m.establish(LoginKind::User, None, &response("t", &["ROLE_USER"]))
            .unwrap();

        m.logout();
        assert!(m.handle_backend_status(401));
    }

    #[test]
    fn establish_writes_token_and_role_together() {
        let mut m = manager();
        let role = m
            .establish(LoginKind::Admin, Some("root@farm.io"), &response("jwt", &["ROLE_ADMIN"]))
            .unwrap();

        assert_eq!(role, CanonicalRole::ADMIN);
        assert_eq!(m.session().unwrap(), Session::new("jwt", "ADMIN"));
        assert_eq!(m.store().get(StorageKey::UserId).unwrap().as_deref(), Some("17"));
        assert_eq!(
            m.store().get(StorageKey::UserEmail).unwrap().as_deref(),
            Some("root@farm.io")
        );
        assert_eq!(m.landing_path(), "/admin/dashboard");
    }

    #[test]
    fn establish_without_token_fails_and_writes_nothing() {
        let mut m = manager();
        let mut r = response("  ", &["ROLE_USER"]);
        assert!(matches!(
            m.establish(LoginKind::User, None, &r),
            Err(SessionError::MissingToken)
        ));
        r.access_token = None;
        assert!(m.establish(LoginKind::User, None, &r).is_err());
        assert_eq!(m.session().unwrap(), Session::anonymous());
    }

    #[test]
    fn relogin_drops_previous_identity_fields() {
        let mut m = manager();
        m.establish(LoginKind::Lab, Some("lab@farm.io"), &response("a", &["ROLE_LAB"]))
            .unwrap();

        let mut r = response("b", &["ROLE_SURVEYOR"]);
        r.user_id = None;
        m.establish(LoginKind::Employee, None, &r).unwrap();

        assert_eq!(m.session().unwrap(), Session::new("b", "SURVEYOR"));
        assert_eq!(m.store().get(StorageKey::UserId).unwrap(), None);
        assert_eq!(m.store().get(StorageKey::UserEmail).unwrap(), None);
        assert_eq!(m.landing_path(), "/employee/dashboard");
    }

    #[test]
    fn auth_failures_end_the_session() {
        let mut m = manager();
        m.establish(LoginKind::User, None, &response("t", &["ROLE_USER"]))
            .unwrap();

        assert!(!m.handle_backend_status(500));
        assert!(!m.handle_backend_status(404));
        assert!(m.session().unwrap().has_token());

        assert!(m.handle_backend_status(401));
        assert_eq!(m.session().unwrap(), Session::anonymous());
        assert_eq!(m.landing_path(), LOGIN_PATH);

        m.establish(LoginKind::User, None, &response("t2", &["ROLE_USER"]))
            .unwrap();
        assert!(m.handle_backend_status(403));
        assert_eq!(m.session().unwrap(), Session::anonymous());
    }

    #[test]
    fn guard_sees_logout_from_another_handle() {
        let store = Arc::new(MemoryTokenStore::new());
        let mut writer = SessionManager::new(store.clone(), Arc::new(RoleCompatibilityTable::default()));
        let reader = StoreSessionProvider::new(store);
        let guard = RouteGuard::default();
        let here = Location::new("/lab/dashboard");

        writer
            .establish(LoginKind::Lab, None, &response("t", &["ROLE_LAB_TECHNICIAN"]))
            .unwrap();
        assert!(guard.evaluate(&reader, &Scope::lab(), &here).is_allowed());

        writer.logout();
        assert_eq!(
            guard.evaluate(&reader, &Scope::lab(), &here).state,
            GuardState::Unauthenticated
        );
    }

    #[test]
    fn login_attempts_are_throttled_per_identity() {
        let mut m = manager();
        let t0 = Instant::now();
        for _ in 0..5 {
            m.begin_login("Farmer@Farm.io", t0).unwrap();
        }
        assert!(matches!(
            m.begin_login("farmer@farm.io ", t0),
            Err(SessionError::Throttled { .. })
        ));
        m.begin_login("other@farm.io", t0).unwrap();

        m.establish(LoginKind::User, Some("farmer@farm.io"), &response("t", &["ROLE_USER"]))
            .unwrap();
        m.begin_login("farmer@farm.io", t0).unwrap();
    }

    #[test]
    fn api_budget_is_keyed_by_user() {
        let mut m = manager();
        let t0 = Instant::now();
        for _ in 0..100 {
            assert!(m.check_api("/api/v1/farmer-form", t0).is_allowed());
        }
        assert!(!m.check_api("/api/v1/farmer-form", t0).is_allowed());

        m.establish(LoginKind::Employee, None, &response("t", &["ROLE_EMPLOYEE"]))
            .unwrap();
        assert!(m.check_api("/api/v1/farmer-form", t0).is_allowed());
    }
}
