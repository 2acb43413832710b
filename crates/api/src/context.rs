use axum::http::{HeaderMap, header};

use agriportal_auth::{CanonicalRole, Scope, SessionProvider};
use agriportal_core::RequestId;

/// Cookie names mirroring the client's persisted storage keys.
pub const TOKEN_COOKIE: &str = "token";
pub const ROLE_COOKIE: &str = "role";

/// Session credentials carried by one request's cookies.
///
/// Built per request, so the guard always sees what the browser sent just now.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieSession {
    token: Option<String>,
    role: Option<String>,
}

impl CookieSession {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let mut session = Self::default();

        for value in headers.get_all(header::COOKIE) {
            let Ok(value) = value.to_str() else {
                continue;
            };
            for pair in value.split(';') {
                let Some((name, val)) = pair.split_once('=') else {
                    continue;
                };
                let val = val.trim().trim_matches('"');
                match name.trim() {
                    TOKEN_COOKIE => session.token = Some(val.to_string()),
                    ROLE_COOKIE => session.role = Some(val.to_string()),
                    _ => {}
                }
            }
        }

        session
    }
}

impl SessionProvider for CookieSession {
    fn token(&self) -> Option<String> {
        self.token.clone()
    }

    fn role(&self) -> Option<String> {
        self.role.clone()
    }
}

/// Correlation id for one request (inserted by the request-context middleware).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RequestContext {
    request_id: RequestId,
}

impl RequestContext {
    pub fn new(request_id: RequestId) -> Self {
        Self { request_id }
    }

    pub fn request_id(&self) -> RequestId {
        self.request_id
    }
}

/// Who entered a scope (inserted by the scope guard on success).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortalContext {
    scope: Scope,
    role: CanonicalRole,
}

impl PortalContext {
    pub fn new(scope: Scope, role: CanonicalRole) -> Self {
        Self { scope, role }
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn role(&self) -> &CanonicalRole {
        &self.role
    }
}
